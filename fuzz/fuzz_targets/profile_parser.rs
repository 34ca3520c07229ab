#![no_main]

use libfuzzer_sys::fuzz_target;
use perfcheck::model::create_model_record;
use perfcheck::Profile;

fuzz_target!(|data: &[u8]| {
    // Parsing a profile and validating its models must never panic
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(profile) = Profile::from_json_str(input) {
            for model in &profile.models {
                let _ = create_model_record(model);
            }
        }
    }
});
