use anyhow::{Context, Result};
use clap::Parser;
use perfcheck::cli::{Cli, OutputFormat};
use perfcheck::{
    check_profiles, degradation_between_profiles, CheckConfig, CheckMethod, CheckReport,
    DetectionContext, ModelsStrategy, Profile,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_profile(path: &Path) -> Result<Profile> {
    Profile::load(path).with_context(|| format!("Failed to load profile {}", path.display()))
}

/// Configuration file overridden by the command line
fn load_config(args: &Cli) -> Result<CheckConfig> {
    let mut config = match &args.config {
        Some(path) => CheckConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => CheckConfig::default(),
    };
    if let Some(name) = &args.models_strategy {
        config.models_strategy = name.parse::<ModelsStrategy>()?;
    }
    if let Some(samples) = args.samples {
        config.samples = samples;
    }
    config.report_missing |= args.report_missing;
    config.validate()?;
    Ok(config)
}

fn print_reports(reports: &[CheckReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for report in reports {
                print!("{}", report.to_report_string());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reports)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let baseline = load_profile(&args.baseline)?;
    let target = load_profile(&args.target)?;

    // Profiles collected with different setups are not comparable
    if !args.force && baseline.configuration() != target.configuration() {
        anyhow::bail!(
            "Profiles were not collected with the same collector, command, workload and \
             postprocessors (use --force to compare anyway)"
        );
    }

    let ctx = DetectionContext::new(&config);
    let reports = if args.methods.is_empty() {
        degradation_between_profiles(&baseline, &target, &ctx)?
    } else {
        let methods = args
            .methods
            .iter()
            .map(|name| name.parse::<CheckMethod>())
            .collect::<Result<Vec<_>, _>>()?;
        check_profiles(&baseline, &target, &methods, &ctx)?
    };

    print_reports(&reports, args.format)
}
