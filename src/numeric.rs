//! Numeric helpers shared by the curve evaluator and the deviation analyzers
//!
//! Safe division, NaN coercion, range tests, Simpson's rule integration and
//! small least-squares solvers. Everything here is pure and deterministic.

/// Divisors with a smaller magnitude are treated as zero
pub const APPROX_ZERO: f64 = 1e-9;

/// Divide `dividend` by `divisor`, returning 0 when the divisor is (approximately) zero
///
/// # Example
/// ```
/// use perfcheck::numeric::safe_division;
///
/// assert_eq!(safe_division(10.0, 4.0), 2.5);
/// assert_eq!(safe_division(10.0, 0.0), 0.0);
/// ```
pub fn safe_division(dividend: f64, divisor: f64) -> f64 {
    if divisor.abs() < APPROX_ZERO || !divisor.is_finite() {
        return 0.0;
    }
    let result = dividend / divisor;
    finite_or_zero(result)
}

/// Replace NaN and infinities with 0
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Round to the given number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Tests `-|border| <= value <= |border|`
pub fn abs_in_absolute_range(value: f64, border: f64) -> bool {
    -border.abs() <= value && value <= border.abs()
}

/// Tests `|(1 - rate) * range_val| <= |value| <= |(1 + rate) * range_val|`
///
/// Rates outside of `[0, 1]` are treated as 0.
pub fn abs_in_relative_range(value: f64, range_val: f64, range_rate: f64) -> bool {
    let rate = if (0.0..=1.0).contains(&range_rate) {
        range_rate
    } else {
        0.0
    };
    ((1.0 - rate) * range_val).abs() <= value.abs()
        && value.abs() <= ((1.0 + rate) * range_val).abs()
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// `count` evenly spaced points over `[start, end]`, both ends included
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            let mut points: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
            points[count - 1] = end;
            points
        }
    }
}

/// Composite Simpson's rule over (possibly unevenly spaced) samples
///
/// With an even number of samples the result averages "Simpson on the first
/// N-2 intervals + trapezoid on the last" and "trapezoid on the first +
/// Simpson on the rest".
pub fn simpson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    match n {
        0 | 1 => 0.0,
        2 => trapezoid(x[0], x[1], y[0], y[1]),
        _ if n % 2 == 1 => simpson_odd(&x[..n], &y[..n]),
        _ => {
            let last = n - 1;
            let head = simpson_odd(&x[..last], &y[..last])
                + trapezoid(x[last - 1], x[last], y[last - 1], y[last]);
            let tail = trapezoid(x[0], x[1], y[0], y[1]) + simpson_odd(&x[1..n], &y[1..n]);
            (head + tail) / 2.0
        }
    }
}

fn trapezoid(x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    (x1 - x0) * (y0 + y1) / 2.0
}

/// Simpson's rule over an odd number of samples
fn simpson_odd(x: &[f64], y: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut i = 0;
    while i + 2 < x.len() {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        if h0.abs() < f64::EPSILON || h1.abs() < f64::EPSILON {
            total += trapezoid(x[i], x[i + 1], y[i], y[i + 1])
                + trapezoid(x[i + 1], x[i + 2], y[i + 1], y[i + 2]);
        } else {
            let hsum = h0 + h1;
            let ratio = h0 / h1;
            total += hsum / 6.0
                * (y[i] * (2.0 - 1.0 / ratio)
                    + y[i + 1] * hsum * hsum / (h0 * h1)
                    + y[i + 2] * (2.0 - ratio));
        }
        i += 2;
    }
    total
}

/// Result of an ordinary least-squares line fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient of the fitted data
    pub r_value: f64,
}

impl LinearFit {
    pub fn r_square(&self) -> f64 {
        self.r_value * self.r_value
    }
}

/// Ordinary least-squares fit of `y = intercept + slope * x`
///
/// Returns `None` for fewer than two points.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let x_mean = mean(&x[..n]);
    let y_mean = mean(&y[..n]);

    let (mut s_xx, mut s_yy, mut s_xy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y.iter()).take(n) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        s_xx += dx * dx;
        s_yy += dy * dy;
        s_xy += dx * dy;
    }

    let slope = safe_division(s_xy, s_xx);
    let intercept = y_mean - slope * x_mean;
    let r_value = if s_xx > 0.0 && s_yy > 0.0 {
        (s_xy / (s_xx.sqrt() * s_yy.sqrt())).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    Some(LinearFit {
        slope,
        intercept,
        r_value,
    })
}

/// Least-squares polynomial of the given degree in the original x basis
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    /// Coefficients in ascending order of power
    pub coefficients: Vec<f64>,
    /// Sum of squared residuals
    pub residual: f64,
}

impl PolynomialFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, coeff| acc * x + coeff)
    }
}

/// Fit a polynomial of `degree` to the points
///
/// The abscissa is mapped onto `[-1, 1]` before building the normal equations
/// and the coefficients are mapped back afterwards. Returns `None` when there
/// are not more points than coefficients or the system is singular.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<PolynomialFit> {
    let n = x.len().min(y.len());
    if n <= degree {
        return None;
    }

    let (min_x, max_x) = x[..n]
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let center = (min_x + max_x) / 2.0;
    let half_width = if max_x - min_x > 0.0 {
        (max_x - min_x) / 2.0
    } else {
        1.0
    };
    let scaled: Vec<f64> = x[..n].iter().map(|v| (v - center) / half_width).collect();

    let size = degree + 1;
    let mut matrix = vec![vec![0.0; size]; size];
    let mut rhs = vec![0.0; size];
    for (t, yi) in scaled.iter().zip(y.iter()) {
        let powers: Vec<f64> = (0..2 * size).map(|p| t.powi(p as i32)).collect();
        for row in 0..size {
            for col in 0..size {
                matrix[row][col] += powers[row + col];
            }
            rhs[row] += yi * powers[row];
        }
    }
    let scaled_coeffs = solve_linear_system(matrix, rhs)?;

    let residual = scaled
        .iter()
        .zip(y.iter())
        .map(|(t, yi)| {
            let fitted = scaled_coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c);
            (yi - fitted).powi(2)
        })
        .sum();

    Some(PolynomialFit {
        coefficients: unscale_polynomial(&scaled_coeffs, center, half_width),
        residual,
    })
}

/// Expand `sum c_k ((x - center) / width)^k` into ascending powers of x
fn unscale_polynomial(scaled: &[f64], center: f64, width: f64) -> Vec<f64> {
    let mut result = vec![0.0; scaled.len()];
    // (x - center)^k / width^k expanded with binomial coefficients
    for (k, coeff) in scaled.iter().enumerate() {
        let factor = coeff / width.powi(k as i32);
        let mut binomial = 1.0;
        for j in 0..=k {
            if j > 0 {
                binomial = binomial * (k - j + 1) as f64 / j as f64;
            }
            result[j] += factor * binomial * (-center).powi((k - j) as i32);
        }
    }
    result
}

/// Gaussian elimination with partial pivoting
fn solve_linear_system(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let size = rhs.len();
    for col in 0..size {
        let pivot = (col..size).max_by(|&a, &b| {
            matrix[a][col]
                .abs()
                .partial_cmp(&matrix[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if matrix[pivot][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..size {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..size {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }
    if solution.iter().all(|v| v.is_finite()) {
        Some(solution)
    } else {
        None
    }
}
