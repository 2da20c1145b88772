//! Shared density math: link functions and finite differences

/// ln(2π), the normalizing constant of the standard normal.
pub const LN_TWO_PI: f64 = 1.837_877_066_409_345_3;

/// Central-difference step, tuned for f64 first derivatives.
pub const FD_STEP: f64 = 6.055_454_452_393_343e-6;

/// Inverse logit, numerically stable on both tails.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^x) without overflow for large x.
pub fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// Log-odds. Infinite at the endpoints, like the transform it inverts.
pub fn logit(p: f64) -> f64 {
    p.ln() - (1.0 - p).ln()
}

/// Central finite difference of `f` along coordinate `i`.
pub fn central_diff<F>(f: F, point: &[f64], i: usize) -> Result<f64, crate::model::ModelError>
where
    F: Fn(&[f64]) -> Result<f64, crate::model::ModelError>,
{
    let mut probe = point.to_vec();
    probe[i] = point[i] + FD_STEP;
    let hi = f(&probe)?;
    probe[i] = point[i] - FD_STEP;
    let lo = f(&probe)?;
    Ok((hi - lo) / (2.0 * FD_STEP))
}
