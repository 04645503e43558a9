//! Tools for making everything else easier.

mod finite_history;

pub use self::finite_history::{FHBool, FiniteHistory};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
/// The error type for weight vectors which cannot be turned into a
/// categorical distribution.
pub enum NumericDegeneracyError {
    /// There were no weights to normalize.
    Empty,
    /// A weight was negative or not finite.
    InvalidWeight { index: usize, weight: f64 },
    /// The weights summed to zero (or to something that is not finite).
    DegenerateSum(f64),
}
impl fmt::Display for NumericDegeneracyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NumericDegeneracyError::Empty => write!(f, "no weights to normalize"),
            NumericDegeneracyError::InvalidWeight { index, weight } => {
                write!(f, "weight {} is invalid: {}", index, weight)
            }
            NumericDegeneracyError::DegenerateSum(z) => {
                write!(f, "weights sum to {}, which cannot be normalized", z)
            }
        }
    }
}
impl std::error::Error for NumericDegeneracyError {}

/// Normalize non-negative `weights` into a categorical distribution.
///
/// # Examples
///
/// ```
/// # extern crate grammarinference;
/// # use grammarinference::utilities::normalize;
/// let ps = normalize(&[1.0, 3.0]).expect("valid weights");
/// assert_eq!(ps, vec![0.25, 0.75]);
///
/// assert!(normalize(&[0.0, 0.0]).is_err());
/// ```
pub fn normalize(weights: &[f64]) -> Result<Vec<f64>, NumericDegeneracyError> {
    if weights.is_empty() {
        return Err(NumericDegeneracyError::Empty);
    }
    if let Some((index, &weight)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(NumericDegeneracyError::InvalidWeight { index, weight });
    }
    let z = weights.iter().sum::<f64>();
    if !z.is_finite() || z <= 0.0 {
        return Err(NumericDegeneracyError::DegenerateSum(z));
    }
    Ok(weights.iter().map(|w| w / z).collect())
}

pub fn logsumexp(lps: &[f64]) -> f64 {
    let largest = lps.iter().fold(f64::NEG_INFINITY, |acc, lp| acc.max(*lp));
    if largest == f64::NEG_INFINITY {
        f64::NEG_INFINITY
    } else {
        largest + lps.iter().map(|lp| (lp - largest).exp()).sum::<f64>().ln()
    }
}

/// Normalize log-weights into a categorical distribution without leaving log
/// space until the largest weight has been factored out.
pub fn exp_normalize(lps: &[f64]) -> Result<Vec<f64>, NumericDegeneracyError> {
    if lps.is_empty() {
        return Err(NumericDegeneracyError::Empty);
    }
    if let Some((index, &weight)) = lps
        .iter()
        .enumerate()
        .find(|(_, lp)| lp.is_nan() || **lp == f64::INFINITY)
    {
        return Err(NumericDegeneracyError::InvalidWeight { index, weight });
    }
    let z = logsumexp(lps);
    if z == f64::NEG_INFINITY {
        return Err(NumericDegeneracyError::DegenerateSum(0.0));
    }
    Ok(lps.iter().map(|lp| (lp - z).exp()).collect())
}

/// Draw an index from the (already normalized) categorical distribution `ps`.
pub fn sample_categorical<R: Rng>(ps: &[f64], rng: &mut R) -> Result<usize, NumericDegeneracyError> {
    match WeightedIndex::new(ps) {
        Ok(dist) => Ok(dist.sample(rng)),
        Err(_) => Err(NumericDegeneracyError::DegenerateSum(ps.iter().sum())),
    }
}

/// Normalize `weights` and draw from the result, returning the index and its
/// log-probability.
pub fn weighted_choice<R: Rng>(
    weights: &[f64],
    rng: &mut R,
) -> Result<(usize, f64), NumericDegeneracyError> {
    let ps = normalize(weights)?;
    let idx = sample_categorical(&ps, rng)?;
    Ok((idx, ps[idx].ln()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn normalize_rejects_bad_weights_test() {
        assert_eq!(Err(NumericDegeneracyError::Empty), normalize(&[]));
        assert_eq!(
            Err(NumericDegeneracyError::InvalidWeight {
                index: 1,
                weight: -1.0
            }),
            normalize(&[1.0, -1.0])
        );
        assert!(matches!(
            normalize(&[1.0, std::f64::NAN]),
            Err(NumericDegeneracyError::InvalidWeight { index: 1, .. })
        ));
        assert_eq!(
            Err(NumericDegeneracyError::DegenerateSum(0.0)),
            normalize(&[0.0, 0.0, 0.0])
        );
    }

    #[test]
    fn exp_normalize_test() {
        let ps = exp_normalize(&[0.0, 3f64.ln()]).unwrap();
        assert!((ps[0] - 0.25).abs() < 1e-12);
        assert!((ps[1] - 0.75).abs() < 1e-12);

        // Far beyond what `exp` can represent directly.
        let ps = exp_normalize(&[2000.0, 2000.0, f64::NEG_INFINITY]).unwrap();
        assert_eq!(vec![0.5, 0.5, 0.0], ps);

        assert_eq!(Err(NumericDegeneracyError::Empty), exp_normalize(&[]));
        assert_eq!(
            Err(NumericDegeneracyError::DegenerateSum(0.0)),
            exp_normalize(&[f64::NEG_INFINITY])
        );
        assert!(matches!(
            exp_normalize(&[0.0, f64::NAN]),
            Err(NumericDegeneracyError::InvalidWeight { index: 1, .. })
        ));
        assert_eq!(f64::NEG_INFINITY, logsumexp(&[]));
    }

    #[test]
    fn weighted_choice_never_picks_zero_weight_test() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let (idx, lp) = weighted_choice(&[0.0, 2.0, 0.0, 2.0], &mut rng).unwrap();
            assert!(idx == 1 || idx == 3);
            assert!((lp - 0.5f64.ln()).abs() < 1e-12);
        }
    }
}
