//! Laplace mechanism
//!
//! Adds noise drawn from Laplace(0, b) with `b = sensitivity / epsilon`.
//! A Laplace(0, b) sample is the difference of two independent Exp(1/b)
//! samples. A zero scale (constant column) adds no noise and draws nothing.

use crate::error::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Exp};

/// Calibrated Laplace mechanism for a single column
#[derive(Debug, Clone)]
pub struct LaplaceMechanism {
    epsilon: f64,
    sensitivity: f64,
    scale: f64,
    exp: Option<Exp<f64>>,
}

impl LaplaceMechanism {
    /// Calibrate for the given epsilon and sensitivity
    pub fn new(epsilon: f64, sensitivity: f64) -> Result<Self> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "Laplace epsilon must be finite and positive, got {}",
                epsilon
            )));
        }
        if !sensitivity.is_finite() || sensitivity < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "Laplace sensitivity must be finite and non-negative, got {}",
                sensitivity
            )));
        }

        let scale = sensitivity / epsilon;
        if !scale.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "Laplace scale {} / {} overflows",
                sensitivity, epsilon
            )));
        }

        let exp = if scale > 0.0 {
            Some(Exp::new(1.0 / scale).map_err(|e| {
                Error::InvalidParameter(format!("Laplace scale {}: {}", scale, e))
            })?)
        } else {
            None
        };

        Ok(Self {
            epsilon,
            sensitivity,
            scale,
            exp,
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    /// Laplace scale `b`
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whether this mechanism adds any noise
    pub fn is_noiseless(&self) -> bool {
        self.exp.is_none()
    }

    /// Draw one noise sample
    pub fn sample_noise<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match &self.exp {
            Some(exp) => exp.sample(rng) - exp.sample(rng),
            None => 0.0,
        }
    }

    /// Perturb a single value
    pub fn randomize<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> f64 {
        value + self.sample_noise(rng)
    }

    /// Perturb every non-null value; nulls stay null
    pub fn randomize_column<R: Rng + ?Sized>(
        &self,
        values: &[Option<f64>],
        rng: &mut R,
    ) -> Vec<Option<f64>> {
        values
            .iter()
            .map(|v| v.map(|x| self.randomize(x, rng)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_scale() {
        let mech = LaplaceMechanism::new(0.5, 2.0).unwrap();
        assert_eq!(mech.scale(), 4.0);
        assert!(!mech.is_noiseless());
    }

    #[test]
    fn test_distribution_matches_laplace() {
        let (sensitivity, epsilon) = (3.0, 1.5);
        let b = sensitivity / epsilon;
        let mech = LaplaceMechanism::new(epsilon, sensitivity).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| mech.sample_noise(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        // For Laplace(0, b), E|X| = b and Var = 2b².
        let mean_abs = samples.iter().map(|x| x.abs()).sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.05 * b, "mean {}", mean);
        assert!((mean_abs - b).abs() < 0.05 * b, "mean |x| {} vs b {}", mean_abs, b);
        assert!((var - 2.0 * b * b).abs() < 0.1 * 2.0 * b * b, "var {}", var);

        // Median of |X| is b·ln 2.
        let mut abs: Vec<f64> = samples.iter().map(|x| x.abs()).collect();
        abs.sort_by(|a, b| a.total_cmp(b));
        let median = abs[n / 2];
        assert!((median - b * std::f64::consts::LN_2).abs() < 0.05 * b);
    }

    #[test]
    fn test_zero_sensitivity_adds_no_noise() {
        let mech = LaplaceMechanism::new(1.0, 0.0).unwrap();
        assert!(mech.is_noiseless());
        assert_eq!(mech.scale(), 0.0);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(mech.randomize(12.5, &mut rng), 12.5);
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            LaplaceMechanism::new(0.0, 1.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(LaplaceMechanism::new(-1.0, 1.0).is_err());
        assert!(LaplaceMechanism::new(1.0, -0.5).is_err());
        assert!(LaplaceMechanism::new(1.0, f64::INFINITY).is_err());
        assert!(LaplaceMechanism::new(1e-320, 1e300).is_err());
    }

    #[test]
    fn test_randomize_column_keeps_nulls() {
        let mech = LaplaceMechanism::new(1.0, 1.0).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let out = mech.randomize_column(&[Some(1.0), None, Some(3.0)], &mut rng);
        assert!(out[0].is_some());
        assert!(out[1].is_none());
        assert!(out[2].is_some());
        assert_ne!(out[0], Some(1.0));
    }

    #[test]
    fn test_same_seed_same_noise() {
        let mech = LaplaceMechanism::new(0.3, 5.0).unwrap();
        let draw = |seed| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            (0..50).map(|_| mech.sample_noise(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
        assert_ne!(draw(7), draw(8));
    }
}
