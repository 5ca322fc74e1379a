use serde::{Deserialize, Serialize};

use crate::error::{Result, SaError};
use crate::parallel_ops::Execution;

/// Caller supplied knobs for building one smoothed aggregation level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaConfig {
    /// Strength threshold: `A_ij` is strong when
    /// `|A_ij| >= theta * sqrt(|A_ii * A_jj|)`. Zero keeps every entry.
    pub theta: f64,
    /// Jacobi damping for the prolongator smoother.
    pub omega: f64,
    /// Arnoldi steps used by the spectral radius estimate.
    pub ritz_iterations: usize,
    pub execution: Execution,
    /// Seed for the random start vector of the Ritz iteration.
    pub seed: u64,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            theta: 0.0,
            omega: 4.0 / 3.0,
            ritz_iterations: 8,
            execution: Execution::Sequential,
            seed: 0x5a_a316,
        }
    }
}

impl SaConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        validate_theta(self.theta)?;
        if !self.omega.is_finite() {
            return Err(SaError::InvalidParameter {
                name: "omega",
                value: self.omega,
            });
        }
        if self.ritz_iterations == 0 {
            return Err(SaError::InvalidParameter {
                name: "ritz_iterations",
                value: 0.0,
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_theta(theta: f64) -> Result<()> {
    if theta.is_finite() && theta >= 0.0 {
        Ok(())
    } else {
        Err(SaError::InvalidParameter {
            name: "theta",
            value: theta,
        })
    }
}
