// libs/matching-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use shared_config::AppConfig;
use waitlist_cell::models::WaitlistEntry;

/// Relative weight of each scoring component. Weights are validated at
/// construction and renormalized to sum to 1, so component scores in [0,1]
/// always combine to a total in [0,1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoringWeights {
    pub urgency: f64,
    pub wait_time: f64,
    pub history: f64,
    pub insurance: f64,
}

impl ScoringWeights {
    pub fn from_config(config: &AppConfig) -> Result<Self, MatchingError> {
        Self {
            urgency: config.urgency_weight,
            wait_time: config.wait_time_weight,
            history: config.history_weight,
            insurance: config.insurance_weight,
        }
        .validated()
    }

    /// Validate ranges and renormalize so the weights sum to exactly 1.
    pub fn validated(self) -> Result<Self, MatchingError> {
        let components = [
            ("urgency", self.urgency),
            ("wait_time", self.wait_time),
            ("history", self.history),
            ("insurance", self.insurance),
        ];

        for (name, value) in components {
            if !(0.0..=1.0).contains(&value) {
                return Err(MatchingError::InvalidWeights(format!(
                    "{} weight must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        let sum: f64 = components.iter().map(|(_, v)| v).sum();
        if sum <= 0.0 {
            return Err(MatchingError::InvalidWeights(
                "at least one scoring weight must be positive".to_string(),
            ));
        }

        if (sum - 1.0).abs() > 1e-9 {
            warn!("Scoring weights sum to {:.3}, renormalizing to 1.0", sum);
            return Ok(Self {
                urgency: self.urgency / sum,
                wait_time: self.wait_time / sum,
                history: self.history / sum,
                insurance: self.insurance / sum,
            });
        }

        Ok(self)
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            urgency: 0.4,
            wait_time: 0.3,
            history: 0.15,
            insurance: 0.15,
        }
    }
}

/// A scored waitlist entry for a specific freed slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub entry: WaitlistEntry,
    pub score: f64,
    pub match_reasons: Vec<String>,
}

#[derive(Error, Debug)]
pub enum MatchingError {
    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(String),
}
