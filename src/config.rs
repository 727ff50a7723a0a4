//! Training configuration.
//!
//! Defaults reproduce the reference MNIST run. Every field can be overridden
//! from the environment:
//!
//! | variable              | field           | default |
//! |-----------------------|-----------------|---------|
//! | `FFNET_EPOCHS`        | `epochs`        | 75      |
//! | `FFNET_BATCH_SIZE`    | `batch_size`    | 16      |
//! | `FFNET_LEARNING_RATE` | `learning_rate` | 0.01    |

use std::env;
use std::str::FromStr;

use crate::{Error, Result};

pub const EPOCHS_VAR: &str = "FFNET_EPOCHS";
pub const BATCH_SIZE_VAR: &str = "FFNET_BATCH_SIZE";
pub const LEARNING_RATE_VAR: &str = "FFNET_LEARNING_RATE";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 75,
            batch_size: 16,
            learning_rate: 0.01,
        }
    }
}

impl TrainConfig {
    /// Defaults overlaid with the `FFNET_*` environment variables.
    ///
    /// # Errors
    /// [`Error::Config`] if a variable is set but unparsable, or the result
    /// fails [`TrainConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Like [`TrainConfig::from_env`], reading variables through `lookup`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(epochs) = parse_var(&lookup, EPOCHS_VAR)? {
            cfg.epochs = epochs;
        }
        if let Some(batch_size) = parse_var(&lookup, BATCH_SIZE_VAR)? {
            cfg.batch_size = batch_size;
        }
        if let Some(lr) = parse_var(&lookup, LEARNING_RATE_VAR)? {
            cfg.learning_rate = lr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// [`Error::Config`] for zero epochs, a zero batch size, or a learning
    /// rate that is not finite and positive.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::Config {
                key: EPOCHS_VAR,
                reason: "epochs must be > 0".to_owned(),
            });
        }
        if self.batch_size == 0 {
            return Err(Error::Config {
                key: BATCH_SIZE_VAR,
                reason: "batch size must be > 0".to_owned(),
            });
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::Config {
                key: LEARNING_RATE_VAR,
                reason: format!(
                    "learning rate must be finite and > 0, got {}",
                    self.learning_rate
                ),
            });
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|e| Error::Config {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}
