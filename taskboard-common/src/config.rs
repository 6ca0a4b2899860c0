//! Validated configuration.
//!
//! Config structs deserialize with defaults for missing keys and are checked
//! with [`ValidatedConfig::validate`] before anything is built from them.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub trait ValidatedConfig:
    Send + Sync + Clone + Debug + Serialize + for<'de> Deserialize<'de>
{
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reject values that deserialize fine but cannot work
    fn validate(&self) -> Result<(), Self::Error>;

    /// Short human description, used in error reports and docs
    fn description() -> &'static str;
}

/// Default construction that is guaranteed to pass validation
pub trait DefaultConfig: ValidatedConfig + Default {
    fn validated_default() -> Result<Self, Self::Error> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }
}

impl<T> DefaultConfig for T where T: ValidatedConfig + Default {}
