//! Configuration Management
//!
//! Tuning knobs for builder pre-sizing. None of them affect correctness; they
//! only decide how much memory builders reserve up front.

use crate::common::constants::{
    DEFAULT_EXPECTED_BYTES_PER_ENTRY, DEFAULT_MAX_PAGE_SIZE_IN_BYTES,
};
use crate::common::error::PrismResult;
use crate::invalid_arg_err;
use serde::{Deserialize, Serialize};

/// Block layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockConfig {
    /// Upper bound for the bytes a page's builders reserve up front
    pub max_page_size_in_bytes: usize,
    /// Bytes per entry assumed when pre-sizing unbounded variable-width builders
    pub default_expected_bytes_per_entry: usize,
}

impl BlockConfig {
    /// Parse a configuration from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> PrismResult<Self> {
        let config: BlockConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no builder could honor
    pub fn validate(&self) -> PrismResult<()> {
        if self.max_page_size_in_bytes == 0 {
            return Err(invalid_arg_err!("max_page_size_in_bytes must be positive"));
        }
        if self.default_expected_bytes_per_entry == 0 {
            return Err(invalid_arg_err!(
                "default_expected_bytes_per_entry must be positive"
            ));
        }
        Ok(())
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        BlockConfig {
            max_page_size_in_bytes: DEFAULT_MAX_PAGE_SIZE_IN_BYTES,
            default_expected_bytes_per_entry: DEFAULT_EXPECTED_BYTES_PER_ENTRY,
        }
    }
}
