//! Command execution functions for pipeline operations.

pub mod assemble;
pub mod package;
pub mod version;

use super::RuntimeConfig;
use crate::bundler::Warning;

/// Prints the end-of-run warning summary.
fn summarize_warnings(warnings: &[Warning], config: &RuntimeConfig) {
    if warnings.is_empty() {
        return;
    }
    config.section(&format!("{} warning(s)", warnings.len()));
    for warning in warnings {
        config.warn(&warning.to_string());
    }
}
