//! Type definitions for votetrack

mod error;
mod records;
mod report;
mod window;

pub use error::*;
pub use records::*;
pub use report::*;
pub use window::*;

/// Options file warning types
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsWarning {
    /// Options file does not exist yet
    Missing(String),
    /// Options file is not valid JSON
    Corrupted(String),
}
