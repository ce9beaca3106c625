//! Report computation, options persistence and presentation

pub mod aggregator;
pub mod options;
pub mod presenter;

pub use aggregator::StatsAggregator;
pub use options::{FileOptionsStore, OptionEntry, OptionsStore};
