//! Participation statistics for participatory-budgeting votes.
//!
//! A snapshot of the platform tables is loaded into a [`store::Dataset`],
//! the voting window comes from an [`services::OptionsStore`], and
//! [`services::StatsAggregator`] turns both into a [`types::Report`].

pub mod cli;
pub mod config;
pub mod logging;
pub mod services;
pub mod store;
pub mod types;
