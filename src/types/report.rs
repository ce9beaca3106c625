//! Report types produced by the statistics aggregator

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{Channel, VotingWindow};

/// Ballots per calendar day. Sparse: days without ballots are absent.
pub type DailyCounts = BTreeMap<NaiveDate, u64>;

/// Ballots per gender value. Sparse, unknown genders kept as-is.
pub type GenderCounts = BTreeMap<String, u64>;

/// Gender values the charts always draw a series for
pub const EXPECTED_GENDERS: [&str; 2] = ["M", "F"];

/// Counts for one channel (or for all channels together)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChannelBreakdown {
    pub total: u64,
    pub per_day: DailyCounts,
    pub per_gender: GenderCounts,
}

impl ChannelBreakdown {
    /// Busiest day and its count; earliest day wins a tie
    pub fn peak_day(&self) -> Option<(NaiveDate, u64)> {
        let mut peak: Option<(NaiveDate, u64)> = None;
        for (date, count) in &self.per_day {
            match &peak {
                None => peak = Some((*date, *count)),
                Some((_, max)) if count > max => peak = Some((*date, *count)),
                _ => {}
            }
        }
        peak
    }
}

/// Head counts of users, sign-ups and voters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    /// Registered accounts
    pub users: u64,
    /// Sign-ups not yet confirmed
    pub pending_users: u64,
    /// Citizens on the roll marked as voted
    pub citizens_voted: u64,
    /// Accounts linked to a roll entry
    pub citizens_with_account: u64,
    /// Accounts whose linked citizen has voted
    pub registered_voters_voted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictTurnout {
    pub district: String,
    pub voters: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighbourhoodTurnout {
    pub district: String,
    pub neighbourhood: String,
    pub voters: u64,
}

/// Participation snapshot for the admin statistics page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub today: NaiveDate,
    pub window: VotingWindow,
    pub totals: Totals,
    /// All ballots, whatever their channel
    pub all: ChannelBreakdown,
    /// One entry per known channel
    pub channels: BTreeMap<Channel, ChannelBreakdown>,
    /// Sorted by voters, descending
    pub districts: Vec<DistrictTurnout>,
    /// Sorted by voters, descending
    pub neighbourhoods: Vec<NeighbourhoodTurnout>,
    /// Zero-fill axis for the daily series
    pub date_axis: Vec<NaiveDate>,
    pub genders: Vec<String>,
    /// Most recent ballot, any channel
    pub last_ballot_at: Option<NaiveDateTime>,
}

impl Report {
    pub fn channel(&self, channel: &Channel) -> Option<&ChannelBreakdown> {
        self.channels.get(channel)
    }

    /// Ballots whose channel is none of the known four
    pub fn unclassified_ballots(&self) -> u64 {
        let known: u64 = self.channels.values().map(|c| c.total).sum();
        self.all.total.saturating_sub(known)
    }
}

/// One day of a densified series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub count: u64,
}

/// Sign-ups still waiting for confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingReport {
    pub users: u64,
    pub pending_users: u64,
    pub per_day: DailyCounts,
    pub date_axis: Vec<NaiveDate>,
}

/// Registered citizens that have and haven't voted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotersSummary {
    pub citizens_with_account: u64,
    pub registered_voters_voted: u64,
    pub pending: u64,
}

impl VotersSummary {
    pub fn new(citizens_with_account: u64, registered_voters_voted: u64) -> Self {
        Self {
            citizens_with_account,
            registered_voters_voted,
            pending: citizens_with_account.saturating_sub(registered_voters_voted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_peak_day_empty() {
        assert!(ChannelBreakdown::default().peak_day().is_none());
    }

    #[test]
    fn test_peak_day_earliest_wins_tie() {
        let mut breakdown = ChannelBreakdown::default();
        breakdown.per_day.insert(d(3), 5);
        breakdown.per_day.insert(d(1), 5);
        breakdown.per_day.insert(d(2), 2);

        assert_eq!(breakdown.peak_day(), Some((d(1), 5)));
    }

    #[test]
    fn test_voters_summary_pending_saturates() {
        let summary = VotersSummary::new(10, 4);
        assert_eq!(summary.pending, 6);

        // Stale snapshot: more voters than linked accounts
        let summary = VotersSummary::new(3, 5);
        assert_eq!(summary.pending, 0);
    }

    #[test]
    fn test_daily_counts_serialize_with_date_keys() {
        let mut breakdown = ChannelBreakdown::default();
        breakdown.total = 2;
        breakdown.per_day.insert(d(1), 2);
        breakdown.per_gender.insert("F".to_string(), 2);

        let json = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["per_day"]["2024-01-01"], 2);
        assert_eq!(json["per_gender"]["F"], 2);
    }
}
