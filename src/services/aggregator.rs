//! Statistics aggregator for voting participation reports

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::services::options::{voting_window, OptionsStore};
use crate::store::{RecordStore, Tally};
use crate::types::{
    Channel, ChannelBreakdown, DistrictTurnout, NeighbourhoodTurnout, PendingReport, Report,
    Result, Totals, VotersSummary, VotingWindow, EXPECTED_GENDERS,
};
use rayon::prelude::*;

/// Computes participation reports from a record store.
///
/// Store queries are independent of each other and are fanned out with
/// rayon; the first failing query's error is returned unchanged.
pub struct StatsAggregator<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Resolve the voting window from `options`, then compute the report.
    /// Option errors surface before any store query runs.
    pub fn report_from_options(
        &self,
        options: &dyn OptionsStore,
        today: NaiveDate,
    ) -> Result<Report> {
        let window = voting_window(options)?;
        self.compute_report(window, today)
    }

    /// Participation snapshot as of `today`.
    ///
    /// Daily and gender maps stay sparse; `date_axis` covers
    /// `window.start..=min(window.end, today)` for zero-filling.
    pub fn compute_report(&self, window: VotingWindow, today: NaiveDate) -> Result<Report> {
        let _span = tracing::info_span!(
            "compute_report",
            start = %window.start,
            end = %window.end,
            %today
        )
        .entered();

        if window.is_inverted() {
            tracing::warn!(
                start = %window.start,
                end = %window.end,
                "voting window starts after it ends, date axis will be empty"
            );
        }

        let ((totals, (breakdowns, last_ballot_at)), (districts, neighbourhoods)) = rayon::join(
            || {
                rayon::join(
                    || self.totals(),
                    || rayon::join(|| self.breakdowns(), || self.store.last_ballot_at()),
                )
            },
            || {
                rayon::join(
                    || self.store.turnout_by_district(),
                    || self.store.turnout_by_neighbourhood(),
                )
            },
        );

        let totals = totals?;
        let (all, channels) = breakdowns?;
        let last_ballot_at = last_ballot_at?;
        let mut districts = districts?;
        let mut neighbourhoods = neighbourhoods?;

        rank_districts(&mut districts);
        rank_neighbourhoods(&mut neighbourhoods);

        let report = Report {
            today,
            window,
            totals,
            all,
            channels,
            districts,
            neighbourhoods,
            date_axis: window.axis_until(today),
            genders: EXPECTED_GENDERS.iter().map(|g| g.to_string()).collect(),
            last_ballot_at,
        };

        tracing::debug!(
            ballots = report.all.total,
            days = report.date_axis.len(),
            districts = report.districts.len(),
            "report computed"
        );

        Ok(report)
    }

    /// Sign-ups awaiting confirmation, bucketed over the whole window
    pub fn pending_report(&self, window: VotingWindow) -> Result<PendingReport> {
        let (users, (pending_users, per_day)) = rayon::join(
            || self.store.count(Tally::Users),
            || {
                rayon::join(
                    || self.store.count(Tally::PendingUsers),
                    || self.store.pending_users_per_day(),
                )
            },
        );

        Ok(PendingReport {
            users: users?,
            pending_users: pending_users?,
            per_day: per_day?,
            date_axis: window.full_axis(),
        })
    }

    /// Registered citizens that have and haven't voted
    pub fn voters_summary(&self) -> Result<VotersSummary> {
        let linked = self.store.count(Tally::LinkedSubjects)?;
        let voted = self.store.count(Tally::RegisteredVotersWhoVoted)?;
        Ok(VotersSummary::new(linked, voted))
    }

    fn totals(&self) -> Result<Totals> {
        Ok(Totals {
            users: self.store.count(Tally::Users)?,
            pending_users: self.store.count(Tally::PendingUsers)?,
            citizens_voted: self.store.count(Tally::VotedCitizens)?,
            citizens_with_account: self.store.count(Tally::LinkedSubjects)?,
            registered_voters_voted: self.store.count(Tally::RegisteredVotersWhoVoted)?,
        })
    }

    /// "All channels" plus one breakdown per known channel
    fn breakdowns(&self) -> Result<(ChannelBreakdown, BTreeMap<Channel, ChannelBreakdown>)> {
        let filters: Vec<Option<Channel>> = std::iter::once(None)
            .chain(Channel::KNOWN.into_iter().map(Some))
            .collect();

        let computed: Vec<(Option<Channel>, ChannelBreakdown)> = filters
            .into_par_iter()
            .map(|filter| {
                let breakdown = self.breakdown(filter.as_ref())?;
                Ok((filter, breakdown))
            })
            .collect::<Result<_>>()?;

        let mut all = ChannelBreakdown::default();
        let mut channels = BTreeMap::new();
        for (filter, breakdown) in computed {
            match filter {
                None => all = breakdown,
                Some(channel) => {
                    channels.insert(channel, breakdown);
                }
            }
        }
        Ok((all, channels))
    }

    fn breakdown(&self, channel: Option<&Channel>) -> Result<ChannelBreakdown> {
        Ok(ChannelBreakdown {
            total: self.store.count_ballots(channel)?,
            per_day: self.store.ballots_per_day(channel)?,
            per_gender: self.store.ballots_per_gender(channel)?,
        })
    }
}

/// Sort by voters descending. Ties fall back to name so output is stable.
fn rank_districts(rows: &mut [DistrictTurnout]) {
    rows.sort_by(|a, b| {
        b.voters
            .cmp(&a.voters)
            .then_with(|| a.district.cmp(&b.district))
    });
}

fn rank_neighbourhoods(rows: &mut [NeighbourhoodTurnout]) {
    rows.sort_by(|a, b| {
        b.voters
            .cmp(&a.voters)
            .then_with(|| a.district.cmp(&b.district))
            .then_with(|| a.neighbourhood.cmp(&b.neighbourhood))
    });
}
