//! Record store: the typed queries the reports run against

mod dataset;
mod loader;

pub use dataset::Dataset;
pub use loader::{DatasetLoader, Table};

use chrono::NaiveDateTime;

use crate::types::{
    Channel, CitizenRecord, DailyCounts, DistrictTurnout, GenderCounts, NeighbourhoodTurnout,
    Result,
};

/// Head counts a store can answer with a single predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tally {
    /// Registered accounts
    Users,
    /// Unconfirmed sign-ups
    PendingUsers,
    /// Roll entries with `voted = true`
    VotedCitizens,
    /// Subjects with a `citizen_id`
    LinkedSubjects,
    /// Users → subjects → citizens where the citizen voted
    RegisteredVotersWhoVoted,
}

/// Read-only access to the platform's ballots, roll and accounts.
///
/// `channel: None` means "every ballot", including channels outside
/// [`Channel::KNOWN`]. Grouped results are sparse: a group with no rows
/// is absent. Turnout rankings come back in store order; callers sort.
pub trait RecordStore: Send + Sync {
    fn count(&self, tally: Tally) -> Result<u64>;

    fn count_ballots(&self, channel: Option<&Channel>) -> Result<u64>;

    /// Ballots grouped by the calendar day of `created_at`
    fn ballots_per_day(&self, channel: Option<&Channel>) -> Result<DailyCounts>;

    fn ballots_per_gender(&self, channel: Option<&Channel>) -> Result<GenderCounts>;

    /// Pending sign-ups grouped by the calendar day of `created_at`
    fn pending_users_per_day(&self) -> Result<DailyCounts>;

    /// Voting registered users grouped by district
    fn turnout_by_district(&self) -> Result<Vec<DistrictTurnout>>;

    /// Voting registered users grouped by (district, neighbourhood)
    fn turnout_by_neighbourhood(&self) -> Result<Vec<NeighbourhoodTurnout>>;

    /// Latest `created_at` over all ballots; `None` when nobody voted yet
    fn last_ballot_at(&self) -> Result<Option<NaiveDateTime>>;

    fn find_citizens_by_dni(&self, dni: &str) -> Result<Vec<CitizenRecord>>;
}
