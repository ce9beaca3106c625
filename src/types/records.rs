//! Record types read from the voting platform's tables

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Medium through which a ballot was cast.
///
/// The four known channels have fixed names in the platform's
/// `statistical_ballots.type` column. Anything else is kept verbatim in
/// `Other` so it still shows up in the all-channels aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Channel {
    /// Kiosk tablet at a polling station
    Tablet,
    /// Authenticated web session
    User,
    /// One-time link sent by email
    Link,
    /// Physical paper ballot, digitised later
    Paper,
    Other(String),
}

impl Channel {
    /// The four channels every report breaks down, in display order
    pub const KNOWN: [Channel; 4] = [Channel::Tablet, Channel::User, Channel::Link, Channel::Paper];

    pub fn as_str(&self) -> &str {
        match self {
            Channel::Tablet => "tablet",
            Channel::User => "user",
            Channel::Link => "link",
            Channel::Paper => "paper",
            Channel::Other(name) => name,
        }
    }

    /// Human label used in terminal output
    pub fn label(&self) -> &str {
        match self {
            Channel::Tablet => "Tablet",
            Channel::User => "Web",
            Channel::Link => "Link",
            Channel::Paper => "Paper",
            Channel::Other(name) => name,
        }
    }
}

impl From<&str> for Channel {
    fn from(value: &str) -> Self {
        match value {
            "tablet" => Channel::Tablet,
            "user" => Channel::User,
            "link" => Channel::Link,
            "paper" => Channel::Paper,
            other => Channel::Other(other.to_string()),
        }
    }
}

impl From<String> for Channel {
    fn from(value: String) -> Self {
        Channel::from(value.as_str())
    }
}

impl From<Channel> for String {
    fn from(value: Channel) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cast vote, stripped of its choices (statistical copy)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ballot {
    pub channel: Channel,
    pub gender: String,
    pub created_at: NaiveDateTime,
}

impl Ballot {
    /// Calendar day the ballot counts towards, same as `DATE(created_at)`
    pub fn day(&self) -> NaiveDate {
        self.created_at.date()
    }
}

/// Entry of the eligibility roll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citizen {
    pub id: u64,
    pub dni: String,
    pub voted: bool,
}

/// Account identity, optionally linked to a citizen and a neighbourhood
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: u64,
    pub citizen_id: Option<u64>,
    pub neighbourhood_id: Option<u64>,
}

/// Registered platform account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: u64,
    pub subject_id: u64,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Sign-up awaiting email confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingUser {
    pub id: u64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbourhood {
    pub id: u64,
    pub name: String,
    pub district_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct District {
    pub id: u64,
    pub name: String,
}

/// Citizen lookup result with its linked account, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitizenRecord {
    #[serde(flatten)]
    pub citizen: Citizen,
    pub subject: Option<Subject>,
    pub user: Option<User>,
}
