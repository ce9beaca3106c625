//! JSONL snapshot loader
//!
//! A snapshot directory holds one JSONL export per table
//! (`ballots.jsonl`, `citizens.jsonl`, ...). Large tables may be split into
//! shards named `<table>-<anything>.jsonl`. Missing tables load as empty;
//! malformed lines are skipped with a warning.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Deserialize;

use super::Dataset;
use crate::types::{
    parse_wall_clock, Ballot, Channel, Citizen, District, Neighbourhood, PendingUser, Result,
    Subject, User, VotetrackError,
};

/// Tables exported in a snapshot directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Ballots,
    Citizens,
    Subjects,
    Users,
    PendingUsers,
    Neighbourhoods,
    Districts,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Ballots,
        Table::Citizens,
        Table::Subjects,
        Table::Users,
        Table::PendingUsers,
        Table::Neighbourhoods,
        Table::Districts,
    ];

    /// File stem of the table's export
    pub fn stem(&self) -> &'static str {
        match self {
            Table::Ballots => "ballots",
            Table::Citizens => "citizens",
            Table::Subjects => "subjects",
            Table::Users => "users",
            Table::PendingUsers => "pending_users",
            Table::Neighbourhoods => "neighbourhoods",
            Table::Districts => "districts",
        }
    }
}

#[derive(Deserialize)]
struct BallotLine<'a> {
    #[serde(rename = "type", alias = "channel")]
    channel: &'a str,
    gender: Option<&'a str>,
    created_at: &'a str,
}

/// DNIs show up both as strings and as bare numbers in exports
#[derive(Deserialize)]
#[serde(untagged)]
enum DniValue {
    Text(String),
    Number(u64),
}

/// MySQL exports booleans as 0/1
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(u8),
}

#[derive(Deserialize)]
struct CitizenLine {
    id: u64,
    dni: DniValue,
    #[serde(default)]
    voted: Option<FlagValue>,
}

#[derive(Deserialize)]
struct SubjectLine {
    id: u64,
    citizen_id: Option<u64>,
    neighbourhood_id: Option<u64>,
}

#[derive(Deserialize)]
struct UserLine<'a> {
    id: u64,
    subject_id: u64,
    name: Option<&'a str>,
    email: Option<&'a str>,
}

#[derive(Deserialize)]
struct PendingUserLine<'a> {
    id: u64,
    created_at: &'a str,
}

#[derive(Deserialize)]
struct NamedLine<'a> {
    id: u64,
    name: &'a str,
    district_id: Option<u64>,
}

/// Loads a [`Dataset`] from a snapshot directory
pub struct DatasetLoader {
    data_dir: PathBuf,
}

impl DatasetLoader {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load every table. Files of one table are parsed in parallel.
    pub fn load(&self) -> Result<Dataset> {
        if !self.data_dir.is_dir() {
            return Err(VotetrackError::DataSource(format!(
                "snapshot directory not found: {}",
                self.data_dir.display()
            )));
        }

        for table in Table::ALL {
            if self.collect_files(table).is_empty() {
                tracing::warn!(table = table.stem(), "no export found, loading as empty");
            }
        }

        let dataset = Dataset {
            ballots: self.parse_table(Table::Ballots, parse_ballot)?,
            citizens: self.parse_table(Table::Citizens, parse_citizen)?,
            subjects: self.parse_table(Table::Subjects, parse_subject)?,
            users: self.parse_table(Table::Users, parse_user)?,
            pending_users: self.parse_table(Table::PendingUsers, parse_pending_user)?,
            neighbourhoods: self.parse_table(Table::Neighbourhoods, parse_neighbourhood)?,
            districts: self.parse_table(Table::Districts, parse_district)?,
        };

        tracing::debug!(
            data_dir = %self.data_dir.display(),
            ballots = dataset.ballots.len(),
            citizens = dataset.citizens.len(),
            users = dataset.users.len(),
            "snapshot loaded"
        );

        Ok(dataset)
    }

    /// Export files of `table`, sorted by path
    pub fn collect_files(&self, table: Table) -> Vec<PathBuf> {
        let patterns = [
            format!("{}.jsonl", table.stem()),
            format!("{}-*.jsonl", table.stem()),
        ];
        // The directory is matched literally; only the file name is a pattern
        let dir = PathBuf::from(glob::Pattern::escape(&self.data_dir.to_string_lossy()));
        let mut files: Vec<PathBuf> = patterns
            .iter()
            .flat_map(|p| {
                let pattern = dir.join(p);
                glob::glob(&pattern.to_string_lossy())
                    .map(|paths| paths.filter_map(|e| e.ok()).collect::<Vec<_>>())
                    .unwrap_or_default()
            })
            .collect();
        files.sort();
        files
    }

    fn parse_table<T: Send>(
        &self,
        table: Table,
        parse: fn(&mut [u8]) -> Option<T>,
    ) -> Result<Vec<T>> {
        let files = self.collect_files(table);
        let chunks: Vec<Vec<T>> = files
            .par_iter()
            .map(|f| parse_file(f, parse))
            .collect::<Result<_>>()?;
        Ok(chunks.into_iter().flatten().collect())
    }
}

/// Parse one JSONL file line by line
fn parse_file<T>(path: &Path, parse: fn(&mut [u8]) -> Option<T>) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| {
        VotetrackError::DataSource(format!("cannot open {}: {}", path.display(), e))
    })?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            VotetrackError::DataSource(format!("cannot read {}: {}", path.display(), e))
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let mut bytes = line.into_bytes();
        match parse(&mut bytes) {
            Some(row) => rows.push(row),
            None => tracing::warn!(
                file = %path.display(),
                line = idx + 1,
                "skipping malformed row"
            ),
        }
    }
    Ok(rows)
}

fn parse_ballot(line: &mut [u8]) -> Option<Ballot> {
    let data: BallotLine = simd_json::from_slice(line).ok()?;
    Some(Ballot {
        channel: Channel::from(data.channel),
        gender: data.gender.unwrap_or("unknown").to_string(),
        created_at: parse_wall_clock(data.created_at)?,
    })
}

fn parse_citizen(line: &mut [u8]) -> Option<Citizen> {
    let data: CitizenLine = simd_json::from_slice(line).ok()?;
    let dni = match data.dni {
        DniValue::Text(s) => s.trim().to_string(),
        DniValue::Number(n) => n.to_string(),
    };
    let voted = match data.voted {
        Some(FlagValue::Bool(b)) => b,
        Some(FlagValue::Int(n)) => n != 0,
        None => false,
    };
    Some(Citizen {
        id: data.id,
        dni,
        voted,
    })
}

fn parse_subject(line: &mut [u8]) -> Option<Subject> {
    let data: SubjectLine = simd_json::from_slice(line).ok()?;
    Some(Subject {
        id: data.id,
        citizen_id: data.citizen_id,
        neighbourhood_id: data.neighbourhood_id,
    })
}

fn parse_user(line: &mut [u8]) -> Option<User> {
    let data: UserLine = simd_json::from_slice(line).ok()?;
    Some(User {
        id: data.id,
        subject_id: data.subject_id,
        name: data.name.map(String::from),
        email: data.email.map(String::from),
    })
}

fn parse_pending_user(line: &mut [u8]) -> Option<PendingUser> {
    let data: PendingUserLine = simd_json::from_slice(line).ok()?;
    Some(PendingUser {
        id: data.id,
        created_at: parse_wall_clock(data.created_at)?,
    })
}

fn parse_neighbourhood(line: &mut [u8]) -> Option<Neighbourhood> {
    let data: NamedLine = simd_json::from_slice(line).ok()?;
    Some(Neighbourhood {
        id: data.id,
        name: data.name.to_string(),
        district_id: data.district_id?,
    })
}

fn parse_district(line: &mut [u8]) -> Option<District> {
    let data: NamedLine = simd_json::from_slice(line).ok()?;
    Some(District {
        id: data.id,
        name: data.name.to_string(),
    })
}
