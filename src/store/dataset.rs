//! In-memory record store over a loaded snapshot

use std::collections::HashMap;

use chrono::NaiveDateTime;

use super::{RecordStore, Tally};
use crate::types::{
    Ballot, Channel, Citizen, CitizenRecord, DailyCounts, District, DistrictTurnout,
    GenderCounts, Neighbourhood, NeighbourhoodTurnout, PendingUser, Result, Subject, User,
};

/// Snapshot of every table the reports read
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub ballots: Vec<Ballot>,
    pub citizens: Vec<Citizen>,
    pub subjects: Vec<Subject>,
    pub users: Vec<User>,
    pub pending_users: Vec<PendingUser>,
    pub neighbourhoods: Vec<Neighbourhood>,
    pub districts: Vec<District>,
}

impl Dataset {
    fn ballots_for<'a>(
        &'a self,
        channel: Option<&'a Channel>,
    ) -> impl Iterator<Item = &'a Ballot> + 'a {
        self.ballots
            .iter()
            .filter(move |b| channel.is_none_or(|c| &b.channel == c))
    }

    /// Subjects of users whose linked citizen has voted (inner joins).
    fn voting_subjects(&self) -> Vec<&Subject> {
        let subjects: HashMap<u64, &Subject> = self.subjects.iter().map(|s| (s.id, s)).collect();
        let citizens: HashMap<u64, &Citizen> = self.citizens.iter().map(|c| (c.id, c)).collect();

        self.users
            .iter()
            .filter_map(|u| subjects.get(&u.subject_id).copied())
            .filter(|s| {
                s.citizen_id
                    .and_then(|id| citizens.get(&id))
                    .is_some_and(|c| c.voted)
            })
            .collect()
    }

    /// (district, neighbourhood) of each voting registered user that has both
    fn voting_geography(&self) -> Vec<(&District, &Neighbourhood)> {
        let neighbourhoods: HashMap<u64, &Neighbourhood> =
            self.neighbourhoods.iter().map(|n| (n.id, n)).collect();
        let districts: HashMap<u64, &District> =
            self.districts.iter().map(|d| (d.id, d)).collect();

        self.voting_subjects()
            .into_iter()
            .filter_map(|s| s.neighbourhood_id.and_then(|id| neighbourhoods.get(&id)))
            .filter_map(|n| districts.get(&n.district_id).map(|d| (*d, *n)))
            .collect()
    }
}

impl RecordStore for Dataset {
    fn count(&self, tally: Tally) -> Result<u64> {
        let n = match tally {
            Tally::Users => self.users.len(),
            Tally::PendingUsers => self.pending_users.len(),
            Tally::VotedCitizens => self.citizens.iter().filter(|c| c.voted).count(),
            Tally::LinkedSubjects => self
                .subjects
                .iter()
                .filter(|s| s.citizen_id.is_some())
                .count(),
            Tally::RegisteredVotersWhoVoted => self.voting_subjects().len(),
        };
        Ok(n as u64)
    }

    fn count_ballots(&self, channel: Option<&Channel>) -> Result<u64> {
        Ok(self.ballots_for(channel).count() as u64)
    }

    fn ballots_per_day(&self, channel: Option<&Channel>) -> Result<DailyCounts> {
        let mut per_day = DailyCounts::new();
        for ballot in self.ballots_for(channel) {
            *per_day.entry(ballot.day()).or_insert(0) += 1;
        }
        Ok(per_day)
    }

    fn ballots_per_gender(&self, channel: Option<&Channel>) -> Result<GenderCounts> {
        let mut per_gender = GenderCounts::new();
        for ballot in self.ballots_for(channel) {
            *per_gender.entry(ballot.gender.clone()).or_insert(0) += 1;
        }
        Ok(per_gender)
    }

    fn pending_users_per_day(&self) -> Result<DailyCounts> {
        let mut per_day = DailyCounts::new();
        for pending in &self.pending_users {
            *per_day.entry(pending.created_at.date()).or_insert(0) += 1;
        }
        Ok(per_day)
    }

    fn turnout_by_district(&self) -> Result<Vec<DistrictTurnout>> {
        let mut groups: HashMap<u64, DistrictTurnout> = HashMap::new();
        for (district, _) in self.voting_geography() {
            groups
                .entry(district.id)
                .or_insert_with(|| DistrictTurnout {
                    district: district.name.clone(),
                    voters: 0,
                })
                .voters += 1;
        }
        Ok(groups.into_values().collect())
    }

    fn turnout_by_neighbourhood(&self) -> Result<Vec<NeighbourhoodTurnout>> {
        let mut groups: HashMap<(u64, u64), NeighbourhoodTurnout> = HashMap::new();
        for (district, neighbourhood) in self.voting_geography() {
            groups
                .entry((district.id, neighbourhood.id))
                .or_insert_with(|| NeighbourhoodTurnout {
                    district: district.name.clone(),
                    neighbourhood: neighbourhood.name.clone(),
                    voters: 0,
                })
                .voters += 1;
        }
        Ok(groups.into_values().collect())
    }

    fn last_ballot_at(&self) -> Result<Option<NaiveDateTime>> {
        Ok(self.ballots.iter().map(|b| b.created_at).max())
    }

    fn find_citizens_by_dni(&self, dni: &str) -> Result<Vec<CitizenRecord>> {
        let dni = dni.trim();
        let records = self
            .citizens
            .iter()
            .filter(|c| c.dni == dni)
            .map(|citizen| {
                let subject = self
                    .subjects
                    .iter()
                    .find(|s| s.citizen_id == Some(citizen.id))
                    .cloned();
                let user = subject
                    .as_ref()
                    .and_then(|s| self.users.iter().find(|u| u.subject_id == s.id))
                    .cloned();
                CitizenRecord {
                    citizen: citizen.clone(),
                    subject,
                    user,
                }
            })
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn ballot(channel: &str, gender: &str, day: u32, hour: u32) -> Ballot {
        Ballot {
            channel: Channel::from(channel),
            gender: gender.to_string(),
            created_at: at(day, hour),
        }
    }

    fn citizen(id: u64, dni: &str, voted: bool) -> Citizen {
        Citizen {
            id,
            dni: dni.to_string(),
            voted,
        }
    }

    fn subject(id: u64, citizen_id: Option<u64>, neighbourhood_id: Option<u64>) -> Subject {
        Subject {
            id,
            citizen_id,
            neighbourhood_id,
        }
    }

    fn user(id: u64, subject_id: u64) -> User {
        User {
            id,
            subject_id,
            name: Some(format!("user-{}", id)),
            email: Some(format!("user{}@example.org", id)),
        }
    }

    /// Two districts, three neighbourhoods, four registered users of whom
    /// three voted (one without a neighbourhood).
    fn sample() -> Dataset {
        Dataset {
            ballots: vec![
                ballot("tablet", "F", 1, 9),
                ballot("tablet", "M", 1, 23),
                ballot("user", "F", 2, 0),
                ballot("kiosk", "X", 2, 12),
            ],
            citizens: vec![
                citizen(1, "30111222", true),
                citizen(2, "30111333", true),
                citizen(3, "30111444", false),
                citizen(4, "30111555", true),
                citizen(5, "30111666", true),
            ],
            subjects: vec![
                subject(10, Some(1), Some(100)),
                subject(11, Some(2), Some(101)),
                subject(12, Some(3), Some(100)),
                subject(13, Some(4), None),
                subject(14, None, Some(102)),
            ],
            users: vec![user(1, 10), user(2, 11), user(3, 12), user(4, 13), user(5, 14)],
            pending_users: vec![
                PendingUser {
                    id: 1,
                    created_at: at(1, 10),
                },
                PendingUser {
                    id: 2,
                    created_at: at(1, 11),
                },
            ],
            neighbourhoods: vec![
                Neighbourhood {
                    id: 100,
                    name: "Centro".to_string(),
                    district_id: 1,
                },
                Neighbourhood {
                    id: 101,
                    name: "Las Flores".to_string(),
                    district_id: 2,
                },
                Neighbourhood {
                    id: 102,
                    name: "Puerto".to_string(),
                    district_id: 2,
                },
            ],
            districts: vec![
                District {
                    id: 1,
                    name: "Norte".to_string(),
                },
                District {
                    id: 2,
                    name: "Sur".to_string(),
                },
            ],
        }
    }

    // ========== count() tests ==========

    #[test]
    fn test_count_tallies() {
        let ds = sample();
        assert_eq!(ds.count(Tally::Users).unwrap(), 5);
        assert_eq!(ds.count(Tally::PendingUsers).unwrap(), 2);
        assert_eq!(ds.count(Tally::VotedCitizens).unwrap(), 4);
        assert_eq!(ds.count(Tally::LinkedSubjects).unwrap(), 4);
        // citizen 5 voted but has no account
        assert_eq!(ds.count(Tally::RegisteredVotersWhoVoted).unwrap(), 3);
    }

    #[test]
    fn test_count_empty_dataset() {
        let ds = Dataset::default();
        assert_eq!(ds.count(Tally::Users).unwrap(), 0);
        assert_eq!(ds.count(Tally::RegisteredVotersWhoVoted).unwrap(), 0);
        assert_eq!(ds.count_ballots(None).unwrap(), 0);
    }

    #[test]
    fn test_user_with_dangling_subject_is_dropped() {
        let mut ds = sample();
        ds.users.push(user(99, 999));
        assert_eq!(ds.count(Tally::Users).unwrap(), 6);
        assert_eq!(ds.count(Tally::RegisteredVotersWhoVoted).unwrap(), 3);
    }

    // ========== ballots tests ==========

    #[test]
    fn test_count_ballots_by_channel() {
        let ds = sample();
        assert_eq!(ds.count_ballots(None).unwrap(), 4);
        assert_eq!(ds.count_ballots(Some(&Channel::Tablet)).unwrap(), 2);
        assert_eq!(ds.count_ballots(Some(&Channel::User)).unwrap(), 1);
        assert_eq!(ds.count_ballots(Some(&Channel::Paper)).unwrap(), 0);
    }

    #[test]
    fn test_last_ballot_at() {
        assert_eq!(sample().last_ballot_at().unwrap(), Some(at(2, 12)));
        assert_eq!(Dataset::default().last_ballot_at().unwrap(), None);
    }

    #[test]
    fn test_ballots_per_day_is_sparse() {
        let ds = sample();
        let tablet = ds.ballots_per_day(Some(&Channel::Tablet)).unwrap();
        assert_eq!(tablet.len(), 1);
        assert_eq!(tablet.values().sum::<u64>(), 2);

        let link = ds.ballots_per_day(Some(&Channel::Link)).unwrap();
        assert!(link.is_empty());

        let all = ds.ballots_per_day(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.values().sum::<u64>(), 4);
    }

    #[test]
    fn test_ballots_per_gender_keeps_unknown_values() {
        let ds = sample();
        let all = ds.ballots_per_gender(None).unwrap();
        assert_eq!(all.get("F"), Some(&2));
        assert_eq!(all.get("M"), Some(&1));
        assert_eq!(all.get("X"), Some(&1));

        let web = ds.ballots_per_gender(Some(&Channel::User)).unwrap();
        assert_eq!(web.len(), 1);
        assert_eq!(web.get("F"), Some(&1));
    }

    #[test]
    fn test_pending_users_per_day() {
        let ds = sample();
        let per_day = ds.pending_users_per_day().unwrap();
        assert_eq!(per_day.len(), 1);
        assert_eq!(per_day.values().next(), Some(&2));
    }

    // ========== turnout tests ==========

    #[test]
    fn test_turnout_by_district() {
        let ds = sample();
        let mut turnout = ds.turnout_by_district().unwrap();
        turnout.sort_by(|a, b| a.district.cmp(&b.district));

        assert_eq!(turnout.len(), 2);
        assert_eq!(turnout[0].district, "Norte");
        assert_eq!(turnout[0].voters, 1);
        assert_eq!(turnout[1].district, "Sur");
        assert_eq!(turnout[1].voters, 1);
    }

    #[test]
    fn test_turnout_by_neighbourhood() {
        let ds = sample();
        let turnout = ds.turnout_by_neighbourhood().unwrap();
        assert_eq!(turnout.len(), 2);
        assert!(turnout
            .iter()
            .any(|t| t.district == "Sur" && t.neighbourhood == "Las Flores" && t.voters == 1));
        // Puerto's only account has no roll entry
        assert!(!turnout.iter().any(|t| t.neighbourhood == "Puerto"));
    }

    #[test]
    fn test_turnout_empty_when_nobody_voted() {
        let mut ds = sample();
        for c in &mut ds.citizens {
            c.voted = false;
        }
        assert!(ds.turnout_by_district().unwrap().is_empty());
        assert!(ds.turnout_by_neighbourhood().unwrap().is_empty());
    }

    // ========== find_citizens_by_dni() tests ==========

    #[test]
    fn test_find_citizen_with_account() {
        let ds = sample();
        let found = ds.find_citizens_by_dni(" 30111333 ").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].citizen.id, 2);
        assert_eq!(found[0].subject.as_ref().map(|s| s.id), Some(11));
        assert_eq!(
            found[0].user.as_ref().and_then(|u| u.email.clone()),
            Some("user2@example.org".to_string())
        );
    }

    #[test]
    fn test_find_citizen_without_account() {
        let ds = sample();
        let found = ds.find_citizens_by_dni("30111666").unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].subject.is_none());
        assert!(found[0].user.is_none());
    }

    #[test]
    fn test_find_citizen_unknown_dni() {
        let ds = sample();
        assert!(ds.find_citizens_by_dni("1").unwrap().is_empty());
    }
}
