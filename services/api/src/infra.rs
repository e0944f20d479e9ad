use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tripmate::onboarding::{DateOfBirth, PersistenceError, ProfileRepository, ProfileRow, UserId};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local profile table used until a real store is wired in.
#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileRepository {
    rows: Arc<Mutex<HashMap<UserId, ProfileRow>>>,
}

impl InMemoryProfileRepository {
    fn rows(&self) -> Result<MutexGuard<'_, HashMap<UserId, ProfileRow>>, PersistenceError> {
        self.rows
            .lock()
            .map_err(|_| PersistenceError::Unavailable("profile table poisoned".to_string()))
    }
}

impl ProfileRepository for InMemoryProfileRepository {
    fn insert(&self, row: ProfileRow) -> Result<ProfileRow, PersistenceError> {
        let mut guard = self.rows()?;
        if guard.contains_key(&row.user_id) {
            return Err(PersistenceError::Conflict);
        }
        guard.insert(row.user_id.clone(), row.clone());
        Ok(row)
    }

    fn update(&self, row: ProfileRow) -> Result<(), PersistenceError> {
        let mut guard = self.rows()?;
        if guard.contains_key(&row.user_id) {
            guard.insert(row.user_id.clone(), row);
            Ok(())
        } else {
            Err(PersistenceError::NotFound)
        }
    }

    fn fetch(&self, user_id: &UserId) -> Result<Option<ProfileRow>, PersistenceError> {
        Ok(self.rows()?.get(user_id).cloned())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_birth_date(raw: &str) -> Result<DateOfBirth, String> {
    DateOfBirth::from_slashed(raw.trim())
        .ok_or_else(|| format!("failed to parse '{raw}' as DD/MM/YYYY"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_requires_an_existing_row() {
        let repository = InMemoryProfileRepository::default();
        let row = ProfileRow::new(UserId("user-1".to_string()));

        assert_eq!(
            repository.update(row.clone()),
            Err(PersistenceError::NotFound)
        );
        repository.insert(row.clone()).expect("insert succeeds");
        assert_eq!(repository.insert(row), Err(PersistenceError::Conflict));
    }

    #[test]
    fn birth_dates_parse_from_slashed_input() {
        let dob = parse_birth_date(" 13/06/1999 ").expect("parses");
        assert_eq!(dob.slashed(), "13/06/1999");
        assert!(parse_birth_date("1999-06-13").is_err());
    }
}
