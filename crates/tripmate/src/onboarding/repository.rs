use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::dates::iso_date;
use super::domain::{AnswerSet, AnswerValue, UserId};

/// Stored profile: one JSON column per answered field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub user_id: UserId,
    pub columns: BTreeMap<String, Value>,
}

impl ProfileRow {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            columns: BTreeMap::new(),
        }
    }

    pub fn has(&self, column: &str) -> bool {
        self.columns
            .get(column)
            .is_some_and(|value| !value.is_null())
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ProfileRepository: Send + Sync {
    fn insert(&self, row: ProfileRow) -> Result<ProfileRow, PersistenceError>;
    fn update(&self, row: ProfileRow) -> Result<(), PersistenceError>;
    fn fetch(&self, user_id: &UserId) -> Result<Option<ProfileRow>, PersistenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("profile already exists")]
    Conflict,
    #[error("profile not found")]
    NotFound,
    #[error("profile storage unavailable: {0}")]
    Unavailable(String),
    #[error("profile storage rejected the write: {0}")]
    Rejected(String),
}

/// What the wizard hands its answers to on submit.
pub trait PersistenceAdapter: Send + Sync {
    fn save(&self, user_id: &UserId, answers: &AnswerSet) -> Result<(), PersistenceError>;
}

impl<T: PersistenceAdapter + ?Sized> PersistenceAdapter for Arc<T> {
    fn save(&self, user_id: &UserId, answers: &AnswerSet) -> Result<(), PersistenceError> {
        (**self).save(user_id, answers)
    }
}

/// Column value for one answer. Dates are stored ISO formatted when they parse.
pub fn column_value(value: &AnswerValue) -> Value {
    match value {
        AnswerValue::Flag(flag) => Value::Bool(*flag),
        AnswerValue::Text(text) => Value::String(text.trim().to_string()),
        AnswerValue::Choices(choices) => json!(choices),
        AnswerValue::Date(date) => match date.to_date() {
            Some(parsed) => Value::String(iso_date(parsed)),
            None => Value::String(date.slashed()),
        },
        AnswerValue::Location(location) => json!({
            "city": location.city,
            "country": location.country,
            "display_name": location.display_name,
            "lat": location.coordinates.map(|point| point.lat),
            "lon": location.coordinates.map(|point| point.lon),
        }),
    }
}

/// [`PersistenceAdapter`] over a [`ProfileRepository`]: fetch, then insert or merge-update.
pub struct ProfileStore<R> {
    repository: Arc<R>,
}

impl<R> Clone for ProfileStore<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ProfileRepository> ProfileStore<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn profile(&self, user_id: &UserId) -> Result<Option<ProfileRow>, PersistenceError> {
        self.repository.fetch(user_id)
    }

    /// Whether a stored profile has a non-null value for `column`.
    pub fn has_column(&self, user_id: &UserId, column: &str) -> Result<bool, PersistenceError> {
        Ok(self
            .repository
            .fetch(user_id)?
            .is_some_and(|row| row.has(column)))
    }
}

impl<R: ProfileRepository> PersistenceAdapter for ProfileStore<R> {
    fn save(&self, user_id: &UserId, answers: &AnswerSet) -> Result<(), PersistenceError> {
        let columns = answers
            .iter()
            .map(|(field, value)| (field.as_str().to_string(), column_value(value)));

        match self.repository.fetch(user_id)? {
            Some(mut row) => {
                row.columns.extend(columns);
                debug!(user_id = %user_id.0, columns = row.columns.len(), "updating profile");
                self.repository.update(row)
            }
            None => {
                let mut row = ProfileRow::new(user_id.clone());
                row.columns.extend(columns);
                debug!(user_id = %user_id.0, columns = row.columns.len(), "inserting profile");
                self.repository.insert(row).map(|_| ())
            }
        }
    }
}
