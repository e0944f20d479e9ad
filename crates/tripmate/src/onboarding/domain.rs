use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of the authenticated account that owns a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identity handed to onboarding by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}

/// Key into an [`AnswerSet`]; the key space is fixed by a step table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub String);

impl FieldId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Birth date as typed: zero-padded day and month, four digit year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOfBirth {
    pub day: String,
    pub month: String,
    pub year: String,
}

impl DateOfBirth {
    pub fn new(day: impl Into<String>, month: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            month: month.into(),
            year: year.into(),
        }
    }

    /// Parses the `DD/MM/YYYY` shape produced by the birthday input filter.
    pub fn from_slashed(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('/');
        let day = parts.next()?;
        let month = parts.next()?;
        let year = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(day, month, year))
    }

    pub fn is_blank(&self) -> bool {
        self.day.is_empty() && self.month.is_empty() && self.year.is_empty()
    }

    /// Calendar date for the components, `None` when they do not name a real day.
    pub fn to_date(&self) -> Option<NaiveDate> {
        let day = self.day.parse::<u32>().ok()?;
        let month = self.month.parse::<u32>().ok()?;
        let year = self.year.parse::<i32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    pub fn slashed(&self) -> String {
        format!("{}/{}/{}", self.day, self.month, self.year)
    }
}

impl From<NaiveDate> for DateOfBirth {
    fn from(date: NaiveDate) -> Self {
        Self::new(
            date.format("%d").to_string(),
            date.format("%m").to_string(),
            date.format("%Y").to_string(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Place picked from the suggestion list. Only `display_name` is shown back to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Value stored for one field. Untagged so JSON payloads stay in the shape the client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Flag(bool),
    Text(String),
    Choices(Vec<String>),
    Date(DateOfBirth),
    Location(Location),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Whether the value carries nothing a step could accept.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Flag(_) => false,
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Choices(choices) => choices.is_empty(),
            AnswerValue::Date(date) => date.is_blank(),
            AnswerValue::Location(location) => location.display_name.trim().is_empty(),
        }
    }
}

/// Answers collected so far, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    values: BTreeMap<FieldId, AnswerValue>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&AnswerValue> {
        self.values.get(&FieldId::from(field))
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.get(field) {
            Some(AnswerValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn choices(&self, field: &str) -> &[String] {
        match self.get(field) {
            Some(AnswerValue::Choices(choices)) => choices,
            _ => &[],
        }
    }

    pub fn date(&self, field: &str) -> Option<&DateOfBirth> {
        match self.get(field) {
            Some(AnswerValue::Date(date)) => Some(date),
            _ => None,
        }
    }

    pub fn location(&self, field: &str) -> Option<&Location> {
        match self.get(field) {
            Some(AnswerValue::Location(location)) => Some(location),
            _ => None,
        }
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.get(field) {
            Some(AnswerValue::Flag(flag)) => Some(*flag),
            _ => None,
        }
    }

    /// True when the field holds a value that is not empty.
    pub fn is_answered(&self, field: &str) -> bool {
        self.get(field).is_some_and(|value| !value.is_empty())
    }

    pub fn insert(&mut self, field: impl Into<FieldId>, value: AnswerValue) {
        self.values.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<AnswerValue> {
        self.values.remove(&FieldId::from(field))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &AnswerValue)> {
        self.values.iter()
    }

    pub fn with(mut self, field: &str, value: AnswerValue) -> Self {
        self.insert(field, value);
        self
    }
}
