use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::dates::{age_on, long_date};

/// What the confirmation prompt shows while the gate is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgePrompt {
    pub age: i32,
    pub birth_date: NaiveDate,
    /// Human-readable birth date, e.g. "June 13, 1999".
    pub born_on: String,
    pub minimum_age: u32,
}

impl AgePrompt {
    pub fn can_confirm(&self) -> bool {
        self.age >= self.minimum_age as i32
    }

    pub fn warning(&self) -> Option<String> {
        (!self.can_confirm()).then(|| {
            format!(
                "You must be {} or older to create an account.",
                self.minimum_age
            )
        })
    }
}

/// Result of pressing "confirm".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Gate closed; the wizard may move past the date step.
    Confirmed,
    /// Underage. The gate stays open and only `edit` leads out.
    Blocked { age: i32 },
    NotOpen,
}

/// Closed/open confirmation sub-flow that sits on top of the date-of-birth step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeGate {
    minimum_age: u32,
    prompt: Option<AgePrompt>,
}

impl AgeGate {
    pub fn new(minimum_age: u32) -> Self {
        Self {
            minimum_age,
            prompt: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.prompt.is_some()
    }

    pub fn prompt(&self) -> Option<&AgePrompt> {
        self.prompt.as_ref()
    }

    /// Opens (or re-opens) the gate for `birth_date` using the calendar age on `today`.
    pub fn open(&mut self, birth_date: NaiveDate, today: NaiveDate) -> &AgePrompt {
        let age = age_on(birth_date, today);
        debug!(age, "age gate opened");
        self.prompt.insert(AgePrompt {
            age,
            birth_date,
            born_on: long_date(birth_date),
            minimum_age: self.minimum_age,
        })
    }

    /// Closes the gate so the date can be changed. Returns whether it was open.
    pub fn edit(&mut self) -> bool {
        self.prompt.take().is_some()
    }

    pub fn confirm(&mut self) -> GateDecision {
        match &self.prompt {
            None => GateDecision::NotOpen,
            Some(prompt) if !prompt.can_confirm() => {
                debug!(age = prompt.age, "age gate confirm refused");
                GateDecision::Blocked { age: prompt.age }
            }
            Some(_) => {
                self.prompt = None;
                GateDecision::Confirmed
            }
        }
    }
}
