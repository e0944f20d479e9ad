//! Pure field predicates. Each returns `Ok` or the first [`FieldError`] so callers can both
//! gate transitions and render helper text from the same check.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use super::dates::age_on;
use super::domain::{DateOfBirth, Location};
use super::steps::ChoiceOption;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;

/// Inclusive age range accepted for a birth date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeBounds {
    pub minimum: u32,
    pub maximum: u32,
}

impl Default for AgeBounds {
    fn default() -> Self {
        Self {
            minimum: 18,
            maximum: 118,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FieldError {
    #[error("this field is required")]
    Required,
    #[error("must be at least {min} characters")]
    TooShort { min: usize },
    #[error("must be less than {max} characters")]
    TooLong { max: usize },
    #[error("can only contain letters, spaces, hyphens, and apostrophes")]
    InvalidCharacters,
    #[error("please enter a valid email address")]
    InvalidEmail,
    #[error("'{value}' is not one of the offered options")]
    UnknownOption { value: String },
    #[error("choose between {min} and {max} options (got {actual})")]
    SelectionCount {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("invalid day")]
    InvalidDay,
    #[error("invalid month")]
    InvalidMonth,
    #[error("invalid year")]
    InvalidYear,
    #[error("{date} is not a calendar date")]
    NotACalendarDate { date: String },
    #[error("you must be {minimum} or older to create an account")]
    Underage { minimum: u32, age: i32 },
    #[error("please check the year; an age of {age} is not plausible")]
    ImplausibleAge { maximum: u32, age: i32 },
    #[error("verification code must be {length} digits")]
    InvalidCode { length: usize },
    #[error("location is required")]
    MissingLocation,
    #[error("answer has the wrong shape for this field")]
    WrongShape,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-ZÀ-ÿ\s'-]+$").expect("name pattern is a valid regex")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

/// Trimmed text must be non-empty and at most `max_chars` characters.
pub fn required_text(value: &str, max_chars: usize) -> Result<(), FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Required);
    }
    if trimmed.chars().count() > max_chars {
        return Err(FieldError::TooLong { max: max_chars });
    }
    Ok(())
}

/// First/last name rule. Optional names accept the empty string.
pub fn person_name(value: &str, required: bool) -> Result<(), FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return if required {
            Err(FieldError::Required)
        } else {
            Ok(())
        };
    }

    let length = trimmed.chars().count();
    if required && length < NAME_MIN_CHARS {
        return Err(FieldError::TooShort {
            min: NAME_MIN_CHARS,
        });
    }
    if length > NAME_MAX_CHARS {
        return Err(FieldError::TooLong {
            max: NAME_MAX_CHARS,
        });
    }
    if !name_pattern().is_match(trimmed) {
        return Err(FieldError::InvalidCharacters);
    }
    Ok(())
}

/// Returns the normalized (trimmed, lowercased) address when it has a valid shape.
pub fn email(value: &str) -> Result<String, FieldError> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(FieldError::Required);
    }
    if !email_pattern().is_match(&normalized) || normalized.contains("..") {
        return Err(FieldError::InvalidEmail);
    }
    Ok(normalized)
}

pub fn single_select(value: &str, options: &[ChoiceOption]) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::Required);
    }
    if !options.iter().any(|option| option.value == value) {
        return Err(FieldError::UnknownOption {
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Between one and `max` distinct members of `options`.
pub fn multi_select(
    values: &[String],
    options: &[ChoiceOption],
    max: usize,
) -> Result<(), FieldError> {
    if values.is_empty() || values.len() > max {
        return Err(FieldError::SelectionCount {
            min: 1,
            max,
            actual: values.len(),
        });
    }
    for (index, value) in values.iter().enumerate() {
        if !options.iter().any(|option| option.value == value) {
            return Err(FieldError::UnknownOption {
                value: value.clone(),
            });
        }
        if values[..index].contains(value) {
            return Err(FieldError::SelectionCount {
                min: 1,
                max,
                actual: values.len(),
            });
        }
    }
    Ok(())
}

fn two_digits_within(value: &str, low: u32, high: u32) -> bool {
    value.len() == 2
        && value.chars().all(|c| c.is_ascii_digit())
        && value
            .parse::<u32>()
            .is_ok_and(|number| (low..=high).contains(&number))
}

/// Component patterns plus calendar validity; does not look at age.
pub fn date_structure(dob: &DateOfBirth) -> Result<NaiveDate, FieldError> {
    if dob.is_blank() {
        return Err(FieldError::Required);
    }
    if !two_digits_within(&dob.day, 1, 31) {
        return Err(FieldError::InvalidDay);
    }
    if !two_digits_within(&dob.month, 1, 12) {
        return Err(FieldError::InvalidMonth);
    }
    if dob.year.len() != 4 || !dob.year.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::InvalidYear);
    }
    dob.to_date().ok_or_else(|| FieldError::NotACalendarDate {
        date: dob.slashed(),
    })
}

/// Upper plausibility bound only. Used when an age gate enforces the minimum afterwards.
pub fn plausible_birth_date(
    dob: &DateOfBirth,
    today: NaiveDate,
    bounds: AgeBounds,
) -> Result<NaiveDate, FieldError> {
    let birth = date_structure(dob)?;
    let age = age_on(birth, today);
    if age < 0 || age > bounds.maximum as i32 {
        return Err(FieldError::ImplausibleAge {
            maximum: bounds.maximum,
            age,
        });
    }
    Ok(birth)
}

/// Full composite rule: structure, calendar validity, and age within `bounds`.
/// Returns the calendar age on success.
pub fn date_of_birth(
    dob: &DateOfBirth,
    today: NaiveDate,
    bounds: AgeBounds,
) -> Result<i32, FieldError> {
    let birth = plausible_birth_date(dob, today, bounds)?;
    let age = age_on(birth, today);
    if age < bounds.minimum as i32 {
        return Err(FieldError::Underage {
            minimum: bounds.minimum,
            age,
        });
    }
    Ok(age)
}

pub fn verification_code(code: &str, length: usize) -> Result<(), FieldError> {
    if code.len() != length || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::InvalidCode { length });
    }
    Ok(())
}

pub fn location(location: &Location) -> Result<(), FieldError> {
    if location.display_name.trim().is_empty() {
        return Err(FieldError::MissingLocation);
    }
    Ok(())
}
