use chrono::{Datelike, NaiveDate};

/// Whole years between `birth` and `today`, truncated on the calendar: the year does not
/// count until the birthday's month/day has been reached. Negative for future dates.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// "June 13, 1999"
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// ISO column format used by the profile store.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Input filter for the single-field birthday box: keeps digits only, at most eight, and
/// inserts slashes progressively (`1306` -> `13/06`, `13061999` -> `13/06/1999`).
pub fn format_birthday_input(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).take(8).collect();

    let mut formatted = String::with_capacity(10);
    for (index, digit) in digits.chars().enumerate() {
        if index == 2 || index == 4 {
            formatted.push('/');
        }
        formatted.push(digit);
    }
    formatted
}

/// Input filter for per-digit code boxes: non-digits are dropped and the result is capped at
/// `length`. Returns the filtered code and whether it is complete.
pub fn filter_code_input(raw: &str, length: usize) -> (String, bool) {
    let code: String = raw
        .chars()
        .filter(char::is_ascii_digit)
        .take(length)
        .collect();
    let complete = code.len() == length;
    (code, complete)
}
