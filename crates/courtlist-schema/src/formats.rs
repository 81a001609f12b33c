//! # Semantic Format Checks
//!
//! Reusable value checks invoked by the structural validator at specific
//! paths. Each check is a pure function of one JSON value and knows nothing
//! about how the validator reached it.
//!
//! Checks only judge content. Whether a value must be present is a separate
//! `required` rule; the validator never calls a format check on a missing or
//! `null` value.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::path::JsonKind;

static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([0-9]{4})-([0-9]{2})-([0-9]{2})T([0-9]{2}):([0-9]{2}):([0-9]{2})(?:\.(?:[0-9]{3}|[0-9]{9}))?Z$",
    )
    .expect("date-time pattern is a valid regex")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("date pattern is a valid regex")
});

// Outward code, one space, inward code. Inward letters never use C I K M O V.
static POSTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:GIR 0AA|(?:[A-Z][0-9]{1,2}|[A-Z]{2}[0-9]{1,2}|[A-Z][0-9][A-Z]|[A-Z]{2}[0-9][A-Z]) [0-9][ABD-HJLNP-UW-Z]{2})$",
    )
    .expect("postcode pattern is a valid regex")
});

const DATE_TIME_SHAPE: &str = "yyyy-MM-ddTHH:mm:ss[.SSS|.SSSSSSSSS]Z";
const DATE_SHAPE: &str = "yyyy-MM-dd";
const POSTCODE_SHAPE: &str = "a UK postcode such as SW1A 1AA";

/// Why a value failed a format check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatViolation {
    /// The value is not a JSON string.
    #[error("expected a string, found {found}")]
    NotAString {
        /// The kind that was present.
        found: JsonKind,
    },

    /// The value does not have the required shape.
    #[error("\"{value}\" is not in the form {expected}")]
    Malformed {
        /// The offending value.
        value: String,
        /// Description of the accepted form.
        expected: &'static str,
    },

    /// The value has the right shape but names no real date or time.
    #[error("\"{value}\" is not a real calendar date or time")]
    Calendar {
        /// The offending value.
        value: String,
    },

    /// The value is not exactly the required length.
    #[error("must be exactly {expected} characters, found {actual}")]
    Length {
        /// Required length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The value is longer than an initial.
    #[error("must be empty or a single character, found {actual} characters")]
    NotAnInitial {
        /// Actual length.
        actual: usize,
    },

    /// The value does not match a rule's regular expression.
    #[error("\"{value}\" does not match pattern {pattern}")]
    NoMatch {
        /// The offending value.
        value: String,
        /// The pattern as written in the rule set.
        pattern: String,
    },
}

/// A content check applied to a present value.
#[derive(Debug, Clone)]
pub enum Format {
    /// ISO-8601 UTC instant with 0, 3 or 9 fractional digits.
    DateTime,
    /// Calendar date, `yyyy-MM-dd`.
    Date,
    /// Exactly `n` characters.
    FixedLength(usize),
    /// Empty, or a single character.
    InitialOrEmpty,
    /// UK postcode.
    Postcode,
    /// Whole-value match against a rule-supplied expression.
    Pattern(Pattern),
}

/// A compiled, anchored regular expression that remembers its source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` so that it must match the entire value.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The expression as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Format {
    /// Short rule label used in violation reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DateTime => "date_time",
            Self::Date => "date",
            Self::FixedLength(_) => "fixed_length",
            Self::InitialOrEmpty => "initial_or_empty",
            Self::Postcode => "postcode",
            Self::Pattern(_) => "pattern",
        }
    }

    /// Check a JSON value. Non-strings always fail.
    pub fn check(&self, value: &Value) -> Result<(), FormatViolation> {
        match value.as_str() {
            Some(s) => self.check_str(s),
            None => Err(FormatViolation::NotAString {
                found: JsonKind::of(value),
            }),
        }
    }

    /// Check a string value.
    pub fn check_str(&self, value: &str) -> Result<(), FormatViolation> {
        match self {
            Self::DateTime => check_date_time(value),
            Self::Date => check_date(value),
            Self::FixedLength(n) => check_fixed_length(value, *n),
            Self::InitialOrEmpty => check_initial_or_empty(value),
            Self::Postcode => check_postcode(value),
            Self::Pattern(pattern) => {
                if pattern.regex.is_match(value) {
                    Ok(())
                } else {
                    Err(FormatViolation::NoMatch {
                        value: value.to_string(),
                        pattern: pattern.source.clone(),
                    })
                }
            }
        }
    }
}

/// ISO-8601 instant with a literal `Z` and whole, milli or nano seconds.
pub fn check_date_time(value: &str) -> Result<(), FormatViolation> {
    let caps = DATE_TIME_RE
        .captures(value)
        .ok_or_else(|| FormatViolation::Malformed {
            value: value.to_string(),
            expected: DATE_TIME_SHAPE,
        })?;
    let field = |i: usize| caps[i].parse::<u32>().unwrap_or(u32::MAX);
    let year = caps[1].parse::<i32>().unwrap_or(i32::MIN);

    let date = NaiveDate::from_ymd_opt(year, field(2), field(3));
    let time = NaiveTime::from_hms_opt(field(4), field(5), field(6));
    if date.is_some() && time.is_some() {
        Ok(())
    } else {
        Err(FormatViolation::Calendar {
            value: value.to_string(),
        })
    }
}

/// Calendar date in `yyyy-MM-dd` form.
pub fn check_date(value: &str) -> Result<(), FormatViolation> {
    let caps = DATE_RE.captures(value).ok_or_else(|| FormatViolation::Malformed {
        value: value.to_string(),
        expected: DATE_SHAPE,
    })?;
    let year = caps[1].parse::<i32>().unwrap_or(i32::MIN);
    let month = caps[2].parse::<u32>().unwrap_or(u32::MAX);
    let day = caps[3].parse::<u32>().unwrap_or(u32::MAX);
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(_) => Ok(()),
        None => Err(FormatViolation::Calendar {
            value: value.to_string(),
        }),
    }
}

/// Exactly `n` characters, counted as Unicode scalar values.
pub fn check_fixed_length(value: &str, n: usize) -> Result<(), FormatViolation> {
    let actual = value.chars().count();
    if actual == n {
        Ok(())
    } else {
        Err(FormatViolation::Length {
            expected: n,
            actual,
        })
    }
}

/// Empty, or exactly one character. Used for redacted given names.
pub fn check_initial_or_empty(value: &str) -> Result<(), FormatViolation> {
    let actual = value.chars().count();
    if actual <= 1 {
        Ok(())
    } else {
        Err(FormatViolation::NotAnInitial { actual })
    }
}

/// Upper-case UK postcode with a single separating space.
pub fn check_postcode(value: &str) -> Result<(), FormatViolation> {
    if POSTCODE_RE.is_match(value) {
        Ok(())
    } else {
        Err(FormatViolation::Malformed {
            value: value.to_string(),
            expected: POSTCODE_SHAPE,
        })
    }
}
