use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, PrimitiveDateTime};

/// Example accepted by the batch form, echoed back in validation errors.
pub const TIMESTAMP_EXAMPLE: &str = "Dec 28, 2024 at 8:07:32 PM";

/// `%b %d, %Y at %I:%M:%S %p`
const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[month repr:short] [day], [year] at [hour repr:12]:[minute]:[second] [period]"
);

// Day and hour may drop their leading zero on input. Everything else is
// matched exactly, including case.
const INPUT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[month repr:short] [day padding:none], [year] at [hour repr:12 padding:none]:[minute]:[second] [period]"
);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid timestamp '{0}'")]
pub struct InvalidTimestamp(pub String);

/// Wall-clock moment stamped onto an image. Carries no offset: the text is
/// rendered exactly as the operator typed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(PrimitiveDateTime);

impl Timestamp {
    pub fn new(inner: PrimitiveDateTime) -> Self {
        Self(inner)
    }

    pub fn parse(input: &str) -> Result<Self, InvalidTimestamp> {
        if !has_plain_year(input) {
            return Err(InvalidTimestamp(input.to_string()));
        }
        PrimitiveDateTime::parse(input, INPUT_FORMAT)
            .map(Self)
            .map_err(|_| InvalidTimestamp(input.to_string()))
    }

    pub fn inner(&self) -> PrimitiveDateTime {
        self.0
    }

    pub fn hour(&self) -> u8 {
        self.0.hour()
    }

    pub fn plus_seconds(self, seconds: i64) -> Self {
        Self(self.0.saturating_add(Duration::seconds(seconds)))
    }
}

/// `[year]` parses an optional sign, so the year is checked up front to be
/// exactly four digits.
fn has_plain_year(input: &str) -> bool {
    let Some((_, rest)) = input.split_once(", ") else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    digits == 4 && rest[digits..].starts_with(" at ")
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The format only contains components a PrimitiveDateTime has.
        let text = self.0.format(DISPLAY_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Timestamp {
    type Err = InvalidTimestamp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<PrimitiveDateTime> for Timestamp {
    fn from(value: PrimitiveDateTime) -> Self {
        Self(value)
    }
}

/// The moving timestamp shared by every image of one batch.
#[derive(Debug, Clone)]
pub struct TimestampCursor {
    current: Timestamp,
    max_step_seconds: u32,
}

impl TimestampCursor {
    pub fn new(start: Timestamp, max_step_seconds: u32) -> Self {
        Self {
            current: start,
            max_step_seconds,
        }
    }

    pub fn current(&self) -> Timestamp {
        self.current
    }

    /// Moves forward by a uniform draw in `[0, max_step_seconds]` and returns
    /// the step taken.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u32 {
        let step = rng.gen_range(0..=self.max_step_seconds);
        self.current = self.current.plus_seconds(i64::from(step));
        step
    }
}
