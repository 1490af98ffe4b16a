//! Fixed twelve-month calendar with hour resolution and no leap years.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const HOURS_PER_DAY: i64 = 24;
pub const DAYS_PER_YEAR: i64 = 365;

const MONTH_LENGTHS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn days_in_month(month: u8) -> u8 {
    MONTH_LENGTHS
        .get(usize::from(month.saturating_sub(1)))
        .copied()
        .unwrap_or(0)
}

pub fn month_name(month: u8) -> &'static str {
    MONTH_NAMES
        .get(usize::from(month.saturating_sub(1)))
        .copied()
        .unwrap_or("Unknown")
}

/// A calendar hour. Field order matches chronological order so the derived
/// `Ord` compares dates correctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    #[serde(default)]
    pub hour: u8,
}

impl GameDate {
    /// Build a date, rejecting months outside `1..=12`. Day and hour overflow
    /// are normalised, so `(2, 30)` lands in March and hour 24 is the next day.
    pub fn new(year: i32, month: u8, day: u8, hour: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidMonth(month));
        }
        let base = Self {
            year,
            month,
            day: 1,
            hour: 0,
        };
        let offset = (i64::from(day) - 1) * HOURS_PER_DAY + i64::from(hour);
        Ok(base.advance(offset))
    }

    /// Boundary check for dates built by struct literal or deserialisation.
    pub fn validate(&self) -> Result<Self> {
        Self::new(self.year, self.month, self.day, self.hour)
    }

    /// 1-based day within the year.
    pub fn day_of_year(&self) -> u16 {
        let before: u16 = MONTH_LENGTHS
            .iter()
            .take(usize::from(self.month.saturating_sub(1)))
            .map(|len| u16::from(*len))
            .sum();
        before + u16::from(self.day)
    }

    /// Days since 0000-01-01.
    pub fn absolute_day(&self) -> i64 {
        i64::from(self.year) * DAYS_PER_YEAR + i64::from(self.day_of_year()) - 1
    }

    /// Hours since 0000-01-01 00:00.
    pub fn absolute_hour(&self) -> i64 {
        self.absolute_day() * HOURS_PER_DAY + i64::from(self.hour)
    }

    pub fn from_absolute_day(day: i64) -> Self {
        Self::from_absolute_hour(day * HOURS_PER_DAY)
    }

    pub fn from_absolute_hour(hours: i64) -> Self {
        let day = hours.div_euclid(HOURS_PER_DAY);
        let hour = hours.rem_euclid(HOURS_PER_DAY) as u8;
        let year = day.div_euclid(DAYS_PER_YEAR);
        let mut remaining = day.rem_euclid(DAYS_PER_YEAR) as u16;
        let mut month = 1u8;
        for len in MONTH_LENGTHS {
            let len = u16::from(len);
            if remaining < len {
                break;
            }
            remaining -= len;
            month += 1;
        }
        Self {
            year: year as i32,
            month,
            day: remaining as u8 + 1,
            hour,
        }
    }

    /// Shift by a signed number of hours, normalising across days, months and years.
    pub fn advance(&self, hours: i64) -> Self {
        Self::from_absolute_hour(self.absolute_hour() + hours)
    }

    /// Signed hour distance from `self` to `other`.
    pub fn hours_until(&self, other: &Self) -> i64 {
        other.absolute_hour() - self.absolute_hour()
    }

    pub fn start_of_day(&self) -> Self {
        Self { hour: 0, ..*self }
    }

    pub fn with_hour(&self, hour: u8) -> Self {
        self.start_of_day().advance(i64::from(hour))
    }

    pub fn month_name(&self) -> &'static str {
        month_name(self.month)
    }

    /// Meteorological season, flipped for the southern hemisphere.
    pub fn season(&self, latitude: f64) -> Season {
        let northern = match self.month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        };
        if latitude < 0.0 {
            northern.opposite()
        } else {
            northern
        }
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:00",
            self.year, self.month, self.day, self.hour
        )
    }
}

impl FromStr for GameDate {
    type Err = Error;

    /// Accepts `YYYY-MM-DD` or `YYYY-MM-DDTHH`; a leading `-` marks negative years.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidDate(s.to_string());
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (date_part, hour_part) = match body.split_once(|c: char| c == 'T' || c == ' ') {
            Some((date, hour)) => (date, Some(hour)),
            None => (body, None),
        };
        let mut fields = date_part.split('-');
        let year: i32 = fields
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(invalid)?;
        let month: u8 = fields
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(invalid)?;
        let day: u8 = fields
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(invalid)?;
        if fields.next().is_some() {
            return Err(invalid());
        }
        let hour: u8 = match hour_part {
            Some(text) => text
                .trim_end_matches(":00")
                .parse()
                .map_err(|_| invalid())?,
            None => 0,
        };
        let year = if negative { -year } else { year };
        Self::new(year, month, day, hour)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn opposite(self) -> Self {
        match self {
            Self::Winter => Self::Summer,
            Self::Spring => Self::Autumn,
            Self::Summer => Self::Winter,
            Self::Autumn => Self::Spring,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
        }
    }
}
