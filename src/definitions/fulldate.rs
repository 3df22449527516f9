use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date, Month};

const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A calendar date written `YYYY-MM-DD`.
///
/// Some issuers append a time to dates that should be plain dates, so anything
/// after the day is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FullDate(Date);

impl FullDate {
    pub fn date(&self) -> Date {
        self.0
    }
}

impl From<Date> for FullDate {
    fn from(date: Date) -> Self {
        FullDate(date)
    }
}

impl fmt::Display for FullDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            <u8>::from(self.0.month()),
            self.0.day()
        )
    }
}

impl FromStr for FullDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let day = s.get(..10).unwrap_or(s);
        Ok(FullDate(Date::parse(day, FORMAT)?))
    }
}

impl TryFrom<String> for FullDate {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        s.parse()
    }
}

impl From<FullDate> for String {
    fn from(d: FullDate) -> String {
        d.to_string()
    }
}

/// A date of birth, possibly without day or month (`YYYY`, `YYYY-MM` or
/// `YYYY-MM-DD`). `XX` stands for an unknown part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BirthDate {
    year: i32,
    month: Option<Month>,
    day: Option<u8>,
}

impl BirthDate {
    /// The earliest date the birth date could stand for: a missing month or
    /// day counts as the first one.
    pub fn date(&self) -> Date {
        let month = self.month.unwrap_or(Month::January);
        let day = self.day.unwrap_or(1);
        // Parsing already checked that the day exists in that month.
        Date::from_calendar_date(self.year, month, day).unwrap_or(Date::MIN)
    }

    /// Completed years of age on `on`.
    pub fn age_on(&self, on: Date) -> i32 {
        let born = self.date();
        let mut age = on.year() - born.year();
        if (u8::from(on.month()), on.day()) < (u8::from(born.month()), born.day()) {
            age -= 1;
        }
        age
    }
}

impl fmt::Display for BirthDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{:02}", u8::from(month))?;
            if let Some(day) = self.day {
                write!(f, "-{day:02}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for BirthDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.get(..10).unwrap_or(s);
        let mut parts = s.split('-');
        let year: i32 = parts
            .next()
            .filter(|y| y.len() == 4)
            .ok_or_else(|| anyhow!("missing year in {s:?}"))?
            .parse()?;
        let month = match parts.next() {
            None | Some("XX") => None,
            Some(m) => Some(Month::try_from(m.parse::<u8>()?)?),
        };
        let day = match (month, parts.next()) {
            (_, None) | (_, Some("XX")) => None,
            (None, Some(_)) => return Err(anyhow!("day without month in {s:?}")),
            (Some(_), Some(d)) => Some(d.parse::<u8>()?),
        };
        if parts.next().is_some() {
            return Err(anyhow!("too many components in {s:?}"));
        }

        if let (Some(month), Some(day)) = (month, day) {
            Date::from_calendar_date(year, month, day)?;
        }
        Ok(BirthDate { year, month, day })
    }
}
