//! Date lists with inherited year and month abbreviations.
//!
//! `2012-03-15,16,04-01` is three dates: the second inherits year and month,
//! the third inherits the year.

use crate::error::{StnError, StnErrorKind};
use chrono::NaiveDate;
use tracing::instrument;

/// One calendar entry; a day is only present together with a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateEntry {
    year: u16,
    month: Option<u8>,
    day: Option<u8>,
}

fn date_error(message: impl Into<String>) -> StnError {
    StnError::new(StnErrorKind::InvalidDateFormat, message)
}

impl DateEntry {
    /// Creates an entry, validating it against the calendar.
    #[instrument]
    pub fn new(year: u16, month: Option<u8>, day: Option<u8>) -> Result<Self, StnError> {
        if year > 9999 {
            return Err(date_error(format!("Year {} has more than four digits", year)));
        }
        match (month, day) {
            (None, Some(_)) => return Err(date_error("Day given without month")),
            (Some(m), None) if !(1..=12).contains(&m) => {
                return Err(date_error(format!("Month {} out of range", m)));
            }
            (Some(m), Some(d)) => {
                if NaiveDate::from_ymd_opt(i32::from(year), u32::from(m), u32::from(d)).is_none() {
                    return Err(date_error(format!(
                        "{:04}-{:02}-{:02} is not a calendar date",
                        year, m, d
                    )));
                }
            }
            _ => {}
        }
        Ok(Self { year, month, day })
    }

    /// Year.
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Month (1..12), if specified.
    pub fn month(&self) -> Option<u8> {
        self.month
    }

    /// Day of month, if specified.
    pub fn day(&self) -> Option<u8> {
        self.day
    }

    fn full(&self) -> String {
        let mut out = format!("{:04}", self.year);
        if let Some(month) = self.month {
            out.push_str(&format!("-{:02}", month));
        }
        if let Some(day) = self.day {
            out.push_str(&format!("-{:02}", day));
        }
        out
    }
}

/// A non-empty ordered list of dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Date {
    entries: Vec<DateEntry>,
}

fn parse_field(text: &str, width: usize) -> Result<u16, StnError> {
    if text.len() != width || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(date_error(format!("Expected {} digits, got '{}'", width, text)));
    }
    text.parse::<u16>()
        .map_err(|e| date_error(format!("Invalid date field '{}': {}", text, e)))
}

fn parse_small(text: &str) -> Result<u8, StnError> {
    // Two digits always fit.
    Ok(parse_field(text, 2)? as u8)
}

impl Date {
    /// Creates a date list from entries.
    #[instrument(skip(entries), fields(count = entries.len()))]
    pub fn new(entries: Vec<DateEntry>) -> Result<Self, StnError> {
        if entries.is_empty() {
            return Err(date_error("A date needs at least one entry"));
        }
        Ok(Self { entries })
    }

    /// Returns the entries.
    pub fn entries(&self) -> &[DateEntry] {
        &self.entries
    }

    /// Parses the comma-separated, possibly abbreviated form.
    #[instrument]
    pub fn parse(text: &str) -> Result<Self, StnError> {
        let mut entries: Vec<DateEntry> = Vec::new();

        for token in text.split(',') {
            let parts: Vec<&str> = token.split('-').collect();
            let entry = if parts[0].len() == 4 {
                if parts.len() > 3 {
                    return Err(date_error(format!("Too many fields in '{}'", token)));
                }
                let year = parse_field(parts[0], 4)?;
                let month = parts.get(1).map(|m| parse_small(m)).transpose()?;
                let day = parts.get(2).map(|d| parse_small(d)).transpose()?;
                DateEntry::new(year, month, day)?
            } else {
                let Some(prev) = entries.last().copied() else {
                    return Err(date_error(format!("'{}' abbreviates a missing full date", token)));
                };
                match parts.as_slice() {
                    [month, day] if prev.month.is_some() => {
                        DateEntry::new(
                            prev.year,
                            Some(parse_small(month)?),
                            Some(parse_small(day)?),
                        )?
                    }
                    [single] if prev.day.is_some() => {
                        DateEntry::new(prev.year, prev.month, Some(parse_small(single)?))?
                    }
                    [single] if prev.month.is_some() => {
                        DateEntry::new(prev.year, Some(parse_small(single)?), None)?
                    }
                    _ => {
                        return Err(date_error(format!(
                            "'{}' cannot abbreviate '{}'",
                            token,
                            prev.full()
                        )));
                    }
                }
            };
            entries.push(entry);
        }

        Self::new(entries)
    }

    /// Writes the shortest abbreviation that parses back to the same list.
    pub fn format(&self) -> String {
        let mut parts = Vec::with_capacity(self.entries.len());
        let mut prev: Option<DateEntry> = None;

        for entry in &self.entries {
            let text = match (prev, entry.month, entry.day) {
                (Some(p), Some(month), Some(day)) if p.day.is_some() && p.year == entry.year => {
                    if p.month == Some(month) {
                        format!("{:02}", day)
                    } else {
                        format!("{:02}-{:02}", month, day)
                    }
                }
                (Some(p), Some(month), None)
                    if p.day.is_none() && p.month.is_some() && p.year == entry.year =>
                {
                    format!("{:02}", month)
                }
                _ => entry.full(),
            };
            parts.push(text);
            prev = Some(*entry);
        }

        parts.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: u16, m: u8, d: u8) -> DateEntry {
        DateEntry::new(y, Some(m), Some(d)).unwrap()
    }

    #[test]
    fn abbreviations_inherit_year_and_month() {
        let date = Date::parse("2012-03-15,16,04-01").unwrap();
        assert_eq!(
            date.entries(),
            &[ymd(2012, 3, 15), ymd(2012, 3, 16), ymd(2012, 4, 1)]
        );
    }

    #[test]
    fn shortest_form_is_written() {
        let date = Date::new(vec![ymd(2012, 3, 15), ymd(2012, 3, 16), ymd(2012, 4, 1)]).unwrap();
        assert_eq!(date.format(), "2012-03-15,16,04-01");
        assert_eq!(Date::parse(&date.format()).unwrap(), date);
    }

    #[test]
    fn month_lists_and_year_changes() {
        let date = Date::parse("1996-05,06").unwrap();
        assert_eq!(date.entries()[1], DateEntry::new(1996, Some(6), None).unwrap());
        assert_eq!(date.format(), "1996-05,06");

        let date = Date::parse("1996-12-27,28,1997-01-03,04").unwrap();
        assert_eq!(date.entries().len(), 4);
        assert_eq!(date.format(), "1996-12-27,28,1997-01-03,04");
    }

    #[test]
    fn leap_days_are_checked() {
        assert!(Date::parse("2012-02-29").is_ok());
        assert_eq!(
            Date::parse("2011-02-29").unwrap_err().kind,
            StnErrorKind::InvalidDateFormat
        );
        assert_eq!(
            Date::parse("0000-02-30").unwrap_err().kind,
            StnErrorKind::InvalidDateFormat
        );
    }

    #[test]
    fn malformed_dates_are_rejected() {
        for bad in ["", "15", "2012-3-15", "2012-13", "2012-01-01-01", "2012,05", "12-01"] {
            assert_eq!(
                Date::parse(bad).unwrap_err().kind,
                StnErrorKind::InvalidDateFormat,
                "{} should be rejected",
                bad
            );
        }
    }
}
