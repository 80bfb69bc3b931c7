use catalog::domain::Period;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{Error, Result};

// Query values arrive as raw strings so malformed input maps to
// `InvalidArgument` instead of an extractor rejection.

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub start_period: Option<String>,
    pub end_period: Option<String>,
}

impl PeriodQuery {
    pub fn period(&self) -> Result<Period> {
        parse_period(self.start_period.as_deref(), self.end_period.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ScreeningsQuery {
    pub movie_id: Option<String>,
    pub start_period: Option<String>,
    pub end_period: Option<String>,
}

impl ScreeningsQuery {
    pub fn movie_id(&self) -> Result<i32> {
        match self.movie_id.as_deref() {
            Some(raw) => parse_id("movie_id", raw),
            None => Err(Error::invalid_argument("movie_id is required")),
        }
    }

    pub fn period(&self) -> Result<Period> {
        parse_period(self.start_period.as_deref(), self.end_period.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewsQuery {
    pub cities_ids: Option<String>,
    pub start_period: Option<String>,
    pub end_period: Option<String>,
}

impl PreviewsQuery {
    /// `None` when no city filter was given.
    pub fn cities_ids(&self) -> Result<Option<Vec<i32>>> {
        self.cities_ids.as_deref().map(parse_ids).transpose()
    }

    pub fn period(&self) -> Result<Period> {
        parse_period(self.start_period.as_deref(), self.end_period.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HallsQuery {
    pub ids: Option<String>,
}

impl HallsQuery {
    pub fn ids(&self) -> Result<Vec<i32>> {
        parse_ids(self.ids.as_deref().unwrap_or_default())
    }
}

pub fn parse_id(field: &str, raw: &str) -> Result<i32> {
    raw.trim()
        .parse()
        .map_err(|_| Error::invalid_argument(format!("{field} must be an integer, got '{raw}'")))
}

pub fn parse_screening_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| {
            Error::invalid_argument(format!("screening_id must be an integer, got '{raw}'"))
        })
}

/// Comma separated ids, optionally wrapped in double quotes. Blank items are skipped.
pub fn parse_ids(raw: &str) -> Result<Vec<i32>> {
    raw.replace('"', "")
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse()
                .map_err(|_| Error::invalid_argument(format!("invalid id '{item}' in '{raw}'")))
        })
        .collect()
}

pub fn parse_period(start: Option<&str>, end: Option<&str>) -> Result<Period> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(Error::invalid_argument(
            "invalid period value, it mustn't be empty",
        ));
    };
    Period::new(
        parse_timestamp("start_period", start)?,
        parse_timestamp("end_period", end)?,
    )
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            Error::invalid_argument(format!(
                "invalid {field} value, it must be RFC3339 layout value: {raw}"
            ))
        })
}
