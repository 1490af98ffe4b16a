use thiserror::Error;

/// Boundary failures. Everything past input validation is total.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("region profile is missing an id")]
    MissingRegionId,
    #[error("month {0} is outside 1..=12")]
    InvalidMonth(u8),
    #[error("latitude {0} is not a finite value in -90..=90")]
    InvalidLatitude(f64),
    #[error("unknown latitude band `{0}`")]
    UnknownLatitudeBand(String),
    #[error("forecast length {requested}h exceeds the {max}h replay window")]
    InvalidForecastLength { requested: u32, max: u32 },
    #[error("could not parse date `{0}`, expected YYYY-MM-DD or YYYY-MM-DDTHH")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, Error>;
