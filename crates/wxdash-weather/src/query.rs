//! Search-box parsing: `"Paris, FR"` → name + optional country.
//! City existence and country codes are left for the provider to judge.

use std::str::FromStr;

use crate::error::QueryError;
use crate::types::CityQuery;

/// Parse free-text search input into a [`CityQuery`].
///
/// Splits on the first comma only; everything after it (trimmed) is the
/// country.
pub fn parse(raw: &str) -> Result<CityQuery, QueryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let (name, country) = match trimmed.split_once(',') {
        Some((name, country)) => (name.trim(), Some(country.trim())),
        None => (trimmed, None),
    };

    if name.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    Ok(CityQuery {
        name: name.to_string(),
        country: country.filter(|c| !c.is_empty()).map(str::to_string),
    })
}

impl FromStr for CityQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
