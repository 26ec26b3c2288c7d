//! Pulls the temperature and place name out of a raw WFS response body.
//!
//! The body is matched with two fixed patterns instead of being parsed as
//! XML. Either pattern may fail independently.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Observation;

// Captures the last value of the tuple list, i.e. the latest observation.
static TEMPERATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<gml:doubleOrNilReasonTupleList>[\s0-9.\-]*\s([0-9.\-]+)[^0-9]*</gml:doubleOrNilReasonTupleList>",
    )
    .unwrap()
});

static PLACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)/region">\s*(\S*)\s*</target:region>"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no temperature found in response body")]
    MissingTemperature,
    #[error("no region found in response body")]
    MissingPlace,
}

pub fn extract_temperature(body: &str) -> Option<&str> {
    first_capture(&TEMPERATURE_RE, body)
}

pub fn extract_place(body: &str) -> Option<&str> {
    first_capture(&PLACE_RE, body)
}

/// Both values, or the first one that could not be found.
pub fn extract_observation(body: &str) -> Result<Observation, ExtractError> {
    let place = extract_place(body).ok_or(ExtractError::MissingPlace)?;
    let temperature = extract_temperature(body).ok_or(ExtractError::MissingTemperature)?;

    Ok(Observation {
        temperature: temperature.to_string(),
        place: place.to_string(),
    })
}

fn first_capture<'a>(re: &Regex, body: &'a str) -> Option<&'a str> {
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}
