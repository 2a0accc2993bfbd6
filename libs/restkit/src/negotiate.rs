//! Header negotiation over weighted alternatives.
//!
//! A logical header such as `Accept` may arrive as several header lines, each
//! a comma-separated list of alternatives like `text/html;q=0.9`. This module
//! parses those lines and ranks them against a catalogue of supported values.
//!
//! Selection is a strict-greater scan that starts at weight 0: the first
//! alternative holding the maximum weight wins, and an alternative weighted
//! exactly 0 is never selected.

use thiserror::Error;

/// Errors raised while parsing a negotiable header.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NegotiationError {
    #[error("invalid quality value {value:?} in header alternative {alternative:?}")]
    InvalidQuality { alternative: String, value: String },
}

/// One alternative of a negotiable header.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub value: String,
    pub quality: f32,
}

/// Parse every alternative from the raw header lines, in the order they appear.
///
/// # Errors
/// Returns [`NegotiationError::InvalidQuality`] if a `q` parameter is not a
/// number in `[0, 1]`.
pub fn parse_alternatives<I, S>(values: I) -> Result<Vec<Alternative>, NegotiationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut alternatives = Vec::new();
    for line in values {
        for entry in line.as_ref().split(',') {
            let mut segments = entry.split(';').map(str::trim);
            let value = segments.next().unwrap_or_default();
            if value.is_empty() {
                continue;
            }

            // A parameter without `=` disqualifies the whole alternative.
            let Some(params) = segments
                .map(|param| param.split_once('='))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };

            let mut quality = 1.0_f32;
            for (key, raw) in params {
                if !key.trim().eq_ignore_ascii_case("q") {
                    continue;
                }
                let raw = raw.trim();
                quality = raw
                    .parse::<f32>()
                    .ok()
                    .filter(|q| (0.0..=1.0).contains(q))
                    .ok_or_else(|| NegotiationError::InvalidQuality {
                        alternative: entry.trim().to_owned(),
                        value: raw.to_owned(),
                    })?;
            }

            alternatives.push(Alternative {
                value: value.to_owned(),
                quality,
            });
        }
    }
    Ok(alternatives)
}

/// Pick the best alternative from `values` that appears in `supported`.
///
/// Returns an empty string when the header is absent, empty, or names nothing
/// the catalogue supports; callers treat that as "no preference" and fall back
/// to their default.
///
/// # Errors
/// Returns [`NegotiationError`] if any alternative carries a malformed weight.
pub fn best_value<I, S>(values: I, supported: &[&str]) -> Result<String, NegotiationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let alternatives = parse_alternatives(values)?;
    Ok(best_of(&alternatives, supported).unwrap_or_default().to_owned())
}

/// Rank already-parsed alternatives; `None` when nothing with a positive
/// weight matches `supported`.
#[must_use]
pub fn best_of<'a>(alternatives: &[Alternative], supported: &[&'a str]) -> Option<&'a str> {
    let mut best = None;
    let mut best_quality = 0.0_f32;
    for alt in alternatives {
        if alt.quality <= best_quality {
            continue;
        }
        if let Some(found) = match_supported(&alt.value, supported) {
            best = Some(found);
            best_quality = alt.quality;
        }
    }
    best
}

fn match_supported<'a>(candidate: &str, supported: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = supported
        .iter()
        .copied()
        .find(|s| s.eq_ignore_ascii_case(candidate))
    {
        return Some(exact);
    }

    if candidate == "*/*" {
        return supported.first().copied();
    }
    let family = candidate.strip_suffix("/*")?;
    supported.iter().copied().find(|s| {
        s.split_once('/')
            .is_some_and(|(kind, _)| kind.eq_ignore_ascii_case(family))
    })
}
