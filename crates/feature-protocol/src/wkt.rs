//! Polygon text (WKT) parsing.
//!
//! Accepts the `POLYGON` form written by the conversion pipeline:
//!
//! - `POLYGON ((x1 y1, x2 y2, x3 y3, x1 y1))`
//! - `POLYGON ((exterior...), (hole...), ...)`
//! - `POLYGON Z ((x1 y1 z1, ...))` (the third ordinate is discarded)
//!
//! Coordinates are plain planar values; no range checks are applied.

use thiserror::Error;

/// Errors that can occur when parsing polygon text.
#[derive(Debug, Error, PartialEq)]
pub enum WktError {
    /// Not a POLYGON geometry.
    #[error("Expected POLYGON, got '{0}'")]
    UnsupportedGeometry(String),

    /// Parentheses missing or unbalanced.
    #[error("Malformed parentheses: {0}")]
    Parentheses(String),

    /// A position could not be parsed.
    #[error("Invalid position '{0}'")]
    InvalidPosition(String),

    /// A ring is too short or not closed.
    #[error("Invalid ring: {0}")]
    InvalidRing(String),

    /// The polygon has no rings.
    #[error("Polygon is empty")]
    Empty,
}

/// Parse polygon text into rings of `[x, y]` positions.
///
/// The first ring is the exterior, the remaining rings are holes.
pub fn parse_polygon(text: &str) -> Result<Vec<Vec<[f64; 2]>>, WktError> {
    let text = text.trim();
    let upper = text.to_ascii_uppercase();

    let Some(rest) = upper.strip_prefix("POLYGON") else {
        let keyword = upper
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        return Err(WktError::UnsupportedGeometry(keyword.to_string()));
    };

    // Work on the original text from here so the offsets line up.
    let mut body = text["POLYGON".len()..].trim_start();
    let mut dims = 2;
    if rest.trim_start().starts_with("ZM") || rest.trim_start().starts_with('M') {
        return Err(WktError::UnsupportedGeometry(
            "POLYGON with measures".to_string(),
        ));
    }
    if rest.trim_start().starts_with('Z') {
        dims = 3;
        body = body[1..].trim_start();
    }

    if body.eq_ignore_ascii_case("EMPTY") {
        return Err(WktError::Empty);
    }

    let inner = body
        .strip_prefix('(')
        .and_then(|b| b.strip_suffix(')'))
        .ok_or_else(|| WktError::Parentheses("polygon must be wrapped in '(' ... ')'".into()))?;

    let rings = split_rings(inner)?
        .into_iter()
        .map(|ring| parse_ring(ring, dims))
        .collect::<Result<Vec<_>, _>>()?;

    if rings.is_empty() {
        return Err(WktError::Empty);
    }

    Ok(rings)
}

/// Split `(ring), (ring)` into the text inside each ring's parentheses.
fn split_rings(inner: &str) -> Result<Vec<&str>, WktError> {
    let mut rings = Vec::new();
    let mut depth = 0usize;
    let mut ring_start = None;
    let mut expect_separator = false;

    for (idx, ch) in inner.char_indices() {
        match ch {
            '(' => {
                if depth > 0 || expect_separator {
                    return Err(WktError::Parentheses(format!(
                        "unexpected '(' at offset {}",
                        idx
                    )));
                }
                depth = 1;
                ring_start = Some(idx + 1);
            }
            ')' => {
                let start = ring_start
                    .take()
                    .ok_or_else(|| WktError::Parentheses(format!("unexpected ')' at offset {}", idx)))?;
                depth = 0;
                rings.push(&inner[start..idx]);
                expect_separator = true;
            }
            ',' if depth == 0 => {
                if !expect_separator {
                    return Err(WktError::Parentheses("empty ring".to_string()));
                }
                expect_separator = false;
            }
            c if depth == 0 && !c.is_whitespace() => {
                return Err(WktError::Parentheses(format!(
                    "unexpected '{}' between rings",
                    c
                )));
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(WktError::Parentheses("unclosed ring".to_string()));
    }
    if !rings.is_empty() && !expect_separator {
        return Err(WktError::Parentheses("trailing ','".to_string()));
    }

    Ok(rings)
}

/// Parse one ring's comma separated positions.
fn parse_ring(ring: &str, dims: usize) -> Result<Vec<[f64; 2]>, WktError> {
    let points = ring
        .split(',')
        .map(|position| parse_position(position, dims))
        .collect::<Result<Vec<_>, _>>()?;

    if points.len() < 4 {
        return Err(WktError::InvalidRing(format!(
            "ring must have at least 4 positions, got {}",
            points.len()
        )));
    }

    if points.first() != points.last() {
        return Err(WktError::InvalidRing("ring is not closed".to_string()));
    }

    Ok(points)
}

fn parse_position(position: &str, dims: usize) -> Result<[f64; 2], WktError> {
    let position = position.trim();
    let parts: Vec<&str> = position.split_whitespace().collect();
    if parts.len() != dims {
        return Err(WktError::InvalidPosition(position.to_string()));
    }

    let values = parts
        .iter()
        .map(|part| part.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| WktError::InvalidPosition(position.to_string()))?;

    Ok([values[0], values[1]])
}
