//! Effective row limit calculation.

/// Clamp a raw `limit` parameter to `max_limit`.
///
/// Absent, unparsable, zero or negative values mean "as many as allowed".
pub fn effective_limit(raw: Option<&str>, max_limit: u64) -> u64 {
    match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
        Some(requested) if requested > 0 => (requested as u64).min(max_limit),
        _ => max_limit,
    }
}
