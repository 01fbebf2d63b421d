//! Validation utilities for ingest and query payloads.
//!
//! Malformed interactions are rejected here, before they reach the update
//! path; query limits are bounded before the ranking scan runs.

use crate::error::RecoError;

/// Upper bound on `top_n` for a single recommendation query.
pub const MAX_TOP_N: usize = 1000;

/// Validate the watch time of an interaction (seconds or ratio).
pub fn validate_watch_time(watch_time: f32) -> Result<(), RecoError> {
    if !watch_time.is_finite() || watch_time < 0.0 {
        return Err(RecoError::validation(
            "watch_time must be a finite, non-negative number",
        ));
    }
    Ok(())
}

/// Validate an optional content duration.
pub fn validate_duration(duration: Option<f32>) -> Result<(), RecoError> {
    if let Some(d) = duration {
        if !d.is_finite() || d <= 0.0 {
            return Err(RecoError::validation(
                "duration must be a finite, positive number when present",
            ));
        }
    }
    Ok(())
}

/// Validate the requested result count of a recommendation query.
pub fn validate_top_n(top_n: usize) -> Result<(), RecoError> {
    if top_n > MAX_TOP_N {
        return Err(RecoError::validation(format!(
            "top_n must not exceed {MAX_TOP_N}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_watch_time() {
        assert!(validate_watch_time(0.0).is_ok());
        assert!(validate_watch_time(600.0).is_ok());
        assert!(validate_watch_time(-1.0).is_err());
        assert!(validate_watch_time(f32::NAN).is_err());
        assert!(validate_watch_time(f32::INFINITY).is_err());
    }

    #[test]
    fn test_validate_duration() {
        assert!(validate_duration(None).is_ok());
        assert!(validate_duration(Some(600.0)).is_ok());
        assert!(validate_duration(Some(0.0)).is_err());
        assert!(validate_duration(Some(-5.0)).is_err());
        assert!(validate_duration(Some(f32::NAN)).is_err());
    }

    #[test]
    fn test_validate_top_n() {
        assert!(validate_top_n(0).is_ok());
        assert!(validate_top_n(MAX_TOP_N).is_ok());
        assert!(validate_top_n(MAX_TOP_N + 1).is_err());
    }
}
