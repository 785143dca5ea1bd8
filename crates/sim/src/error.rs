use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rejected configuration. Raised at construction time, never mid-run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{what} must be positive (got {value})")]
    NonPositive { what: &'static str, value: f64 },

    #[error("{what} must be non-negative (got {value})")]
    Negative { what: &'static str, value: f64 },

    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid range for {what}: min {min} > max {max}")]
    InvalidRange { what: &'static str, min: f64, max: f64 },

    #[error("Sample interval {ts} s exceeds the forward-Euler stability limit {limit} s")]
    Unstable { ts: f64, limit: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub fn ensure_finite(what: &'static str, value: f64) -> ConfigResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { what, value })
    }
}

pub fn ensure_positive(what: &'static str, value: f64) -> ConfigResult<f64> {
    ensure_finite(what, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { what, value })
    }
}

pub fn ensure_non_negative(what: &'static str, value: f64) -> ConfigResult<f64> {
    ensure_finite(what, value)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Negative { what, value })
    }
}

pub fn ensure_range(what: &'static str, min: f64, max: f64) -> ConfigResult<()> {
    ensure_finite(what, min)?;
    ensure_finite(what, max)?;
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { what, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_rejects_zero_and_nan() {
        assert!(ensure_positive("ts", 0.5).is_ok());
        assert_eq!(
            ensure_positive("ts", 0.0),
            Err(ConfigError::NonPositive { what: "ts", value: 0.0 })
        );
        assert!(matches!(
            ensure_positive("ts", f64::NAN),
            Err(ConfigError::NonFinite { .. })
        ));
    }

    #[test]
    fn range_allows_degenerate_interval() {
        assert!(ensure_range("u", 0.3, 0.3).is_ok());
        assert!(ensure_range("u", 1.0, 0.0).is_err());
    }

    #[test]
    fn messages_name_the_field() {
        let err = ensure_non_negative("qdu", -1.0).unwrap_err();
        assert_eq!(err.to_string(), "qdu must be non-negative (got -1)");
    }
}
