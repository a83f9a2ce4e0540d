use thiserror::Error;

/// Input-validation failures raised by the pricing and staking core.
///
/// Every variant is raised synchronously at the offending input and is never
/// recovered inside the core: a computation either returns a complete result
/// or one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Decimal odds must be finite and strictly greater than 1.0.
    #[error("invalid odds for {outcome}: {value} (decimal odds must be finite and > 1.0)")]
    InvalidOdds { outcome: &'static str, value: f64 },

    /// Form must lie in [-1, 1]; goal difference must be finite.
    #[error("invalid adjustment {field}: {value}")]
    InvalidAdjustment { field: &'static str, value: f64 },

    /// Actual match score must be 0.0, 0.5 or 1.0.
    #[error("invalid match score {0} (expected 0.0, 0.5 or 1.0)")]
    InvalidScore(f64),

    #[error("invalid rating {0} (ratings must be finite)")]
    InvalidRating(f64),

    #[error("invalid bankroll {0} (bankroll must be positive)")]
    InvalidBankroll(f64),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_the_input() {
        let err = EngineError::InvalidOdds {
            outcome: "draw",
            value: 0.9,
        };
        let msg = err.to_string();
        assert!(msg.contains("draw"));
        assert!(msg.contains("0.9"));

        let err = EngineError::InvalidAdjustment {
            field: "home_form",
            value: 1.5,
        };
        assert!(err.to_string().contains("home_form"));
    }

    #[test]
    fn test_errors_are_std_errors() {
        let err: Box<dyn std::error::Error> = Box::new(EngineError::InvalidBankroll(-5.0));
        assert!(err.to_string().contains("bankroll"));
    }
}
