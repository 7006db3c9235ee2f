//! Unified error kinds for the cross-venue arbitrage bot.
//!
//! Every [`crate::venue_client::VenueClient`] implementation wraps its own
//! venue-specific error type into an [`ErrorKind`] at the trait boundary, so
//! nothing above that boundary ever inspects a raw HTTP status code or
//! venue-native error string.

use thiserror::Error;

/// Venue- and boundary-independent error classification.
///
/// Recovery policy is attached to the kind, not to the call site: callers
/// branch on `kind()` rather than re-deriving retry behavior per error.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Timeout, 5xx, or dropped websocket. Retry with backoff.
    #[error("transient error: {0}")]
    Transient(String),

    /// Book snapshot older than the freshness threshold.
    #[error("stale book data: {0}")]
    Stale(String),

    /// Insufficient depth to fill the requested size.
    #[error("no liquidity: {0}")]
    NoLiquidity(String),

    /// Price fell outside the valid probability range or crossed a limit.
    #[error("bad price: {0}")]
    BadPrice(String),

    /// Order size below the venue's minimum.
    #[error("below minimum order size: {0}")]
    BelowMinOrder(String),

    /// RiskGate rejected the attempt before submission.
    #[error("risk rejected: {0}")]
    RiskRejected(String),

    /// One leg of a two-leg execution filled while the other did not.
    #[error("partial fill: {0}")]
    PartialFill(String),

    /// An unwind attempt (cancel, hedge, or aggressive close) itself failed.
    #[error("unwind failed: {0}")]
    UnwindFailed(String),

    /// Credentials rejected or missing. Fatal at startup.
    #[error("authentication failure: {0}")]
    AuthFailure(String),

    /// Configuration failed validation. Fatal at startup.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The kill switch has tripped; terminal until process restart.
    #[error("kill switch active: {0}")]
    KillSwitch(String),
}

impl ErrorKind {
    /// Returns true if the caller should retry the same call with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns true if this kind is fatal at process startup.
    #[must_use]
    pub fn is_fatal_at_init(&self) -> bool {
        matches!(self, Self::AuthFailure(_) | Self::ConfigInvalid(_))
    }

    /// Returns true if this kind is terminal for the running process.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::KillSwitch(_))
    }

    /// Returns true if the detector/executor should abort the current
    /// attempt and enter cooldown without retrying on the same tick.
    #[must_use]
    pub fn is_abort_and_cooldown(&self) -> bool {
        matches!(
            self,
            Self::NoLiquidity(_) | Self::BadPrice(_) | Self::BelowMinOrder(_)
        )
    }
}

/// Result type alias used throughout the core and venue-client crates.
pub type Result<T> = std::result::Result<T, ErrorKind>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable() {
        let err = ErrorKind::Transient("timeout".to_string());
        assert!(err.is_retryable());
        assert!(!err.is_fatal_at_init());
    }

    #[test]
    fn auth_failure_is_fatal_at_init() {
        let err = ErrorKind::AuthFailure("missing api key".to_string());
        assert!(err.is_fatal_at_init());
        assert!(!err.is_retryable());
    }

    #[test]
    fn kill_switch_is_terminal() {
        let err = ErrorKind::KillSwitch("daily loss cap tripped".to_string());
        assert!(err.is_terminal());
    }

    #[test]
    fn no_liquidity_aborts_and_cools_down() {
        let err = ErrorKind::NoLiquidity("insufficient ask depth".to_string());
        assert!(err.is_abort_and_cooldown());
        assert!(!err.is_retryable());
    }

    #[test]
    fn risk_rejected_is_not_an_error_from_the_systems_view() {
        let err = ErrorKind::RiskRejected("per-trade cap exceeded".to_string());
        assert!(!err.is_retryable());
        assert!(!err.is_fatal_at_init());
        assert!(!err.is_terminal());
    }
}
