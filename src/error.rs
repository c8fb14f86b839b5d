//! Error-kind taxonomy shared by the router, governor, and replication subsystem.
//!
//! Application code mostly propagates `anyhow::Error` (see the teacher's style
//! throughout `store`/`main`), but the boundaries that need to dispatch on *kind*
//! — retry transient failures, disable a registry row on provider-config errors,
//! fail validation immediately — match on this enum instead of string-sniffing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoneyClawError {
    /// Timeout, 5xx, connection refused — retried with jittered backoff.
    #[error("transient: {0}")]
    Transient(String),

    /// Auth failure or model-not-found — skip the provider for this turn.
    #[error("provider config: {0}")]
    ProviderConfig(String),

    /// Zero wallet address, malformed model id — fail immediately, no side effects.
    #[error("validation: {0}")]
    Validation(String),

    /// `/v1/chat/completions` unsupported — opportunistic one-shot fallback.
    #[error("protocol: {0}")]
    Protocol(String),

    /// Store unreadable, migration aborted, identity missing — terminate the process.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl MoneyClawError {
    /// Whether this error class should be retried with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
