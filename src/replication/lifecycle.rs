//! Replication state machine transition rules.
//!
//! ```text
//! init -> sandbox_created -> runtime_ready -> wallet_verified
//!       -> funded -> starting -> healthy -> stopped -> cleaned_up
//!                                                ↘ dead
//! ```
//!
//! Transitions are linear forward; `dead` is reachable from any running
//! state; `cleaned_up` only from `stopped` or `dead`.

use crate::types::ChildStatus;

/// Whether `to` is a legal next state from `from`.
pub fn is_valid_transition(from: ChildStatus, to: ChildStatus) -> bool {
    use ChildStatus::*;

    if to == Dead {
        return !matches!(from, Stopped | Dead | CleanedUp);
    }
    if to == CleanedUp {
        return matches!(from, Stopped | Dead);
    }

    matches!(
        (from, to),
        (Init, SandboxCreated)
            | (SandboxCreated, RuntimeReady)
            | (RuntimeReady, WalletVerified)
            | (WalletVerified, Funded)
            | (Funded, Starting)
            | (Starting, Healthy)
            | (Healthy, Stopped)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ChildStatus::*;

    #[test]
    fn linear_forward_path_is_valid() {
        assert!(is_valid_transition(Init, SandboxCreated));
        assert!(is_valid_transition(SandboxCreated, RuntimeReady));
        assert!(is_valid_transition(Healthy, Stopped));
    }

    #[test]
    fn skipping_a_state_is_invalid() {
        assert!(!is_valid_transition(Init, RuntimeReady));
        assert!(!is_valid_transition(SandboxCreated, Healthy));
    }

    #[test]
    fn dead_reachable_from_any_running_state() {
        assert!(is_valid_transition(Init, Dead));
        assert!(is_valid_transition(Funded, Dead));
        assert!(is_valid_transition(Healthy, Dead));
        assert!(!is_valid_transition(Dead, Dead));
        assert!(!is_valid_transition(CleanedUp, Dead));
    }

    #[test]
    fn cleaned_up_only_from_stopped_or_dead() {
        assert!(is_valid_transition(Stopped, CleanedUp));
        assert!(is_valid_transition(Dead, CleanedUp));
        assert!(!is_valid_transition(Healthy, CleanedUp));
        assert!(!is_valid_transition(Init, CleanedUp));
    }
}
