pub mod governor;

pub use governor::{
    can_run_inference, determine_tier, max_tokens_for_tier, model_for_tier, restrictions_for,
    HealthSignals, TierRestrictions,
};
