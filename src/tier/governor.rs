//! Survival tier governor — maps observable health signals to a tier.
//!
//! Pure: no I/O happens in [`determine_tier`]. Callers persist the result and
//! toggle the router's low-compute mode; the governor itself just decides.

use crate::config::AutomatonConfig;
use crate::types::SurvivalTier;

/// Observable health signals the governor reasons about.
#[derive(Debug, Clone, Copy)]
pub struct HealthSignals {
    pub credits: f64,
    pub errors_per_hour: f64,
    pub recent_topup_failed: bool,
    pub topup_impossible: bool,
}

/// `(credits, errors, flags) -> tier`.
pub fn determine_tier(signals: HealthSignals, config: &AutomatonConfig) -> SurvivalTier {
    let (high, normal, low, critical) = config.tier_thresholds();

    if signals.credits < critical {
        return if signals.topup_impossible {
            SurvivalTier::Dead
        } else {
            SurvivalTier::Critical
        };
    }
    if signals.recent_topup_failed {
        return SurvivalTier::LowCompute;
    }
    if signals.credits >= high && signals.errors_per_hour < config.tier_error_rate_high {
        return SurvivalTier::High;
    }
    if signals.credits >= normal {
        return SurvivalTier::Normal;
    }
    debug_assert!(signals.credits >= low, "credits below L should have tripped critical above");
    SurvivalTier::LowCompute
}

/// Restrictions implied by a tier, applied by the caller (KV write, router toggle).
#[derive(Debug, Clone, Copy)]
pub struct TierRestrictions {
    pub suspend_discovery: bool,
    pub suspend_replication: bool,
    pub force_cheap_model: bool,
    pub low_compute_mode: bool,
}

pub fn restrictions_for(tier: SurvivalTier) -> TierRestrictions {
    match tier {
        SurvivalTier::High | SurvivalTier::Normal => TierRestrictions {
            suspend_discovery: false,
            suspend_replication: false,
            force_cheap_model: false,
            low_compute_mode: false,
        },
        SurvivalTier::LowCompute | SurvivalTier::Critical => TierRestrictions {
            suspend_discovery: true,
            suspend_replication: true,
            force_cheap_model: true,
            low_compute_mode: true,
        },
        SurvivalTier::Dead => TierRestrictions {
            suspend_discovery: true,
            suspend_replication: true,
            force_cheap_model: true,
            low_compute_mode: true,
        },
    }
}

/// True for every tier except `dead`.
pub fn can_run_inference(tier: SurvivalTier) -> bool {
    tier != SurvivalTier::Dead
}

/// Default model for `high`/`normal`, the configured cheap model otherwise.
pub fn model_for_tier<'a>(tier: SurvivalTier, default_model: &'a str, cheap_model: &'a str) -> &'a str {
    match tier {
        SurvivalTier::High | SurvivalTier::Normal => default_model,
        _ => cheap_model,
    }
}

/// Max output tokens for a tier, honouring the `critical` reduction.
pub fn max_tokens_for_tier(tier: SurvivalTier, config: &AutomatonConfig) -> u32 {
    match tier {
        SurvivalTier::Critical | SurvivalTier::Dead => config.max_tokens_critical,
        _ => config.max_tokens_per_turn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AutomatonConfig {
        AutomatonConfig::default()
    }

    fn signals(credits: f64) -> HealthSignals {
        HealthSignals {
            credits,
            errors_per_hour: 0.0,
            recent_topup_failed: false,
            topup_impossible: false,
        }
    }

    #[test]
    fn high_credits_give_high_tier() {
        let cfg = config();
        assert_eq!(determine_tier(signals(cfg.tier_threshold_high + 1.0), &cfg), SurvivalTier::High);
    }

    #[test]
    fn high_error_rate_demotes_to_normal() {
        let cfg = config();
        let mut s = signals(cfg.tier_threshold_high + 1.0);
        s.errors_per_hour = cfg.tier_error_rate_high + 1.0;
        assert_eq!(determine_tier(s, &cfg), SurvivalTier::Normal);
    }

    #[test]
    fn below_critical_without_topup_is_dead() {
        let cfg = config();
        let mut s = signals(cfg.tier_threshold_critical - 0.01);
        s.topup_impossible = true;
        assert_eq!(determine_tier(s, &cfg), SurvivalTier::Dead);
    }

    #[test]
    fn below_critical_with_topup_possible_is_critical() {
        let cfg = config();
        let s = signals(cfg.tier_threshold_critical - 0.01);
        assert_eq!(determine_tier(s, &cfg), SurvivalTier::Critical);
    }

    #[test]
    fn recent_topup_failure_forces_low_compute() {
        let cfg = config();
        let mut s = signals(cfg.tier_threshold_high + 1.0);
        s.recent_topup_failed = true;
        assert_eq!(determine_tier(s, &cfg), SurvivalTier::LowCompute);
    }

    #[test]
    fn governor_recovers_upward_across_calls() {
        let cfg = config();
        let low = determine_tier(signals(cfg.tier_threshold_critical - 0.01), &cfg);
        let high = determine_tier(signals(cfg.tier_threshold_high + 1.0), &cfg);
        assert_eq!(low, SurvivalTier::Critical);
        assert_eq!(high, SurvivalTier::High);
    }

    #[test]
    fn dead_tier_cannot_run_inference() {
        assert!(!can_run_inference(SurvivalTier::Dead));
        assert!(can_run_inference(SurvivalTier::Critical));
    }

    #[test]
    fn model_selection_forces_cheap_model_below_normal() {
        assert_eq!(model_for_tier(SurvivalTier::High, "gpt-4o", "gpt-5-mini"), "gpt-4o");
        assert_eq!(model_for_tier(SurvivalTier::Critical, "gpt-4o", "gpt-5-mini"), "gpt-5-mini");
    }
}
