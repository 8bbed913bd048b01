//! Strategy selection.
//!
//! Resolves the active [`ExecutionPlan`] from the feature profile, the
//! caller's preference and the latest resource constraints. Precedence:
//!
//! 1. a forced venue in the preference
//! 2. an explicitly named strategy (validated against the profile)
//! 3. severity-driven adaptation above the adaptation threshold
//! 4. tier-based automatic selection
//! 5. `Hybrid` when nothing is known about the host

use chrono::Utc;
use proofplane_kernel::error::{ProofError, ProofResult};
use proofplane_kernel::profile::{DeviceTier, FeatureProfile};
use proofplane_kernel::strategy::{
    ExecutionMode, ExecutionPlan, ExecutionPreference, ExecutionStrategy, PlanTimeouts,
    ResourceConstraints, StrategyType,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::StrategyCatalog;

/// Severity cut-offs used for adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptationThresholds {
    /// Above this, the strategy is re-evaluated
    pub adaptation: f64,
    /// Above this, everything goes to the server
    pub server_side: f64,
}

impl Default for AdaptationThresholds {
    fn default() -> Self {
        Self {
            adaptation: 0.5,
            server_side: 0.7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategySelector {
    catalog: StrategyCatalog,
    thresholds: AdaptationThresholds,
    remote_endpoint: String,
    timeouts: PlanTimeouts,
}

impl StrategySelector {
    pub fn new(
        catalog: StrategyCatalog,
        thresholds: AdaptationThresholds,
        remote_endpoint: impl Into<String>,
        timeouts: PlanTimeouts,
    ) -> Self {
        Self {
            catalog,
            thresholds,
            remote_endpoint: remote_endpoint.into(),
            timeouts,
        }
    }

    pub fn from_config(config: &crate::config::PlaneConfig) -> Self {
        Self::new(
            StrategyCatalog::standard(),
            config.thresholds(),
            config.remote_endpoint.clone(),
            config.timeouts(),
        )
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    pub fn thresholds(&self) -> AdaptationThresholds {
        self.thresholds
    }

    /// Strategy class implied by the device tier.
    pub fn automatic_type(profile: &FeatureProfile) -> StrategyType {
        match profile.tier {
            DeviceTier::High if profile.cpu_cores >= 8 && profile.memory_mb >= 8192 => {
                StrategyType::HighPerformance
            }
            DeviceTier::High => StrategyType::FullLocal,
            DeviceTier::Medium => StrategyType::Hybrid,
            DeviceTier::Low | DeviceTier::Incompatible => StrategyType::ServerSide,
        }
    }

    /// Tier-based strategy, tailored to the profile.
    pub fn select_automatic(&self, profile: &FeatureProfile) -> ProofResult<ExecutionStrategy> {
        self.strategy_for(Self::automatic_type(profile), Some(profile))
    }

    /// Strategy the resource monitor should move to, if any.
    pub fn adapt(&self, constraints: &ResourceConstraints) -> Option<StrategyType> {
        if constraints.severity <= self.thresholds.adaptation {
            return None;
        }
        let target = if constraints.severity > self.thresholds.server_side {
            StrategyType::ServerSide
        } else if constraints.memory || constraints.battery {
            StrategyType::LowResource
        } else if constraints.network {
            StrategyType::FullLocal
        } else {
            StrategyType::Hybrid
        };
        Some(target)
    }

    /// Catalog entry for a named strategy. `Automatic` is resolved against
    /// the profile, or falls back to `Hybrid` without one.
    pub fn strategy_for(
        &self,
        strategy_type: StrategyType,
        profile: Option<&FeatureProfile>,
    ) -> ProofResult<ExecutionStrategy> {
        let concrete = match (strategy_type, profile) {
            (StrategyType::Automatic, Some(p)) => Self::automatic_type(p),
            (StrategyType::Automatic, None) => StrategyType::Hybrid,
            (other, _) => other,
        };
        self.catalog.tailored(concrete, profile).ok_or_else(|| {
            ProofError::Configuration(format!("strategy '{concrete}' is not in the catalog"))
        })
    }

    /// Resolve a complete plan.
    pub fn resolve(
        &self,
        profile: Option<&FeatureProfile>,
        preference: ExecutionPreference,
        constraints: &ResourceConstraints,
    ) -> ProofResult<ExecutionPlan> {
        let (strategy_type, reason) = match preference.mode {
            ExecutionMode::ForceServer => (StrategyType::ServerSide, "forced server"),
            ExecutionMode::ForceLocal => (StrategyType::FullLocal, "forced local"),
            ExecutionMode::Strategy(requested) if requested != StrategyType::Automatic => {
                self.validate_explicit(requested, profile)?;
                (requested, "explicit")
            }
            _ => match self.adapt(constraints) {
                Some(adapted) => (adapted, "resource pressure"),
                None => match profile {
                    Some(p) => (Self::automatic_type(p), "automatic"),
                    None => (StrategyType::Hybrid, "default"),
                },
            },
        };

        let strategy = self.strategy_for(strategy_type, profile)?;
        info!(
            strategy = %strategy.strategy_type,
            offload = strategy.server_offload_percentage,
            reason,
            "Resolved execution strategy"
        );
        Ok(self.plan_with(strategy, preference))
    }

    /// Wrap a strategy into a plan. The revision is assigned on publish.
    pub fn plan_with(
        &self,
        strategy: ExecutionStrategy,
        preference: ExecutionPreference,
    ) -> ExecutionPlan {
        ExecutionPlan {
            revision: 0,
            strategy,
            preference,
            remote_endpoint: self.remote_endpoint.clone(),
            timeouts: self.timeouts,
            created_at: Utc::now(),
        }
    }

    fn validate_explicit(
        &self,
        requested: StrategyType,
        profile: Option<&FeatureProfile>,
    ) -> ProofResult<()> {
        let Some(profile) = profile else {
            return Ok(());
        };
        if requested.uses_local_prover() && !profile.tier.can_prove_locally() {
            debug!(%requested, tier = %profile.tier, "Rejected explicit strategy");
            return Err(ProofError::Configuration(format!(
                "strategy '{requested}' needs local proving, which this {} device cannot do",
                profile.environment
            )));
        }
        Ok(())
    }
}
