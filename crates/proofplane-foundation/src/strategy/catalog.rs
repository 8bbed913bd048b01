//! Strategy catalog.
//!
//! Fixed table of named strategies. Entries are tailored to the detected
//! profile on the way out; the table itself never changes.

use std::collections::HashMap;

use proofplane_kernel::profile::{EnvironmentKind, FeatureProfile};
use proofplane_kernel::strategy::{ExecutionStrategy, PlatformOptimizations, StrategyType};

#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    entries: HashMap<StrategyType, ExecutionStrategy>,
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn entry(
    strategy_type: StrategyType,
    worker_thread_count: u32,
    server_offload_percentage: u8,
    memory_limit_mb: u64,
    enable_compression: bool,
    aggressive_cleanup: bool,
) -> ExecutionStrategy {
    ExecutionStrategy {
        strategy_type,
        use_worker_threads: worker_thread_count > 0,
        worker_thread_count,
        use_wasm: strategy_type.uses_local_prover(),
        use_local_cache: strategy_type.uses_local_prover(),
        offload_to_server: server_offload_percentage > 0,
        server_offload_percentage,
        memory_limit_mb,
        enable_compression,
        aggressive_cleanup,
        optimizations: PlatformOptimizations::default(),
    }
}

impl StrategyCatalog {
    /// The built-in table.
    pub fn standard() -> Self {
        let entries = [
            entry(StrategyType::FullLocal, 4, 0, 4096, false, false),
            entry(StrategyType::Hybrid, 2, 50, 2048, true, false),
            entry(StrategyType::ServerSide, 0, 100, 512, true, true),
            entry(StrategyType::LowResource, 1, 70, 1024, true, true),
            entry(StrategyType::HighPerformance, 8, 0, 8192, false, false),
        ]
        .into_iter()
        .map(|s| (s.strategy_type, s))
        .collect();

        Self { entries }
    }

    /// Raw catalog entry. `Automatic` has none; the selector resolves it.
    pub fn get(&self, strategy_type: StrategyType) -> Option<&ExecutionStrategy> {
        self.entries.get(&strategy_type)
    }

    /// Replace an entry.
    pub fn with_entry(mut self, strategy: ExecutionStrategy) -> Self {
        self.entries.insert(strategy.strategy_type, strategy);
        self
    }

    /// Catalog entry adjusted to what the host can actually do.
    pub fn tailored(
        &self,
        strategy_type: StrategyType,
        profile: Option<&FeatureProfile>,
    ) -> Option<ExecutionStrategy> {
        let mut strategy = self.get(strategy_type)?.clone();
        let Some(profile) = profile else {
            return Some(strategy);
        };

        if !profile.flags.worker_threads {
            strategy.use_worker_threads = false;
            strategy.worker_thread_count = 0;
        } else {
            strategy.worker_thread_count = strategy.worker_thread_count.min(profile.cpu_cores);
            strategy.use_worker_threads = strategy.worker_thread_count > 0;
        }

        if !profile.flags.wasm {
            strategy.use_wasm = false;
        }
        if !profile.flags.persistent_storage {
            strategy.use_local_cache = false;
        }

        // unknown memory (0) leaves the catalog limit in place
        if profile.memory_mb > 0 {
            strategy.memory_limit_mb = strategy.memory_limit_mb.min(profile.memory_mb / 2);
        }

        strategy.optimizations = optimizations_for(profile);
        Some(strategy)
    }
}

/// Per-environment tuning flags.
pub fn optimizations_for(profile: &FeatureProfile) -> PlatformOptimizations {
    match profile.environment {
        EnvironmentKind::Desktop => PlatformOptimizations {
            native_threads: profile.flags.worker_threads,
            ..Default::default()
        },
        EnvironmentKind::Browser => PlatformOptimizations {
            yield_main_thread: true,
            ..Default::default()
        },
        EnvironmentKind::Mobile => PlatformOptimizations {
            battery_saver: profile.battery.is_some_and(|b| !b.charging),
            yield_main_thread: true,
            ..Default::default()
        },
        EnvironmentKind::Worker => PlatformOptimizations {
            isolated_worker: true,
            ..Default::default()
        },
        EnvironmentKind::Unknown => PlatformOptimizations::default(),
    }
}
