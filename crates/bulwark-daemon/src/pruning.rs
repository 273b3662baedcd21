//! Periodic pruning of slashing-protection history

use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use bulwark_slashing::PruneSummary;

use crate::config::PruningConfig;
use crate::service::SlashingService;

pub struct PruningScheduler {
    service: SlashingService,
    config: PruningConfig,
}

impl PruningScheduler {
    pub fn new(service: SlashingService, config: PruningConfig) -> Self {
        Self { service, config }
    }

    /// Run one pass; failures are logged, never propagated into the loop
    pub async fn run_once(&self) -> Option<PruneSummary> {
        match self.service.prune_all(self.config.entries_to_keep).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Pruning pass failed: {}", e);
                None
            }
        }
    }

    /// Prune on every interval tick, forever
    pub async fn run(self) {
        info!(
            "Pruning every {}s, keeping {} entries per validator",
            self.config.interval_secs, self.config.entries_to_keep
        );

        let mut interval = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately
        interval.tick().await;
        if self.config.at_boot {
            self.run_once().await;
        }

        loop {
            interval.tick().await;
            self.run_once().await;
        }
    }
}
