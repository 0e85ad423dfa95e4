use alloy::primitives::TxHash;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::{LocalConfig, RefreshSchedule},
    position_aggregator::{PositionSource, UserLendingPosition},
};

/// Lifecycle of a session. `Idle`, `Ready` and `Degraded` are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    /// Position read from the pool's account data
    Ready,
    /// Position partly estimated after a failed read
    Degraded,
    Submitting,
    Confirmed,
}

impl SessionState {
    pub fn settled_from(source: PositionSource) -> Self {
        match source {
            PositionSource::Unloaded => Self::Idle,
            PositionSource::AccountData => Self::Ready,
            PositionSource::Estimated => Self::Degraded,
        }
    }
}

/// Read-only view handed to the rendering layer
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PositionSnapshot {
    #[serde(flatten)]
    pub position: UserLendingPosition,
    pub state: SessionState,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Result of a confirmed action, taken after the follow-up refreshes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReceipt {
    pub tx_hash: TxHash,
    pub snapshot: PositionSnapshot,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Enable the supplied reserve as collateral right after a supply
    pub use_as_collateral: bool,
    pub refresh_schedule: RefreshSchedule,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            use_as_collateral: true,
            refresh_schedule: RefreshSchedule::default(),
        }
    }
}

impl From<&LocalConfig> for SessionSettings {
    fn from(local_config: &LocalConfig) -> Self {
        Self {
            use_as_collateral: local_config.use_as_collateral,
            refresh_schedule: local_config.refresh_schedule.clone(),
        }
    }
}
