//! Activity log of trade workflows
//!
//! An append-only record of what players did, kept apart from diagnostic
//! `tracing` output. Entries are only recorded for successful workflows and
//! carry the timestamp of the engine's clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SerializationError;
use crate::types::{PlayerId, TradeId};

/// Kind of recorded activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    InitiateTrade,
    AcceptTrade,
    DeclineTrade,
    ModifyTrade,
}

/// One recorded activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub activity_type: ActivityType,
    pub timestamp: DateTime<Utc>,
    /// Player who performed the activity
    pub player_id: PlayerId,
    /// The other party, if any
    pub involved_player_id: Option<PlayerId>,
    pub involved_trade_id: Option<TradeId>,
    /// Characters the acting player received
    pub characters_gained: Option<String>,
    /// Characters the acting player gave away
    pub characters_lost: Option<String>,
}

impl ActivityEntry {
    pub fn new(activity_type: ActivityType, timestamp: DateTime<Utc>, player_id: PlayerId) -> Self {
        Self {
            activity_type,
            timestamp,
            player_id,
            involved_player_id: None,
            involved_trade_id: None,
            characters_gained: None,
            characters_lost: None,
        }
    }

    pub fn with_involved_player(mut self, player_id: PlayerId) -> Self {
        self.involved_player_id = Some(player_id);
        self
    }

    pub fn with_trade(mut self, trade_id: TradeId) -> Self {
        self.involved_trade_id = Some(trade_id);
        self
    }

    /// Record characters gained and lost by the acting player
    pub fn with_characters(mut self, gained: &str, lost: &str) -> Self {
        self.characters_gained = Some(gained.to_string());
        self.characters_lost = Some(lost.to_string());
        self
    }
}

/// Collected activity entries
///
/// Whether workflows write here at all is decided by
/// [`EngineConfig::record_activity`](crate::config::EngineConfig).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: ActivityEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn filter_by_type(&self, activity_type: ActivityType) -> Vec<&ActivityEntry> {
        self.entries
            .iter()
            .filter(|e| e.activity_type == activity_type)
            .collect()
    }

    /// Entries where the player acted or was involved
    pub fn filter_by_player(&self, player_id: &PlayerId) -> Vec<&ActivityEntry> {
        self.entries
            .iter()
            .filter(|e| &e.player_id == player_id || e.involved_player_id.as_ref() == Some(player_id))
            .collect()
    }

    pub fn filter_by_trade(&self, trade_id: TradeId) -> Vec<&ActivityEntry> {
        self.entries
            .iter()
            .filter(|e| e.involved_trade_id == Some(trade_id))
            .collect()
    }

    /// Export the entries for a persistence collaborator
    pub fn to_json(&self) -> Result<String, SerializationError> {
        serde_json::to_string(&self.entries).map_err(|e| SerializationError::SerializationFailed {
            reason: format!("Activity log encoding failed: {}", e),
        })
    }
}
