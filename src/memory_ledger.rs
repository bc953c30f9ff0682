//! In-memory ledger with checkpointed transactions
//!
//! Reference implementation of the collaborator contracts in
//! [`ledger`](crate::ledger). Writes go straight to a [`LedgerState`];
//! [`Transactional::atomically`] snapshots the state first and puts the
//! snapshot back when the closure fails or leaves the state invalid.
//!
//! Each transaction clones and re-validates the whole state, so its cost
//! grows with the number of stored trades and ballots. Fingerprinted
//! [`Checkpoint`]s are only computed when asked for through
//! [`MemoryLedger::checkpoint`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{LedgerError, ValidationError};
use crate::hasher::{StateHash, StateHasher};
use crate::ledger::{GamePhase, PlayerLedger, TradeStore, Transactional, VoteStore};
use crate::traits::Validate;
use crate::types::{NewTrade, Player, PlayerId, Trade, TradeId, TradeStatus, UserId, Vote};

/// Everything the in-memory ledger stores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub players: BTreeMap<PlayerId, Player>,
    pub trades: BTreeMap<TradeId, Trade>,
    pub votes: BTreeMap<UserId, Vote>,
    /// Id of the most recently created trade
    pub last_trade_id: u64,
    pub voting_open: bool,
}

impl Validate for LedgerState {
    fn validate(&self) -> Result<(), ValidationError> {
        for (id, player) in &self.players {
            if id != &player.id {
                return Err(ValidationError::InvalidState {
                    reason: format!("Player stored under {} has id {}", id, player.id),
                });
            }
        }

        for trade in self.trades.values() {
            trade.validate()?;
            for party in [&trade.initiating_player_id, &trade.recipient_player_id] {
                if !self.players.contains_key(party) {
                    return Err(ValidationError::InvalidState {
                        reason: format!("Trade {} references unknown player {}", trade.id, party),
                    });
                }
            }
        }

        for vote in self.votes.values() {
            vote.validate()?;
        }

        Ok(())
    }
}

/// Ledger state captured at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub state: LedgerState,
    pub hash: StateHash,
    pub write_count: usize,
}

/// Ledger kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: LedgerState,
    hasher: StateHasher,
    write_count: usize,
}

impl MemoryLedger {
    /// Create an empty ledger with voting closed
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger from an existing state
    pub fn from_state(state: LedgerState) -> Result<Self, ValidationError> {
        state.validate()?;

        Ok(Self {
            state,
            hasher: StateHasher::new(),
            write_count: 0,
        })
    }

    /// Register a player, replacing any record with the same id
    pub fn add_player(&mut self, player: Player) {
        self.state.players.insert(player.id.clone(), player);
        self.write_count += 1;
    }

    pub fn open_voting(&mut self) {
        self.state.voting_open = true;
    }

    pub fn close_voting(&mut self) {
        self.state.voting_open = false;
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn into_state(self) -> LedgerState {
        self.state
    }

    /// Number of writes applied so far
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    pub fn current_hash(&self) -> Result<StateHash, LedgerError> {
        self.hasher.hash(&self.state)
    }

    /// Capture the current state
    pub fn checkpoint(&self) -> Result<Checkpoint, LedgerError> {
        Ok(Checkpoint {
            state: self.state.clone(),
            hash: self.current_hash()?,
            write_count: self.write_count,
        })
    }

    /// Restore a captured state after checking its fingerprint and invariants
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<(), LedgerError> {
        checkpoint.state.validate().map_err(|e| LedgerError::Checkpoint {
            reason: format!("Checkpoint state validation failed: {}", e),
        })?;

        let computed_hash = self.hasher.hash(&checkpoint.state)?;
        if computed_hash != checkpoint.hash {
            return Err(LedgerError::Checkpoint {
                reason: format!(
                    "Checkpoint hash mismatch: expected {}, got {}",
                    checkpoint.hash, computed_hash
                ),
            });
        }

        self.state = checkpoint.state.clone();
        self.write_count = checkpoint.write_count;
        Ok(())
    }

    fn player_mut(&mut self, id: &PlayerId) -> Result<&mut Player, LedgerError> {
        self.write_count += 1;
        self.state
            .players
            .get_mut(id)
            .ok_or_else(|| LedgerError::PlayerNotFound { id: id.clone() })
    }

    fn trade_mut(&mut self, id: TradeId) -> Result<&mut Trade, LedgerError> {
        self.write_count += 1;
        self.state
            .trades
            .get_mut(&id)
            .ok_or(LedgerError::TradeNotFound { id })
    }
}

impl PlayerLedger for MemoryLedger {
    fn player(&self, id: &PlayerId) -> Option<Player> {
        self.state.players.get(id).cloned()
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.state.players.keys().cloned().collect()
    }

    fn set_tokens(&mut self, id: &PlayerId, tokens: i64) -> Result<(), LedgerError> {
        self.player_mut(id)?.tokens = tokens;
        Ok(())
    }

    fn set_inventory(&mut self, id: &PlayerId, inventory: String) -> Result<(), LedgerError> {
        self.player_mut(id)?.inventory = inventory;
        Ok(())
    }

    fn set_current_name(&mut self, id: &PlayerId, name: String) -> Result<(), LedgerError> {
        self.player_mut(id)?.current_name = name;
        Ok(())
    }

    fn set_published_name(
        &mut self,
        id: &PlayerId,
        name: Option<String>,
    ) -> Result<(), LedgerError> {
        self.player_mut(id)?.published_name = name;
        Ok(())
    }
}

impl TradeStore for MemoryLedger {
    fn create_trade(&mut self, trade: NewTrade) -> Result<Trade, LedgerError> {
        for party in [&trade.initiating_player_id, &trade.recipient_player_id] {
            if !self.state.players.contains_key(party) {
                return Err(LedgerError::PlayerNotFound { id: party.clone() });
            }
        }

        let trade = Trade {
            id: TradeId(self.state.last_trade_id + 1),
            initiating_player_id: trade.initiating_player_id,
            recipient_player_id: trade.recipient_player_id,
            offered_characters: trade.offered_characters,
            requested_characters: trade.requested_characters,
            status: TradeStatus::AwaitingRecipient,
        };
        trade.validate()?;

        self.state.last_trade_id = trade.id.0;
        self.state.trades.insert(trade.id, trade.clone());
        self.write_count += 1;
        Ok(trade)
    }

    fn trade(&self, id: TradeId) -> Option<Trade> {
        self.state.trades.get(&id).cloned()
    }

    fn set_trade_status(&mut self, id: TradeId, status: TradeStatus) -> Result<(), LedgerError> {
        self.trade_mut(id)?.status = status;
        Ok(())
    }

    fn set_trade_characters(
        &mut self,
        id: TradeId,
        offered_characters: String,
        requested_characters: String,
    ) -> Result<(), LedgerError> {
        let trade = self.trade_mut(id)?;
        trade.offered_characters = offered_characters;
        trade.requested_characters = requested_characters;
        Ok(())
    }
}

impl VoteStore for MemoryLedger {
    fn vote(&self, voter_id: &UserId) -> Option<Vote> {
        self.state.votes.get(voter_id).cloned()
    }

    fn votes(&self) -> Vec<Vote> {
        self.state.votes.values().cloned().collect()
    }

    fn save_vote(&mut self, vote: Vote) -> Result<(), LedgerError> {
        vote.validate()?;
        self.state.votes.insert(vote.voter_id.clone(), vote);
        self.write_count += 1;
        Ok(())
    }

    fn delete_vote(&mut self, voter_id: &UserId) -> Option<Vote> {
        let removed = self.state.votes.remove(voter_id);
        if removed.is_some() {
            self.write_count += 1;
        }
        removed
    }

    fn reset_votes(&mut self) {
        self.state.votes.clear();
        self.write_count += 1;
    }
}

impl GamePhase for MemoryLedger {
    fn is_voting_open(&self) -> bool {
        self.state.voting_open
    }
}

impl Transactional for MemoryLedger {
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let snapshot = self.state.clone();
        let writes_before = self.write_count;

        let error = match f(self) {
            Ok(value) => match self.state.validate() {
                Ok(()) => return Ok(value),
                Err(invalid) => E::from(LedgerError::Rejected(invalid)),
            },
            Err(error) => error,
        };

        warn!(
            writes = self.write_count - writes_before,
            "Rolling back ledger transaction"
        );
        self.state = snapshot;
        self.write_count = writes_before;
        Err(error)
    }
}
