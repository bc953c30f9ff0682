//! Contracts the engines consume from their persistence collaborator
//!
//! The engines never own player, trade or ballot storage. They read and
//! request writes through these traits, re-reading at the start of every
//! workflow rather than trusting values captured by an earlier call.
//! Implementations are assumed synchronous and last-write-wins.

use crate::error::LedgerError;
use crate::types::{NewTrade, Player, PlayerId, Trade, TradeId, TradeStatus, UserId, Vote};

/// Read/write access to registered players
pub trait PlayerLedger {
    /// Resolve an id to the player's current record
    fn player(&self, id: &PlayerId) -> Option<Player>;

    /// Ids of every registered player
    fn player_ids(&self) -> Vec<PlayerId>;

    fn set_tokens(&mut self, id: &PlayerId, tokens: i64) -> Result<(), LedgerError>;

    fn set_inventory(&mut self, id: &PlayerId, inventory: String) -> Result<(), LedgerError>;

    fn set_current_name(&mut self, id: &PlayerId, name: String) -> Result<(), LedgerError>;

    fn set_published_name(&mut self, id: &PlayerId, name: Option<String>)
        -> Result<(), LedgerError>;
}

/// Storage for trades
pub trait TradeStore {
    /// Store a new trade awaiting its recipient
    fn create_trade(&mut self, trade: NewTrade) -> Result<Trade, LedgerError>;

    fn trade(&self, id: TradeId) -> Option<Trade>;

    fn set_trade_status(&mut self, id: TradeId, status: TradeStatus) -> Result<(), LedgerError>;

    fn set_trade_characters(
        &mut self,
        id: TradeId,
        offered_characters: String,
        requested_characters: String,
    ) -> Result<(), LedgerError>;
}

/// Storage for ranked ballots, one per voter
pub trait VoteStore {
    fn vote(&self, voter_id: &UserId) -> Option<Vote>;

    fn votes(&self) -> Vec<Vote>;

    /// Create or replace the voter's ballot
    fn save_vote(&mut self, vote: Vote) -> Result<(), LedgerError>;

    /// Remove the voter's ballot, returning it if there was one
    fn delete_vote(&mut self, voter_id: &UserId) -> Option<Vote>;

    /// Drop every ballot at a phase boundary
    fn reset_votes(&mut self);
}

/// The game phase as seen by the voting workflows
pub trait GamePhase {
    fn is_voting_open(&self) -> bool;
}

/// All-or-nothing grouping of ledger writes
pub trait Transactional {
    /// Run `f` against the ledger. If it returns `Err`, every write made
    /// inside `f` is rolled back before the error is returned.
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<LedgerError>;
}

/// Everything the engines need from a collaborator
pub trait Ledger: PlayerLedger + TradeStore + VoteStore + GamePhase + Transactional {}

impl<L> Ledger for L where L: PlayerLedger + TradeStore + VoteStore + GamePhase + Transactional {}

/// A player given either by id or by a (possibly stale) record
#[derive(Debug, Clone, Copy)]
pub enum PlayerRef<'a> {
    Id(&'a PlayerId),
    Player(&'a Player),
}

impl<'a> PlayerRef<'a> {
    pub fn id(&self) -> &'a PlayerId {
        match self {
            PlayerRef::Id(id) => id,
            PlayerRef::Player(player) => &player.id,
        }
    }
}

impl<'a> From<&'a PlayerId> for PlayerRef<'a> {
    fn from(id: &'a PlayerId) -> Self {
        PlayerRef::Id(id)
    }
}

impl<'a> From<&'a Player> for PlayerRef<'a> {
    fn from(player: &'a Player) -> Self {
        PlayerRef::Player(player)
    }
}

/// A trade given either by id or by a (possibly stale) record
#[derive(Debug, Clone, Copy)]
pub enum TradeRef<'a> {
    Id(TradeId),
    Trade(&'a Trade),
}

impl TradeRef<'_> {
    pub fn id(&self) -> TradeId {
        match self {
            TradeRef::Id(id) => *id,
            TradeRef::Trade(trade) => trade.id,
        }
    }
}

impl From<TradeId> for TradeRef<'_> {
    fn from(id: TradeId) -> Self {
        TradeRef::Id(id)
    }
}

impl<'a> From<&'a Trade> for TradeRef<'a> {
    fn from(trade: &'a Trade) -> Self {
        TradeRef::Trade(trade)
    }
}

/// Resolve a trade reference to the stored record, re-reading it by id
pub fn resolve_trade<S: TradeStore + ?Sized>(store: &S, trade: TradeRef<'_>) -> Option<Trade> {
    store.trade(trade.id())
}
