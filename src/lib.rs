//! Namesmith: character trading and ranked name voting
//!
//! Players hold an ordered multiset of characters that spells out their
//! display name. They trade characters with one another through a two-sided
//! negotiation, and at the end of a round rank each other's published names.
//! Every workflow returns a named [`Outcome`]; only collaborator faults come
//! back as errors.

pub mod activity;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod inventory;
pub mod ledger;
pub mod memory_ledger;
pub mod outcome;
pub mod players;
pub mod trade_engine;
pub mod traits;
pub mod types;
pub mod vote_engine;

pub use activity::{ActivityEntry, ActivityLog, ActivityType};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{Namesmith, NamesmithBuilder};
pub use error::{
    ConfigError, LedgerError, NamesmithError, SerializationError, ValidationError,
};
pub use hasher::{StateHash, StateHasher};
pub use inventory::CharacterDifferences;
pub use ledger::{
    GamePhase, Ledger, PlayerLedger, PlayerRef, TradeRef, TradeStore, Transactional, VoteStore,
};
pub use memory_ledger::{Checkpoint, LedgerState, MemoryLedger};
pub use outcome::{Outcome, UnexpectedFailure, WorkflowFailure};
pub use trade_engine::{
    InitiateTrade, InitiateTradeFailure, TradeAccepted, TradeDeclined, TradeEngine,
    TradeExchangeFailure, TradeInitiated, TradeModifiable, TradeModification, TradeModified,
    TradeResponse, TradeResponseFailure,
};
pub use traits::Validate;
pub use types::{NewTrade, Player, PlayerId, Rank, Trade, TradeId, TradeStatus, UserId, Vote};
pub use vote_engine::{
    ClearedVotes, MyVotes, VoteEngine, VoteName, VoteNameFailure, VoteNameSuccess,
};
