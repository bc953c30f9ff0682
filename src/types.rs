//! Core data types for players, trades and ballots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::ValidationError;
use crate::traits::Validate;

/// Identity of a user of the platform, who may or may not be a registered player
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identity of a registered player
pub type PlayerId = UserId;

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A preference slot in a ranked vote. Ordered FIRST < SECOND < THIRD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    First,
    Second,
    Third,
}

impl Rank {
    /// Every rank, in preference order
    pub const ALL: [Rank; 3] = [Rank::First, Rank::Second, Rank::Third];
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rank::First => "1st",
            Rank::Second => "2nd",
            Rank::Third => "3rd",
        };
        write!(f, "{}", label)
    }
}

/// A registered player of the name-building game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Display name built from held characters
    pub current_name: String,
    /// Name finalized for voting, if any
    pub published_name: Option<String>,
    pub tokens: i64,
    /// Held characters, in the order they were received
    pub inventory: String,
    pub role: Option<String>,
    pub perks: BTreeSet<String>,
    pub last_claimed_refill_time: Option<DateTime<Utc>>,
}

impl Player {
    /// Create a player with an empty inventory and name
    pub fn new(id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            current_name: String::new(),
            published_name: None,
            tokens: 0,
            inventory: String::new(),
            role: None,
            perks: BTreeSet::new(),
            last_claimed_refill_time: None,
        }
    }

    pub fn with_inventory(mut self, inventory: impl Into<String>) -> Self {
        self.inventory = inventory.into();
        self
    }

    pub fn with_current_name(mut self, name: impl Into<String>) -> Self {
        self.current_name = name.into();
        self
    }

    pub fn with_published_name(mut self, name: impl Into<String>) -> Self {
        self.published_name = Some(name.into());
        self
    }

    pub fn with_tokens(mut self, tokens: i64) -> Self {
        self.tokens = tokens;
        self
    }
}

/// Negotiation state of a trade. ACCEPTED and DECLINED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeStatus {
    AwaitingRecipient,
    AwaitingInitiator,
    Accepted,
    Declined,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeStatus::Accepted | TradeStatus::Declined)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeStatus::AwaitingRecipient => "awaiting recipient",
            TradeStatus::AwaitingInitiator => "awaiting initiator",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Declined => "declined",
        };
        write!(f, "{}", label)
    }
}

/// A bilateral exchange of characters between two players
///
/// `offered_characters` always flow initiator -> recipient and
/// `requested_characters` always flow recipient -> initiator, whichever side
/// made the latest counter-offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub initiating_player_id: PlayerId,
    pub recipient_player_id: PlayerId,
    pub offered_characters: String,
    pub requested_characters: String,
    pub status: TradeStatus,
}

impl Trade {
    /// The player whose response the trade is waiting on, or `None` once terminal
    pub fn awaiting_player_id(&self) -> Option<&PlayerId> {
        match self.status {
            TradeStatus::AwaitingRecipient => Some(&self.recipient_player_id),
            TradeStatus::AwaitingInitiator => Some(&self.initiating_player_id),
            TradeStatus::Accepted | TradeStatus::Declined => None,
        }
    }

    /// The player who made the standing offer, or `None` once terminal
    pub fn waiting_player_id(&self) -> Option<&PlayerId> {
        match self.status {
            TradeStatus::AwaitingRecipient => Some(&self.initiating_player_id),
            TradeStatus::AwaitingInitiator => Some(&self.recipient_player_id),
            TradeStatus::Accepted | TradeStatus::Declined => None,
        }
    }
}

impl Validate for Trade {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.initiating_player_id == self.recipient_player_id {
            return Err(ValidationError::SelfTrade {
                id: self.id,
                player: self.initiating_player_id.clone(),
            });
        }
        Ok(())
    }
}

/// Fields needed to open a new trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrade {
    pub initiating_player_id: PlayerId,
    pub recipient_player_id: PlayerId,
    pub offered_characters: String,
    pub requested_characters: String,
}

/// One voter's ranked ballot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: UserId,
    pub voted_first_player_id: Option<PlayerId>,
    pub voted_second_player_id: Option<PlayerId>,
    pub voted_third_player_id: Option<PlayerId>,
}

impl Vote {
    /// Create an empty ballot
    pub fn new(voter_id: impl Into<UserId>) -> Self {
        Self {
            voter_id: voter_id.into(),
            voted_first_player_id: None,
            voted_second_player_id: None,
            voted_third_player_id: None,
        }
    }

    pub fn slot(&self, rank: Rank) -> Option<&PlayerId> {
        match rank {
            Rank::First => self.voted_first_player_id.as_ref(),
            Rank::Second => self.voted_second_player_id.as_ref(),
            Rank::Third => self.voted_third_player_id.as_ref(),
        }
    }

    pub fn set_slot(&mut self, rank: Rank, player_id: Option<PlayerId>) {
        match rank {
            Rank::First => self.voted_first_player_id = player_id,
            Rank::Second => self.voted_second_player_id = player_id,
            Rank::Third => self.voted_third_player_id = player_id,
        }
    }

    /// Filled ranks mapped to the player in each
    pub fn ranks(&self) -> BTreeMap<Rank, PlayerId> {
        Rank::ALL
            .iter()
            .filter_map(|rank| self.slot(*rank).map(|id| (*rank, id.clone())))
            .collect()
    }

    pub fn filled_ranks(&self) -> BTreeSet<Rank> {
        Rank::ALL.iter().copied().filter(|rank| self.slot(*rank).is_some()).collect()
    }

    pub fn missing_ranks(&self) -> BTreeSet<Rank> {
        Rank::ALL.iter().copied().filter(|rank| self.slot(*rank).is_none()).collect()
    }

    /// The rank a player occupies on this ballot, if any
    pub fn rank_of(&self, player_id: &PlayerId) -> Option<Rank> {
        Rank::ALL
            .iter()
            .copied()
            .find(|rank| self.slot(*rank) == Some(player_id))
    }

    pub fn is_empty(&self) -> bool {
        self.filled_ranks().is_empty()
    }

    /// Whether the filled ranks form an unbroken run starting at FIRST
    pub fn is_prefix_closed(&self) -> bool {
        let filled = self.filled_ranks();
        Rank::ALL.iter().take(filled.len()).all(|rank| filled.contains(rank))
    }
}

impl Validate for Vote {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.is_prefix_closed() {
            let filled = self.filled_ranks();
            let highest = filled.iter().next_back().copied();
            let missing = Rank::ALL
                .iter()
                .filter(|rank| Some(**rank) < highest && !filled.contains(rank))
                .map(|rank| rank.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ValidationError::BallotGap {
                voter: self.voter_id.clone(),
                missing,
            });
        }

        let mut seen = BTreeSet::new();
        for player_id in self.ranks().values() {
            if !seen.insert(player_id) {
                return Err(ValidationError::DuplicateSeat {
                    voter: self.voter_id.clone(),
                    player: player_id.clone(),
                });
            }
        }
        Ok(())
    }
}
