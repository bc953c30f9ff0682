//! Bilateral character trades
//!
//! A trade moves between two awaiting states until one side accepts or
//! declines it:
//!
//! ```text
//! AwaitingRecipient --accept(recipient)--> Accepted
//! AwaitingRecipient --decline(recipient)--> Declined
//! AwaitingRecipient --modify(recipient)--> AwaitingInitiator
//! AwaitingInitiator --accept(initiator)--> Accepted
//! AwaitingInitiator --decline(initiator)--> Declined
//! AwaitingInitiator --modify(initiator)--> AwaitingRecipient
//! ```
//!
//! Every response is checked in the same order: the actor is a player, the
//! trade exists, the trade is not terminal, the trade awaits this actor, and
//! finally both parties still hold what they would give. The first check that
//! fails decides the outcome.

use tracing::{debug, info};

use crate::activity::{ActivityEntry, ActivityLog, ActivityType};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::LedgerError;
use crate::inventory;
use crate::ledger::{resolve_trade, Ledger, PlayerRef, TradeRef};
use crate::outcome::{failed, Outcome, WorkflowFailure};
use crate::players::{are_same_players, require_player, resolve_player, transfer_characters};
use crate::types::{NewTrade, Player, PlayerId, Trade, TradeStatus};

/// Request to open a trade
#[derive(Debug, Clone, Copy)]
pub struct InitiateTrade<'a> {
    pub initiating_player: PlayerRef<'a>,
    pub recipient_player: PlayerRef<'a>,
    /// Characters the initiator would give
    pub offered_characters: &'a str,
    /// Characters the initiator wants in return
    pub requested_characters: &'a str,
}

/// A player answering a trade: accepting, declining or asking to modify it
#[derive(Debug, Clone, Copy)]
pub struct TradeResponse<'a> {
    pub player: PlayerRef<'a>,
    pub trade: TradeRef<'a>,
}

impl<'a> TradeResponse<'a> {
    pub fn new(player: impl Into<PlayerRef<'a>>, trade: impl Into<TradeRef<'a>>) -> Self {
        Self {
            player: player.into(),
            trade: trade.into(),
        }
    }
}

/// A counter-offer, in the modifying player's own terms
#[derive(Debug, Clone, Copy)]
pub struct TradeModification<'a> {
    pub player_modifying: PlayerRef<'a>,
    pub trade: TradeRef<'a>,
    /// What the modifying player would give
    pub characters_giving: &'a str,
    /// What the modifying player wants in return
    pub characters_receiving: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitiateTradeFailure {
    InitiatorNotAPlayer { id: PlayerId },
    RecipientNotAPlayer { id: PlayerId },
    TradeWithSelf { player: Player },
    MissingOfferedCharacters { player: Player, missing_characters: String },
    MissingRequestedCharacters { player: Player, missing_characters: String },
}

impl InitiateTradeFailure {
    pub fn is_initiator_not_a_player(&self) -> bool {
        matches!(self, Self::InitiatorNotAPlayer { .. })
    }

    pub fn is_recipient_not_a_player(&self) -> bool {
        matches!(self, Self::RecipientNotAPlayer { .. })
    }

    pub fn is_trade_with_self(&self) -> bool {
        matches!(self, Self::TradeWithSelf { .. })
    }

    pub fn is_missing_offered_characters(&self) -> bool {
        matches!(self, Self::MissingOfferedCharacters { .. })
    }

    pub fn is_missing_requested_characters(&self) -> bool {
        matches!(self, Self::MissingRequestedCharacters { .. })
    }
}

impl WorkflowFailure for InitiateTradeFailure {
    fn name(&self) -> &'static str {
        match self {
            Self::InitiatorNotAPlayer { .. } => "nonPlayerInitiatedTrade",
            Self::RecipientNotAPlayer { .. } => "tradeWithNonPlayer",
            Self::TradeWithSelf { .. } => "tradeBetweenSamePlayers",
            Self::MissingOfferedCharacters { .. } => "missingOfferedCharacters",
            Self::MissingRequestedCharacters { .. } => "missingRequestedCharacters",
        }
    }
}

/// Reasons a player may not respond to a trade
#[derive(Debug, Clone, PartialEq)]
pub enum TradeResponseFailure {
    NotAPlayer,
    TradeDoesNotExist,
    AlreadyRespondedTo { trade: Trade },
    AwaitingDifferentPlayer { player_awaiting: Player },
}

impl TradeResponseFailure {
    pub fn is_not_a_player(&self) -> bool {
        matches!(self, Self::NotAPlayer)
    }

    pub fn is_trade_does_not_exist(&self) -> bool {
        matches!(self, Self::TradeDoesNotExist)
    }

    pub fn is_already_responded_to(&self) -> bool {
        matches!(self, Self::AlreadyRespondedTo { .. })
    }

    pub fn is_awaiting_different_player(&self) -> bool {
        matches!(self, Self::AwaitingDifferentPlayer { .. })
    }
}

impl WorkflowFailure for TradeResponseFailure {
    fn name(&self) -> &'static str {
        match self {
            Self::NotAPlayer => "nonPlayerRespondedToTrade",
            Self::TradeDoesNotExist => "nonTradeRespondedTo",
            Self::AlreadyRespondedTo { .. } => "tradeAlreadyRespondedTo",
            Self::AwaitingDifferentPlayer { .. } => "tradeAwaitingDifferentPlayer",
        }
    }
}

/// Reasons an accept or a modification can fail
#[derive(Debug, Clone, PartialEq)]
pub enum TradeExchangeFailure {
    NotAPlayer,
    TradeDoesNotExist,
    AlreadyRespondedTo { trade: Trade },
    AwaitingDifferentPlayer { player_awaiting: Player },
    /// A party no longer holds what it would give; `missing_characters` is
    /// the exact shortfall, sorted
    PlayerMissingCharacters { player: Player, missing_characters: String },
}

impl TradeExchangeFailure {
    pub fn is_not_a_player(&self) -> bool {
        matches!(self, Self::NotAPlayer)
    }

    pub fn is_trade_does_not_exist(&self) -> bool {
        matches!(self, Self::TradeDoesNotExist)
    }

    pub fn is_already_responded_to(&self) -> bool {
        matches!(self, Self::AlreadyRespondedTo { .. })
    }

    pub fn is_awaiting_different_player(&self) -> bool {
        matches!(self, Self::AwaitingDifferentPlayer { .. })
    }

    pub fn is_player_missing_characters(&self) -> bool {
        matches!(self, Self::PlayerMissingCharacters { .. })
    }
}

impl WorkflowFailure for TradeExchangeFailure {
    fn name(&self) -> &'static str {
        match self {
            Self::NotAPlayer => "nonPlayerRespondedToTrade",
            Self::TradeDoesNotExist => "nonTradeRespondedTo",
            Self::AlreadyRespondedTo { .. } => "tradeAlreadyRespondedTo",
            Self::AwaitingDifferentPlayer { .. } => "tradeAwaitingDifferentPlayer",
            Self::PlayerMissingCharacters { .. } => "playerMissingCharacters",
        }
    }
}

impl From<TradeResponseFailure> for TradeExchangeFailure {
    fn from(failure: TradeResponseFailure) -> Self {
        match failure {
            TradeResponseFailure::NotAPlayer => Self::NotAPlayer,
            TradeResponseFailure::TradeDoesNotExist => Self::TradeDoesNotExist,
            TradeResponseFailure::AlreadyRespondedTo { trade } => Self::AlreadyRespondedTo { trade },
            TradeResponseFailure::AwaitingDifferentPlayer { player_awaiting } => {
                Self::AwaitingDifferentPlayer { player_awaiting }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeInitiated {
    pub trade: Trade,
    pub initiating_player: Player,
    pub recipient_player: Player,
}

/// An accepted trade with both parties as they are after the exchange
#[derive(Debug, Clone, PartialEq)]
pub struct TradeAccepted {
    pub trade: Trade,
    pub initiating_player: Player,
    pub recipient_player: Player,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeDeclined {
    pub trade: Trade,
    pub player_declining: Player,
    /// The party whose standing offer was turned down
    pub player_declined: Player,
}

/// A trade the player may modify, and the party they would be countering
#[derive(Debug, Clone, PartialEq)]
pub struct TradeModifiable {
    pub trade: Trade,
    pub player_modifying: Player,
    pub other_player: Player,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeModified {
    pub trade: Trade,
    pub player_modifying: Player,
    /// The party now awaited
    pub other_player: Player,
}

/// Runs trade workflows against a ledger
pub struct TradeEngine<'a, L: Ledger> {
    ledger: &'a mut L,
    config: &'a EngineConfig,
    activity: &'a mut ActivityLog,
    clock: &'a dyn Clock,
}

impl<'a, L: Ledger> TradeEngine<'a, L> {
    pub fn new(
        ledger: &'a mut L,
        config: &'a EngineConfig,
        activity: &'a mut ActivityLog,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            ledger,
            config,
            activity,
            clock,
        }
    }

    /// Open a trade awaiting the recipient
    ///
    /// # Arguments
    /// * `request` - Both players and the characters each side would give
    ///
    /// # Returns
    /// The stored trade with both players, or the first failing check. Nothing
    /// is written on failure.
    pub fn initiate_trade(
        &mut self,
        request: InitiateTrade<'_>,
    ) -> Result<Outcome<TradeInitiated, InitiateTradeFailure>, LedgerError> {
        const WORKFLOW: &str = "initiateTrade";

        let Some(initiating_player) = resolve_player(&*self.ledger, request.initiating_player) else {
            return Ok(failed(
                WORKFLOW,
                InitiateTradeFailure::InitiatorNotAPlayer {
                    id: request.initiating_player.id().clone(),
                },
            ));
        };
        let Some(recipient_player) = resolve_player(&*self.ledger, request.recipient_player) else {
            return Ok(failed(
                WORKFLOW,
                InitiateTradeFailure::RecipientNotAPlayer {
                    id: request.recipient_player.id().clone(),
                },
            ));
        };

        if are_same_players(request.initiating_player, request.recipient_player) {
            return Ok(failed(
                WORKFLOW,
                InitiateTradeFailure::TradeWithSelf {
                    player: initiating_player,
                },
            ));
        }

        if let Some(missing_characters) = shortfall(&initiating_player, request.offered_characters) {
            return Ok(failed(
                WORKFLOW,
                InitiateTradeFailure::MissingOfferedCharacters {
                    player: initiating_player,
                    missing_characters,
                },
            ));
        }
        if let Some(missing_characters) = shortfall(&recipient_player, request.requested_characters) {
            return Ok(failed(
                WORKFLOW,
                InitiateTradeFailure::MissingRequestedCharacters {
                    player: recipient_player,
                    missing_characters,
                },
            ));
        }

        let trade = self.ledger.create_trade(NewTrade {
            initiating_player_id: initiating_player.id.clone(),
            recipient_player_id: recipient_player.id.clone(),
            offered_characters: request.offered_characters.to_string(),
            requested_characters: request.requested_characters.to_string(),
        })?;

        info!(
            trade = %trade.id,
            initiator = %initiating_player.id,
            recipient = %recipient_player.id,
            "Trade initiated"
        );
        self.record(
            ActivityEntry::new(
                ActivityType::InitiateTrade,
                self.clock.now(),
                initiating_player.id.clone(),
            )
            .with_involved_player(recipient_player.id.clone())
            .with_trade(trade.id),
        );

        Ok(Outcome::Success(TradeInitiated {
            trade,
            initiating_player,
            recipient_player,
        }))
    }

    /// Accept a trade, exchanging both sides' characters in one transaction
    ///
    /// # Arguments
    /// * `request` - The accepting player and the trade, both re-read by id
    ///
    /// # Returns
    /// The accepted trade and both players after the exchange. A shortfall is
    /// reported as `PlayerMissingCharacters` before anything moves. A ledger
    /// fault inside the transaction rolls it back and comes back as `Err`.
    pub fn accept_trade(
        &mut self,
        request: TradeResponse<'_>,
    ) -> Result<Outcome<TradeAccepted, TradeExchangeFailure>, LedgerError> {
        const WORKFLOW: &str = "acceptTrade";

        let responding = match self.check_response(request)? {
            Outcome::Success(responding) => responding,
            Outcome::Failure(failure) => return Ok(failed(WORKFLOW, failure.into())),
        };
        let pending = responding.trade;

        if let Some(failure) =
            self.exchange_shortfall(&pending.initiating_player_id, &pending.offered_characters)?
        {
            return Ok(failed(WORKFLOW, failure));
        }
        if let Some(failure) =
            self.exchange_shortfall(&pending.recipient_player_id, &pending.requested_characters)?
        {
            return Ok(failed(WORKFLOW, failure));
        }

        let max_name_length = self.config.max_name_length;
        let (trade, recipient_player, initiating_player) =
            self.ledger.atomically(|ledger| -> Result<_, LedgerError> {
                transfer_characters(
                    ledger,
                    PlayerRef::Id(&pending.initiating_player_id),
                    PlayerRef::Id(&pending.recipient_player_id),
                    &pending.offered_characters,
                    max_name_length,
                )?;
                let (recipient, initiator) = transfer_characters(
                    ledger,
                    PlayerRef::Id(&pending.recipient_player_id),
                    PlayerRef::Id(&pending.initiating_player_id),
                    &pending.requested_characters,
                    max_name_length,
                )?;
                ledger.set_trade_status(pending.id, TradeStatus::Accepted)?;
                let accepted = ledger
                    .trade(pending.id)
                    .ok_or(LedgerError::TradeNotFound { id: pending.id })?;
                Ok((accepted, recipient, initiator))
            })?;

        info!(
            trade = %trade.id,
            accepted_by = %responding.player.id,
            offered = %trade.offered_characters,
            requested = %trade.requested_characters,
            "Trade accepted"
        );

        let (gained, lost) = if responding.player.id == trade.recipient_player_id {
            (&trade.offered_characters, &trade.requested_characters)
        } else {
            (&trade.requested_characters, &trade.offered_characters)
        };
        let entry = ActivityEntry::new(
            ActivityType::AcceptTrade,
            self.clock.now(),
            responding.player.id.clone(),
        )
        .with_involved_player(responding.counterparty.id.clone())
        .with_trade(trade.id)
        .with_characters(gained, lost);
        self.record(entry);

        Ok(Outcome::Success(TradeAccepted {
            trade,
            initiating_player,
            recipient_player,
        }))
    }

    /// Decline a trade; no characters move
    ///
    /// # Returns
    /// The declined trade with the declining player and the player declined.
    pub fn decline_trade(
        &mut self,
        request: TradeResponse<'_>,
    ) -> Result<Outcome<TradeDeclined, TradeResponseFailure>, LedgerError> {
        let responding = match self.check_response(request)? {
            Outcome::Success(responding) => responding,
            Outcome::Failure(failure) => return Ok(failed("declineTrade", failure)),
        };
        let trade_id = responding.trade.id;

        self.ledger.set_trade_status(trade_id, TradeStatus::Declined)?;
        let trade = self
            .ledger
            .trade(trade_id)
            .ok_or(LedgerError::TradeNotFound { id: trade_id })?;

        info!(trade = %trade_id, declined_by = %responding.player.id, "Trade declined");
        self.record(
            ActivityEntry::new(
                ActivityType::DeclineTrade,
                self.clock.now(),
                responding.player.id.clone(),
            )
            .with_involved_player(responding.counterparty.id.clone())
            .with_trade(trade_id),
        );

        Ok(Outcome::Success(TradeDeclined {
            trade,
            player_declining: responding.player,
            player_declined: responding.counterparty,
        }))
    }

    /// First phase of a modification: may this player counter the trade now?
    ///
    /// Read-only.
    ///
    /// # Arguments
    /// * `request` - The player who wants to counter and the trade
    ///
    /// # Returns
    /// The trade with the modifying player and the other side, or the same
    /// failures `decline_trade` reports.
    pub fn check_if_player_can_modify_trade(
        &self,
        request: TradeResponse<'_>,
    ) -> Result<Outcome<TradeModifiable, TradeResponseFailure>, LedgerError> {
        Ok(match self.check_response(request)? {
            Outcome::Success(responding) => Outcome::Success(TradeModifiable {
                trade: responding.trade,
                player_modifying: responding.player,
                other_player: responding.counterparty,
            }),
            Outcome::Failure(failure) => failed("checkIfPlayerCanModifyTrade", failure),
        })
    }

    /// Replace the trade's terms with a counter-offer and hand it to the other side
    ///
    /// # Arguments
    /// * `request` - The modifying player, the trade, and the characters that
    ///   player would give and receive
    ///
    /// # Returns
    /// The trade with its new terms, now awaiting the other player.
    pub fn modify_trade(
        &mut self,
        request: TradeModification<'_>,
    ) -> Result<Outcome<TradeModified, TradeExchangeFailure>, LedgerError> {
        const WORKFLOW: &str = "modifyTrade";

        let response = TradeResponse {
            player: request.player_modifying,
            trade: request.trade,
        };
        let responding = match self.check_response(response)? {
            Outcome::Success(responding) => responding,
            Outcome::Failure(failure) => return Ok(failed(WORKFLOW, failure.into())),
        };
        let pending = responding.trade;

        // Offered always flows initiator -> recipient, whoever is modifying
        let status = pending.status;
        let (offered, requested, next_status) = match status {
            TradeStatus::AwaitingRecipient => (
                request.characters_receiving,
                request.characters_giving,
                TradeStatus::AwaitingInitiator,
            ),
            TradeStatus::AwaitingInitiator => (
                request.characters_giving,
                request.characters_receiving,
                TradeStatus::AwaitingRecipient,
            ),
            TradeStatus::Accepted | TradeStatus::Declined => {
                return Ok(failed(
                    WORKFLOW,
                    TradeExchangeFailure::AlreadyRespondedTo { trade: pending },
                ))
            }
        };

        if let Some(failure) = self.exchange_shortfall(&pending.initiating_player_id, offered)? {
            return Ok(failed(WORKFLOW, failure));
        }
        if let Some(failure) = self.exchange_shortfall(&pending.recipient_player_id, requested)? {
            return Ok(failed(WORKFLOW, failure));
        }

        let trade_id = pending.id;
        let trade = self.ledger.atomically(|ledger| -> Result<_, LedgerError> {
            ledger.set_trade_characters(trade_id, offered.to_string(), requested.to_string())?;
            ledger.set_trade_status(trade_id, next_status)?;
            ledger
                .trade(trade_id)
                .ok_or(LedgerError::TradeNotFound { id: trade_id })
        })?;

        info!(
            trade = %trade_id,
            modified_by = %responding.player.id,
            offered,
            requested,
            status = %next_status,
            "Trade modified"
        );
        self.record(
            ActivityEntry::new(
                ActivityType::ModifyTrade,
                self.clock.now(),
                responding.player.id.clone(),
            )
            .with_involved_player(responding.counterparty.id.clone())
            .with_trade(trade_id),
        );

        Ok(Outcome::Success(TradeModified {
            trade,
            player_modifying: responding.player,
            other_player: responding.counterparty,
        }))
    }

    /// The checks every response shares, in order
    fn check_response(
        &self,
        request: TradeResponse<'_>,
    ) -> Result<Outcome<Responding, TradeResponseFailure>, LedgerError> {
        let ledger = &*self.ledger;

        let Some(player) = resolve_player(ledger, request.player) else {
            return Ok(Outcome::Failure(TradeResponseFailure::NotAPlayer));
        };
        let Some(trade) = resolve_trade(ledger, request.trade) else {
            return Ok(Outcome::Failure(TradeResponseFailure::TradeDoesNotExist));
        };

        let Some(awaiting_id) = trade.awaiting_player_id().cloned() else {
            return Ok(Outcome::Failure(TradeResponseFailure::AlreadyRespondedTo { trade }));
        };
        if awaiting_id != player.id {
            let player_awaiting = require_player(ledger, (&awaiting_id).into())?;
            debug!(
                trade = %trade.id,
                responder = %player.id,
                awaiting = %player_awaiting.id,
                "Response from a player the trade is not awaiting"
            );
            return Ok(Outcome::Failure(TradeResponseFailure::AwaitingDifferentPlayer {
                player_awaiting,
            }));
        }

        let counterparty_id = if player.id == trade.initiating_player_id {
            &trade.recipient_player_id
        } else {
            &trade.initiating_player_id
        };
        let counterparty = require_player(ledger, counterparty_id.into())?;

        Ok(Outcome::Success(Responding {
            player,
            counterparty,
            trade,
        }))
    }

    fn exchange_shortfall(
        &self,
        player_id: &PlayerId,
        characters: &str,
    ) -> Result<Option<TradeExchangeFailure>, LedgerError> {
        let player = require_player(&*self.ledger, player_id.into())?;
        Ok(shortfall(&player, characters).map(|missing_characters| {
            TradeExchangeFailure::PlayerMissingCharacters {
                player,
                missing_characters,
            }
        }))
    }

    fn record(&mut self, entry: ActivityEntry) {
        if self.config.record_activity {
            self.activity.record(entry);
        }
    }
}

/// A validated responder: the awaited player, the other party and the trade
struct Responding {
    player: Player,
    counterparty: Player,
    trade: Trade,
}

/// Characters `player` lacks to give `characters`, if any
fn shortfall(player: &Player, characters: &str) -> Option<String> {
    if inventory::has_characters(&player.inventory, characters) {
        return None;
    }
    Some(inventory::character_differences(characters, &player.inventory).missing)
}
