//! Entry point tying a ledger, configuration, clock and activity log together

use std::convert::Infallible;

use tracing::debug;

use crate::activity::ActivityLog;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{ConfigError, LedgerError};
use crate::ledger::Ledger;
use crate::outcome::Outcome;
use crate::trade_engine::{
    InitiateTrade, InitiateTradeFailure, TradeAccepted, TradeDeclined, TradeEngine,
    TradeExchangeFailure, TradeInitiated, TradeModifiable, TradeModification, TradeModified,
    TradeResponse, TradeResponseFailure,
};
use crate::types::UserId;
use crate::vote_engine::{ClearedVotes, MyVotes, VoteEngine, VoteName, VoteNameFailure, VoteNameSuccess};

/// The trading and voting engine over one ledger
pub struct Namesmith<L: Ledger> {
    ledger: L,
    config: EngineConfig,
    activity: ActivityLog,
    clock: Box<dyn Clock>,
}

impl<L: Ledger> Namesmith<L> {
    /// Create an engine with the default config and the system clock
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            config: EngineConfig::default(),
            activity: ActivityLog::new(),
            clock: Box::new(SystemClock),
        }
    }

    pub fn builder() -> NamesmithBuilder<L> {
        NamesmithBuilder::new()
    }

    /// Trade workflows, borrowing this engine's state
    pub fn trades(&mut self) -> TradeEngine<'_, L> {
        TradeEngine::new(
            &mut self.ledger,
            &self.config,
            &mut self.activity,
            self.clock.as_ref(),
        )
    }

    /// Ballot workflows, borrowing this engine's ledger
    pub fn votes(&mut self) -> VoteEngine<'_, L> {
        VoteEngine::new(&mut self.ledger)
    }

    pub fn initiate_trade(
        &mut self,
        request: InitiateTrade<'_>,
    ) -> Result<Outcome<TradeInitiated, InitiateTradeFailure>, LedgerError> {
        self.trades().initiate_trade(request)
    }

    pub fn accept_trade(
        &mut self,
        request: TradeResponse<'_>,
    ) -> Result<Outcome<TradeAccepted, TradeExchangeFailure>, LedgerError> {
        self.trades().accept_trade(request)
    }

    pub fn decline_trade(
        &mut self,
        request: TradeResponse<'_>,
    ) -> Result<Outcome<TradeDeclined, TradeResponseFailure>, LedgerError> {
        self.trades().decline_trade(request)
    }

    pub fn check_if_player_can_modify_trade(
        &mut self,
        request: TradeResponse<'_>,
    ) -> Result<Outcome<TradeModifiable, TradeResponseFailure>, LedgerError> {
        self.trades().check_if_player_can_modify_trade(request)
    }

    pub fn modify_trade(
        &mut self,
        request: TradeModification<'_>,
    ) -> Result<Outcome<TradeModified, TradeExchangeFailure>, LedgerError> {
        self.trades().modify_trade(request)
    }

    pub fn vote_name(
        &mut self,
        request: VoteName<'_>,
    ) -> Result<Outcome<VoteNameSuccess, VoteNameFailure>, LedgerError> {
        self.votes().vote_name(request)
    }

    pub fn see_my_votes(&mut self, voter: &UserId) -> Outcome<MyVotes, Infallible> {
        self.votes().see_my_votes(voter)
    }

    pub fn clear_my_votes(&mut self, voter: &UserId) -> Outcome<ClearedVotes, Infallible> {
        self.votes().clear_my_votes(voter)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for collaborator-driven changes, such as
    /// registering players or moving between game phases
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_ledger(self) -> L {
        self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn activity_mut(&mut self) -> &mut ActivityLog {
        &mut self.activity
    }
}

/// Builder for [`Namesmith`]
pub struct NamesmithBuilder<L: Ledger> {
    ledger: Option<L>,
    config: Option<EngineConfig>,
    clock: Option<Box<dyn Clock>>,
    activity: Option<ActivityLog>,
}

impl<L: Ledger> NamesmithBuilder<L> {
    pub fn new() -> Self {
        Self {
            ledger: None,
            config: None,
            clock: None,
            activity: None,
        }
    }

    pub fn with_ledger(mut self, ledger: L) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Continue an existing activity log instead of starting an empty one
    pub fn with_activity_log(mut self, activity: ActivityLog) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Build the engine. A ledger is required; everything else has a default.
    pub fn build(self) -> Result<Namesmith<L>, ConfigError> {
        let ledger = self.ledger.ok_or_else(|| ConfigError::MissingComponent {
            component: "ledger".to_string(),
        })?;

        let config = self.config.unwrap_or_default();
        config.validate()?;
        debug!(
            max_name_length = config.max_name_length,
            record_activity = config.record_activity,
            "Building engine"
        );

        Ok(Namesmith {
            ledger,
            config,
            activity: self.activity.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
        })
    }
}

impl<L: Ledger> Default for NamesmithBuilder<L> {
    fn default() -> Self {
        Self::new()
    }
}
