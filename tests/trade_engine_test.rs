//! Integration tests for trade negotiation and character exchange

use chrono::{TimeZone, Utc};
use namesmith::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn alice() -> PlayerId {
    PlayerId::new("alice")
}

fn bob() -> PlayerId {
    PlayerId::new("bob")
}

fn ledger() -> MemoryLedger {
    let mut ledger = MemoryLedger::new();
    ledger.add_player(
        Player::new("alice")
            .with_inventory("Bbbdoevr")
            .with_current_name("Bobber"),
    );
    ledger.add_player(
        Player::new("bob")
            .with_inventory("Xxxxyzander")
            .with_current_name("Xander"),
    );
    ledger
}

fn engine_with(ledger: MemoryLedger, config: EngineConfig) -> Namesmith<MemoryLedger> {
    Namesmith::builder()
        .with_ledger(ledger)
        .with_config(config)
        .with_clock(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()))
        .build()
        .unwrap()
}

fn engine() -> Namesmith<MemoryLedger> {
    engine_with(ledger(), EngineConfig::default())
}

fn open_trade(engine: &mut Namesmith<MemoryLedger>, offered: &str, requested: &str) -> Trade {
    let (a, b) = (alice(), bob());
    engine
        .initiate_trade(InitiateTrade {
            initiating_player: (&a).into(),
            recipient_player: (&b).into(),
            offered_characters: offered,
            requested_characters: requested,
        })
        .unwrap()
        .into_success()
        .unwrap()
        .trade
}

fn player(engine: &Namesmith<MemoryLedger>, id: &PlayerId) -> Player {
    engine.ledger().player(id).unwrap()
}

#[test]
fn test_accept_moves_characters_both_ways() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    assert_eq!(trade.status, TradeStatus::AwaitingRecipient);

    let b = bob();
    let accepted = engine
        .accept_trade(TradeResponse::new(&b, trade.id))
        .unwrap()
        .into_success()
        .unwrap();

    assert_eq!(accepted.trade.status, TradeStatus::Accepted);
    assert_eq!(accepted.initiating_player.inventory, "BbdoXx");
    assert_eq!(accepted.initiating_player.current_name, "BobXx");
    assert_eq!(accepted.recipient_player.inventory, "xxyzanderberv");
    assert_eq!(accepted.recipient_player.current_name, "anderberv");

    assert_eq!(player(&engine, &alice()), accepted.initiating_player);
    assert_eq!(player(&engine, &bob()), accepted.recipient_player);
}

#[test]
fn test_second_accept_reports_already_responded() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let b = bob();

    let first = engine.accept_trade(TradeResponse::new(&b, trade.id)).unwrap();
    assert!(first.is_success());
    let after_first = engine.ledger().state().clone();

    let second = engine.accept_trade(TradeResponse::new(&b, trade.id)).unwrap();
    let failure = second.failure().unwrap();
    assert!(failure.is_already_responded_to());
    assert_eq!(failure.name(), "tradeAlreadyRespondedTo");
    assert_eq!(engine.ledger().state().players, after_first.players);
}

#[test]
fn test_initiator_cannot_accept_own_offer() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let a = alice();

    let outcome = engine.accept_trade(TradeResponse::new(&a, trade.id)).unwrap();
    match outcome {
        Outcome::Failure(TradeExchangeFailure::AwaitingDifferentPlayer { player_awaiting }) => {
            assert_eq!(player_awaiting.id, bob());
        }
        other => panic!("expected awaiting different player, got {:?}", other),
    }
    assert_eq!(player(&engine, &alice()).inventory, "Bbbdoevr");
}

#[test]
fn test_uninvolved_player_gets_awaiting_different_player() {
    let mut engine = engine();
    engine
        .ledger_mut()
        .add_player(Player::new("carol").with_inventory("Xxberv"));
    let trade = open_trade(&mut engine, "berv", "Xx");
    let carol = PlayerId::new("carol");

    match engine.accept_trade(TradeResponse::new(&carol, trade.id)).unwrap() {
        Outcome::Failure(TradeExchangeFailure::AwaitingDifferentPlayer { player_awaiting }) => {
            assert_eq!(player_awaiting.id, bob());
        }
        other => panic!("expected awaiting different player, got {:?}", other),
    }

    match engine.decline_trade(TradeResponse::new(&carol, trade.id)).unwrap() {
        Outcome::Failure(TradeResponseFailure::AwaitingDifferentPlayer { player_awaiting }) => {
            assert_eq!(player_awaiting.id, bob());
        }
        other => panic!("expected awaiting different player, got {:?}", other),
    }

    match engine
        .check_if_player_can_modify_trade(TradeResponse::new(&carol, trade.id))
        .unwrap()
    {
        Outcome::Failure(TradeResponseFailure::AwaitingDifferentPlayer { player_awaiting }) => {
            assert_eq!(player_awaiting.id, bob());
        }
        other => panic!("expected awaiting different player, got {:?}", other),
    }

    let outcome = engine
        .modify_trade(TradeModification {
            player_modifying: (&carol).into(),
            trade: trade.id.into(),
            characters_giving: "X",
            characters_receiving: "b",
        })
        .unwrap();
    assert!(outcome.failure().unwrap().is_awaiting_different_player());

    assert_eq!(player(&engine, &alice()).inventory, "Bbbdoevr");
    assert_eq!(player(&engine, &bob()).inventory, "Xxxxyzander");
    assert_eq!(player(&engine, &carol).inventory, "Xxberv");
    assert_eq!(
        engine.ledger().trade(trade.id).unwrap().status,
        TradeStatus::AwaitingRecipient
    );
}

#[test]
fn test_decline_after_accept_reports_already_responded() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let b = bob();
    assert!(engine
        .accept_trade(TradeResponse::new(&b, trade.id))
        .unwrap()
        .is_success());

    let outcome = engine.decline_trade(TradeResponse::new(&b, trade.id)).unwrap();
    match outcome.failure() {
        Some(TradeResponseFailure::AlreadyRespondedTo { trade }) => {
            assert_eq!(trade.status, TradeStatus::Accepted);
        }
        other => panic!("expected already responded, got {:?}", other),
    }
}

#[test]
fn test_decline_names_the_declined_player() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let b = bob();

    let declined = engine
        .decline_trade(TradeResponse::new(&b, trade.id))
        .unwrap()
        .into_success()
        .unwrap();

    assert_eq!(declined.trade.status, TradeStatus::Declined);
    assert_eq!(declined.player_declining.id, bob());
    assert_eq!(declined.player_declined.id, alice());
    assert_eq!(player(&engine, &alice()).inventory, "Bbbdoevr");
    assert_eq!(player(&engine, &bob()).inventory, "Xxxxyzander");
}

#[test]
fn test_stale_trade_record_is_reread() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let b = bob();
    assert!(engine
        .decline_trade(TradeResponse::new(&b, &trade))
        .unwrap()
        .is_success());

    // `trade` still says AwaitingRecipient
    let outcome = engine.accept_trade(TradeResponse::new(&b, &trade)).unwrap();
    assert_eq!(outcome.kind(), "tradeAlreadyRespondedTo");
}

#[test]
fn test_response_validation_order() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let stranger = PlayerId::new("mallory");
    let b = bob();

    let outcome = engine.accept_trade(TradeResponse::new(&stranger, TradeId(404))).unwrap();
    assert!(outcome.failure().unwrap().is_not_a_player());

    let outcome = engine.accept_trade(TradeResponse::new(&b, TradeId(404))).unwrap();
    assert!(outcome.failure().unwrap().is_trade_does_not_exist());

    let outcome = engine.accept_trade(TradeResponse::new(&stranger, trade.id)).unwrap();
    assert!(outcome.failure().unwrap().is_not_a_player());
}

#[test]
fn test_accept_reports_exact_missing_characters() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    engine
        .ledger_mut()
        .set_inventory(&alice(), "Bdov".to_string())
        .unwrap();

    let b = bob();
    let outcome = engine.accept_trade(TradeResponse::new(&b, trade.id)).unwrap();
    match outcome.failure() {
        Some(TradeExchangeFailure::PlayerMissingCharacters {
            player,
            missing_characters,
        }) => {
            assert_eq!(player.id, alice());
            assert_eq!(missing_characters, "ber");
        }
        other => panic!("expected missing characters, got {:?}", other),
    }

    let stored = engine.ledger().trade(trade.id).unwrap();
    assert_eq!(stored.status, TradeStatus::AwaitingRecipient);
    assert_eq!(player(&engine, &bob()).inventory, "Xxxxyzander");
}

#[test]
fn test_initiate_failures_in_order() {
    let mut engine = engine();
    let (a, b, stranger) = (alice(), bob(), PlayerId::new("mallory"));
    let mut initiate = |from: &PlayerId, to: &PlayerId, offered: &str, requested: &str| {
        engine
            .initiate_trade(InitiateTrade {
                initiating_player: from.into(),
                recipient_player: to.into(),
                offered_characters: offered,
                requested_characters: requested,
            })
            .unwrap()
    };

    let outcome = initiate(&stranger, &stranger, "zz", "zz");
    assert!(outcome.failure().unwrap().is_initiator_not_a_player());

    let outcome = initiate(&a, &stranger, "zz", "zz");
    assert!(outcome.failure().unwrap().is_recipient_not_a_player());

    let outcome = initiate(&a, &a, "zz", "zz");
    assert!(outcome.failure().unwrap().is_trade_with_self());

    let outcome = initiate(&a, &b, "bbbz", "qq");
    match outcome.failure() {
        Some(InitiateTradeFailure::MissingOfferedCharacters {
            player,
            missing_characters,
        }) => {
            assert_eq!(player.id, alice());
            assert_eq!(missing_characters, "bz");
        }
        other => panic!("expected missing offered characters, got {:?}", other),
    }

    let outcome = initiate(&a, &b, "b", "qq");
    match outcome.failure() {
        Some(InitiateTradeFailure::MissingRequestedCharacters {
            player,
            missing_characters,
        }) => {
            assert_eq!(player.id, bob());
            assert_eq!(missing_characters, "qq");
        }
        other => panic!("expected missing requested characters, got {:?}", other),
    }

    assert!(engine.ledger().state().trades.is_empty());
}

#[test]
fn test_initiate_returns_both_players() {
    let mut engine = engine();
    let (a, b) = (alice(), bob());
    let alice_record = player(&engine, &a);

    let initiated = engine
        .initiate_trade(InitiateTrade {
            initiating_player: (&alice_record).into(),
            recipient_player: (&b).into(),
            offered_characters: "B",
            requested_characters: "X",
        })
        .unwrap()
        .into_success()
        .unwrap();

    assert_eq!(initiated.trade.id, TradeId(1));
    assert_eq!(initiated.initiating_player.id, a);
    assert_eq!(initiated.recipient_player.id, b);
    assert_eq!(initiated.trade.offered_characters, "B");
    assert_eq!(initiated.trade.requested_characters, "X");
}

#[test]
fn test_modify_flips_awaiting_side_and_swaps_roles() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let (a, b) = (alice(), bob());

    let modifiable = engine
        .check_if_player_can_modify_trade(TradeResponse::new(&b, trade.id))
        .unwrap()
        .into_success()
        .unwrap();
    assert_eq!(modifiable.other_player.id, a);

    // Bob now gives one "x" and wants Alice's "B"
    let modified = engine
        .modify_trade(TradeModification {
            player_modifying: (&b).into(),
            trade: trade.id.into(),
            characters_giving: "x",
            characters_receiving: "B",
        })
        .unwrap()
        .into_success()
        .unwrap();

    assert_eq!(modified.trade.status, TradeStatus::AwaitingInitiator);
    assert_eq!(modified.trade.offered_characters, "B");
    assert_eq!(modified.trade.requested_characters, "x");
    assert_eq!(modified.player_modifying.id, b);
    assert_eq!(modified.other_player.id, a);

    let outcome = engine.accept_trade(TradeResponse::new(&b, trade.id)).unwrap();
    assert!(outcome.failure().unwrap().is_awaiting_different_player());

    let accepted = engine
        .accept_trade(TradeResponse::new(&a, trade.id))
        .unwrap()
        .into_success()
        .unwrap();
    assert_eq!(accepted.initiating_player.inventory, "bbdoevrx");
    assert_eq!(accepted.initiating_player.current_name, "obberx");
    assert_eq!(accepted.recipient_player.inventory, "XxxyzanderB");
    assert_eq!(accepted.recipient_player.current_name, "XanderB");
}

#[test]
fn test_counter_offer_from_initiator_maps_directly() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let (a, b) = (alice(), bob());

    engine
        .modify_trade(TradeModification {
            player_modifying: (&b).into(),
            trade: trade.id.into(),
            characters_giving: "y",
            characters_receiving: "o",
        })
        .unwrap()
        .into_success()
        .unwrap();

    let modified = engine
        .modify_trade(TradeModification {
            player_modifying: (&a).into(),
            trade: trade.id.into(),
            characters_giving: "d",
            characters_receiving: "z",
        })
        .unwrap()
        .into_success()
        .unwrap();

    assert_eq!(modified.trade.status, TradeStatus::AwaitingRecipient);
    assert_eq!(modified.trade.offered_characters, "d");
    assert_eq!(modified.trade.requested_characters, "z");
    assert_eq!(modified.other_player.id, b);
}

#[test]
fn test_modify_rejects_unaffordable_counter() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let (a, b) = (alice(), bob());

    let outcome = engine
        .modify_trade(TradeModification {
            player_modifying: (&a).into(),
            trade: trade.id.into(),
            characters_giving: "B",
            characters_receiving: "X",
        })
        .unwrap();
    assert!(outcome.failure().unwrap().is_awaiting_different_player());

    let outcome = engine
        .modify_trade(TradeModification {
            player_modifying: (&b).into(),
            trade: trade.id.into(),
            characters_giving: "qqq",
            characters_receiving: "B",
        })
        .unwrap();
    match outcome.failure() {
        Some(TradeExchangeFailure::PlayerMissingCharacters {
            player,
            missing_characters,
        }) => {
            assert_eq!(player.id, b);
            assert_eq!(missing_characters, "qqq");
        }
        other => panic!("expected missing characters, got {:?}", other),
    }

    let stored = engine.ledger().trade(trade.id).unwrap();
    assert_eq!(stored, trade);
}

#[test]
fn test_long_names_stop_growing_at_limit() {
    let config = EngineConfig {
        max_name_length: 8,
        ..EngineConfig::default()
    };
    let mut engine = engine_with(ledger(), config);
    let trade = open_trade(&mut engine, "berv", "Xx");
    let b = bob();

    let accepted = engine
        .accept_trade(TradeResponse::new(&b, trade.id))
        .unwrap()
        .into_success()
        .unwrap();

    assert_eq!(accepted.recipient_player.inventory, "xxyzanderberv");
    assert_eq!(accepted.recipient_player.current_name, "ander");
    assert_eq!(accepted.initiating_player.current_name, "BobXx");
}

#[test]
fn test_activity_log_records_successes_only() {
    let mut engine = engine();
    let trade = open_trade(&mut engine, "berv", "Xx");
    let (a, b) = (alice(), bob());

    let failed = engine.accept_trade(TradeResponse::new(&a, trade.id)).unwrap();
    assert!(failed.is_failure());
    assert_eq!(engine.activity().len(), 1);

    engine
        .accept_trade(TradeResponse::new(&b, trade.id))
        .unwrap()
        .into_success()
        .unwrap();

    let accepts = engine.activity().filter_by_type(ActivityType::AcceptTrade);
    assert_eq!(accepts.len(), 1);
    let entry = accepts[0];
    assert_eq!(entry.player_id, b);
    assert_eq!(entry.involved_player_id, Some(a.clone()));
    assert_eq!(entry.involved_trade_id, Some(trade.id));
    assert_eq!(entry.characters_gained.as_deref(), Some("berv"));
    assert_eq!(entry.characters_lost.as_deref(), Some("Xx"));
    assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());

    assert_eq!(engine.activity().filter_by_player(&a).len(), 2);
    assert_eq!(engine.activity().filter_by_trade(trade.id).len(), 2);
}

/// Wraps a memory ledger and refuses trade status changes
struct StatusLockedLedger {
    inner: MemoryLedger,
}

impl PlayerLedger for StatusLockedLedger {
    fn player(&self, id: &PlayerId) -> Option<Player> {
        self.inner.player(id)
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.inner.player_ids()
    }

    fn set_tokens(&mut self, id: &PlayerId, tokens: i64) -> Result<(), LedgerError> {
        self.inner.set_tokens(id, tokens)
    }

    fn set_inventory(&mut self, id: &PlayerId, inventory: String) -> Result<(), LedgerError> {
        self.inner.set_inventory(id, inventory)
    }

    fn set_current_name(&mut self, id: &PlayerId, name: String) -> Result<(), LedgerError> {
        self.inner.set_current_name(id, name)
    }

    fn set_published_name(
        &mut self,
        id: &PlayerId,
        name: Option<String>,
    ) -> Result<(), LedgerError> {
        self.inner.set_published_name(id, name)
    }
}

impl TradeStore for StatusLockedLedger {
    fn create_trade(&mut self, trade: NewTrade) -> Result<Trade, LedgerError> {
        self.inner.create_trade(trade)
    }

    fn trade(&self, id: TradeId) -> Option<Trade> {
        self.inner.trade(id)
    }

    fn set_trade_status(&mut self, _id: TradeId, _status: TradeStatus) -> Result<(), LedgerError> {
        Err(LedgerError::Checkpoint {
            reason: "status writes are locked".to_string(),
        })
    }

    fn set_trade_characters(
        &mut self,
        id: TradeId,
        offered_characters: String,
        requested_characters: String,
    ) -> Result<(), LedgerError> {
        self.inner
            .set_trade_characters(id, offered_characters, requested_characters)
    }
}

impl VoteStore for StatusLockedLedger {
    fn vote(&self, voter_id: &UserId) -> Option<Vote> {
        self.inner.vote(voter_id)
    }

    fn votes(&self) -> Vec<Vote> {
        self.inner.votes()
    }

    fn save_vote(&mut self, vote: Vote) -> Result<(), LedgerError> {
        self.inner.save_vote(vote)
    }

    fn delete_vote(&mut self, voter_id: &UserId) -> Option<Vote> {
        self.inner.delete_vote(voter_id)
    }

    fn reset_votes(&mut self) {
        self.inner.reset_votes()
    }
}

impl GamePhase for StatusLockedLedger {
    fn is_voting_open(&self) -> bool {
        self.inner.is_voting_open()
    }
}

impl Transactional for StatusLockedLedger {
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let checkpoint = self.inner.checkpoint()?;
        let result = f(self);
        if result.is_err() {
            self.inner.restore(&checkpoint)?;
        }
        result
    }
}

#[test]
fn test_failed_accept_leaves_no_partial_transfer() {
    let mut engine = Namesmith::new(StatusLockedLedger { inner: ledger() });
    let (a, b) = (alice(), bob());

    let trade = engine
        .initiate_trade(InitiateTrade {
            initiating_player: (&a).into(),
            recipient_player: (&b).into(),
            offered_characters: "berv",
            requested_characters: "Xx",
        })
        .unwrap()
        .into_success()
        .unwrap()
        .trade;

    let result = engine.accept_trade(TradeResponse::new(&b, trade.id));
    assert!(matches!(result, Err(LedgerError::Checkpoint { .. })));

    let ledger = engine.ledger();
    assert_eq!(ledger.player(&a).unwrap().inventory, "Bbbdoevr");
    assert_eq!(ledger.player(&a).unwrap().current_name, "Bobber");
    assert_eq!(ledger.player(&b).unwrap().inventory, "Xxxxyzander");
    assert_eq!(ledger.trade(trade.id).unwrap().status, TradeStatus::AwaitingRecipient);
    assert!(engine.activity().filter_by_type(ActivityType::AcceptTrade).is_empty());
}

fn character_totals(players: &[&Player]) -> BTreeMap<char, usize> {
    let mut totals = BTreeMap::new();
    for player in players {
        for character in player.inventory.chars() {
            *totals.entry(character).or_insert(0) += 1;
        }
    }
    totals
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An accepted trade moves characters without creating or losing any
    #[test]
    fn property_accept_conserves_characters(
        alice_inventory in "[a-eA-E]{0,10}",
        bob_inventory in "[v-zV-Z]{0,10}",
        offered_len in 0usize..10,
        requested_len in 0usize..10,
    ) {
        let offered: String = alice_inventory.chars().take(offered_len).collect();
        let requested: String = bob_inventory.chars().take(requested_len).collect();

        let mut ledger = MemoryLedger::new();
        ledger.add_player(Player::new("alice").with_inventory(alice_inventory.clone()));
        ledger.add_player(Player::new("bob").with_inventory(bob_inventory.clone()));
        let before = character_totals(&[
            &ledger.player(&alice()).unwrap(),
            &ledger.player(&bob()).unwrap(),
        ]);

        let mut engine = Namesmith::new(ledger);
        let trade = open_trade(&mut engine, &offered, &requested);
        let b = bob();
        let accepted = engine
            .accept_trade(TradeResponse::new(&b, trade.id))
            .unwrap()
            .into_success()
            .unwrap();

        prop_assert_eq!(accepted.trade.status, TradeStatus::Accepted);
        let after = character_totals(&[&accepted.initiating_player, &accepted.recipient_player]);
        prop_assert_eq!(before, after);
        prop_assert!(accepted.recipient_player.inventory.ends_with(&offered));
        prop_assert!(accepted.initiating_player.inventory.ends_with(&requested));
    }
}
