//! Player lookups and character movement on top of a [`PlayerLedger`]

use crate::error::LedgerError;
use crate::inventory::{self, CharacterDifferences};
use crate::ledger::{PlayerLedger, PlayerRef};
use crate::types::Player;

/// Resolve a player reference to the stored record, re-reading it by id
pub fn resolve_player<L: PlayerLedger + ?Sized>(ledger: &L, player: PlayerRef<'_>) -> Option<Player> {
    ledger.player(player.id())
}

pub fn are_same_players(first: PlayerRef<'_>, second: PlayerRef<'_>) -> bool {
    first.id() == second.id()
}

/// Like [`resolve_player`], for ids that must already be known to the ledger
pub fn require_player<L: PlayerLedger + ?Sized>(
    ledger: &L,
    player: PlayerRef<'_>,
) -> Result<Player, LedgerError> {
    resolve_player(ledger, player).ok_or_else(|| LedgerError::PlayerNotFound {
        id: player.id().clone(),
    })
}

/// What `player` lacks to give `characters`, checked against the current inventory
pub fn missing_characters<L: PlayerLedger + ?Sized>(
    ledger: &L,
    player: PlayerRef<'_>,
    characters: &str,
) -> Result<CharacterDifferences, LedgerError> {
    let player = require_player(ledger, player)?;
    Ok(inventory::character_differences(characters, &player.inventory))
}

/// Move characters between two players' inventories and names
///
/// Both records are re-read, updated together in memory and written back, so
/// a failed precondition leaves both players untouched.
pub fn transfer_characters<L: PlayerLedger + ?Sized>(
    ledger: &mut L,
    from: PlayerRef<'_>,
    to: PlayerRef<'_>,
    characters: &str,
    max_name_length: usize,
) -> Result<(Player, Player), LedgerError> {
    let mut source = require_player(ledger, from)?;
    let mut destination = require_player(ledger, to)?;

    inventory::transfer_characters(&mut source, &mut destination, characters, max_name_length)?;

    ledger.set_inventory(&source.id, source.inventory.clone())?;
    ledger.set_current_name(&source.id, source.current_name.clone())?;
    ledger.set_inventory(&destination.id, destination.inventory.clone())?;
    ledger.set_current_name(&destination.id, destination.current_name.clone())?;

    Ok((source, destination))
}
