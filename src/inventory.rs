//! Multiset algebra over character inventories
//!
//! An inventory is an ordered sequence of characters. Containment and
//! difference checks treat it as a multiset through a counting map, while
//! removal and appending keep the sequence order, because the display name is
//! built from the same characters and its order is visible to players.
//!
//! Matching is exact: `'B'` and `'b'` are different characters.

use std::collections::BTreeMap;

use crate::error::LedgerError;
use crate::types::Player;

/// Count the occurrences of each character
pub fn character_counts(characters: &str) -> BTreeMap<char, usize> {
    let mut counts = BTreeMap::new();
    for character in characters.chars() {
        *counts.entry(character).or_insert(0) += 1;
    }
    counts
}

/// Whether every character of `required` occurs in `inventory` at least as many times
pub fn has_characters(inventory: &str, required: &str) -> bool {
    let available = character_counts(inventory);
    character_counts(required)
        .iter()
        .all(|(character, wanted)| available.get(character).copied().unwrap_or(0) >= *wanted)
}

/// Per-character comparison of what is required against what is held
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterDifferences {
    /// Characters in `required` that `have` cannot cover, sorted
    pub missing: String,
    /// Characters in `have` left over once `required` is covered, sorted
    pub extra: String,
}

impl CharacterDifferences {
    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Diff `required` against `have` for user-facing diagnostics
pub fn character_differences(required: &str, have: &str) -> CharacterDifferences {
    let required_counts = character_counts(required);
    let have_counts = character_counts(have);
    let mut differences = CharacterDifferences::default();

    for (character, wanted) in &required_counts {
        let held = have_counts.get(character).copied().unwrap_or(0);
        for _ in held..*wanted {
            differences.missing.push(*character);
        }
    }

    for (character, held) in &have_counts {
        let wanted = required_counts.get(character).copied().unwrap_or(0);
        for _ in wanted..*held {
            differences.extra.push(*character);
        }
    }

    differences
}

/// Remove one occurrence of each character of `characters` from `sequence`
///
/// Each removal takes the first matching occurrence and keeps the relative
/// order of what remains. Characters with no occurrence left are skipped.
pub fn remove_characters(sequence: &str, characters: &str) -> String {
    let mut remaining: Vec<char> = sequence.chars().collect();
    for character in characters.chars() {
        if let Some(position) = remaining.iter().position(|held| *held == character) {
            remaining.remove(position);
        }
    }
    remaining.into_iter().collect()
}

/// Move `characters` from `source` to `destination`
///
/// Removes the characters from the source's inventory and, where present,
/// from its display name. Appends them to the destination's inventory and to
/// its display name, unless that would push the name past `max_name_length`
/// characters, in which case the name is left as it was.
///
/// Nothing is modified if the source does not hold every character.
pub fn transfer_characters(
    source: &mut Player,
    destination: &mut Player,
    characters: &str,
    max_name_length: usize,
) -> Result<(), LedgerError> {
    if !has_characters(&source.inventory, characters) {
        let differences = character_differences(characters, &source.inventory);
        return Err(LedgerError::InsufficientCharacters {
            id: source.id.clone(),
            characters: characters.to_string(),
            missing: differences.missing,
        });
    }

    let source_inventory = remove_characters(&source.inventory, characters);
    let source_name = remove_characters(&source.current_name, characters);
    let destination_inventory = format!("{}{}", destination.inventory, characters);
    let extended_name = format!("{}{}", destination.current_name, characters);

    source.inventory = source_inventory;
    source.current_name = source_name;
    destination.inventory = destination_inventory;
    if extended_name.chars().count() <= max_name_length {
        destination.current_name = extended_name;
    }

    Ok(())
}
