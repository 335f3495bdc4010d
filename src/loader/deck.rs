//! Deck list loader
//!
//! Plain text lists, one "count name" entry per line:
//!
//! ```text
//! # Mono red
//! 20 Mountain
//! 4 Lightning Bolt|M10
//!
//! [Sideboard]
//! 3 Shock
//! ```

use crate::core::{CardDefinition, CardId, PlayerId};
use crate::game::GameState;
use crate::loader::database::CardDatabase;
use crate::{MtgError, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Deck loader for text deck lists
pub struct DeckLoader;

impl DeckLoader {
    /// Load a deck from a file
    pub fn load_from_file(path: &Path) -> Result<DeckList> {
        let content = fs::read_to_string(path).map_err(MtgError::IoError)?;
        Self::parse(&content)
    }

    /// Parse a deck from its text content
    pub fn parse(content: &str) -> Result<DeckList> {
        let mut main_deck = Vec::new();
        let mut sideboard = Vec::new();
        let mut in_sideboard = false;

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            if line.starts_with('[') {
                in_sideboard = line.eq_ignore_ascii_case("[sideboard]");
                continue;
            }
            // Metadata lines like "Name=Burn"
            if line.contains('=') {
                continue;
            }

            let (count_str, rest) = line.split_once(' ').ok_or_else(|| {
                MtgError::InvalidDeckFormat(format!("line {}: expected 'count name'", number + 1))
            })?;
            let count = count_str.trim_end_matches('x').parse::<u32>().map_err(|_| {
                MtgError::InvalidDeckFormat(format!("line {}: bad count '{count_str}'", number + 1))
            })?;

            // Card name comes before the set code
            let card_name = match rest.split_once('|') {
                Some((name, _set)) => name.trim(),
                None => rest.trim(),
            };
            if card_name.is_empty() {
                return Err(MtgError::InvalidDeckFormat(format!(
                    "line {}: missing card name",
                    number + 1
                )));
            }

            let entry = DeckEntry {
                card_name: card_name.to_string(),
                count,
            };
            if in_sideboard {
                sideboard.push(entry);
            } else {
                main_deck.push(entry);
            }
        }

        if main_deck.is_empty() {
            return Err(MtgError::InvalidDeckFormat("Empty deck".to_string()));
        }

        Ok(DeckList {
            main_deck,
            sideboard,
        })
    }
}

/// Represents a deck entry (card name and count)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckEntry {
    pub card_name: String,
    pub count: u32,
}

/// Represents a complete deck list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckList {
    pub main_deck: Vec<DeckEntry>,
    pub sideboard: Vec<DeckEntry>,
}

impl DeckList {
    /// Total cards in main deck
    pub fn total_cards(&self) -> usize {
        self.main_deck.iter().map(|e| e.count as usize).sum()
    }

    /// Total cards in sideboard
    pub fn sideboard_size(&self) -> usize {
        self.sideboard.iter().map(|e| e.count as usize).sum()
    }

    /// Resolve every main deck card against the database, in list order
    pub fn resolve(&self, db: &CardDatabase) -> Result<Vec<Arc<CardDefinition>>> {
        let mut cards = Vec::with_capacity(self.total_cards());
        let mut missing = Vec::new();
        for entry in &self.main_deck {
            match db.get_card(&entry.card_name) {
                Some(card) => {
                    cards.extend(std::iter::repeat(card).take(entry.count as usize));
                }
                None => missing.push(entry.card_name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(MtgError::InvalidDeckFormat(format!(
                "Cards not found in database: {}",
                missing.join(", ")
            )));
        }
        Ok(cards)
    }

    /// Put fresh instances of the main deck into a player's library
    pub fn load_into(
        &self,
        game: &mut GameState,
        player: PlayerId,
        db: &CardDatabase,
    ) -> Result<Vec<CardId>> {
        let cards = self.resolve(db)?;
        game.load_deck(player, cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardFace, ManaCost, TypeLine};
    use crate::GameConfig;

    #[test]
    fn test_parse_simple_deck() {
        let content = r#"
[metadata]
Name=Test Deck

[Main]
20 Mountain
40 Lightning Bolt|M10

[Sideboard]
15 Shock
"#;

        let deck = DeckLoader::parse(content).unwrap();
        assert_eq!(deck.main_deck.len(), 2);
        assert_eq!(deck.total_cards(), 60);

        assert_eq!(deck.main_deck[0].card_name, "Mountain");
        assert_eq!(deck.main_deck[0].count, 20);

        assert_eq!(deck.main_deck[1].card_name, "Lightning Bolt");
        assert_eq!(deck.main_deck[1].count, 40);

        assert_eq!(deck.sideboard.len(), 1);
        assert_eq!(deck.sideboard_size(), 15);
        assert_eq!(deck.sideboard[0].card_name, "Shock");
    }

    #[test]
    fn test_parse_errors() {
        assert!(DeckLoader::parse("# nothing here\n").is_err());
        assert!(DeckLoader::parse("four Lightning Bolt").is_err());
        assert!(DeckLoader::parse("Lightning").is_err());
    }

    #[test]
    fn test_load_into_library() {
        let mut db = CardDatabase::new();
        db.add_card(CardDefinition::single(CardFace::new(
            "Shock",
            TypeLine::parse("Instant").unwrap(),
            ManaCost::parse("{R}").unwrap(),
        )));
        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default());
        let alice = game.players[0].id;

        let deck = DeckLoader::parse("3 shock\n").unwrap();
        let ids = deck.load_into(&mut game, alice, &db).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(game.library(alice).len(), 3);

        let missing = DeckLoader::parse("1 Shock\n2 Ponder\n").unwrap();
        let err = missing.load_into(&mut game, alice, &db).unwrap_err();
        assert!(err.to_string().contains("Ponder"));
        assert_eq!(game.library(alice).len(), 3);
    }
}
