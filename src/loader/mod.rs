//! Card and deck loaders
//!
//! JSON card records, the oracle text parser, the card database and deck
//! lists.

pub mod card;
pub mod database;
pub mod deck;
pub mod oracle;

pub use card::{CardLoader, CardRecord, FaceRecord};
pub use database::{CardDatabase, LoadReport};
pub use deck::{DeckEntry, DeckList, DeckLoader};
pub use oracle::{parse_abilities, parse_effect, parse_effects};
