//! Card database for looking up card definitions
//!
//! Lookup is case- and diacritic-insensitive ("Lim-Dûl's Vault" matches
//! "lim-dul's vault"). Directories are walked with jwalk and the files
//! parsed in parallel.

use crate::core::{normalize_card_name, CardDefinition};
use crate::loader::card::CardLoader;
use crate::{MtgError, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Summary of a bulk load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub files: usize,
    pub cards: usize,
    /// Files that failed to parse, with the reason
    pub failures: Vec<(PathBuf, String)>,
    pub duration: Duration,
}

/// Database of card definitions
#[derive(Debug, Clone, Default)]
pub struct CardDatabase {
    cards: FxHashMap<String, Arc<CardDefinition>>,
}

impl CardDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.json` file below a directory
    ///
    /// Files that fail to parse are reported, not fatal.
    pub fn load_directory(dir: &Path) -> Result<(Self, LoadReport)> {
        if !dir.is_dir() {
            return Err(MtgError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Card directory not found: {dir:?}"),
            )));
        }
        let start = Instant::now();

        let mut paths = Vec::new();
        for entry in jwalk::WalkDir::new(dir).skip_hidden(false) {
            let entry = entry.map_err(|e| MtgError::IoError(std::io::Error::other(e.to_string())))?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(|s| s.to_str()) == Some("json")
            {
                paths.push(path);
            }
        }

        let results: Vec<(PathBuf, Result<Vec<CardDefinition>>)> = paths
            .into_par_iter()
            .map(|path| {
                let cards = CardLoader::load_from_file(&path);
                (path, cards)
            })
            .collect();

        let mut db = CardDatabase::new();
        let mut report = LoadReport {
            files: results.len(),
            ..LoadReport::default()
        };
        for (path, result) in results {
            match result {
                Ok(cards) => {
                    report.cards += cards.len();
                    for card in cards {
                        db.add_card(card);
                    }
                }
                Err(e) => report.failures.push((path, e.to_string())),
            }
        }
        report.duration = start.elapsed();
        Ok((db, report))
    }

    /// Load the cards in one JSON file
    pub fn load_file(path: &Path) -> Result<Self> {
        let mut db = CardDatabase::new();
        for card in CardLoader::load_from_file(path)? {
            db.add_card(card);
        }
        Ok(db)
    }

    /// Add a single card definition, replacing any card with the same name
    pub fn add_card(&mut self, card_def: CardDefinition) -> Arc<CardDefinition> {
        let key = card_def.name().lookup_key();
        let card = Arc::new(card_def);
        self.cards.insert(key, Arc::clone(&card));
        card
    }

    /// Look up a card by name
    pub fn get_card(&self, name: &str) -> Option<Arc<CardDefinition>> {
        self.cards.get(&normalize_card_name(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cards.contains_key(&normalize_card_name(name))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Arc<CardDefinition>> {
        self.cards.values()
    }

    /// Rules text lines the oracle parser could not classify, per card
    pub fn unparsed_lines(&self) -> Vec<(String, String)> {
        let mut lines: Vec<(String, String)> = self
            .cards
            .values()
            .flat_map(|card| {
                card.faces.iter().flat_map(|face| {
                    face.abilities
                        .unparsed
                        .iter()
                        .map(|line| (face.name.to_string(), line.clone()))
                })
            })
            .collect();
        lines.sort();
        lines
    }
}
