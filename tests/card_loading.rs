//! Card loading tests
//!
//! A small card set on disk, loaded the way the CLI does it, then used to
//! build decks and start a game.

use mtg_rules_engine::core::{CardType, EffectKind, Keyword, StaticAbility, TriggerEvent};
use mtg_rules_engine::game::{GameState, Step};
use mtg_rules_engine::loader::{CardDatabase, DeckLoader};
use mtg_rules_engine::{GameConfig, Result};
use similar_asserts::assert_eq;
use std::path::{Path, PathBuf};

const WHITE: &str = r#"[
    {"name": "Plains", "type_line": "Basic Land — Plains", "oracle_text": "({T}: Add {W}.)"},
    {"name": "Serra Angel", "type_line": "Creature — Angel", "mana_cost": "{3}{W}{W}",
     "power": "4", "toughness": "4", "keywords": ["Flying", "Vigilance"],
     "oracle_text": "Flying, vigilance"},
    {"name": "Soul Warden", "type_line": "Creature — Human Cleric", "mana_cost": "{W}",
     "power": "1", "toughness": "1",
     "oracle_text": "Whenever another creature enters the battlefield, you gain 1 life."}
]"#;

const GREEN: &str = r#"[
    {"name": "Forest", "type_line": "Basic Land — Forest", "oracle_text": "({T}: Add {G}.)"},
    {"name": "Llanowar Elves", "type_line": "Creature — Elf Druid", "mana_cost": "{G}",
     "power": "1", "toughness": "1", "oracle_text": "{T}: Add {G}."},
    {"name": "Exploration", "type_line": "Enchantment", "mana_cost": "{G}",
     "oracle_text": "You may play an additional land on each of your turns."},
    {"name": "Rampant Growth", "type_line": "Sorcery", "mana_cost": "{1}{G}",
     "oracle_text": "Search your library for a basic land card, put that card onto the battlefield tapped, then shuffle."}
]"#;

/// A scratch card directory removed when dropped
struct CardDir(PathBuf);

impl CardDir {
    fn new(tag: &str) -> CardDir {
        let dir = std::env::temp_dir().join(format!("mtg-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("green")).unwrap();
        std::fs::write(dir.join("white.json"), WHITE).unwrap();
        std::fs::write(dir.join("green").join("green.json"), GREEN).unwrap();
        CardDir(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for CardDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[test]
fn test_load_card_directory() -> Result<()> {
    let dir = CardDir::new("dir");
    let (db, report) = CardDatabase::load_directory(dir.path())?;

    assert_eq!(report.files, 2);
    assert_eq!(report.cards, 7);
    assert!(report.failures.is_empty());
    assert_eq!(db.len(), 7);
    assert!(db.unparsed_lines().is_empty());

    let angel = db.get_card("serra angel").unwrap();
    let face = angel.front();
    assert!(face.type_line.is(CardType::Creature));
    assert_eq!(face.mana_cost.mana_value(), 5);
    assert_eq!(face.abilities.keywords, vec![Keyword::Flying, Keyword::Vigilance]);

    let warden = db.get_card("Soul Warden").unwrap();
    assert_eq!(
        warden.front().abilities.triggered[0].event,
        TriggerEvent::EntersBattlefield
    );

    let elves = db.get_card("Llanowar Elves").unwrap();
    assert!(elves.front().abilities.activated[0].is_mana_ability);

    let exploration = db.get_card("Exploration").unwrap();
    assert_eq!(
        exploration.front().abilities.statics,
        vec![StaticAbility::AdditionalLand { count: 1 }]
    );

    let growth = db.get_card("Rampant Growth").unwrap();
    assert_eq!(growth.front().abilities.spell_effects.len(), 1);
    assert_eq!(growth.front().abilities.spell_effects[0].kind, EffectKind::Search);
    Ok(())
}

#[test]
fn test_decks_start_a_game() -> Result<()> {
    let dir = CardDir::new("deck");
    let (db, _) = CardDatabase::load_directory(dir.path())?;

    let white = DeckLoader::parse("20 Plains\n10 Serra Angel\n10 Soul Warden\n")?;
    let green = DeckLoader::parse(
        "# Ramp\n18 Forest\n8 Llanowar Elves|M19\n6 Rampant Growth\n[Sideboard]\n4 Exploration\n",
    )?;
    assert_eq!(green.total_cards(), 32);
    assert_eq!(green.sideboard_size(), 4);

    let mut game = GameState::new(["Alice", "Bob"], GameConfig::default().with_seed(11));
    let (alice, bob) = (game.players[0].id, game.players[1].id);
    white.load_into(&mut game, alice, &db)?;
    green.load_into(&mut game, bob, &db)?;
    assert_eq!(game.library(alice).len(), 40);
    assert_eq!(game.library(bob).len(), 32);

    let game = game.start_game()?;
    assert_eq!(game.turn.step, Step::Upkeep);
    assert_eq!(game.hand(alice).len(), 7);
    assert_eq!(game.library(bob).len(), 25);
    Ok(())
}

#[test]
fn test_same_seed_same_opening_hands() -> Result<()> {
    let dir = CardDir::new("seed");
    let (db, _) = CardDatabase::load_directory(dir.path())?;
    let deck = DeckLoader::parse("20 Forest\n20 Llanowar Elves\n20 Rampant Growth\n")?;

    let deal = |seed: u64| -> Result<Vec<String>> {
        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default().with_seed(seed));
        let alice = game.players[0].id;
        deck.load_into(&mut game, alice, &db)?;
        let game = game.start_game()?;
        game.hand(alice)
            .iter()
            .map(|id| Ok(game.card(*id)?.card_name().to_string()))
            .collect()
    };

    assert_eq!(deal(5)?, deal(5)?);
    Ok(())
}
