//! MTG rules engine - command line
//!
//! Inspect the oracle parser, check a card collection's parser coverage, or
//! watch a scripted two-player game.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mtg_rules_engine::{
    core::{CardId, PlayerId, TargetRef},
    game::{
        ActivateOptions, CastOptions, GameAction, GameLogger, GameSession,
        GameState, Step, VerbosityLevel,
    },
    loader::{parse_abilities, CardDatabase, CardLoader, DeckLoader},
    GameConfig,
};
use std::path::{Path, PathBuf};

/// Verbosity level for game output (names or numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

#[derive(Parser)]
#[command(name = "mtg")]
#[command(about = "MTG rules engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ability descriptors parsed from oracle text, as JSON
    Parse {
        /// Oracle text (use \n between abilities)
        text: String,

        /// Card name, replaced by ~ before parsing
        #[arg(long, default_value = "")]
        name: String,

        /// Treat plain sentences as spell effects (instants and sorceries)
        #[arg(long)]
        spell: bool,
    },

    /// Load a card file or directory and report parser coverage
    Cards {
        /// A .json file or a directory of them
        path: PathBuf,

        /// List every unclassified rules text line
        #[arg(long)]
        show_unparsed: bool,
    },

    /// Play a scripted game between two autopilots
    Demo {
        /// Card file or directory (defaults to a small built-in set)
        #[arg(long)]
        cards: Option<PathBuf>,

        /// Deck list for both players (defaults to a built-in deck)
        #[arg(long)]
        deck: Option<PathBuf>,

        /// Game configuration as JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Set random seed for deterministic games
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many turns
        #[arg(long, default_value_t = 40)]
        max_turns: u32,

        /// Verbosity level for game output (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,
    },
}

const DEMO_CARDS: &str = r#"[
    {"name": "Forest", "type_line": "Basic Land — Forest", "oracle_text": "({T}: Add {G}.)"},
    {"name": "Mountain", "type_line": "Basic Land — Mountain", "oracle_text": "({T}: Add {R}.)"},
    {"name": "Grizzly Bears", "type_line": "Creature — Bear", "mana_cost": "{1}{G}",
     "power": "2", "toughness": "2"},
    {"name": "Raging Goblin", "type_line": "Creature — Goblin Berserker", "mana_cost": "{R}",
     "oracle_text": "Haste", "power": "1", "toughness": "1"},
    {"name": "Lightning Bolt", "type_line": "Instant", "mana_cost": "{R}",
     "oracle_text": "Lightning Bolt deals 3 damage to any target."}
]"#;

const DEMO_DECK: &str = "\
9 Forest
8 Mountain
8 Grizzly Bears
4 Raging Goblin
6 Lightning Bolt
";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { text, name, spell } => run_parse(&text, &name, spell),
        Commands::Cards {
            path,
            show_unparsed,
        } => run_cards(path, show_unparsed),
        Commands::Demo {
            cards,
            deck,
            config,
            seed,
            max_turns,
            verbosity,
        } => run_demo(cards, deck, config, seed, max_turns, verbosity.0),
    }
}

fn run_parse(text: &str, name: &str, spell: bool) -> anyhow::Result<()> {
    let text = text.replace("\\n", "\n");
    let abilities = parse_abilities(&text, name, spell);
    println!("{}", serde_json::to_string_pretty(&abilities)?);
    Ok(())
}

fn load_cards(path: &Path) -> anyhow::Result<CardDatabase> {
    if path.is_dir() {
        let (db, report) = CardDatabase::load_directory(path)
            .with_context(|| format!("loading cards from {}", path.display()))?;
        for (file, reason) in &report.failures {
            eprintln!("  skipped {}: {reason}", file.display());
        }
        println!(
            "Loaded {} cards from {} files in {:.2?}",
            report.cards, report.files, report.duration
        );
        Ok(db)
    } else {
        CardDatabase::load_file(path).with_context(|| format!("loading {}", path.display()))
    }
}

fn run_cards(path: PathBuf, show_unparsed: bool) -> anyhow::Result<()> {
    let db = load_cards(&path)?;
    let unparsed = db.unparsed_lines();
    let cards_with_gaps = {
        let mut names: Vec<&str> = unparsed.iter().map(|(name, _)| name.as_str()).collect();
        names.dedup();
        names.len()
    };

    println!("Cards: {}", db.len());
    println!(
        "Fully parsed: {} ({} with unclassified text, {} lines)",
        db.len().saturating_sub(cards_with_gaps),
        cards_with_gaps,
        unparsed.len()
    );
    if show_unparsed {
        for (name, line) in &unparsed {
            println!("  {name}: {line}");
        }
    }
    Ok(())
}

fn run_demo(
    cards: Option<PathBuf>,
    deck: Option<PathBuf>,
    config: Option<PathBuf>,
    seed: Option<u64>,
    max_turns: u32,
    verbosity: VerbosityLevel,
) -> anyhow::Result<()> {
    let db = match cards {
        Some(path) => load_cards(&path)?,
        None => {
            let mut db = CardDatabase::new();
            for card in CardLoader::parse(DEMO_CARDS)? {
                db.add_card(card);
            }
            db
        }
    };
    let deck = match deck {
        Some(path) => DeckLoader::load_from_file(&path)
            .with_context(|| format!("loading deck {}", path.display()))?,
        None => DeckLoader::parse(DEMO_DECK)?,
    };
    let mut config = match config {
        Some(path) => GameConfig::from_file(&path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    let mut game = GameState::new(["Alice", "Bob"], config);
    let players: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();
    for player in &players {
        deck.load_into(&mut game, *player, &db)?;
    }

    let mut session = GameSession::with_logger(game, GameLogger::with_verbosity(verbosity));
    session.start()?;

    let mut actions = 0usize;
    while !session.state().is_over() && session.state().turn.turn_number <= max_turns {
        let Some(player) = session.state().priority_player else {
            bail!("no player holds priority in an unfinished game");
        };
        for action in autopilot(session.state(), player) {
            let result = session.apply(&action)?;
            actions += 1;
            if result.success && matches!(action, GameAction::PassPriority { .. }) {
                break;
            }
        }
    }

    println!("{} ({} actions)", session.outcome(), actions);
    for player in &session.state().players {
        println!("  {}: {} life", player.name, player.life);
    }
    Ok(())
}

/// Actions for the player holding priority, ending with a pass
///
/// Plays a land, taps out for creatures and burn in its own main phases,
/// attacks with everything that can, and never blocks.
fn autopilot(state: &GameState, player: PlayerId) -> Vec<GameAction> {
    let mut actions = Vec::new();
    let active = state.turn.active_player == player;
    let opponent = state.opponents_of(player).into_iter().next();

    match state.turn.step {
        Step::PrecombatMain | Step::PostcombatMain if active && state.stack.is_empty() => {
            let hand = state.hand(player);
            if let Some(land) = hand.iter().find(|c| is(state, **c, |i| i.is_land())) {
                actions.push(GameAction::PlayLand {
                    player,
                    card: *land,
                });
            }
            for land in state.battlefield_of(player) {
                let untapped_land = state.card(land).map(|c| c.is_land() && !c.tapped);
                if untapped_land.unwrap_or(false) {
                    actions.push(GameAction::ActivateAbility {
                        player,
                        card: land,
                        index: 0,
                        options: ActivateOptions::default(),
                    });
                }
            }
            for card in hand.iter().filter(|c| !is(state, **c, |i| i.is_land())) {
                let options = match opponent {
                    Some(opp) if is(state, *card, |i| i.is_instant_or_sorcery()) => {
                        CastOptions::targets([TargetRef::Player(opp)])
                    }
                    _ => CastOptions::default(),
                };
                actions.push(GameAction::CastSpell {
                    player,
                    card: *card,
                    options,
                });
            }
        }
        Step::DeclareAttackers if active && !state.combat.attackers_declared => {
            if let Some(opp) = opponent {
                let attacks: Vec<(CardId, PlayerId)> = state
                    .battlefield_of(player)
                    .into_iter()
                    .filter(|c| is(state, *c, |i| i.is_creature() && !i.tapped))
                    .map(|c| (c, opp))
                    .collect();
                actions.push(GameAction::DeclareAttackers {
                    player,
                    attacks,
                });
            }
        }
        _ => {}
    }

    actions.push(GameAction::PassPriority { player });
    actions
}

fn is(
    state: &GameState,
    card: CardId,
    test: impl Fn(&mtg_rules_engine::core::CardInstance) -> bool,
) -> bool {
    state.card(card).map(test).unwrap_or(false)
}
