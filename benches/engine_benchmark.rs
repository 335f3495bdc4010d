//! Engine benchmarks
//!
//! Mana payment, oracle text parsing, replacement pipeline throughput and
//! full turns of passing priority.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mtg_rules_engine::core::{
    CardDefinition, CardFace, ManaCost, ManaPool, ManaType, TargetRef, TypeLine,
};
use mtg_rules_engine::game::replacement::{MODIFICATION_LAYER, PREVENTION_LAYER};
use mtg_rules_engine::game::{
    EffectDuration, EventFilter, EventTransform, GameState, ReplacementEffect,
};
use mtg_rules_engine::loader::parse_abilities;
use mtg_rules_engine::GameConfig;
use std::sync::Arc;

const ORACLE_SAMPLES: [(&str, &str, bool); 6] = [
    ("Lightning Bolt", "Lightning Bolt deals 3 damage to any target.", true),
    ("Serra Angel", "Flying, vigilance", false),
    (
        "Elvish Visionary",
        "When Elvish Visionary enters the battlefield, draw a card.",
        false,
    ),
    (
        "Cryptic Choice",
        "Choose two —\n• Counter target spell.\n• Return target permanent to its owner's hand.\n• Tap all creatures your opponents control.\n• Draw a card.",
        true,
    ),
    (
        "Chandra, Novice Pyromancer",
        "+1: Elementals you control get +2/+0 until end of turn.\n−1: Add {R}{R}.\n−2: Chandra deals 2 damage to any target.",
        false,
    ),
    (
        "Furnace of Rath",
        "If a source would deal damage to a permanent or player, it deals double that damage to that permanent or player instead.",
        false,
    ),
];

fn bench_mana_spend(c: &mut Criterion) {
    let pool = ManaPool::new()
        .add(ManaType::Green, 3)
        .add(ManaType::Red, 2)
        .add(ManaType::Colorless, 2);
    let mut group = c.benchmark_group("mana_spend");
    for symbols in ["{G}", "{2}{G}", "{C}{3}{R}", "{5}{G}{R}"] {
        let cost = ManaCost::parse(symbols).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(symbols), &cost, |b, cost| {
            b.iter(|| black_box(pool.spend(black_box(cost))))
        });
    }
    group.finish();
}

fn bench_oracle_parse(c: &mut Criterion) {
    let total: usize = ORACLE_SAMPLES.iter().map(|(_, text, _)| text.len()).sum();
    c.benchmark_group("oracle_parse")
        .throughput(Throughput::Bytes(total as u64))
        .bench_function("samples", |b| {
            b.iter(|| {
                for (name, text, is_spell) in ORACLE_SAMPLES {
                    black_box(parse_abilities(black_box(text), name, is_spell));
                }
            })
        });
}

fn started_game() -> GameState {
    let forest = Arc::new(CardDefinition::single(CardFace::new(
        "Forest",
        TypeLine::parse("Basic Land — Forest").unwrap(),
        ManaCost::new(),
    )));
    let mut game = GameState::new(["Alice", "Bob"], GameConfig::default().with_seed(1));
    for player in game.players.iter().map(|p| p.id).collect::<Vec<_>>() {
        game.load_deck(player, std::iter::repeat(forest.clone()).take(60))
            .unwrap();
    }
    game.start_game().unwrap()
}

fn bench_replacement_pipeline(c: &mut Criterion) {
    let mut game = started_game();
    let (alice, bob) = (game.players[0].id, game.players[1].id);
    for (controller, layer, transform) in [
        (alice, PREVENTION_LAYER, EventTransform::Prevent(1)),
        (alice, MODIFICATION_LAYER, EventTransform::Multiply(2)),
        (bob, MODIFICATION_LAYER, EventTransform::Add(1)),
    ] {
        game.effects.register(ReplacementEffect::new(
            None,
            controller,
            layer,
            EventFilter::AnyDamage,
            transform,
            EffectDuration::Permanent,
        ));
    }

    c.bench_function("damage_through_three_effects", |b| {
        b.iter(|| {
            let mut state = game.clone();
            black_box(state.deal_damage(None, TargetRef::Player(bob), black_box(3), false))
        })
    });
}

fn bench_priority_cycle(c: &mut Criterion) {
    let game = started_game();
    c.bench_function("pass_through_one_turn", |b| {
        b.iter(|| {
            let mut state = game.clone();
            let starting = state.turn.turn_number;
            while state.turn.turn_number == starting {
                let Some(holder) = state.priority_player else {
                    break;
                };
                state = state.pass_priority(holder).unwrap().state;
            }
            black_box(state)
        })
    });
}

criterion_group!(
    benches,
    bench_mana_spend,
    bench_oracle_parse,
    bench_replacement_pipeline,
    bench_priority_cycle
);
criterion_main!(benches);
