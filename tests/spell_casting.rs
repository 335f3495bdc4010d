//! End-to-end casting and resolution through the action API
//!
//! Every test starts a two-player game with forest libraries, walks to
//! Alice's first main phase and puts the cards it needs straight into
//! hand or onto the battlefield.

use mtg_rules_engine::core::{CardId, ManaCost, ManaType, PlayerId, TargetRef};
use mtg_rules_engine::game::{
    ActionResult, ActivateOptions, CastOptions, ChoiceKind, ChoiceOption, GameState,
    StackObjectKind, Step,
};
use mtg_rules_engine::loader::{CardDatabase, CardLoader};
use mtg_rules_engine::zones::Zone;
use mtg_rules_engine::{GameConfig, Result};
use similar_asserts::assert_eq;

const CARDS: &str = r#"[
    {"name": "Forest", "type_line": "Basic Land — Forest", "oracle_text": "({T}: Add {G}.)"},
    {"name": "Lightning Bolt", "type_line": "Instant", "mana_cost": "{R}",
     "oracle_text": "Lightning Bolt deals 3 damage to any target."},
    {"name": "Grizzly Bears", "type_line": "Creature — Bear", "mana_cost": "{1}{G}",
     "power": "2", "toughness": "2"},
    {"name": "Counterspell", "type_line": "Instant", "mana_cost": "{U}{U}",
     "oracle_text": "Counter target spell."},
    {"name": "Unsummon", "type_line": "Instant", "mana_cost": "{U}",
     "oracle_text": "Return target creature to its owner's hand."},
    {"name": "Healing Salve", "type_line": "Instant", "mana_cost": "{W}",
     "oracle_text": "Prevent the next 3 damage that would be dealt to any target this turn."},
    {"name": "Blaze", "type_line": "Sorcery", "mana_cost": "{X}{R}",
     "oracle_text": "Blaze deals X damage to any target."},
    {"name": "Twin Blaze", "type_line": "Sorcery", "mana_cost": "{X}{X}{R}",
     "oracle_text": "Twin Blaze deals X damage to any target."},
    {"name": "Raise the Alarm", "type_line": "Instant", "mana_cost": "{1}{W}",
     "oracle_text": "Create two 1/1 white Soldier creature tokens."},
    {"name": "Elvish Visionary", "type_line": "Creature — Elf Shaman", "mana_cost": "{1}{G}",
     "power": "1", "toughness": "1",
     "oracle_text": "When Elvish Visionary enters the battlefield, draw a card."},
    {"name": "Boros Charm of Choices", "type_line": "Instant", "mana_cost": "{R}{W}",
     "oracle_text": "Choose one —\n• Target player gains 3 life.\n• Boros Charm of Choices deals 2 damage to any target."},
    {"name": "Holy Strength", "type_line": "Enchantment — Aura", "mana_cost": "{W}",
     "oracle_text": "Enchant creature\nEnchanted creature gets +1/+2."},
    {"name": "Murder", "type_line": "Instant", "mana_cost": "{1}{B}{B}",
     "oracle_text": "Destroy target creature."},
    {"name": "Ivory Relic", "type_line": "Artifact", "mana_cost": "{2}",
     "oracle_text": "{1}: You gain 1 life. Activate only once each turn."},
    {"name": "Fiery Walker", "type_line": "Legendary Planeswalker — Chandra", "mana_cost": "{3}{R}",
     "loyalty": "3",
     "oracle_text": "+1: Fiery Walker deals 2 damage to target opponent.\n−3: Draw a card."},
    {"name": "Furnace of Wrath", "type_line": "Enchantment", "mana_cost": "{1}{R}{R}{R}",
     "oracle_text": "If a source you control would deal damage to a permanent or player, it deals double that damage instead."}
]"#;

struct Table {
    db: CardDatabase,
    state: GameState,
    alice: PlayerId,
    bob: PlayerId,
}

impl Table {
    /// A started game at Alice's first precombat main phase
    fn new() -> Table {
        let mut db = CardDatabase::new();
        for card in CardLoader::parse(CARDS).unwrap() {
            db.add_card(card);
        }
        let forest = db.get_card("Forest").unwrap();

        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default().with_seed(42));
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        for player in [alice, bob] {
            game.load_deck(player, std::iter::repeat(forest.clone()).take(20))
                .unwrap();
        }
        let mut table = Table {
            db,
            state: game.start_game().unwrap(),
            alice,
            bob,
        };
        table.pass_until(Step::PrecombatMain);
        table
    }

    fn give(&mut self, name: &str, owner: PlayerId, zone: Zone) -> CardId {
        let def = self.db.get_card(name).unwrap();
        self.state.create_card(def, owner, zone).unwrap()
    }

    fn add_mana(&mut self, player: PlayerId, symbols: &str) {
        let produced = ManaCost::parse(symbols).unwrap();
        let player = self.state.player_mut(player).unwrap();
        player.mana_pool = player.mana_pool.add_produced(&produced);
    }

    /// Apply an action that must succeed
    fn ok(&mut self, result: Result<ActionResult>) {
        let result = result.unwrap();
        assert!(result.success, "action failed: {:?}", result.error);
        self.state = result.state;
    }

    fn pass(&mut self) {
        let holder = self.state.priority_player.unwrap();
        let result = self.state.pass_priority(holder);
        self.ok(result);
    }

    /// Everyone passes once in a row, resolving the top of the stack
    fn resolve(&mut self) {
        assert!(!self.state.stack.is_empty(), "nothing to resolve");
        self.pass();
        self.pass();
    }

    fn pass_until(&mut self, step: Step) {
        while self.state.turn.step != step {
            self.pass();
        }
    }

    fn life(&self, player: PlayerId) -> i32 {
        self.state.player(player).unwrap().life
    }
}

#[test]
fn test_lightning_bolt_to_face() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let bolt = t.give("Lightning Bolt", alice, Zone::Hand);
    t.add_mana(alice, "{R}");

    let result = t
        .state
        .cast_spell(alice, bolt, CastOptions::targets([TargetRef::Player(bob)]));
    t.ok(result);
    assert_eq!(t.state.stack.len(), 1);
    assert_eq!(t.state.priority_player, Some(bob));
    assert_eq!(t.state.consecutive_passes, 0);
    assert_eq!(t.state.player(alice).unwrap().mana_pool.total(), 0);

    t.pass();
    assert_eq!(t.state.priority_player, Some(alice));
    assert_eq!(t.state.consecutive_passes, 1);
    t.pass();

    assert_eq!(t.life(bob), 17);
    assert!(t.state.stack.is_empty());
    assert!(t.state.graveyard(alice).contains(&bolt));
    assert_eq!(t.state.priority_player, Some(alice));
    assert_eq!(t.state.consecutive_passes, 0);
    assert_eq!(t.state.turn.step, Step::PrecombatMain);
}

#[test]
fn test_rejected_cast_leaves_state_untouched() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let bolt = t.give("Lightning Bolt", alice, Zone::Hand);

    // No mana
    let result = t
        .state
        .cast_spell(alice, bolt, CastOptions::targets([TargetRef::Player(bob)]))
        .unwrap();
    assert!(!result.success);
    assert!(!result.is_waiting());
    assert!(result.error.is_some());
    assert!(result.state.hand(alice).contains(&bolt));
    assert!(result.state.stack.is_empty());

    // Bob doesn't hold priority
    t.add_mana(bob, "{R}");
    let bobs_bolt = t.give("Lightning Bolt", bob, Zone::Hand);
    let result = t
        .state
        .cast_spell(bob, bobs_bolt, CastOptions::targets([TargetRef::Player(alice)]))
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.state.player(bob).unwrap().mana_pool.total(), 1);
}

#[test]
fn test_missing_target_waits_for_a_choice() {
    let mut t = Table::new();
    let alice = t.alice;
    let bolt = t.give("Lightning Bolt", alice, Zone::Hand);
    t.add_mana(alice, "{R}");

    let result = t.state.cast_spell(alice, bolt, CastOptions::default()).unwrap();
    assert!(result.is_waiting());
    let choice = result.pending_choice.unwrap();
    assert_eq!(choice.kind, ChoiceKind::Targets);
    assert_eq!(choice.player, alice);
    assert!(choice
        .options
        .contains(&ChoiceOption::Target(TargetRef::Player(t.bob))));
    // Nothing was paid or moved
    assert!(result.state.hand(alice).contains(&bolt));
    assert_eq!(result.state.player(alice).unwrap().mana_pool.total(), 1);
}

#[test]
fn test_sorcery_timing() {
    let mut t = Table::new();
    let alice = t.alice;
    let bears = t.give("Grizzly Bears", alice, Zone::Hand);
    let bolt = t.give("Lightning Bolt", alice, Zone::Hand);
    t.add_mana(alice, "{G}{G}{R}");

    // Instants are fine while something is on the stack, creatures are not
    let result = t
        .state
        .cast_spell(alice, bolt, CastOptions::targets([TargetRef::Player(t.bob)]));
    t.ok(result);
    t.pass();
    assert_eq!(t.state.priority_player, Some(alice));
    let result = t
        .state
        .cast_spell(alice, bears, CastOptions::default())
        .unwrap();
    assert!(!result.success);

    t.pass();
    assert!(t.state.stack.is_empty());
    let result = t.state.cast_spell(alice, bears, CastOptions::default());
    t.ok(result);
    t.resolve();

    let bears_card = t.state.card(bears).unwrap();
    assert!(t.state.battlefield_of(alice).contains(&bears));
    assert!(bears_card.summoning_sick);
    assert_eq!(bears_card.controller, alice);
}

#[test]
fn test_stack_resolves_last_in_first_out() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let alices_bolt = t.give("Lightning Bolt", alice, Zone::Hand);
    let bobs_bolt = t.give("Lightning Bolt", bob, Zone::Hand);
    t.add_mana(alice, "{R}");
    t.add_mana(bob, "{R}");

    let result = t
        .state
        .cast_spell(alice, alices_bolt, CastOptions::targets([TargetRef::Player(bob)]));
    t.ok(result);
    let result = t
        .state
        .cast_spell(bob, bobs_bolt, CastOptions::targets([TargetRef::Player(alice)]));
    t.ok(result);
    assert_eq!(t.state.stack.len(), 2);
    assert_eq!(t.state.priority_player, Some(alice));

    t.resolve();
    assert_eq!(t.life(alice), 17);
    assert_eq!(t.life(bob), 20);
    assert_eq!(t.state.stack.len(), 1);

    t.resolve();
    assert_eq!(t.life(bob), 17);
    assert!(t.state.stack.is_empty());
}

#[test]
fn test_counterspell() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let bears = t.give("Grizzly Bears", alice, Zone::Hand);
    let counter = t.give("Counterspell", bob, Zone::Hand);
    t.add_mana(alice, "{G}{G}");
    t.add_mana(bob, "{U}{U}");

    let result = t.state.cast_spell(alice, bears, CastOptions::default());
    t.ok(result);
    let spell = t.state.stack[0].id;
    let result = t.state.cast_spell(
        bob,
        counter,
        CastOptions::targets([TargetRef::StackObject(spell)]),
    );
    t.ok(result);

    t.resolve();
    assert!(t.state.graveyard(bob).contains(&counter));
    assert_eq!(t.state.stack.len(), 1);
    assert!(t.state.stack[0].countered);

    t.resolve();
    assert!(t.state.stack.is_empty());
    assert!(t.state.graveyard(alice).contains(&bears));
    assert!(t.state.battlefield_of(alice).is_empty());
}

#[test]
fn test_spell_with_no_legal_targets_does_nothing() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let bears = t.give("Grizzly Bears", bob, Zone::Battlefield);
    let bolt = t.give("Lightning Bolt", alice, Zone::Hand);
    let unsummon = t.give("Unsummon", bob, Zone::Hand);
    t.add_mana(alice, "{R}");
    t.add_mana(bob, "{U}");

    let result = t
        .state
        .cast_spell(alice, bolt, CastOptions::targets([TargetRef::Card(bears)]));
    t.ok(result);
    let result = t
        .state
        .cast_spell(bob, unsummon, CastOptions::targets([TargetRef::Card(bears)]));
    t.ok(result);

    t.resolve();
    assert!(t.state.hand(bob).contains(&bears));

    t.resolve();
    assert!(t.state.stack.is_empty());
    assert!(t.state.graveyard(alice).contains(&bolt));
    assert!(t.state.hand(bob).contains(&bears));
    assert_eq!(t.life(bob), 20);
}

#[test]
fn test_prevention_shield() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let salve = t.give("Healing Salve", alice, Zone::Hand);
    let bolt = t.give("Lightning Bolt", bob, Zone::Hand);
    t.add_mana(alice, "{W}");
    t.add_mana(bob, "{R}");

    let result = t
        .state
        .cast_spell(alice, salve, CastOptions::targets([TargetRef::Player(alice)]));
    t.ok(result);
    t.resolve();
    assert_eq!(t.state.effects.shields().len(), 1);

    // Alice passes with an empty stack so Bob can respond at instant speed
    t.pass();
    assert_eq!(t.state.priority_player, Some(bob));
    let result = t
        .state
        .cast_spell(bob, bolt, CastOptions::targets([TargetRef::Player(alice)]));
    t.ok(result);
    t.resolve();

    assert_eq!(t.life(alice), 20);
    assert!(t.state.effects.shields().is_empty());
}

#[test]
fn test_x_spell() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let blaze = t.give("Blaze", alice, Zone::Hand);
    t.add_mana(alice, "{R}{R}{R}{R}");

    let result = t
        .state
        .cast_spell(alice, blaze, CastOptions::targets([TargetRef::Player(bob)]))
        .unwrap();
    let choice = result.pending_choice.unwrap();
    assert_eq!(choice.kind, ChoiceKind::XValue);
    assert_eq!(choice.options, vec![ChoiceOption::Range { min: 0, max: 3 }]);

    let result = t.state.cast_spell(
        alice,
        blaze,
        CastOptions::targets([TargetRef::Player(bob)]).with_x(3),
    );
    t.ok(result);
    assert_eq!(t.state.player(alice).unwrap().mana_pool.total(), 0);
    t.resolve();
    assert_eq!(t.life(bob), 17);
}

#[test]
fn test_x_beyond_the_pool_is_rejected() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let twin = t.give("Twin Blaze", alice, Zone::Hand);
    t.add_mana(alice, "{R}");

    let result = t
        .state
        .cast_spell(
            alice,
            twin,
            CastOptions::targets([TargetRef::Player(bob)]).with_x(1 << 31),
        )
        .unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("X = 2147483648"));
    assert!(result.state.stack.is_empty());
    assert_eq!(result.state.player(alice).unwrap().mana_pool.total(), 1);

    t.add_mana(alice, "{R}{R}");
    let result = t
        .state
        .cast_spell(
            alice,
            twin,
            CastOptions::targets([TargetRef::Player(bob)]).with_x(2),
        )
        .unwrap();
    assert!(!result.success);

    let result = t.state.cast_spell(
        alice,
        twin,
        CastOptions::targets([TargetRef::Player(bob)]).with_x(1),
    );
    t.ok(result);
    t.resolve();
    assert_eq!(t.life(bob), 19);
}

#[test]
fn test_modal_spell() {
    let mut t = Table::new();
    let alice = t.alice;
    let charm = t.give("Boros Charm of Choices", alice, Zone::Hand);
    t.add_mana(alice, "{R}{W}");

    let result = t
        .state
        .cast_spell(alice, charm, CastOptions::default())
        .unwrap();
    let choice = result.pending_choice.unwrap();
    assert_eq!(choice.kind, ChoiceKind::Modes);
    assert_eq!(choice.options.len(), 2);

    let result = t.state.cast_spell(
        alice,
        charm,
        CastOptions::targets([TargetRef::Player(alice)]).with_modes([0]),
    );
    t.ok(result);
    t.resolve();
    assert_eq!(t.life(alice), 23);
    assert_eq!(t.life(t.bob), 20);
}

#[test]
fn test_tokens() {
    let mut t = Table::new();
    let alice = t.alice;
    let alarm = t.give("Raise the Alarm", alice, Zone::Hand);
    t.add_mana(alice, "{W}{W}");

    let result = t.state.cast_spell(alice, alarm, CastOptions::default());
    t.ok(result);
    t.resolve();

    let soldiers: Vec<_> = t
        .state
        .battlefield_of(alice)
        .into_iter()
        .map(|id| t.state.card(id).unwrap().clone())
        .collect();
    assert_eq!(soldiers.len(), 2);
    for soldier in &soldiers {
        assert!(soldier.is_token);
        assert!(soldier.is_creature());
        assert_eq!((soldier.power(), soldier.toughness()), (1, 1));
    }
}

#[test]
fn test_enters_the_battlefield_trigger() {
    let mut t = Table::new();
    let alice = t.alice;
    let elf = t.give("Elvish Visionary", alice, Zone::Hand);
    t.add_mana(alice, "{G}{G}");
    let hand_before = t.state.hand(alice).len();

    let result = t.state.cast_spell(alice, elf, CastOptions::default());
    t.ok(result);
    t.resolve();

    assert!(t.state.battlefield_of(alice).contains(&elf));
    assert_eq!(t.state.stack.len(), 1);
    assert!(matches!(
        t.state.stack[0].kind,
        StackObjectKind::TriggeredAbility { source, .. } if source == elf
    ));

    t.resolve();
    assert!(t.state.stack.is_empty());
    assert_eq!(t.state.hand(alice).len(), hand_before);
}

#[test]
fn test_aura_attaches_and_falls_off() {
    let mut t = Table::new();
    let alice = t.alice;
    let bears = t.give("Grizzly Bears", alice, Zone::Battlefield);
    let aura = t.give("Holy Strength", alice, Zone::Hand);
    let murder = t.give("Murder", alice, Zone::Hand);
    t.add_mana(alice, "{W}{B}{B}{B}");

    let result = t.state.cast_spell(alice, aura, CastOptions::default()).unwrap();
    assert_eq!(result.pending_choice.unwrap().kind, ChoiceKind::Targets);

    let result = t
        .state
        .cast_spell(alice, aura, CastOptions::targets([TargetRef::Card(bears)]));
    t.ok(result);
    t.resolve();
    assert_eq!(t.state.card(aura).unwrap().attached_to, Some(bears));
    assert!(t.state.card(bears).unwrap().attachments.contains(&aura));

    let result = t
        .state
        .cast_spell(alice, murder, CastOptions::targets([TargetRef::Card(bears)]));
    t.ok(result);
    t.resolve();
    assert!(t.state.graveyard(alice).contains(&bears));
    assert!(t.state.graveyard(alice).contains(&aura));
    assert!(t.state.battlefield().is_empty());
}

#[test]
fn test_mana_ability_keeps_priority() {
    let mut t = Table::new();
    let alice = t.alice;
    let forest = t.give("Forest", alice, Zone::Battlefield);

    let result = t
        .state
        .activate_ability(alice, forest, 0, ActivateOptions::default());
    t.ok(result);
    assert!(t.state.stack.is_empty());
    assert_eq!(t.state.priority_player, Some(alice));
    assert!(t.state.card(forest).unwrap().tapped);
    assert_eq!(
        t.state.player(alice).unwrap().mana_pool.get(ManaType::Green),
        1
    );

    let again = t
        .state
        .activate_ability(alice, forest, 0, ActivateOptions::default())
        .unwrap();
    assert!(!again.success);

    // Unspent mana is gone at the next step
    t.pass_until(Step::BeginCombat);
    assert_eq!(t.state.player(alice).unwrap().mana_pool.total(), 0);
}

#[test]
fn test_once_per_turn_ability() {
    let mut t = Table::new();
    let alice = t.alice;
    let relic = t.give("Ivory Relic", alice, Zone::Battlefield);
    t.add_mana(alice, "{W}{W}");

    let result = t
        .state
        .activate_ability(alice, relic, 0, ActivateOptions::default());
    t.ok(result);
    assert_eq!(t.state.stack.len(), 1);
    t.resolve();
    assert_eq!(t.life(alice), 21);

    let again = t
        .state
        .activate_ability(alice, relic, 0, ActivateOptions::default())
        .unwrap();
    assert!(!again.success);
    assert_eq!(again.state.player(alice).unwrap().mana_pool.total(), 1);
}

#[test]
fn test_loyalty_ability() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let walker = t.give("Fiery Walker", alice, Zone::Battlefield);
    assert_eq!(t.state.card(walker).unwrap().loyalty(), 3);

    let result = t.state.activate_loyalty_ability(
        alice,
        walker,
        0,
        ActivateOptions::targets([TargetRef::Player(bob)]),
    );
    t.ok(result);
    t.resolve();
    assert_eq!(t.state.card(walker).unwrap().loyalty(), 4);
    assert_eq!(t.life(bob), 18);

    // One loyalty ability per planeswalker per turn
    let again = t
        .state
        .activate_loyalty_ability(alice, walker, 1, ActivateOptions::default())
        .unwrap();
    assert!(!again.success);
}

#[test]
fn test_static_damage_doubler() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.give("Furnace of Wrath", alice, Zone::Battlefield);
    let bolt = t.give("Lightning Bolt", alice, Zone::Hand);
    t.add_mana(alice, "{R}");

    let result = t
        .state
        .cast_spell(alice, bolt, CastOptions::targets([TargetRef::Player(bob)]));
    t.ok(result);
    t.resolve();
    assert_eq!(t.life(bob), 14);
}

#[test]
fn test_land_play() {
    let mut t = Table::new();
    let alice = t.alice;
    let lands: Vec<CardId> = t.state.hand(alice).iter().take(2).copied().collect();
    assert!(t.state.can_play_land(alice));

    let result = t.state.play_land(alice, lands[0]);
    t.ok(result);
    assert!(t.state.battlefield_of(alice).contains(&lands[0]));
    assert!(!t.state.can_play_land(alice));

    let second = t.state.play_land(alice, lands[1]).unwrap();
    assert!(!second.success);
    assert!(second.state.hand(alice).contains(&lands[1]));
}

#[test]
fn test_concede_and_draw_offers() {
    let t = Table::new();
    let (alice, bob) = (t.alice, t.bob);

    let conceded = t.state.concede(bob).unwrap();
    assert!(conceded.success);
    assert!(conceded.state.is_over());
    assert_eq!(conceded.state.winners, vec![alice]);

    let offered = t.state.offer_draw(alice).unwrap();
    assert!(offered.success);
    assert!(!offered.state.is_over());
    let drawn = offered.state.accept_draw(bob).unwrap();
    assert!(drawn.success);
    assert!(drawn.state.is_over());
    assert!(drawn.state.winners.is_empty());

    let declined = offered.state.decline_draw(bob).unwrap();
    assert!(declined.success);
    assert!(!declined.state.is_over());
    assert!(!declined.state.accept_draw(bob).unwrap().success);
}
