//! Replacement and prevention effect system
//!
//! Replacement effects rewrite an event before it happens ("instead",
//! "prevent", "skip"). Prevention shields are the quantity-bounded variant
//! ("prevent the next 3 damage"). "As though" grants are capability flags
//! queried by the legality checks. All three live in one `EffectStore`
//! owned by the game state, so separate games never share effects.
//!
//! Ordering for one event:
//! 1. prevention shields, first registered first
//! 2. self-replacement effects (sourced from the object the event is about)
//! 3. the affected player's effects
//! 4. the other controllers' effects in APNAP order from the active player
//!
//! Within one controller, lower layers apply first, then earlier timestamps.
//! Every effect applies to a given event at most once.

use crate::core::{CardId, PlayerId, TargetRef};
use crate::zones::Zone;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layer for prevention-style effects
pub const PREVENTION_LAYER: u32 = 4;

/// Layer for replacement and doubling effects
pub const MODIFICATION_LAYER: u32 = 5;

/// Identifier of a registered effect, shield or grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectId(pub u32);

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// What the replacement manager needs to know about the game
///
/// Implemented by `GameState`; tests use small fixtures.
pub trait RulesContext {
    fn active_player(&self) -> PlayerId;

    /// Players still in the game, in turn order
    fn turn_order(&self) -> Vec<PlayerId>;

    fn controller_of(&self, card: CardId) -> Option<PlayerId>;

    fn turn_number(&self) -> u32;

    fn stack_is_empty(&self) -> bool;
}

/// An event that replacement effects may rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Damage {
        source: Option<CardId>,
        target: TargetRef,
        amount: u32,
        combat: bool,
    },
    LifeGain {
        player: PlayerId,
        amount: u32,
    },
    LifeLoss {
        player: PlayerId,
        amount: u32,
    },
    Draw {
        player: PlayerId,
        count: u32,
    },
    Destroy {
        card: CardId,
        destination: Zone,
    },
}

impl GameEvent {
    pub fn damage(source: Option<CardId>, target: TargetRef, amount: u32) -> Self {
        GameEvent::Damage {
            source,
            target,
            amount,
            combat: false,
        }
    }

    /// The quantity of a damage, life or draw event
    pub fn amount(&self) -> Option<u32> {
        match self {
            GameEvent::Damage { amount, .. }
            | GameEvent::LifeGain { amount, .. }
            | GameEvent::LifeLoss { amount, .. } => Some(*amount),
            GameEvent::Draw { count, .. } => Some(*count),
            GameEvent::Destroy { .. } => None,
        }
    }

    fn with_amount(mut self, value: u32) -> Self {
        match &mut self {
            GameEvent::Damage { amount, .. }
            | GameEvent::LifeGain { amount, .. }
            | GameEvent::LifeLoss { amount, .. } => *amount = value,
            GameEvent::Draw { count, .. } => *count = value,
            GameEvent::Destroy { .. } => {}
        }
        self
    }

    /// The player the event happens to
    pub fn affected_player(&self, ctx: &impl RulesContext) -> Option<PlayerId> {
        match self {
            GameEvent::Damage { target, .. } => match target {
                TargetRef::Player(p) => Some(*p),
                TargetRef::Card(c) => ctx.controller_of(*c),
                TargetRef::StackObject(_) => None,
            },
            GameEvent::LifeGain { player, .. }
            | GameEvent::LifeLoss { player, .. }
            | GameEvent::Draw { player, .. } => Some(*player),
            GameEvent::Destroy { card, .. } => ctx.controller_of(*card),
        }
    }

    /// Objects whose own effects count as self-replacement for this event
    fn subject_cards(&self) -> [Option<CardId>; 2] {
        match self {
            GameEvent::Damage { source, target, .. } => {
                let target_card = match target {
                    TargetRef::Card(c) => Some(*c),
                    _ => None,
                };
                [target_card, *source]
            }
            GameEvent::Destroy { card, .. } => [Some(*card), None],
            _ => [None, None],
        }
    }

    /// Nothing would happen any more
    pub fn is_empty(&self) -> bool {
        self.amount() == Some(0)
    }
}

/// Which events an effect looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventFilter {
    AnyDamage,
    CombatDamage,
    DamageTo(TargetRef),
    DamageToCreaturesControlledBy(PlayerId),
    DamageFromSource(CardId),
    DamageFromSourcesControlledBy(PlayerId),
    /// Damage to a player other than this one, or to their permanents
    DamageToOpponentsOf(PlayerId),
    LifeGainBy(PlayerId),
    LifeLossBy(PlayerId),
    DrawBy(PlayerId),
    DestroyOf(CardId),
    DestroyOfPermanentsControlledBy(PlayerId),
}

impl EventFilter {
    pub fn matches(&self, event: &GameEvent, ctx: &impl RulesContext) -> bool {
        match (self, event) {
            (EventFilter::AnyDamage, GameEvent::Damage { .. }) => true,
            (EventFilter::CombatDamage, GameEvent::Damage { combat, .. }) => *combat,
            (EventFilter::DamageTo(expected), GameEvent::Damage { target, .. }) => {
                expected == target
            }
            (EventFilter::DamageToCreaturesControlledBy(p), GameEvent::Damage { target, .. }) => {
                matches!(target, TargetRef::Card(c) if ctx.controller_of(*c) == Some(*p))
            }
            (EventFilter::DamageFromSource(card), GameEvent::Damage { source, .. }) => {
                *source == Some(*card)
            }
            (EventFilter::DamageFromSourcesControlledBy(p), GameEvent::Damage { source, .. }) => {
                source.and_then(|s| ctx.controller_of(s)) == Some(*p)
            }
            (EventFilter::DamageToOpponentsOf(p), GameEvent::Damage { .. }) => {
                matches!(event.affected_player(ctx), Some(victim) if victim != *p)
            }
            (EventFilter::LifeGainBy(p), GameEvent::LifeGain { player, .. }) => p == player,
            (EventFilter::LifeLossBy(p), GameEvent::LifeLoss { player, .. }) => p == player,
            (EventFilter::DrawBy(p), GameEvent::Draw { player, .. }) => p == player,
            (EventFilter::DestroyOf(c), GameEvent::Destroy { card, .. }) => c == card,
            (EventFilter::DestroyOfPermanentsControlledBy(p), GameEvent::Destroy { card, .. }) => {
                ctx.controller_of(*card) == Some(*p)
            }
            _ => false,
        }
    }
}

/// How an effect rewrites a matching event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTransform {
    /// Reduce the amount by up to N
    Prevent(u32),
    PreventAll,
    Multiply(u32),
    Add(u32),
    SetTo(u32),
    /// The event does not happen
    Skip,
    /// A destroyed permanent is exiled instead
    ExileInstead,
}

impl EventTransform {
    /// Apply to an event; `None` means the event was replaced by nothing
    pub fn apply(&self, event: GameEvent) -> Option<GameEvent> {
        match self {
            EventTransform::Skip => None,
            EventTransform::ExileInstead => match event {
                GameEvent::Destroy { card, .. } => Some(GameEvent::Destroy {
                    card,
                    destination: Zone::Exile,
                }),
                other => Some(other),
            },
            _ => {
                let Some(amount) = event.amount() else {
                    return Some(event);
                };
                let new_amount = match self {
                    EventTransform::Prevent(n) => amount.saturating_sub(*n),
                    EventTransform::PreventAll => 0,
                    EventTransform::Multiply(k) => amount.saturating_mul(*k),
                    EventTransform::Add(n) => amount.saturating_add(*n),
                    EventTransform::SetTo(n) => *n,
                    EventTransform::Skip | EventTransform::ExileInstead => amount,
                };
                Some(event.with_amount(new_amount))
            }
        }
    }
}

/// When an effect stops existing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDuration {
    /// Until the cleanup step of the given turn
    EndOfTurn { turn: u32 },
    /// While the source permanent stays on the battlefield
    WhileSourceOnBattlefield,
    Permanent,
}

impl EffectDuration {
    fn is_active(&self, ctx: &impl RulesContext) -> bool {
        match self {
            EffectDuration::EndOfTurn { turn } => ctx.turn_number() <= *turn,
            _ => true,
        }
    }
}

/// A registered replacement effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementEffect {
    pub id: EffectId,
    pub source: Option<CardId>,
    pub controller: PlayerId,
    pub layer: u32,
    pub timestamp: u64,
    pub filter: EventFilter,
    pub transform: EventTransform,
    pub duration: EffectDuration,
    pub description: String,
}

impl ReplacementEffect {
    /// An unregistered effect; the store assigns id and timestamp
    pub fn new(
        source: Option<CardId>,
        controller: PlayerId,
        layer: u32,
        filter: EventFilter,
        transform: EventTransform,
        duration: EffectDuration,
    ) -> Self {
        ReplacementEffect {
            id: EffectId(0),
            source,
            controller,
            layer,
            timestamp: 0,
            filter,
            transform,
            duration,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn is_self_replacement(&self, event: &GameEvent) -> bool {
        self.source.is_some() && event.subject_cards().contains(&self.source)
    }
}

/// "Prevent the next N damage that would be dealt to ..."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreventionShield {
    pub id: EffectId,
    pub source: Option<CardId>,
    pub controller: PlayerId,
    pub protects: TargetRef,
    pub amount_remaining: u32,
    pub duration: EffectDuration,
    pub timestamp: u64,
}

impl PreventionShield {
    pub fn new(
        source: Option<CardId>,
        controller: PlayerId,
        protects: TargetRef,
        amount: u32,
        duration: EffectDuration,
    ) -> Self {
        PreventionShield {
            id: EffectId(0),
            source,
            controller,
            protects,
            amount_remaining: amount,
            duration,
            timestamp: 0,
        }
    }
}

/// Things a player may do "as though" a rule didn't apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    CastWithFlash,
    IgnoreSummoningSickness,
}

/// State-dependent condition on a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantCondition {
    YourTurn,
    OpponentsTurn,
    StackEmpty,
}

/// A capability granted to a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsThoughGrant {
    pub id: EffectId,
    pub player: PlayerId,
    pub capability: Capability,
    pub condition: Option<GrantCondition>,
    pub duration: EffectDuration,
    pub source: Option<CardId>,
}

impl AsThoughGrant {
    pub fn new(
        player: PlayerId,
        capability: Capability,
        duration: EffectDuration,
        source: Option<CardId>,
    ) -> Self {
        AsThoughGrant {
            id: EffectId(0),
            player,
            capability,
            condition: None,
            duration,
            source,
        }
    }

    pub fn when(mut self, condition: GrantCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    fn holds(&self, ctx: &impl RulesContext) -> bool {
        if !self.duration.is_active(ctx) {
            return false;
        }
        match self.condition {
            None => true,
            Some(GrantCondition::YourTurn) => ctx.active_player() == self.player,
            Some(GrantCondition::OpponentsTurn) => ctx.active_player() != self.player,
            Some(GrantCondition::StackEmpty) => ctx.stack_is_empty(),
        }
    }
}

/// The event after all applicable effects, and what touched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementOutcome {
    /// `None` when the event was skipped
    pub event: Option<GameEvent>,
    /// Effects and shields in the order they applied
    pub applied: Vec<EffectId>,
    /// Damage absorbed by shields
    pub prevented: u32,
}

/// Store of every replacement effect, prevention shield and grant in a game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectStore {
    replacements: Vec<ReplacementEffect>,
    shields: Vec<PreventionShield>,
    grants: Vec<AsThoughGrant>,
    next_id: u32,
    next_timestamp: u64,
}

impl EffectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> (EffectId, u64) {
        self.next_id += 1;
        self.next_timestamp += 1;
        (EffectId(self.next_id), self.next_timestamp)
    }

    pub fn register(&mut self, mut effect: ReplacementEffect) -> EffectId {
        let (id, timestamp) = self.allocate();
        effect.id = id;
        effect.timestamp = timestamp;
        self.replacements.push(effect);
        id
    }

    pub fn add_shield(&mut self, mut shield: PreventionShield) -> EffectId {
        let (id, timestamp) = self.allocate();
        shield.id = id;
        shield.timestamp = timestamp;
        self.shields.push(shield);
        id
    }

    pub fn grant(&mut self, mut grant: AsThoughGrant) -> EffectId {
        let (id, _) = self.allocate();
        grant.id = id;
        self.grants.push(grant);
        id
    }

    pub fn replacements(&self) -> &[ReplacementEffect] {
        &self.replacements
    }

    pub fn shields(&self) -> &[PreventionShield] {
        &self.shields
    }

    pub fn grants(&self) -> &[AsThoughGrant] {
        &self.grants
    }

    pub fn remove(&mut self, id: EffectId) {
        self.replacements.retain(|e| e.id != id);
        self.shields.retain(|s| s.id != id);
        self.grants.retain(|g| g.id != id);
    }

    /// Drop everything tied to a permanent that left the battlefield
    ///
    /// Returns how many entries were removed.
    pub fn remove_from_source(&mut self, card: CardId) -> usize {
        let before = self.len();
        let tied =
            |source: Option<CardId>, duration: EffectDuration| {
                source == Some(card) && duration == EffectDuration::WhileSourceOnBattlefield
            };
        self.replacements.retain(|e| !tied(e.source, e.duration));
        self.shields.retain(|s| !tied(s.source, s.duration));
        self.grants.retain(|g| !tied(g.source, g.duration));
        before - self.len()
    }

    /// Drop "this turn" effects at cleanup
    pub fn expire_end_of_turn(&mut self, turn: u32) {
        let expired =
            |d: EffectDuration| matches!(d, EffectDuration::EndOfTurn { turn: t } if t <= turn);
        self.replacements.retain(|e| !expired(e.duration));
        self.shields.retain(|s| !expired(s.duration));
        self.grants.retain(|g| !expired(g.duration));
    }

    pub fn len(&self) -> usize {
        self.replacements.len() + self.shields.len() + self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Does `player` currently hold `capability`?
    pub fn has_capability(
        &self,
        player: PlayerId,
        capability: Capability,
        ctx: &impl RulesContext,
    ) -> bool {
        self.grants
            .iter()
            .any(|g| g.player == player && g.capability == capability && g.holds(ctx))
    }

    /// Run an event through shields and replacement effects
    ///
    /// Shields are consumed as they absorb damage; exhausted shields are
    /// discarded.
    pub fn apply(&mut self, event: GameEvent, ctx: &impl RulesContext) -> ReplacementOutcome {
        let mut applied = Vec::new();
        let mut prevented = 0;
        let mut event = event;

        if let GameEvent::Damage { target, amount, .. } = &event {
            let target = *target;
            let mut remaining = *amount;
            let mut order: Vec<usize> = (0..self.shields.len())
                .filter(|&i| {
                    let s = &self.shields[i];
                    s.protects == target && s.amount_remaining > 0 && s.duration.is_active(ctx)
                })
                .collect();
            order.sort_by_key(|&i| self.shields[i].timestamp);

            for i in order {
                if remaining == 0 {
                    break;
                }
                let shield = &mut self.shields[i];
                let absorbed = remaining.min(shield.amount_remaining);
                shield.amount_remaining -= absorbed;
                remaining -= absorbed;
                prevented += absorbed;
                applied.push(shield.id);
            }
            self.shields.retain(|s| s.amount_remaining > 0);
            event = event.with_amount(remaining);
        }

        if event.is_empty() {
            return ReplacementOutcome {
                event: Some(event),
                applied,
                prevented,
            };
        }

        let ordered = self.ordered_candidates(&event, ctx);
        let mut current = Some(event);
        for index in ordered {
            let Some(ev) = current.take() else { break };
            let effect = &self.replacements[index];
            // A rewritten event may no longer match
            if !effect.filter.matches(&ev, ctx) {
                current = Some(ev);
                continue;
            }
            applied.push(effect.id);
            current = effect.transform.apply(ev);
            if current.as_ref().is_some_and(GameEvent::is_empty) {
                break;
            }
        }

        ReplacementOutcome {
            event: current,
            applied,
            prevented,
        }
    }

    /// Indices of matching replacement effects in application order
    fn ordered_candidates(&self, event: &GameEvent, ctx: &impl RulesContext) -> Vec<usize> {
        let candidates: Vec<usize> = (0..self.replacements.len())
            .filter(|&i| {
                let e = &self.replacements[i];
                e.duration.is_active(ctx) && e.filter.matches(event, ctx)
            })
            .collect();

        let affected = event.affected_player(ctx);
        let mut controllers: Vec<PlayerId> = Vec::new();
        if let Some(p) = affected {
            controllers.push(p);
        }
        let order = ctx.turn_order();
        let active = ctx.active_player();
        let start = order.iter().position(|p| *p == active).unwrap_or(0);
        for offset in 0..order.len() {
            let p = order[(start + offset) % order.len()];
            if !controllers.contains(&p) {
                controllers.push(p);
            }
        }

        let by_layer = |a: &usize, b: &usize| {
            let (ea, eb) = (&self.replacements[*a], &self.replacements[*b]);
            (ea.layer, ea.timestamp).cmp(&(eb.layer, eb.timestamp))
        };

        let (mut self_replacements, others): (Vec<usize>, Vec<usize>) = candidates
            .into_iter()
            .partition(|&i| self.replacements[i].is_self_replacement(event));
        self_replacements.sort_by(by_layer);

        let mut ordered = self_replacements;
        for controller in &controllers {
            let mut group: Vec<usize> = others
                .iter()
                .copied()
                .filter(|&i| self.replacements[i].controller == *controller)
                .collect();
            group.sort_by(by_layer);
            ordered.extend(group);
        }
        // Controllers no longer in the game still had their effects registered
        let mut orphans: Vec<usize> = others
            .iter()
            .copied()
            .filter(|&i| !controllers.contains(&self.replacements[i].controller))
            .collect();
        orphans.sort_by(by_layer);
        ordered.extend(orphans);
        ordered
    }
}
