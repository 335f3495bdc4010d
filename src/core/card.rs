//! Card types and definitions
//!
//! A `CardDefinition` is the read-only printed card, shared by every
//! instance through an `Arc`. A `CardInstance` is one physical card during
//! play; its state changes only through the consuming operations below,
//! each of which returns the updated instance.

use crate::core::{
    AbilitySet, CardId, CardName, Color, CounterType, GameEntity, Keyword, ManaCost, PlayerId,
    Subtype,
};
use crate::{MtgError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Card types in MTG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Artifact,
    Battle,
    Creature,
    Enchantment,
    Instant,
    Kindred,
    Land,
    Planeswalker,
    Sorcery,
}

impl CardType {
    pub fn from_name(name: &str) -> Option<CardType> {
        let card_type = match name.to_lowercase().as_str() {
            "artifact" => CardType::Artifact,
            "battle" => CardType::Battle,
            "creature" => CardType::Creature,
            "enchantment" => CardType::Enchantment,
            "instant" => CardType::Instant,
            "kindred" | "tribal" => CardType::Kindred,
            "land" => CardType::Land,
            "planeswalker" => CardType::Planeswalker,
            "sorcery" => CardType::Sorcery,
            _ => return None,
        };
        Some(card_type)
    }

    pub fn is_permanent_type(&self) -> bool {
        !matches!(self, CardType::Instant | CardType::Sorcery | CardType::Kindred)
    }
}

/// Supertypes in MTG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Supertype {
    Basic,
    Legendary,
    Snow,
    World,
}

impl Supertype {
    pub fn from_name(name: &str) -> Option<Supertype> {
        match name.to_lowercase().as_str() {
            "basic" => Some(Supertype::Basic),
            "legendary" => Some(Supertype::Legendary),
            "snow" => Some(Supertype::Snow),
            "world" => Some(Supertype::World),
            _ => None,
        }
    }
}

/// A parsed type line ("Legendary Creature — Elf Druid")
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeLine {
    pub supertypes: SmallVec<[Supertype; 1]>,
    pub types: SmallVec<[CardType; 2]>,
    pub subtypes: SmallVec<[Subtype; 2]>,
}

impl TypeLine {
    /// Parse a type line once, at ingestion
    pub fn parse(text: &str) -> Result<TypeLine> {
        let (main, sub) = match text.split_once('—').or_else(|| text.split_once(" - ")) {
            Some((main, sub)) => (main, sub),
            None => (text, ""),
        };

        let mut line = TypeLine::default();
        for word in main.split_whitespace() {
            if let Some(supertype) = Supertype::from_name(word) {
                line.supertypes.push(supertype);
            } else if let Some(card_type) = CardType::from_name(word) {
                line.types.push(card_type);
            } else {
                return Err(MtgError::InvalidCardFormat(format!(
                    "Unknown card type '{word}' in type line '{text}'"
                )));
            }
        }
        if line.types.is_empty() {
            return Err(MtgError::InvalidCardFormat(format!(
                "Type line '{text}' has no card type"
            )));
        }
        line.subtypes = sub.split_whitespace().map(Subtype::from).collect();
        Ok(line)
    }

    pub fn is(&self, card_type: CardType) -> bool {
        self.types.contains(&card_type)
    }

    pub fn has_supertype(&self, supertype: Supertype) -> bool {
        self.supertypes.contains(&supertype)
    }

    pub fn has_subtype(&self, subtype: &str) -> bool {
        self.subtypes.iter().any(|s| s.as_str().eq_ignore_ascii_case(subtype))
    }

    pub fn is_permanent(&self) -> bool {
        self.types.iter().any(CardType::is_permanent_type)
    }
}

impl fmt::Display for TypeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words: Vec<String> = self.supertypes.iter().map(|s| format!("{s:?}")).collect();
        words.extend(self.types.iter().map(|t| format!("{t:?}")));
        write!(f, "{}", words.join(" "))?;
        if !self.subtypes.is_empty() {
            let subs: Vec<&str> = self.subtypes.iter().map(Subtype::as_str).collect();
            write!(f, " — {}", subs.join(" "))?;
        }
        Ok(())
    }
}

/// Power or toughness as printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PtValue {
    Fixed(i32),
    /// `*` and friends; treated as zero by the engine
    Variable,
}

impl PtValue {
    pub fn parse(text: &str) -> PtValue {
        text.trim()
            .parse::<i32>()
            .map(PtValue::Fixed)
            .unwrap_or(PtValue::Variable)
    }

    pub fn value(&self) -> i32 {
        match self {
            PtValue::Fixed(n) => *n,
            PtValue::Variable => 0,
        }
    }
}

/// One face of a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFace {
    pub name: CardName,
    pub type_line: TypeLine,
    pub mana_cost: ManaCost,
    pub oracle_text: String,
    pub power: Option<PtValue>,
    pub toughness: Option<PtValue>,
    pub loyalty: Option<u32>,
    pub colors: SmallVec<[Color; 2]>,
    pub abilities: AbilitySet,
}

impl CardFace {
    /// A face with no rules text, for tokens and tests
    pub fn new(name: impl Into<CardName>, type_line: TypeLine, mana_cost: ManaCost) -> Self {
        let colors = mana_cost.colors();
        CardFace {
            name: name.into(),
            type_line,
            mana_cost,
            oracle_text: String::new(),
            power: None,
            toughness: None,
            loyalty: None,
            colors,
            abilities: AbilitySet::default(),
        }
    }
}

/// The printed card, shared by all its instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Front face first; transforming and split cards carry more
    pub faces: SmallVec<[CardFace; 1]>,
    pub color_identity: SmallVec<[Color; 2]>,
}

impl CardDefinition {
    pub fn single(face: CardFace) -> Self {
        let color_identity = face.colors.clone();
        let mut faces = SmallVec::new();
        faces.push(face);
        CardDefinition {
            faces,
            color_identity,
        }
    }

    pub fn front(&self) -> &CardFace {
        &self.faces[0]
    }

    pub fn name(&self) -> &CardName {
        &self.front().name
    }
}

/// Represents a card in the game
///
/// Cards have a unique id but many cards can share the same definition.
/// This struct represents the instance of a card during gameplay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardInstance {
    pub id: CardId,
    pub definition: Arc<CardDefinition>,
    /// Index into `definition.faces`
    pub face: usize,
    pub owner: PlayerId,
    pub controller: PlayerId,
    pub tapped: bool,
    pub damage: u32,
    /// Some marked damage came from a deathtouch source
    pub deathtouch_damage: bool,
    pub counters: SmallVec<[(CounterType, u32); 2]>,
    /// Cards attached to this one (auras, equipment)
    pub attachments: SmallVec<[CardId; 1]>,
    pub attached_to: Option<CardId>,
    pub summoning_sick: bool,
    pub phased_out: bool,
    pub is_token: bool,
    /// Activations this turn, by ability index
    pub activations: SmallVec<[(usize, u32); 2]>,
    pub loyalty_activated: bool,
}

impl CardInstance {
    pub fn new(id: CardId, definition: Arc<CardDefinition>, owner: PlayerId) -> Self {
        CardInstance {
            id,
            definition,
            face: 0,
            owner,
            controller: owner,
            tapped: false,
            damage: 0,
            deathtouch_damage: false,
            counters: SmallVec::new(),
            attachments: SmallVec::new(),
            attached_to: None,
            summoning_sick: true,
            phased_out: false,
            is_token: false,
            activations: SmallVec::new(),
            loyalty_activated: false,
        }
    }

    pub fn current_face(&self) -> &CardFace {
        self.definition
            .faces
            .get(self.face)
            .unwrap_or_else(|| self.definition.front())
    }

    pub fn card_name(&self) -> &CardName {
        &self.current_face().name
    }

    pub fn type_line(&self) -> &TypeLine {
        &self.current_face().type_line
    }

    pub fn abilities(&self) -> &AbilitySet {
        &self.current_face().abilities
    }

    pub fn mana_cost(&self) -> &ManaCost {
        &self.current_face().mana_cost
    }

    pub fn is_type(&self, card_type: CardType) -> bool {
        self.type_line().is(card_type)
    }

    pub fn is_creature(&self) -> bool {
        self.is_type(CardType::Creature)
    }

    pub fn is_land(&self) -> bool {
        self.is_type(CardType::Land)
    }

    pub fn is_planeswalker(&self) -> bool {
        self.is_type(CardType::Planeswalker)
    }

    pub fn is_instant_or_sorcery(&self) -> bool {
        self.is_type(CardType::Instant) || self.is_type(CardType::Sorcery)
    }

    pub fn is_permanent(&self) -> bool {
        self.type_line().is_permanent()
    }

    pub fn has_keyword(&self, keyword: &Keyword) -> bool {
        self.abilities().has_keyword(keyword)
    }

    pub fn counter(&self, kind: &CounterType) -> u32 {
        self.counters
            .iter()
            .find(|(t, _)| t == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Get current power (including counters)
    pub fn power(&self) -> i32 {
        let base = self.current_face().power.map(|p| p.value()).unwrap_or(0);
        base + self.counter(&CounterType::PlusOne) as i32
            - self.counter(&CounterType::MinusOne) as i32
    }

    /// Get current toughness (including counters)
    pub fn toughness(&self) -> i32 {
        let base = self.current_face().toughness.map(|t| t.value()).unwrap_or(0);
        base + self.counter(&CounterType::PlusOne) as i32
            - self.counter(&CounterType::MinusOne) as i32
    }

    pub fn loyalty(&self) -> u32 {
        self.counter(&CounterType::Loyalty)
    }

    pub fn activations_this_turn(&self, ability_index: usize) -> u32 {
        self.activations
            .iter()
            .find(|(i, _)| *i == ability_index)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn tap(mut self) -> Self {
        self.tapped = true;
        self
    }

    pub fn untap(mut self) -> Self {
        self.tapped = false;
        self
    }

    pub fn add_counters(mut self, kind: CounterType, amount: u32) -> Self {
        if let Some((_, count)) = self.counters.iter_mut().find(|(t, _)| *t == kind) {
            *count += amount;
        } else if amount > 0 {
            self.counters.push((kind, amount));
        }
        self
    }

    /// Remove up to `amount` counters of a kind
    pub fn remove_counters(mut self, kind: &CounterType, amount: u32) -> Self {
        if let Some((_, count)) = self.counters.iter_mut().find(|(t, _)| t == kind) {
            *count = count.saturating_sub(amount);
        }
        self.counters.retain(|(_, n)| *n > 0);
        self
    }

    pub fn mark_damage(mut self, amount: u32, deathtouch: bool) -> Self {
        self.damage += amount;
        self.deathtouch_damage |= deathtouch && amount > 0;
        self
    }

    pub fn clear_damage(mut self) -> Self {
        self.damage = 0;
        self.deathtouch_damage = false;
        self
    }

    /// Record that `host` now carries this card
    pub fn attach_to(mut self, host: CardId) -> Self {
        self.attached_to = Some(host);
        self
    }

    pub fn detach(mut self) -> Self {
        self.attached_to = None;
        self
    }

    pub fn add_attachment(mut self, attachment: CardId) -> Self {
        if !self.attachments.contains(&attachment) {
            self.attachments.push(attachment);
        }
        self
    }

    pub fn remove_attachment(mut self, attachment: CardId) -> Self {
        self.attachments.retain(|a| *a != attachment);
        self
    }

    /// A permanent that changes controller is summoning sick for its new controller
    pub fn change_controller(mut self, controller: PlayerId) -> Self {
        if controller != self.controller {
            self.controller = controller;
            self.summoning_sick = true;
        }
        self
    }

    /// Flip to the next face; single-faced cards are unchanged
    pub fn transform(mut self) -> Self {
        let faces = self.definition.faces.len();
        if faces > 1 {
            self.face = (self.face + 1) % faces;
        }
        self
    }

    pub fn record_activation(mut self, ability_index: usize) -> Self {
        if let Some((_, n)) = self.activations.iter_mut().find(|(i, _)| *i == ability_index) {
            *n += 1;
        } else {
            self.activations.push((ability_index, 1));
        }
        self
    }

    pub fn record_loyalty_activation(mut self) -> Self {
        self.loyalty_activated = true;
        self
    }

    /// Clear the per-turn activation record
    pub fn reset_turn_limits(mut self) -> Self {
        self.activations.clear();
        self.loyalty_activated = false;
        self
    }

    /// A card that changes zones becomes a new object with no memory
    pub fn reset_for_zone_change(mut self) -> Self {
        self.face = 0;
        self.controller = self.owner;
        self.tapped = false;
        self.damage = 0;
        self.deathtouch_damage = false;
        self.counters.clear();
        self.attachments.clear();
        self.attached_to = None;
        self.summoning_sick = true;
        self.phased_out = false;
        self.reset_turn_limits()
    }
}

impl GameEntity<CardInstance> for CardInstance {
    fn id(&self) -> CardId {
        self.id
    }

    fn name(&self) -> &str {
        self.card_name().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bear() -> Arc<CardDefinition> {
        let mut face = CardFace::new(
            "Grizzly Bears",
            TypeLine::parse("Creature — Bear").unwrap(),
            ManaCost::parse("{1}{G}").unwrap(),
        );
        face.power = Some(PtValue::Fixed(2));
        face.toughness = Some(PtValue::Fixed(2));
        Arc::new(CardDefinition::single(face))
    }

    #[test]
    fn test_type_line_parsing() {
        let line = TypeLine::parse("Legendary Creature — Elf Druid").unwrap();
        assert!(line.is(CardType::Creature));
        assert!(line.has_supertype(Supertype::Legendary));
        assert!(line.has_subtype("elf"));
        assert!(line.is_permanent());

        let instant = TypeLine::parse("Instant").unwrap();
        assert!(!instant.is_permanent());
        assert!(TypeLine::parse("Basic Land - Forest").unwrap().has_subtype("Forest"));
        assert!(TypeLine::parse("Wizard").is_err());
    }

    #[test]
    fn test_card_creation() {
        let owner = PlayerId::new(100);
        let card = CardInstance::new(CardId::new(1), bear(), owner);

        assert_eq!(card.name(), "Grizzly Bears");
        assert_eq!(card.owner, owner);
        assert_eq!(card.controller, owner);
        assert!(!card.tapped);
        assert!(card.summoning_sick);
        assert!(card.is_creature());
    }

    #[test]
    fn test_card_counters() {
        let card = CardInstance::new(CardId::new(1), bear(), PlayerId::new(0));
        assert_eq!(card.power(), 2);

        let card = card.add_counters(CounterType::PlusOne, 2);
        assert_eq!(card.power(), 4);
        assert_eq!(card.toughness(), 4);

        let card = card.add_counters(CounterType::MinusOne, 1);
        assert_eq!(card.power(), 3);

        let card = card.remove_counters(&CounterType::PlusOne, 5);
        assert_eq!(card.counter(&CounterType::PlusOne), 0);
        assert_eq!(card.toughness(), 1);
    }

    #[test]
    fn test_pure_state_operations() {
        let card = CardInstance::new(CardId::new(1), bear(), PlayerId::new(0));
        let tapped = card.clone().tap();
        assert!(tapped.tapped);
        assert!(!card.tapped);

        let damaged = tapped.mark_damage(2, false);
        assert_eq!(damaged.damage, 2);
        assert_eq!(damaged.clear_damage().damage, 0);

        let stolen = card.clone().change_controller(PlayerId::new(1));
        assert_eq!(stolen.controller, PlayerId::new(1));
        assert_eq!(stolen.owner, PlayerId::new(0));

        let host = card.add_attachment(CardId::new(7)).add_attachment(CardId::new(7));
        assert_eq!(host.attachments.len(), 1);
        assert!(host.remove_attachment(CardId::new(7)).attachments.is_empty());
    }

    #[test]
    fn test_transform_cycles_faces() {
        let single = CardInstance::new(CardId::new(1), bear(), PlayerId::new(0));
        assert_eq!(single.transform().face, 0);

        let mut def = (*bear()).clone();
        def.faces.push(CardFace::new(
            "Werebear Night",
            TypeLine::parse("Creature — Bear").unwrap(),
            ManaCost::new(),
        ));
        let card = CardInstance::new(CardId::new(2), Arc::new(def), PlayerId::new(0));
        let flipped = card.transform();
        assert_eq!(flipped.name(), "Werebear Night");
        assert_eq!(flipped.transform().name(), "Grizzly Bears");
    }

    #[test]
    fn test_zone_change_resets_instance() {
        let card = CardInstance::new(CardId::new(1), bear(), PlayerId::new(0))
            .tap()
            .add_counters(CounterType::PlusOne, 1)
            .change_controller(PlayerId::new(1))
            .record_activation(0)
            .reset_for_zone_change();
        assert!(!card.tapped);
        assert!(card.counters.is_empty());
        assert_eq!(card.controller, PlayerId::new(0));
        assert_eq!(card.activations_this_turn(0), 0);
    }
}
