//! Ability descriptors
//!
//! Structured, possibly incomplete descriptions of what a card's rules text
//! does. The oracle parser produces them once at card ingestion and the
//! ability system executes them; nothing downstream re-reads the text.

use crate::core::{ActivationCost, CardId, CardType, Color, ManaCost, PlayerId, StackObjectId};
use crate::game::Step;
use crate::zones::Zone;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Keyword abilities in MTG
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Flying,
    FirstStrike,
    DoubleStrike,
    Deathtouch,
    Haste,
    Hexproof,
    Indestructible,
    Lifelink,
    Menace,
    Reach,
    Trample,
    Vigilance,
    Defender,
    Flash,
    Shroud,

    /// Catch-all for keywords with no rules support
    Other(String),
}

impl Keyword {
    /// Recognise a keyword by name ("first strike", "Flying")
    pub fn from_name(name: &str) -> Option<Keyword> {
        let keyword = match name.trim().to_lowercase().as_str() {
            "flying" => Keyword::Flying,
            "first strike" => Keyword::FirstStrike,
            "double strike" => Keyword::DoubleStrike,
            "deathtouch" => Keyword::Deathtouch,
            "haste" => Keyword::Haste,
            "hexproof" => Keyword::Hexproof,
            "indestructible" => Keyword::Indestructible,
            "lifelink" => Keyword::Lifelink,
            "menace" => Keyword::Menace,
            "reach" => Keyword::Reach,
            "trample" => Keyword::Trample,
            "vigilance" => Keyword::Vigilance,
            "defender" => Keyword::Defender,
            "flash" => Keyword::Flash,
            "shroud" => Keyword::Shroud,
            _ => return None,
        };
        Some(keyword)
    }
}

/// Closed set of effect tags the parser classifies text into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Damage,
    Destroy,
    Exile,
    Draw,
    CreateToken,
    CounterSpell,
    GainLife,
    LoseLife,
    Tap,
    Untap,
    PlusOneCounters,
    Return,
    Search,
    GainControl,
    AddMana,
    PreventDamage,
    /// Recognised as an effect sentence but not executable
    Generic,
}

impl EffectKind {
    /// Effects a controller aims at opponents' objects when choosing automatically
    pub fn is_harmful(&self) -> bool {
        matches!(
            self,
            EffectKind::Damage
                | EffectKind::Destroy
                | EffectKind::Exile
                | EffectKind::CounterSpell
                | EffectKind::LoseLife
                | EffectKind::Tap
                | EffectKind::Return
                | EffectKind::GainControl
        )
    }
}

/// A numeric quantity in rules text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Amount {
    Fixed(u32),
    /// The X chosen when the spell or ability was put on the stack
    X,
}

impl Amount {
    pub fn value(&self, x: u32) -> u32 {
        match self {
            Amount::Fixed(n) => *n,
            Amount::X => x,
        }
    }
}

/// What a "target ..." phrase may point at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSpec {
    /// Creature, player or planeswalker
    AnyTarget,
    Player,
    Opponent,
    Creature,
    CreatureOrPlaneswalker,
    Planeswalker,
    Permanent,
    NonlandPermanent,
    Artifact,
    Enchantment,
    Land,
    Spell,
    /// A card in its owner's graveyard, optionally of one type
    CardInGraveyard(Option<CardType>),
}

/// Who or what an effect applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// The controller of the ability
    You,
    /// The source object itself
    This,
    Target(TargetSpec),
    EachPlayer,
    EachOpponent,
    EachCreature,
    EachCreatureYouControl,
    EachCreatureOpponentsControl,
}

impl Recipient {
    pub fn target_spec(&self) -> Option<&TargetSpec> {
        match self {
            Recipient::Target(spec) => Some(spec),
            _ => None,
        }
    }
}

/// A token a `CreateToken` effect makes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub name: String,
    pub power: i32,
    pub toughness: i32,
    pub types: SmallVec<[CardType; 2]>,
    pub subtypes: SmallVec<[String; 2]>,
    pub colors: SmallVec<[Color; 2]>,
    pub keywords: SmallVec<[Keyword; 2]>,
}

/// Card filter for library searches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub card_type: Option<CardType>,
    pub basic: bool,
}

/// How much damage a prevention effect stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreventionAmount {
    Up(u32),
    All,
    /// "Prevent all combat damage that would be dealt this turn"
    AllCombat,
}

/// One effect sentence of a spell or ability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    pub kind: EffectKind,
    pub recipient: Recipient,
    pub amount: Option<Amount>,
    /// Produced mana for `AddMana`
    pub mana: Option<ManaCost>,
    /// Mana of a color chosen on activation ("one mana of any color")
    pub any_color: u32,
    pub token: Option<TokenSpec>,
    pub search: Option<SearchFilter>,
    /// Where a `Return`/`Search` puts the card
    pub destination: Option<Zone>,
    pub prevention: Option<PreventionAmount>,
    pub text: String,
}

impl EffectDescriptor {
    pub fn new(kind: EffectKind, recipient: Recipient, text: impl Into<String>) -> Self {
        EffectDescriptor {
            kind,
            recipient,
            amount: None,
            mana: None,
            any_color: 0,
            token: None,
            search: None,
            destination: None,
            prevention: None,
            text: text.into(),
        }
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn amount_value(&self, x: u32) -> u32 {
        self.amount.map(|a| a.value(x)).unwrap_or(1)
    }

    pub fn target_spec(&self) -> Option<&TargetSpec> {
        self.recipient.target_spec()
    }
}

/// A chosen target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    Player(PlayerId),
    Card(CardId),
    StackObject(StackObjectId),
}

/// One option of a modal spell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeDescriptor {
    pub text: String,
    pub effects: Vec<EffectDescriptor>,
}

/// `cost: effect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedAbility {
    pub cost: ActivationCost,
    pub effects: Vec<EffectDescriptor>,
    /// Produces mana, has no target and resolves without the stack
    pub is_mana_ability: bool,
    pub once_per_turn: bool,
    pub sorcery_speed: bool,
    pub text: String,
}

impl ActivatedAbility {
    /// The intrinsic `{T}: Add {C}` style ability of a basic land type
    pub fn intrinsic_mana(color_symbol: char) -> Option<ActivatedAbility> {
        let produced = ManaCost::parse(&format!("{{{color_symbol}}}")).ok()?;
        let mut effect = EffectDescriptor::new(
            EffectKind::AddMana,
            Recipient::You,
            format!("Add {{{color_symbol}}}."),
        );
        effect.mana = Some(produced);
        Some(ActivatedAbility {
            cost: ActivationCost::tap(),
            effects: vec![effect],
            is_mana_ability: true,
            once_per_turn: false,
            sorcery_speed: false,
            text: format!("{{T}}: Add {{{color_symbol}}}."),
        })
    }
}

/// Events a triggered ability listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    EntersBattlefield,
    LeavesBattlefield,
    Dies,
    DealsDamage,
    Attacks,
    StepBegins { step: Step, yours_only: bool },
    Draw,
}

/// Whose event sets the trigger off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSubject {
    This,
    AnyCreature,
    AnotherCreature,
    CreatureYouControl,
    You,
    Opponent,
    /// Step triggers have no subject
    Game,
}

/// "When/Whenever/At ..., effect"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredAbility {
    pub event: TriggerEvent,
    pub subject: TriggerSubject,
    pub effects: Vec<EffectDescriptor>,
    pub optional: bool,
    pub text: String,
}

/// "+1: effect" on a planeswalker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyAbility {
    pub change: i32,
    pub effects: Vec<EffectDescriptor>,
    pub text: String,
}

/// Whose damage a static damage modifier looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageScope {
    /// Damage from sources you control
    FromYourSources,
    /// Damage dealt to you
    ToYou,
    /// Damage dealt to creatures you control
    ToYourCreatures,
    /// Damage dealt to opponents or their permanents
    ToOpponents,
    Any,
}

/// The recognised static abilities, registered while the permanent is on the battlefield
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaticAbility {
    DamageMultiplier { factor: u32, scope: DamageScope },
    PreventDamage { amount: PreventionAmount, scope: DamageScope },
    /// "If you would draw a card, draw two cards instead"
    DrawReplacement { count: u32 },
    LifeGainMultiplier { factor: u32 },
    CastAsThoughFlash,
    AdditionalLand { count: u32 },
}

/// Everything parsed from one face's rules text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbilitySet {
    pub keywords: Vec<Keyword>,
    pub ability_words: Vec<String>,
    pub reminder_text: Vec<String>,
    /// Effects of an instant or sorcery
    pub spell_effects: Vec<EffectDescriptor>,
    pub modes: Vec<ModeDescriptor>,
    /// Number of modes to choose for modal spells
    pub modes_to_choose: u32,
    pub activated: Vec<ActivatedAbility>,
    pub triggered: Vec<TriggeredAbility>,
    pub loyalty: Vec<LoyaltyAbility>,
    pub statics: Vec<StaticAbility>,
    /// What an aura enchants; it targets this when cast
    pub enchant: Option<TargetSpec>,
    /// Lines the parser could not classify
    pub unparsed: Vec<String>,
}

impl AbilitySet {
    pub fn has_keyword(&self, keyword: &Keyword) -> bool {
        self.keywords.contains(keyword)
    }

    pub fn is_modal(&self) -> bool {
        !self.modes.is_empty()
    }
}
