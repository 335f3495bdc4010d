//! Cost system for activated abilities
//!
//! Represents the various costs players can pay to activate abilities,
//! such as tapping, paying mana, sacrificing permanents, etc. The parts
//! are always paid in one order: tap, mana, life, sacrifice, discard.

use crate::core::{CardType, ManaCost};
use crate::{MtgError, Result};
use serde::{Deserialize, Serialize};

/// What a sacrifice cost asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SacrificeCost {
    /// "Sacrifice ~"
    This,
    /// "Sacrifice a creature", "Sacrifice a land"; `None` is any permanent
    Permanent(Option<CardType>),
}

/// The full cost of an activated ability
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivationCost {
    pub tap: bool,
    pub mana: Option<ManaCost>,
    pub life: u32,
    pub sacrifice: Option<SacrificeCost>,
    /// Number of cards to discard
    pub discard: u32,
}

impl ActivationCost {
    pub fn tap() -> Self {
        ActivationCost {
            tap: true,
            ..Self::default()
        }
    }

    pub fn mana(cost: ManaCost) -> Self {
        ActivationCost {
            mana: Some(cost),
            ..Self::default()
        }
    }

    /// Parse the part of an activated ability before the colon
    ///
    /// Handles comma-separated parts like "{2}{G}, {T}, Pay 2 life,
    /// Sacrifice a creature, Discard a card". The card's own name is expected
    /// to have been replaced with `~`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut cost = ActivationCost::default();

        for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let lower = part.to_lowercase();

            if lower == "{t}" {
                cost.tap = true;
            } else if part.starts_with('{') {
                // "{T}" may share a segment with mana in sloppy text: "{1}{T}"
                let (tap, mana_text) = if let Some(stripped) = part.strip_suffix("{T}") {
                    (true, stripped)
                } else {
                    (false, part)
                };
                cost.tap |= tap;
                let mana = ManaCost::parse(mana_text)?;
                cost.mana = Some(match cost.mana.take() {
                    Some(existing) => merge_mana(existing, mana),
                    None => mana,
                });
            } else if let Some(rest) = lower.strip_prefix("pay ") {
                let amount = rest
                    .strip_suffix(" life")
                    .and_then(|n| n.trim().parse::<u32>().ok())
                    .ok_or_else(|| MtgError::ParseError(format!("Unrecognised cost: {part}")))?;
                cost.life += amount;
            } else if let Some(rest) = lower.strip_prefix("sacrifice ") {
                cost.sacrifice = Some(parse_sacrifice(rest));
            } else if let Some(rest) = lower.strip_prefix("discard ") {
                cost.discard += match rest.trim() {
                    "a card" | "a card at random" => 1,
                    "two cards" => 2,
                    "three cards" => 3,
                    "your hand" => u32::MAX,
                    _ => {
                        return Err(MtgError::ParseError(format!("Unrecognised cost: {part}")));
                    }
                };
            } else {
                return Err(MtgError::ParseError(format!("Unrecognised cost: {part}")));
            }
        }

        Ok(cost)
    }

    pub fn mana_cost(&self) -> Option<&ManaCost> {
        self.mana.as_ref()
    }

    pub fn is_free(&self) -> bool {
        *self == ActivationCost::default()
    }
}

fn parse_sacrifice(rest: &str) -> SacrificeCost {
    let rest = rest.trim();
    if rest == "~" || rest.starts_with("this ") {
        return SacrificeCost::This;
    }
    let noun = rest
        .trim_start_matches("a ")
        .trim_start_matches("an ")
        .trim_start_matches("another ");
    let card_type = match noun {
        "creature" => Some(CardType::Creature),
        "land" => Some(CardType::Land),
        "artifact" => Some(CardType::Artifact),
        "enchantment" => Some(CardType::Enchantment),
        _ => None,
    };
    SacrificeCost::Permanent(card_type)
}

fn merge_mana(a: ManaCost, b: ManaCost) -> ManaCost {
    let mut merged = ManaCost {
        generic: a.generic + b.generic,
        white: a.white + b.white,
        blue: a.blue + b.blue,
        black: a.black + b.black,
        red: a.red + b.red,
        green: a.green + b.green,
        colorless: a.colorless + b.colorless,
        x_count: a.x_count + b.x_count,
        hybrid: a.hybrid,
        phyrexian: a.phyrexian,
    };
    merged.hybrid.extend(b.hybrid);
    merged.phyrexian.extend(b.phyrexian);
    merged
}
