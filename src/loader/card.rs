//! Card record loader (JSON format)
//!
//! Card data arrives as JSON records, one per card or an array of them.
//! Each record is turned into an immutable [`CardDefinition`] with its
//! oracle text parsed once into ability descriptors.

use crate::core::{
    ActivatedAbility, CardDefinition, CardFace, CardType, Color, Keyword, ManaCost, PtValue,
    TypeLine,
};
use crate::loader::oracle::parse_abilities;
use crate::{MtgError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fs;
use std::path::Path;

/// Basic land types and the mana their intrinsic ability makes
const BASIC_LAND_MANA: [(&str, char); 5] = [
    ("Plains", 'W'),
    ("Island", 'U'),
    ("Swamp", 'B'),
    ("Mountain", 'R'),
    ("Forest", 'G'),
];

/// Loyalty is a number in some sources and a string in others
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoyaltyValue {
    Number(u32),
    Text(String),
}

impl LoyaltyValue {
    fn value(&self) -> Option<u32> {
        match self {
            LoyaltyValue::Number(n) => Some(*n),
            LoyaltyValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One face of a multi-faced card record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceRecord {
    pub name: String,
    pub type_line: String,
    pub mana_cost: String,
    pub oracle_text: String,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<LoyaltyValue>,
    pub colors: Option<Vec<String>>,
}

/// A card as supplied by the card database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardRecord {
    pub name: String,
    pub type_line: String,
    pub mana_cost: String,
    pub oracle_text: String,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<LoyaltyValue>,
    pub colors: Option<Vec<String>>,
    pub color_identity: Vec<String>,
    pub keywords: Vec<String>,
    pub card_faces: Vec<FaceRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CardFile {
    Many(Vec<CardRecord>),
    One(Box<CardRecord>),
}

/// Card loader for JSON card records
pub struct CardLoader;

impl CardLoader {
    /// Load every card in a JSON file
    pub fn load_from_file(path: &Path) -> Result<Vec<CardDefinition>> {
        let content = fs::read_to_string(path).map_err(MtgError::IoError)?;
        Self::parse(&content)
            .map_err(|e| MtgError::InvalidCardFormat(format!("{}: {e}", path.display())))
    }

    /// Parse a single record or an array of records
    pub fn parse(content: &str) -> Result<Vec<CardDefinition>> {
        let file: CardFile = serde_json::from_str(content)
            .map_err(|e| MtgError::InvalidCardFormat(e.to_string()))?;
        match file {
            CardFile::Many(records) => records.iter().map(Self::from_record).collect(),
            CardFile::One(record) => Ok(vec![Self::from_record(&record)?]),
        }
    }

    /// Build a definition from one record
    pub fn from_record(record: &CardRecord) -> Result<CardDefinition> {
        if record.name.trim().is_empty() {
            return Err(MtgError::InvalidCardFormat("Card record has no name".to_string()));
        }

        let faces: SmallVec<[CardFace; 1]> = if record.card_faces.is_empty() {
            let face = FaceRecord {
                name: record.name.clone(),
                type_line: record.type_line.clone(),
                mana_cost: record.mana_cost.clone(),
                oracle_text: record.oracle_text.clone(),
                power: record.power.clone(),
                toughness: record.toughness.clone(),
                loyalty: record.loyalty.clone(),
                colors: record.colors.clone(),
            };
            std::iter::once(build_face(&face, &record.keywords)).collect::<Result<_>>()?
        } else {
            record
                .card_faces
                .iter()
                .map(|face| build_face(face, &record.keywords))
                .collect::<Result<_>>()?
        };

        let color_identity = if record.color_identity.is_empty() {
            let mut identity: SmallVec<[Color; 2]> = SmallVec::new();
            for color in faces.iter().flat_map(|f| f.colors.iter()) {
                if !identity.contains(color) {
                    identity.push(*color);
                }
            }
            identity
        } else {
            parse_colors(&record.color_identity)?
        };

        Ok(CardDefinition {
            faces,
            color_identity,
        })
    }
}

fn build_face(record: &FaceRecord, keywords: &[String]) -> Result<CardFace> {
    let type_line = TypeLine::parse(&record.type_line)
        .map_err(|e| MtgError::InvalidCardFormat(format!("{}: {e}", record.name)))?;
    let mana_cost = ManaCost::parse(&record.mana_cost)
        .map_err(|e| MtgError::InvalidCardFormat(format!("{}: {e}", record.name)))?;
    let is_spell = type_line.is(CardType::Instant) || type_line.is(CardType::Sorcery);

    let mut face = CardFace::new(record.name.as_str(), type_line, mana_cost);
    face.oracle_text = record.oracle_text.clone();
    face.power = record.power.as_deref().map(PtValue::parse);
    face.toughness = record.toughness.as_deref().map(PtValue::parse);
    face.loyalty = record.loyalty.as_ref().and_then(LoyaltyValue::value);
    if let Some(colors) = &record.colors {
        face.colors = parse_colors(colors)?;
    }

    face.abilities = parse_abilities(&record.oracle_text, &record.name, is_spell);

    // The record's keyword list catches keywords the text only implies
    for name in keywords {
        if let Some(keyword) = Keyword::from_name(name) {
            if !face.abilities.has_keyword(&keyword) && mentions(&face.oracle_text, name) {
                face.abilities.keywords.push(keyword);
            }
        }
    }

    for (subtype, symbol) in BASIC_LAND_MANA {
        if face.type_line.has_subtype(subtype) {
            if let Some(ability) = ActivatedAbility::intrinsic_mana(symbol) {
                face.abilities.activated.insert(0, ability);
            }
        }
    }

    Ok(face)
}

/// Multi-face records list keywords for the whole card
fn mentions(oracle_text: &str, keyword: &str) -> bool {
    oracle_text.is_empty() || oracle_text.to_lowercase().contains(&keyword.to_lowercase())
}

/// "G", "Green" or "green"
fn parse_colors(names: &[String]) -> Result<SmallVec<[Color; 2]>> {
    names
        .iter()
        .map(|name| {
            let mut chars = name.chars();
            let color = match (chars.next(), chars.next()) {
                (Some(c), None) => Color::from_symbol(c),
                _ => match name.to_lowercase().as_str() {
                    "white" => Some(Color::White),
                    "blue" => Some(Color::Blue),
                    "black" => Some(Color::Black),
                    "red" => Some(Color::Red),
                    "green" => Some(Color::Green),
                    _ => None,
                },
            };
            color.ok_or_else(|| MtgError::InvalidCardFormat(format!("Unknown color '{name}'")))
        })
        .collect()
}
