//! Strongly-typed names and counter kinds
//!
//! Card names, player names and subtypes are distinct string newtypes so
//! they can't be mixed up with each other or with rules text.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! name_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

name_type!(
    /// Card name as printed
    CardName
);

name_type!(
    /// Player name shown in logs
    PlayerName
);

name_type!(
    /// Creature, land or other subtype ("Goblin", "Forest", "Aura")
    Subtype
);

impl CardName {
    /// Database key: ASCII-folded and lowercased
    pub fn lookup_key(&self) -> String {
        normalize_card_name(&self.0)
    }
}

/// Fold a card name to its database key ("Lim-Dûl" and "lim-dul" match)
pub fn normalize_card_name(name: &str) -> String {
    deunicode::deunicode(name.trim()).to_lowercase()
}

/// Kinds of counters a permanent can carry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterType {
    PlusOne,
    MinusOne,
    Loyalty,
    Charge,
    Other(String),
}

impl fmt::Display for CounterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterType::PlusOne => f.write_str("+1/+1"),
            CounterType::MinusOne => f.write_str("-1/-1"),
            CounterType::Loyalty => f.write_str("loyalty"),
            CounterType::Charge => f.write_str("charge"),
            CounterType::Other(name) => f.write_str(name),
        }
    }
}

impl From<&str> for CounterType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "+1/+1" => CounterType::PlusOne,
            "-1/-1" => CounterType::MinusOne,
            "loyalty" => CounterType::Loyalty,
            "charge" => CounterType::Charge,
            other => CounterType::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_type_names() {
        assert_eq!(CounterType::from("+1/+1"), CounterType::PlusOne);
        assert_eq!(CounterType::from(" Loyalty"), CounterType::Loyalty);
        assert_eq!(
            CounterType::from("Oil"),
            CounterType::Other("oil".to_string())
        );
        assert_eq!(CounterType::MinusOne.to_string(), "-1/-1");
    }

    #[test]
    fn test_card_name_lookup_key() {
        let name = CardName::new("Lim-Dûl the Necromancer");
        assert_eq!(name.lookup_key(), "lim-dul the necromancer");
        assert_eq!(CardName::new("  Lightning Bolt ").lookup_key(), "lightning bolt");
    }

    #[test]
    fn test_names_serialize_as_strings() {
        let json = serde_json::to_string(&PlayerName::new("Alice")).unwrap();
        assert_eq!(json, "\"Alice\"");
        assert_eq!(Subtype::from("Goblin").to_string(), "Goblin");
    }
}
