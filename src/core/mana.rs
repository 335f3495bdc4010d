//! Mana system for casting spells
//!
//! `ManaCost` is the printed cost of a card or ability (`{2}{G}{G/U}{X}`);
//! `ManaPool` is the per-player store of spendable mana. Costs with hybrid,
//! Phyrexian or X symbols are first resolved against a pool into a fixed
//! cost, and only fixed costs are ever spent.

use crate::{MtgError, Result};
use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map, map_opt, map_res},
    multi::many0,
    sequence::{delimited, separated_pair},
    IResult,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// The five colors of magic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
}

impl Color {
    /// All colors in WUBRG order
    pub const ALL: [Color; 5] = [Color::White, Color::Blue, Color::Black, Color::Red, Color::Green];

    pub fn from_symbol(c: char) -> Option<Color> {
        match c.to_ascii_uppercase() {
            'W' => Some(Color::White),
            'U' => Some(Color::Blue),
            'B' => Some(Color::Black),
            'R' => Some(Color::Red),
            'G' => Some(Color::Green),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Color::White => 'W',
            Color::Blue => 'U',
            Color::Black => 'B',
            Color::Red => 'R',
            Color::Green => 'G',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One bucket of a mana pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManaType {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
    Generic,
}

impl From<Color> for ManaType {
    fn from(color: Color) -> Self {
        match color {
            Color::White => ManaType::White,
            Color::Blue => ManaType::Blue,
            Color::Black => ManaType::Black,
            Color::Red => ManaType::Red,
            Color::Green => ManaType::Green,
        }
    }
}

/// A hybrid mana symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HybridSymbol {
    /// `{G/U}`: either color
    TwoColor(Color, Color),
    /// `{2/W}`: the color or two generic
    ColorOrTwo(Color),
}

/// Represents a mana cost (e.g., "{2}{R}{R}" = 2 generic + 2 red)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManaCost {
    pub generic: u32,
    pub white: u32,
    pub blue: u32,
    pub black: u32,
    pub red: u32,
    pub green: u32,
    pub colorless: u32,
    /// Number of `{X}` symbols
    pub x_count: u32,
    pub hybrid: SmallVec<[HybridSymbol; 2]>,
    pub phyrexian: SmallVec<[Color; 2]>,
}

/// A fixed cost together with the life that Phyrexian symbols will cost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCost {
    pub mana: ManaCost,
    pub life: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManaSymbol {
    Generic(u32),
    Colored(Color),
    Colorless,
    X,
    Hybrid(Color, Color),
    ColorOrTwo(Color),
    Phyrexian(Color),
}

fn color(input: &str) -> IResult<&str, Color> {
    map_opt(one_of("WUBRG"), Color::from_symbol)(input)
}

fn symbol_body(input: &str) -> IResult<&str, ManaSymbol> {
    alt((
        map(separated_pair(color, char('/'), char('P')), |(c, _)| {
            ManaSymbol::Phyrexian(c)
        }),
        map(separated_pair(color, char('/'), color), |(a, b)| {
            ManaSymbol::Hybrid(a, b)
        }),
        map(separated_pair(char('2'), char('/'), color), |(_, c)| {
            ManaSymbol::ColorOrTwo(c)
        }),
        map(color, ManaSymbol::Colored),
        map(char('C'), |_| ManaSymbol::Colorless),
        map(char('X'), |_| ManaSymbol::X),
        map_res(digit1, |d: &str| d.parse::<u32>().map(ManaSymbol::Generic)),
    ))(input)
}

fn mana_symbol(input: &str) -> IResult<&str, ManaSymbol> {
    delimited(char('{'), symbol_body, char('}'))(input)
}

impl ManaCost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mana cost string like "{2}{R}{R}", "{X}{G/U}" or "{B/P}"
    ///
    /// The empty string is the zero cost (lands, most tokens).
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (_, symbols) = all_consuming(many0(mana_symbol))(trimmed)
            .map_err(|e| MtgError::ParseError(format!("Invalid mana cost '{s}': {e}")))?;

        let mut cost = ManaCost::new();
        for symbol in symbols {
            match symbol {
                ManaSymbol::Generic(n) => cost.generic += n,
                ManaSymbol::Colored(c) => *cost.color_mut(c) += 1,
                ManaSymbol::Colorless => cost.colorless += 1,
                ManaSymbol::X => cost.x_count += 1,
                ManaSymbol::Hybrid(a, b) => cost.hybrid.push(HybridSymbol::TwoColor(a, b)),
                ManaSymbol::ColorOrTwo(c) => cost.hybrid.push(HybridSymbol::ColorOrTwo(c)),
                ManaSymbol::Phyrexian(c) => cost.phyrexian.push(c),
            }
        }
        Ok(cost)
    }

    /// Build a generic-only cost
    pub fn generic(amount: u32) -> Self {
        ManaCost {
            generic: amount,
            ..Self::default()
        }
    }

    pub fn color(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white,
            Color::Blue => self.blue,
            Color::Black => self.black,
            Color::Red => self.red,
            Color::Green => self.green,
        }
    }

    fn color_mut(&mut self, color: Color) -> &mut u32 {
        match color {
            Color::White => &mut self.white,
            Color::Blue => &mut self.blue,
            Color::Black => &mut self.black,
            Color::Red => &mut self.red,
            Color::Green => &mut self.green,
        }
    }

    /// Add colored requirements, consuming self
    pub fn with_color(mut self, color: Color, amount: u32) -> Self {
        *self.color_mut(color) += amount;
        self
    }

    /// Mana value (converted mana cost); X counts as zero
    pub fn mana_value(&self) -> u32 {
        let hybrid: u32 = self
            .hybrid
            .iter()
            .map(|h| match h {
                HybridSymbol::TwoColor(..) => 1,
                HybridSymbol::ColorOrTwo(_) => 2,
            })
            .sum();
        self.generic
            + self.white
            + self.blue
            + self.black
            + self.red
            + self.green
            + self.colorless
            + hybrid
            + self.phyrexian.len() as u32
    }

    /// Total mana a fixed cost requires
    pub fn total(&self) -> u32 {
        self.generic
            .saturating_add(self.colored_total())
            .saturating_add(self.colorless)
    }

    fn colored_total(&self) -> u32 {
        self.white + self.blue + self.black + self.red + self.green
    }

    /// True when the cost contains no hybrid, Phyrexian or X symbols
    pub fn is_fixed(&self) -> bool {
        self.x_count == 0 && self.hybrid.is_empty() && self.phyrexian.is_empty()
    }

    /// Colors named by this cost's symbols
    pub fn colors(&self) -> SmallVec<[Color; 2]> {
        let mut colors = SmallVec::new();
        for c in Color::ALL {
            let in_hybrid = self.hybrid.iter().any(|h| match h {
                HybridSymbol::TwoColor(a, b) => *a == c || *b == c,
                HybridSymbol::ColorOrTwo(a) => *a == c,
            });
            if self.color(c) > 0 || in_hybrid || self.phyrexian.contains(&c) {
                colors.push(c);
            }
        }
        colors
    }

    /// Turn a symbolic cost into a fixed cost against a pool
    ///
    /// X becomes `x * x_count` generic, saturating so an absurd X is
    /// simply unpayable. A hybrid symbol takes the color the
    /// pool has more of (first color on a tie); `{2/C}` takes the color when
    /// the pool has one spare, else two generic. A Phyrexian symbol takes the
    /// color when available, else two life.
    pub fn resolve(&self, pool: &ManaPool, x: u32) -> ResolvedCost {
        let mut mana = ManaCost {
            generic: self.generic.saturating_add(self.x_count.saturating_mul(x)),
            white: self.white,
            blue: self.blue,
            black: self.black,
            red: self.red,
            green: self.green,
            colorless: self.colorless,
            ..ManaCost::default()
        };
        let mut life = 0;
        let spare = |mana: &ManaCost, c: Color| pool.color(c).saturating_sub(mana.color(c));

        for symbol in &self.hybrid {
            match *symbol {
                HybridSymbol::TwoColor(a, b) => {
                    let chosen = if spare(&mana, b) > spare(&mana, a) { b } else { a };
                    *mana.color_mut(chosen) += 1;
                }
                HybridSymbol::ColorOrTwo(c) => {
                    if spare(&mana, c) > 0 {
                        *mana.color_mut(c) += 1;
                    } else {
                        mana.generic += 2;
                    }
                }
            }
        }
        for &c in &self.phyrexian {
            if spare(&mana, c) > 0 {
                *mana.color_mut(c) += 1;
            } else {
                life += 2;
            }
        }
        ResolvedCost { mana, life }
    }
}

impl fmt::Display for ManaCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.x_count {
            write!(f, "{{X}}")?;
        }
        let only_zero = self.total() == 0
            && self.x_count == 0
            && self.hybrid.is_empty()
            && self.phyrexian.is_empty();
        if self.generic > 0 || only_zero {
            write!(f, "{{{}}}", self.generic)?;
        }
        for _ in 0..self.colorless {
            write!(f, "{{C}}")?;
        }
        for c in Color::ALL {
            for _ in 0..self.color(c) {
                write!(f, "{{{c}}}")?;
            }
        }
        for h in &self.hybrid {
            match h {
                HybridSymbol::TwoColor(a, b) => write!(f, "{{{a}/{b}}}")?,
                HybridSymbol::ColorOrTwo(c) => write!(f, "{{2/{c}}}")?,
            }
        }
        for c in &self.phyrexian {
            write!(f, "{{{c}/P}}")?;
        }
        Ok(())
    }
}

/// Mana pool for a player
///
/// Seven independent non-negative buckets: the five colors, colorless mana
/// (`{C}`) and generic mana (`{1}`), which can only pay generic costs.
/// All operations return a new pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManaPool {
    pub white: u32,
    pub blue: u32,
    pub black: u32,
    pub red: u32,
    pub green: u32,
    pub colorless: u32,
    pub generic: u32,
}

impl ManaPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mana: ManaType) -> u32 {
        match mana {
            ManaType::White => self.white,
            ManaType::Blue => self.blue,
            ManaType::Black => self.black,
            ManaType::Red => self.red,
            ManaType::Green => self.green,
            ManaType::Colorless => self.colorless,
            ManaType::Generic => self.generic,
        }
    }

    fn bucket_mut(&mut self, mana: ManaType) -> &mut u32 {
        match mana {
            ManaType::White => &mut self.white,
            ManaType::Blue => &mut self.blue,
            ManaType::Black => &mut self.black,
            ManaType::Red => &mut self.red,
            ManaType::Green => &mut self.green,
            ManaType::Colorless => &mut self.colorless,
            ManaType::Generic => &mut self.generic,
        }
    }

    pub fn color(&self, color: Color) -> u32 {
        self.get(color.into())
    }

    /// Add mana of one type
    pub fn add(&self, mana: ManaType, amount: u32) -> ManaPool {
        let mut pool = *self;
        let bucket = pool.bucket_mut(mana);
        *bucket = bucket.saturating_add(amount);
        pool
    }

    /// Add the mana described by a produced-mana cost (`Add {G}{G}`, `Add {C}`, `Add {2}`)
    pub fn add_produced(&self, produced: &ManaCost) -> ManaPool {
        self.add_produced_times(produced, 1)
    }

    /// Add produced mana `times` over, as for "Add {G} for each ..." or X
    pub fn add_produced_times(&self, produced: &ManaCost, times: u32) -> ManaPool {
        let mut pool = *self;
        for c in Color::ALL {
            pool = pool.add(c.into(), produced.color(c).saturating_mul(times));
        }
        pool.add(ManaType::Colorless, produced.colorless.saturating_mul(times))
            .add(ManaType::Generic, produced.generic.saturating_mul(times))
    }

    /// The pool with every bucket at zero
    pub fn emptied(&self) -> ManaPool {
        ManaPool::new()
    }

    /// Check if we can pay the given fixed mana cost
    pub fn can_pay(&self, cost: &ManaCost) -> bool {
        self.spend(cost).is_ok()
    }

    /// Pay a fixed mana cost from this pool
    ///
    /// Colored and colorless requirements are checked bucket by bucket. The
    /// generic requirement may then be covered by the generic bucket, by
    /// colored mana left over, and by colorless mana left over, consumed in
    /// that order. Leftover colored mana is drawn one at a time from
    /// whichever color currently has the most left, so no single color is
    /// drained first. On failure the pool is untouched.
    pub fn spend(&self, cost: &ManaCost) -> Result<ManaPool> {
        if !cost.is_fixed() {
            return Err(MtgError::InvariantViolation(format!(
                "cost {cost} must be resolved before it is spent"
            )));
        }

        for c in Color::ALL {
            if self.color(c) < cost.color(c) {
                return Err(MtgError::invalid(format!(
                    "Insufficient {c} mana: need {}, have {}",
                    cost.color(c),
                    self.color(c)
                )));
            }
        }
        if self.colorless < cost.colorless {
            return Err(MtgError::invalid(format!(
                "Insufficient colorless mana: need {}, have {}",
                cost.colorless, self.colorless
            )));
        }

        let mut pool = *self;
        for c in Color::ALL {
            *pool.bucket_mut(c.into()) -= cost.color(c);
        }
        pool.colorless -= cost.colorless;

        let flexible = pool.total();
        if flexible < cost.generic {
            return Err(MtgError::invalid(format!(
                "Insufficient mana to pay cost {cost}: {flexible} available for {} generic",
                cost.generic
            )));
        }

        let mut remaining = cost.generic;

        let from_generic = remaining.min(pool.generic);
        pool.generic -= from_generic;
        remaining -= from_generic;

        while remaining > 0 {
            // Max by amount, earliest color in WUBRG order on ties
            let richest = Color::ALL
                .iter()
                .copied()
                .filter(|c| pool.color(*c) > 0)
                .fold(None::<Color>, |best, c| match best {
                    Some(b) if pool.color(b) >= pool.color(c) => Some(b),
                    _ => Some(c),
                });
            match richest {
                Some(c) => {
                    *pool.bucket_mut(c.into()) -= 1;
                    remaining -= 1;
                }
                None => break,
            }
        }

        let from_colorless = remaining.min(pool.colorless);
        pool.colorless -= from_colorless;
        remaining -= from_colorless;

        debug_assert_eq!(remaining, 0, "flexible mana check guarantees payment");
        Ok(pool)
    }

    /// Total mana in pool
    pub fn total(&self) -> u32 {
        [
            self.white,
            self.blue,
            self.black,
            self.red,
            self.green,
            self.colorless,
            self.generic,
        ]
        .into_iter()
        .fold(0, u32::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for ManaPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}W {}U {}B {}R {}G {}C {}generic",
            self.white, self.blue, self.black, self.red, self.green, self.colorless, self.generic
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(white: u32, blue: u32, black: u32, red: u32, green: u32) -> ManaPool {
        ManaPool {
            white,
            blue,
            black,
            red,
            green,
            ..ManaPool::default()
        }
    }

    #[test]
    fn test_mana_cost_parsing() {
        let cost = ManaCost::parse("{2}{R}{R}").unwrap();
        assert_eq!(cost.generic, 2);
        assert_eq!(cost.red, 2);
        assert_eq!(cost.mana_value(), 4);

        let cost2 = ManaCost::parse("{1}{U}{B}").unwrap();
        assert_eq!(cost2.generic, 1);
        assert_eq!(cost2.blue, 1);
        assert_eq!(cost2.black, 1);
        assert_eq!(cost2.mana_value(), 3);

        assert_eq!(ManaCost::parse("").unwrap(), ManaCost::new());
    }

    #[test]
    fn test_parse_special_symbols() {
        let cost = ManaCost::parse("{X}{X}{G/U}{2/W}{B/P}{C}").unwrap();
        assert_eq!(cost.x_count, 2);
        assert_eq!(cost.colorless, 1);
        assert_eq!(cost.hybrid.as_slice(), &[
            HybridSymbol::TwoColor(Color::Green, Color::Blue),
            HybridSymbol::ColorOrTwo(Color::White),
        ]);
        assert_eq!(cost.phyrexian.as_slice(), &[Color::Black]);
        assert_eq!(cost.mana_value(), 1 + 1 + 2 + 1);
        assert!(!cost.is_fixed());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ManaCost::parse("{2}{Q}").is_err());
        assert!(ManaCost::parse("2RR").is_err());
        assert!(ManaCost::parse("{2").is_err());
    }

    #[test]
    fn test_display_round_trips_symbols() {
        let cost = ManaCost::parse("{3}{G}{G}").unwrap();
        assert_eq!(cost.to_string(), "{3}{G}{G}");
        assert_eq!(ManaCost::new().to_string(), "{0}");
    }

    #[test]
    fn test_spend_simple() {
        let p = pool(0, 0, 0, 1, 0);
        let cost = ManaCost::parse("{R}").unwrap();
        let after = p.spend(&cost).unwrap();
        assert_eq!(after.total(), 0);
    }

    #[test]
    fn test_spend_green_and_generic_from_mixed_pool() {
        let p = pool(0, 0, 0, 2, 2);
        let cost = ManaCost::generic(2).with_color(Color::Green, 1);
        let after = p.spend(&cost).unwrap();
        assert_eq!(after.green + after.red, 1);
        assert_eq!(after.total(), p.total() - cost.total());
    }

    #[test]
    fn test_spend_prefers_generic_bucket() {
        let p = ManaPool::new()
            .add(ManaType::Generic, 2)
            .add(ManaType::Red, 1);
        let after = p.spend(&ManaCost::generic(2)).unwrap();
        assert_eq!(after.generic, 0);
        assert_eq!(after.red, 1);
    }

    #[test]
    fn test_spend_apportions_excess_colors() {
        // 3 white, 3 blue: four generic should leave one of each
        let p = pool(3, 3, 0, 0, 0);
        let after = p.spend(&ManaCost::generic(4)).unwrap();
        assert_eq!(after.white, 1);
        assert_eq!(after.blue, 1);
    }

    #[test]
    fn test_spend_uses_colorless_last() {
        let p = pool(0, 0, 0, 1, 0).add(ManaType::Colorless, 1);
        let after = p.spend(&ManaCost::generic(1)).unwrap();
        assert_eq!(after.red, 0);
        assert_eq!(after.colorless, 1);
    }

    #[test]
    fn test_spend_insufficient_leaves_pool_unchanged() {
        let p = pool(0, 0, 0, 1, 0);
        let cost = ManaCost::parse("{2}{R}").unwrap();
        assert!(matches!(p.spend(&cost), Err(MtgError::InvalidAction(_))));
        assert_eq!(p.red, 1);

        let wrong_color = pool(0, 2, 0, 0, 0);
        assert!(wrong_color.spend(&ManaCost::parse("{R}{R}").unwrap()).is_err());
        assert_eq!(wrong_color.blue, 2);
    }

    #[test]
    fn test_spend_colorless_requirement_needs_colorless() {
        let p = pool(0, 0, 0, 0, 3);
        assert!(p.spend(&ManaCost::parse("{C}").unwrap()).is_err());
    }

    #[test]
    fn test_spend_rejects_unresolved_cost() {
        let p = pool(1, 1, 1, 1, 1);
        let cost = ManaCost::parse("{X}{R}").unwrap();
        assert!(matches!(p.spend(&cost), Err(MtgError::InvariantViolation(_))));
    }

    #[test]
    fn test_mana_conservation() {
        let pools = [
            pool(1, 2, 0, 3, 1),
            pool(0, 0, 4, 0, 0).add(ManaType::Colorless, 2),
            pool(2, 2, 2, 2, 2).add(ManaType::Generic, 3),
        ];
        let costs = ["{1}", "{2}{B}", "{3}{U}{U}", "{C}{1}", "{5}", "{W}{U}{B}{R}{G}"];
        for p in pools {
            for c in costs {
                let cost = ManaCost::parse(c).unwrap();
                match p.spend(&cost) {
                    Ok(after) => assert_eq!(after.total(), p.total() - cost.total()),
                    Err(_) => assert!(
                        p.total() < cost.total()
                            || !cost.is_fixed()
                            || p.colorless < cost.colorless
                            || Color::ALL.iter().any(|c| p.color(*c) < cost.color(*c))
                    ),
                }
            }
        }
    }

    #[test]
    fn test_resolve_hybrid_and_phyrexian() {
        let p = pool(0, 1, 0, 0, 0);
        let cost = ManaCost::parse("{G/U}{B/P}{2/W}").unwrap();
        let resolved = cost.resolve(&p, 0);
        assert_eq!(resolved.mana.blue, 1);
        assert_eq!(resolved.mana.generic, 2);
        assert_eq!(resolved.life, 2);
        assert!(resolved.mana.is_fixed());
    }

    #[test]
    fn test_resolve_x() {
        let cost = ManaCost::parse("{X}{R}").unwrap();
        let resolved = cost.resolve(&ManaPool::new(), 3);
        assert_eq!(resolved.mana.generic, 3);
        assert_eq!(resolved.mana.red, 1);

        let twin = ManaCost::parse("{X}{X}{R}").unwrap();
        let resolved = twin.resolve(&pool(0, 0, 0, 1, 0), 1 << 31);
        assert_eq!(resolved.mana.generic, u32::MAX);
        assert!(pool(0, 0, 0, 1, 0).spend(&resolved.mana).is_err());
    }

    #[test]
    fn test_add_produced() {
        let produced = ManaCost::parse("{G}{G}{C}").unwrap();
        let p = ManaPool::new().add_produced(&produced);
        assert_eq!(p.green, 2);
        assert_eq!(p.colorless, 1);
        assert!(p.emptied().is_empty());

        let p = ManaPool::new().add_produced_times(&produced, 3);
        assert_eq!(p.green, 6);
        assert_eq!(p.colorless, 3);
        let p = p.add_produced_times(&produced, u32::MAX);
        assert_eq!(p.green, u32::MAX);
        assert_eq!(p.total(), u32::MAX);
    }
}
