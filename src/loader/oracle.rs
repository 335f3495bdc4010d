//! Oracle text parser
//!
//! Turns a face's rules text into an [`AbilitySet`] once, at card
//! ingestion. Recognition is pattern based: lines are classified as
//! keywords, modes, loyalty, activated, triggered or static abilities, and
//! effect sentences are mapped onto the closed [`EffectKind`] set. Anything
//! not understood is kept as text so nothing is silently dropped.

use crate::core::{
    ActivatedAbility, ActivationCost, AbilitySet, Amount, CardType, Color, DamageScope,
    EffectDescriptor, EffectKind, Keyword, LoyaltyAbility, ManaCost, ModeDescriptor,
    PreventionAmount, Recipient, SearchFilter, StaticAbility, TargetSpec, TokenSpec,
    TriggerEvent, TriggerSubject, TriggeredAbility,
};
use crate::game::Step;
use crate::zones::Zone;
use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{map_res, opt},
    IResult,
};
use smallvec::SmallVec;

/// Phrases that refer to the object carrying the ability
const SELF_REFERENCES: [&str; 8] = [
    "this creature",
    "this spell",
    "this artifact",
    "this enchantment",
    "this land",
    "this permanent",
    "this planeswalker",
    "this card",
];

/// Parse a face's oracle text
///
/// `is_spell` is set for instants and sorceries, whose plain sentences are
/// spell effects rather than unclassified permanent text.
pub fn parse_abilities(oracle_text: &str, card_name: &str, is_spell: bool) -> AbilitySet {
    let mut set = AbilitySet::default();
    let text = substitute_name(oracle_text, card_name);
    let mut in_modes = false;

    for raw_line in text.lines() {
        let (line, reminders) = strip_reminder_text(raw_line);
        set.reminder_text.extend(reminders);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(count) = parse_mode_header(line) {
            set.modes_to_choose = count;
            in_modes = true;
            continue;
        }
        if let Some(mode) = line.strip_prefix('•') {
            let mode = mode.trim();
            if in_modes {
                set.modes.push(ModeDescriptor {
                    text: mode.to_string(),
                    effects: parse_effects(mode),
                });
            } else {
                set.unparsed.push(line.to_string());
            }
            continue;
        }
        in_modes = false;

        if let Some(rest) = line.strip_prefix("Enchant ") {
            set.enchant = Some(enchant_spec(rest));
            continue;
        }

        if let Some(keywords) = parse_keyword_line(line) {
            set.keywords.extend(keywords);
            continue;
        }

        let line = match split_ability_word(line) {
            Some((word, rest)) => {
                set.ability_words.push(word.to_string());
                rest
            }
            None => line,
        };

        if let Ok((rest, change)) = loyalty_prefix(line) {
            let effect_text = rest.trim();
            set.loyalty.push(LoyaltyAbility {
                change,
                effects: parse_effects(effect_text),
                text: line.to_string(),
            });
            continue;
        }

        if let Some(ability) = parse_activated(line) {
            set.activated.push(ability);
            continue;
        }

        if let Some(ability) = parse_triggered(line) {
            set.triggered.push(ability);
            continue;
        }

        if let Some(ability) = parse_static(line) {
            set.statics.push(ability);
            continue;
        }

        if is_spell {
            set.spell_effects.extend(parse_effects(line));
        } else {
            set.unparsed.push(line.to_string());
        }
    }

    set
}

/// Replace the card's name and self references with `~`
fn substitute_name(text: &str, card_name: &str) -> String {
    let mut out = if card_name.is_empty() {
        text.to_string()
    } else {
        text.replace(card_name, "~")
    };
    // Legendary cards refer to themselves by the part before the comma
    if let Some((short, _)) = card_name.split_once(',') {
        let short = short.trim();
        if !short.is_empty() {
            out = out.replace(short, "~");
        }
    }
    for phrase in SELF_REFERENCES {
        out = out.replace(phrase, "~");
        let mut capitalised = phrase.to_string();
        capitalised[..1].make_ascii_uppercase();
        out = out.replace(&capitalised, "~");
    }
    out
}

/// Split parenthesised reminder text out of a line
fn strip_reminder_text(line: &str) -> (String, Vec<String>) {
    let mut kept = String::with_capacity(line.len());
    let mut reminders = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in line.chars() {
        match c {
            '(' => {
                if depth > 0 {
                    current.push(c);
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    reminders.push(std::mem::take(&mut current).trim().to_string());
                } else {
                    current.push(c);
                }
            }
            _ if depth > 0 => current.push(c),
            _ => kept.push(c),
        }
    }
    (kept, reminders)
}

/// "Choose one —", "Choose two —", "Choose one or both —"
fn parse_mode_header(line: &str) -> Option<u32> {
    let lower = line.to_lowercase();
    let rest = lower.strip_prefix("choose ")?;
    let rest = rest.trim_end_matches(['—', '-', ':', ' ']);
    let count_word = rest.split_whitespace().next()?;
    let count = number_word(count_word)?;
    // "Choose one —" stands alone; "choose a creature" is an effect
    (rest == count_word || rest.contains(" or ")).then_some(count)
}

fn enchant_spec(rest: &str) -> TargetSpec {
    match rest.trim().trim_end_matches('.').to_lowercase().as_str() {
        "creature" | "creature you control" => TargetSpec::Creature,
        "artifact" => TargetSpec::Artifact,
        "enchantment" => TargetSpec::Enchantment,
        "land" => TargetSpec::Land,
        "planeswalker" => TargetSpec::Planeswalker,
        "player" => TargetSpec::Player,
        "opponent" => TargetSpec::Opponent,
        _ => TargetSpec::Permanent,
    }
}

/// A line made only of keywords: "Flying, vigilance"
///
/// Unknown but keyword-shaped parts ("Protection from red", "Equip {2}")
/// are kept as [`Keyword::Other`].
fn parse_keyword_line(line: &str) -> Option<Vec<Keyword>> {
    if line.ends_with('.') || line.contains(':') || line.contains('"') {
        return None;
    }
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    let mut keywords = Vec::with_capacity(parts.len());
    let mut known = 0;
    for part in &parts {
        if part.is_empty() || part.split_whitespace().count() > 4 {
            return None;
        }
        match Keyword::from_name(part) {
            Some(keyword) => {
                known += 1;
                keywords.push(keyword);
            }
            None => keywords.push(Keyword::Other(part.to_string())),
        }
    }
    let starts_upper = line.chars().next().is_some_and(|c| c.is_uppercase());
    (known > 0 || starts_upper).then_some(keywords)
}

/// "Landfall — Whenever a land enters..." splits into the word and the ability
fn split_ability_word(line: &str) -> Option<(&str, &str)> {
    let (word, rest) = line.split_once(" — ")?;
    let short = word.split_whitespace().count() <= 3;
    (short && !word.contains('{') && !rest.is_empty()).then_some((word.trim(), rest.trim()))
}

/// "+2:", "−3:" (typographic minus), "0:"
fn loyalty_prefix(input: &str) -> IResult<&str, i32> {
    let (input, sign) = opt(alt((char('+'), char('−'), char('-'))))(input)?;
    let (input, value) = map_res(digit1, |d: &str| d.parse::<i32>())(input)?;
    let (input, _) = char(':')(input)?;
    let change = match sign {
        Some('+') | None => value,
        Some(_) => -value,
    };
    Ok((input, change))
}

fn parse_activated(line: &str) -> Option<ActivatedAbility> {
    let (cost_text, effect_text) = line.split_once(": ")?;
    let cost = ActivationCost::parse(cost_text).ok()?;

    let mut once_per_turn = false;
    let mut sorcery_speed = false;
    let mut kept = Vec::new();
    for sentence in split_sentences(effect_text) {
        let lower = sentence.to_lowercase();
        if lower.starts_with("activate only") {
            once_per_turn |= lower.contains("once each turn");
            sorcery_speed |= lower.contains("as a sorcery");
        } else {
            kept.push(sentence);
        }
    }

    let effects: Vec<EffectDescriptor> =
        kept.iter().flat_map(|s| parse_sentence(s)).collect();
    let is_mana_ability = !effects.is_empty()
        && effects
            .iter()
            .all(|e| e.kind == EffectKind::AddMana && e.target_spec().is_none());

    Some(ActivatedAbility {
        cost,
        effects,
        is_mana_ability,
        once_per_turn,
        sorcery_speed,
        text: line.to_string(),
    })
}

fn parse_triggered(line: &str) -> Option<TriggeredAbility> {
    let lower = line.to_lowercase();
    if !["when ", "whenever ", "at "].iter().any(|p| lower.starts_with(p)) {
        return None;
    }
    let (condition, effect_text) = line.split_once(", ")?;
    let (event, subject) = parse_trigger_condition(condition)?;

    let effect_text = effect_text.trim();
    let (optional, effect_text) = match effect_text
        .strip_prefix("you may ")
        .or_else(|| effect_text.strip_prefix("You may "))
    {
        Some(rest) => (true, rest),
        None => (false, effect_text),
    };

    Some(TriggeredAbility {
        event,
        subject,
        effects: parse_effects(effect_text),
        optional,
        text: line.to_string(),
    })
}

fn parse_trigger_condition(condition: &str) -> Option<(TriggerEvent, TriggerSubject)> {
    let lower = condition.to_lowercase();

    if let Some(rest) = lower.strip_prefix("at the beginning of ") {
        let step = if rest.contains("upkeep") {
            Step::Upkeep
        } else if rest.contains("draw step") {
            Step::Draw
        } else if rest.contains("end step") {
            Step::End
        } else if rest.contains("postcombat main") {
            Step::PostcombatMain
        } else if rest.contains("precombat main") {
            Step::PrecombatMain
        } else if rest.contains("combat") {
            Step::BeginCombat
        } else {
            return None;
        };
        let yours_only = rest.contains("your ");
        return Some((TriggerEvent::StepBegins { step, yours_only }, TriggerSubject::Game));
    }

    let rest = lower
        .strip_prefix("whenever ")
        .or_else(|| lower.strip_prefix("when "))?;

    let event = if rest.contains("enters") {
        TriggerEvent::EntersBattlefield
    } else if rest.contains(" dies") {
        TriggerEvent::Dies
    } else if rest.contains("leaves the battlefield") {
        TriggerEvent::LeavesBattlefield
    } else if rest.contains(" deals ") && rest.contains("damage") {
        TriggerEvent::DealsDamage
    } else if rest.contains(" attacks") {
        TriggerEvent::Attacks
    } else if rest.contains(" draw") {
        TriggerEvent::Draw
    } else {
        return None;
    };

    let subject = if rest.starts_with('~') {
        TriggerSubject::This
    } else if rest.starts_with("another creature") || rest.starts_with("another nontoken creature")
    {
        TriggerSubject::AnotherCreature
    } else if rest.starts_with("a creature you control")
        || (rest.starts_with("a creature") && rest.contains("under your control"))
    {
        TriggerSubject::CreatureYouControl
    } else if rest.starts_with("a creature") || rest.starts_with("a nontoken creature") {
        TriggerSubject::AnyCreature
    } else if rest.starts_with("you ") {
        TriggerSubject::You
    } else if rest.starts_with("an opponent") {
        TriggerSubject::Opponent
    } else {
        return None;
    };

    Some((event, subject))
}

fn parse_static(line: &str) -> Option<StaticAbility> {
    let lower = line.to_lowercase();
    let lower = lower.trim_end_matches('.');

    if lower.contains("as though it had flash") || lower.contains("as though they had flash") {
        return Some(StaticAbility::CastAsThoughFlash);
    }
    if let Some(rest) = lower.strip_prefix("you may play ") {
        if rest.contains("additional land") {
            let count = number_word(rest.split_whitespace().next()?).unwrap_or(1);
            return Some(StaticAbility::AdditionalLand { count });
        }
    }
    if lower.starts_with("if you would draw a card") {
        let (_, rest) = lower.split_once(", draw ")?;
        let count = number_word(rest.split_whitespace().next()?)?;
        return Some(StaticAbility::DrawReplacement { count });
    }
    if lower.starts_with("if you would gain life") && lower.contains("twice that much") {
        return Some(StaticAbility::LifeGainMultiplier { factor: 2 });
    }
    if lower.starts_with("if a source you control would deal damage")
        && lower.contains("double that damage")
    {
        return Some(StaticAbility::DamageMultiplier {
            factor: 2,
            scope: if lower.contains("opponent") {
                DamageScope::ToOpponents
            } else {
                DamageScope::FromYourSources
            },
        });
    }
    if lower.starts_with("if a source would deal damage") && lower.contains("double that damage") {
        let scope = if lower.contains("to you") {
            DamageScope::ToYou
        } else if lower.contains("creature you control") {
            DamageScope::ToYourCreatures
        } else {
            DamageScope::Any
        };
        return Some(StaticAbility::DamageMultiplier { factor: 2, scope });
    }
    if let Some(rest) = lower.strip_prefix("prevent all ") {
        let amount = if rest.starts_with("combat damage") {
            PreventionAmount::AllCombat
        } else if rest.starts_with("damage") {
            PreventionAmount::All
        } else {
            return None;
        };
        // "this turn" makes it a one-shot effect, not a static
        if rest.contains("this turn") {
            return None;
        }
        let scope = if rest.contains("to you") {
            DamageScope::ToYou
        } else if rest.contains("creatures you control") {
            DamageScope::ToYourCreatures
        } else if rest.contains("sources you control") || rest.contains("by sources you control")
        {
            DamageScope::FromYourSources
        } else {
            DamageScope::Any
        };
        return Some(StaticAbility::PreventDamage { amount, scope });
    }
    None
}

/// Split effect text into sentences and classify each one
pub fn parse_effects(text: &str) -> Vec<EffectDescriptor> {
    split_sentences(text)
        .iter()
        .flat_map(|s| parse_sentence(s))
        .collect()
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for c in text.chars() {
        current.push(c);
        match c {
            '"' => in_quote = !in_quote,
            '.' if !in_quote => {
                let sentence = current.trim().trim_end_matches('.').trim().to_string();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                current.clear();
            }
            _ => {}
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// One sentence may carry two effects ("... and you gain 2 life")
fn parse_sentence(sentence: &str) -> Vec<EffectDescriptor> {
    let lower = sentence.to_lowercase();
    // Searching always shuffles
    if lower == "then shuffle" || lower == "shuffle your library" {
        return Vec::new();
    }
    if let Some(idx) = find_ignore_ascii_case(sentence, " and you gain ") {
        if !lower.starts_with("search") {
            let (first, second) = sentence.split_at(idx);
            let second = &second[" and ".len()..];
            return vec![parse_effect(first), parse_effect(second)];
        }
    }
    vec![parse_effect(sentence)]
}

/// Byte offset of an ASCII `needle` in `haystack`, ignoring ASCII case
///
/// Lowercasing can change a string's byte length, so offsets found in a
/// lowercased copy can't be used to split the original.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Classify one effect sentence
pub fn parse_effect(sentence: &str) -> EffectDescriptor {
    let text = sentence.trim().trim_end_matches('.');
    let lower = text.to_lowercase();
    let generic = || EffectDescriptor::new(EffectKind::Generic, Recipient::You, text);

    if lower.starts_with("counter target") {
        return EffectDescriptor::new(
            EffectKind::CounterSpell,
            Recipient::Target(TargetSpec::Spell),
            text,
        );
    }
    if lower.starts_with("prevent ") {
        return parse_prevention(text, &lower).unwrap_or_else(generic);
    }
    if lower.starts_with("add ") {
        return parse_add_mana(text, &lower).unwrap_or_else(generic);
    }
    if lower.starts_with("search your library") {
        return parse_search(text, &lower);
    }
    if let Some(rest) = lower.strip_prefix("gain control of ") {
        return EffectDescriptor::new(EffectKind::GainControl, parse_recipient(rest), text);
    }
    if let Some(idx) = lower.find(" deals ") {
        if let Some(damage) = parse_damage(text, &lower[idx + " deals ".len()..]) {
            return damage;
        }
    }
    if let Some(rest) = lower.strip_prefix("destroy ") {
        return object_effect(EffectKind::Destroy, rest, text).unwrap_or_else(generic);
    }
    if let Some(rest) = lower.strip_prefix("exile ") {
        return object_effect(EffectKind::Exile, rest, text).unwrap_or_else(generic);
    }
    if let Some(rest) = lower.strip_prefix("tap ") {
        return object_effect(EffectKind::Tap, rest, text).unwrap_or_else(generic);
    }
    if let Some(rest) = lower.strip_prefix("untap ") {
        return object_effect(EffectKind::Untap, rest, text).unwrap_or_else(generic);
    }
    if let Some(rest) = lower.strip_prefix("create ") {
        return parse_token(text, rest).unwrap_or_else(generic);
    }
    if let Some(rest) = lower.strip_prefix("return ") {
        return parse_return(text, rest).unwrap_or_else(generic);
    }
    if let Some(rest) = lower.strip_prefix("put ") {
        if let Some((count, target)) = rest.split_once(" +1/+1 counter") {
            let amount = parse_amount(count.trim()).unwrap_or(Amount::Fixed(1));
            let recipient = target
                .split_once(" on ")
                .map(|(_, on)| parse_recipient(on))
                .unwrap_or(Recipient::This);
            return EffectDescriptor::new(EffectKind::PlusOneCounters, recipient, text)
                .with_amount(amount);
        }
        return generic();
    }
    if let Some(effect) = parse_player_effect(text, &lower) {
        return effect;
    }
    generic()
}

fn object_effect(kind: EffectKind, rest: &str, text: &str) -> Option<EffectDescriptor> {
    let recipient = parse_recipient(rest);
    (recipient != Recipient::You).then(|| EffectDescriptor::new(kind, recipient, text))
}

/// "~ deals 3 damage to any target"
fn parse_damage(text: &str, after_deals: &str) -> Option<EffectDescriptor> {
    let (amount_word, rest) = after_deals.split_once(" damage")?;
    let amount = parse_amount(amount_word.trim())?;
    let recipient = rest
        .trim()
        .strip_prefix("to ")
        .map(parse_recipient)
        .unwrap_or(Recipient::Target(TargetSpec::AnyTarget));
    Some(EffectDescriptor::new(EffectKind::Damage, recipient, text).with_amount(amount))
}

/// Draw, gain life and lose life, with the player who does it
fn parse_player_effect(text: &str, lower: &str) -> Option<EffectDescriptor> {
    let subject = if lower.starts_with("target player") {
        Recipient::Target(TargetSpec::Player)
    } else if lower.starts_with("target opponent") {
        Recipient::Target(TargetSpec::Opponent)
    } else if lower.starts_with("each opponent") {
        Recipient::EachOpponent
    } else if lower.starts_with("each player") {
        Recipient::EachPlayer
    } else {
        Recipient::You
    };

    let words: Vec<&str> = lower.split_whitespace().collect();
    let verb_at = |verbs: &[&str]| words.iter().position(|w| verbs.contains(w));

    if let Some(i) = verb_at(&["draw", "draws"]) {
        let amount = words.get(i + 1).and_then(|w| parse_amount(w))?;
        return Some(EffectDescriptor::new(EffectKind::Draw, subject, text).with_amount(amount));
    }
    if lower.contains(" life") {
        if let Some(i) = verb_at(&["gain", "gains"]) {
            let amount = words.get(i + 1).and_then(|w| parse_amount(w))?;
            return Some(
                EffectDescriptor::new(EffectKind::GainLife, subject, text).with_amount(amount),
            );
        }
        if let Some(i) = verb_at(&["lose", "loses"]) {
            let amount = words.get(i + 1).and_then(|w| parse_amount(w))?;
            return Some(
                EffectDescriptor::new(EffectKind::LoseLife, subject, text).with_amount(amount),
            );
        }
    }
    None
}

fn parse_prevention(text: &str, lower: &str) -> Option<EffectDescriptor> {
    let rest = lower.strip_prefix("prevent ")?;
    let to_whom = |s: &str| {
        s.split_once("dealt to ")
            .map(|(_, who)| parse_recipient(who.trim_end_matches(" this turn")))
    };

    let (amount, recipient) = if rest.starts_with("all combat damage") {
        (PreventionAmount::AllCombat, Recipient::EachPlayer)
    } else if rest.starts_with("all damage") {
        (PreventionAmount::All, to_whom(rest).unwrap_or(Recipient::EachPlayer))
    } else if let Some(next) = rest.strip_prefix("the next ") {
        let n = match parse_amount(next.split_whitespace().next()?)? {
            Amount::Fixed(n) => n,
            Amount::X => return None,
        };
        (PreventionAmount::Up(n), to_whom(rest)?)
    } else {
        return None;
    };

    let mut effect = EffectDescriptor::new(EffectKind::PreventDamage, recipient, text);
    if let PreventionAmount::Up(n) = amount {
        effect.amount = Some(Amount::Fixed(n));
    }
    effect.prevention = Some(amount);
    Some(effect)
}

/// "Add {G}", "Add {R}{R}", "Add one mana of any color"
fn parse_add_mana(text: &str, lower: &str) -> Option<EffectDescriptor> {
    let mut effect = EffectDescriptor::new(EffectKind::AddMana, Recipient::You, text);
    if lower.contains("mana of any") {
        let count = lower
            .split_whitespace()
            .nth(1)
            .and_then(number_word)
            .unwrap_or(1);
        effect.any_color = count;
        return Some(effect);
    }

    let symbols: String = text
        .split_whitespace()
        .skip(1)
        .take_while(|w| w.starts_with('{'))
        .flat_map(|w| w.trim_end_matches([',', '.']).chars())
        .collect();
    // "Add {R} or {G}" is a choice the descriptor can't express
    if symbols.is_empty() || lower.contains(" or {") {
        return None;
    }
    effect.mana = Some(ManaCost::parse(&symbols).ok()?);
    Some(effect)
}

fn parse_search(text: &str, lower: &str) -> EffectDescriptor {
    let what = lower
        .split_once(" for ")
        .map(|(_, w)| w.split(',').next().unwrap_or(w))
        .unwrap_or("");
    let basic = what.contains("basic");
    let card_type = what
        .split_whitespace()
        .find_map(CardType::from_name);
    let destination = if lower.contains("onto the battlefield") {
        Zone::Battlefield
    } else {
        Zone::Hand
    };

    let mut effect = EffectDescriptor::new(EffectKind::Search, Recipient::You, text);
    effect.search = Some(SearchFilter { card_type, basic });
    effect.destination = Some(destination);
    effect
}

/// "return target creature to its owner's hand",
/// "return target creature card from your graveyard to your hand"
fn parse_return(text: &str, rest: &str) -> Option<EffectDescriptor> {
    let destination = if rest.contains("to the battlefield") {
        Zone::Battlefield
    } else if rest.contains("hand") {
        Zone::Hand
    } else if rest.contains("on top of") || rest.contains("library") {
        Zone::Library
    } else {
        return None;
    };

    let recipient = if rest.contains("graveyard") {
        let phrase = rest.split(" from ").next().unwrap_or(rest);
        let card_type = phrase
            .split_whitespace()
            .take_while(|w| *w != "card")
            .find_map(CardType::from_name);
        if !phrase.starts_with("target") {
            return None;
        }
        Recipient::Target(TargetSpec::CardInGraveyard(card_type))
    } else {
        let phrase = rest.split(" to ").next().unwrap_or(rest);
        match parse_recipient(phrase) {
            Recipient::You => return None,
            recipient => recipient,
        }
    };

    let mut effect = EffectDescriptor::new(EffectKind::Return, recipient, text);
    effect.destination = Some(destination);
    Some(effect)
}

/// "create two 1/1 white Soldier creature tokens with flying"
fn parse_token(text: &str, rest: &str) -> Option<EffectDescriptor> {
    let token_at = rest.find(" token")?;
    let words: Vec<&str> = rest[..token_at].split_whitespace().collect();
    let (count_word, description) = words.split_first()?;
    let count = parse_amount(count_word)?;

    // Keep the original casing for subtypes and names
    let original_words: Vec<&str> = text
        .split_whitespace()
        .skip(2)
        .take(description.len())
        .collect();

    let mut power = 0;
    let mut toughness = 0;
    let mut colors: SmallVec<[Color; 2]> = SmallVec::new();
    let mut types: SmallVec<[CardType; 2]> = SmallVec::new();
    let mut subtypes: SmallVec<[String; 2]> = SmallVec::new();

    for (i, word) in description.iter().enumerate() {
        if let Some((p, t)) = word.split_once('/') {
            power = p.parse().ok()?;
            toughness = t.parse().ok()?;
        } else if let Some(color) = color_word(word) {
            colors.push(color);
        } else if let Some(card_type) = CardType::from_name(word) {
            types.push(card_type);
        } else if *word != "and" && *word != "colorless" && *word != "legendary" {
            let original = original_words.get(i).copied().unwrap_or(word);
            subtypes.push(original.to_string());
        }
    }
    if types.is_empty() {
        // Named artifact tokens: "a Treasure token", "a Clue token"
        types.push(CardType::Artifact);
    }

    let keywords: SmallVec<[Keyword; 2]> = rest[token_at..]
        .split_once(" with ")
        .map(|(_, with)| {
            with.split(',')
                .flat_map(|part| part.split(" and "))
                .filter_map(|k| Keyword::from_name(k.trim()))
                .collect()
        })
        .unwrap_or_default();

    let name = if subtypes.is_empty() {
        "Token".to_string()
    } else {
        subtypes.join(" ")
    };

    let mut effect =
        EffectDescriptor::new(EffectKind::CreateToken, Recipient::You, text).with_amount(count);
    effect.token = Some(TokenSpec {
        name,
        power,
        toughness,
        types,
        subtypes,
        colors,
        keywords,
    });
    Some(effect)
}

/// Map a noun phrase onto who or what an effect applies to
///
/// Falls back to `You` when the phrase names no object.
fn parse_recipient(phrase: &str) -> Recipient {
    let phrase = phrase.trim();
    let target = |spec| Recipient::Target(spec);

    if phrase.starts_with('~') {
        return Recipient::This;
    }
    if phrase.contains("any target") || phrase.contains("target creature or player") {
        return target(TargetSpec::AnyTarget);
    }
    if let Some(after) = phrase.split_once("target ").map(|(_, a)| a) {
        let spec = if after.starts_with("creature or planeswalker") {
            TargetSpec::CreatureOrPlaneswalker
        } else if after.starts_with("creature") {
            TargetSpec::Creature
        } else if after.starts_with("planeswalker") {
            TargetSpec::Planeswalker
        } else if after.starts_with("nonland permanent") {
            TargetSpec::NonlandPermanent
        } else if after.starts_with("permanent") {
            TargetSpec::Permanent
        } else if after.starts_with("artifact") {
            TargetSpec::Artifact
        } else if after.starts_with("enchantment") {
            TargetSpec::Enchantment
        } else if after.starts_with("land") {
            TargetSpec::Land
        } else if after.contains("spell") {
            TargetSpec::Spell
        } else if after.starts_with("opponent") {
            TargetSpec::Opponent
        } else if after.starts_with("player") {
            TargetSpec::Player
        } else {
            return Recipient::You;
        };
        return target(spec);
    }

    if phrase.contains("creature you don't control")
        || phrase.contains("creatures you don't control")
        || phrase.contains("creatures your opponents control")
        || phrase.contains("creature your opponents control")
    {
        Recipient::EachCreatureOpponentsControl
    } else if phrase.contains("creatures you control") || phrase.contains("creature you control") {
        Recipient::EachCreatureYouControl
    } else if phrase.contains("each creature") || phrase.contains("all creatures") {
        Recipient::EachCreature
    } else if phrase.contains("each opponent") {
        Recipient::EachOpponent
    } else if phrase.contains("each player") {
        Recipient::EachPlayer
    } else {
        Recipient::You
    }
}

fn parse_amount(word: &str) -> Option<Amount> {
    match word {
        "x" | "X" => Some(Amount::X),
        _ => number_word(word).map(Amount::Fixed),
    }
}

fn number_word(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse::<u32>() {
        return Some(n);
    }
    let n = match word.to_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => return None,
    };
    Some(n)
}

fn color_word(word: &str) -> Option<Color> {
    match word {
        "white" => Some(Color::White),
        "blue" => Some(Color::Blue),
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        _ => None,
    }
}
