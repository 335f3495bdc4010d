//! Target legality and automatic target selection

use crate::core::{CardId, CardType, EffectDescriptor, Keyword, PlayerId, TargetRef, TargetSpec};
use crate::game::GameState;

impl GameState {
    /// Is `target` a legal choice for `spec`, chosen by `chooser`?
    ///
    /// `source` is the card the spell or ability comes from; a spell can't
    /// target itself.
    pub fn is_legal_target(
        &self,
        spec: &TargetSpec,
        target: TargetRef,
        chooser: PlayerId,
        source: Option<CardId>,
    ) -> bool {
        match target {
            TargetRef::Player(player) => {
                let Ok(p) = self.player(player) else {
                    return false;
                };
                if p.has_lost {
                    return false;
                }
                match spec {
                    TargetSpec::AnyTarget | TargetSpec::Player => true,
                    TargetSpec::Opponent => player != chooser,
                    _ => false,
                }
            }
            TargetRef::Card(card) => {
                if let TargetSpec::CardInGraveyard(card_type) = spec {
                    return self.is_legal_graveyard_target(card, *card_type);
                }
                self.is_legal_permanent_target(spec, card, chooser)
            }
            TargetRef::StackObject(id) => match spec {
                TargetSpec::Spell => self
                    .stack_object(id)
                    .map(|o| o.is_spell() && Some(o.source_card()) != source)
                    .unwrap_or(false),
                _ => false,
            },
        }
    }

    fn is_legal_graveyard_target(&self, card: CardId, card_type: Option<CardType>) -> bool {
        let Ok(instance) = self.card(card) else {
            return false;
        };
        self.graveyard(instance.owner).contains(&card)
            && card_type.map(|t| instance.is_type(t)).unwrap_or(true)
    }

    fn is_legal_permanent_target(
        &self,
        spec: &TargetSpec,
        card: CardId,
        chooser: PlayerId,
    ) -> bool {
        if !self.is_on_battlefield(card) {
            return false;
        }
        let Ok(instance) = self.card(card) else {
            return false;
        };
        if instance.phased_out || instance.has_keyword(&Keyword::Shroud) {
            return false;
        }
        if instance.controller != chooser && instance.has_keyword(&Keyword::Hexproof) {
            return false;
        }
        match spec {
            TargetSpec::AnyTarget | TargetSpec::CreatureOrPlaneswalker => {
                instance.is_creature() || instance.is_planeswalker()
            }
            TargetSpec::Creature => instance.is_creature(),
            TargetSpec::Planeswalker => instance.is_planeswalker(),
            TargetSpec::Permanent => true,
            TargetSpec::NonlandPermanent => !instance.is_land(),
            TargetSpec::Artifact => instance.is_type(CardType::Artifact),
            TargetSpec::Enchantment => instance.is_type(CardType::Enchantment),
            TargetSpec::Land => instance.is_land(),
            TargetSpec::Player
            | TargetSpec::Opponent
            | TargetSpec::Spell
            | TargetSpec::CardInGraveyard(_) => false,
        }
    }

    /// Every legal choice for `spec`: players, then permanents, graveyards and spells
    pub fn legal_targets(
        &self,
        spec: &TargetSpec,
        chooser: PlayerId,
        source: Option<CardId>,
    ) -> Vec<TargetRef> {
        let players = self.remaining_players().into_iter().map(TargetRef::Player);
        let permanents = self.battlefield().iter().copied().map(TargetRef::Card);
        let graveyards = self
            .players
            .iter()
            .flat_map(|p| self.graveyard(p.id).iter().copied())
            .map(TargetRef::Card);
        let spells = self.stack.iter().map(|o| TargetRef::StackObject(o.id));

        players
            .chain(permanents)
            .chain(graveyards)
            .chain(spells)
            .filter(|t| self.is_legal_target(spec, *t, chooser, source))
            .collect()
    }

    /// The player controlling a target
    pub fn target_controller(&self, target: TargetRef) -> Option<PlayerId> {
        match target {
            TargetRef::Player(p) => Some(p),
            TargetRef::Card(c) => self.card(c).ok().map(|c| c.controller),
            TargetRef::StackObject(id) => self.stack_object(id).map(|o| o.controller),
        }
    }

    /// Pick a target for an effect without asking anyone
    ///
    /// Harmful effects prefer things the controller's opponents control,
    /// beneficial ones prefer the controller's own. Falls back to any legal
    /// target.
    pub fn auto_target(
        &self,
        effect: &EffectDescriptor,
        controller: PlayerId,
        source: Option<CardId>,
    ) -> Option<TargetRef> {
        let spec = effect.target_spec()?;
        let candidates = self.legal_targets(spec, controller, source);
        let harmful = effect.kind.is_harmful();
        candidates
            .iter()
            .copied()
            .find(|t| {
                let owned = self.target_controller(*t) == Some(controller);
                if harmful {
                    !owned
                } else {
                    owned
                }
            })
            .or_else(|| candidates.first().copied())
    }
}
