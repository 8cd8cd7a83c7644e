use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::config::ConfigStore;
use crate::core::event::{Consequence, PrivateMessageEvent, PrivateMessageKind};

/// Probabilistically opens a side channel from one persona to the user,
/// gossiping about the other. Stateless; the pending event lives in the
/// session.
pub struct PrivateMessageEngine {
    config: Arc<ConfigStore>,
}

impl PrivateMessageEngine {
    pub const BASE_TRIGGER_CHANCE: f64 = 0.25;
    pub const RIVALRY_BOOST: f64 = 0.15;
    pub const LOW_EMOTION_BOOST: f64 = 0.1;
    pub const CONFLICT_BOOST: f64 = 0.1;

    pub fn new(config: Arc<ConfigStore>) -> Self {
        PrivateMessageEngine { config }
    }

    /// One draw against the summed probability, not one per bonus.
    pub fn maybe_trigger<R: Rng>(
        &self,
        sender_id: &str,
        other_ids: &[&str],
        emotion_value: i32,
        recent_conflict: bool,
        rng: &mut R,
    ) -> bool {
        let rivals = other_ids
            .iter()
            .filter(|other| self.config.is_rival(sender_id, other))
            .count();
        let chance = trigger_chance(rivals, emotion_value, recent_conflict);
        rng.gen::<f64>() < chance
    }

    /// Build the side-channel message: type conditioned on the pair's
    /// relationship, body from a canned template pool, always exactly three
    /// options with a fixed consequence table.
    pub fn generate<R: Rng>(
        &self,
        sender_id: &str,
        target_id: &str,
        rng: &mut R,
    ) -> PrivateMessageEvent {
        let relationship = self.config.relationship_between(sender_id, target_id);

        let kind = if relationship.is_rivalry() {
            *[PrivateMessageKind::Alliance, PrivateMessageKind::Gossip]
                .choose(rng)
                .unwrap_or(&PrivateMessageKind::Gossip)
        } else if relationship.is_warm() {
            *[PrivateMessageKind::Gossip, PrivateMessageKind::SecretReveal]
                .choose(rng)
                .unwrap_or(&PrivateMessageKind::Gossip)
        } else {
            *PrivateMessageKind::ALL
                .choose(rng)
                .unwrap_or(&PrivateMessageKind::Gossip)
        };

        let body = self.render_body(kind, sender_id, target_id, &relationship, rng);

        PrivateMessageEvent {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            target_id: target_id.to_string(),
            kind,
            body,
            options: options_for(kind),
            consequences: consequence_table(&self.config.persona_name(sender_id)),
        }
    }

    fn render_body<R: Rng>(
        &self,
        kind: PrivateMessageKind,
        sender_id: &str,
        target_id: &str,
        relationship: &crate::config::Relationship,
        rng: &mut R,
    ) -> String {
        let target = self.config.persona_name(target_id);
        let respect = if relationship.secret_respect.is_empty() {
            "isn't half as confident in private".to_string()
        } else {
            relationship.secret_respect.clone()
        };

        let templates: Vec<String> = match kind {
            PrivateMessageKind::Alliance => {
                let jab = relationship
                    .attack_lines
                    .choose(rng)
                    .cloned()
                    .unwrap_or_else(|| "it's all just posturing anyway".to_string());
                vec![
                    format!("psst... did you see what {target} just said? typical. want to team up against them?"),
                    format!("between us: {target} was out of line today. we should stick together..."),
                    format!("quiet voice: you don't actually buy their talk, right? {jab}"),
                ]
            }
            PrivateMessageKind::Gossip => vec![
                format!("don't tell anyone, but {target} {respect}"),
                format!(
                    "you know what {target} is most afraid of hearing? {}",
                    self.fear_of(target_id)
                ),
                format!(
                    "a little bird says {target} once got dragged over {}",
                    self.public_shame_of(target_id, rng)
                ),
            ],
            PrivateMessageKind::Complaint => vec![
                format!("that thing {target} said earlier really stung..."),
                format!("is it just me, or has {target} been targeting me all session?"),
                format!("did I say something wrong? why does {target} keep dunking on me..."),
            ],
            PrivateMessageKind::SecretReveal => vec![
                format!("okay. a secret... {}", self.private_shame_of(sender_id, rng)),
                format!("don't spread this, but {target} privately {respect}"),
                format!("honestly, sometimes I wonder... {}", self.self_doubt_of(sender_id)),
            ],
            PrivateMessageKind::BetrayalHint => vec![
                format!(
                    "about the topic earlier... truth is, {}",
                    self.betrayal_hint_of(sender_id)
                ),
                format!("don't tell {target}, but I think they had a point..."),
                format!("I'd never admit it out loud, but {respect}"),
            ],
            PrivateMessageKind::Manipulation => vec![
                format!("could you ask {target} if they have a problem with me?"),
                format!("next time {target} starts up, back me up, yeah?"),
                format!("you seem fair. help me settle a score with {target}?"),
            ],
        };

        templates
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| format!("so... about {target}."))
    }

    fn fear_of(&self, persona_id: &str) -> String {
        let fear = self
            .config
            .get_secrets(persona_id)
            .map(|s| s.core_fear.clone())
            .unwrap_or_default();
        if fear.is_empty() {
            "...actually, never mind".to_string()
        } else {
            truncate_chars(&fear, 30)
        }
    }

    fn public_shame_of<R: Rng>(&self, persona_id: &str, rng: &mut R) -> String {
        self.config
            .get_secrets(persona_id)
            .and_then(|s| s.public_shames.choose(rng))
            .cloned()
            .unwrap_or_else(|| "that one thing".to_string())
    }

    fn private_shame_of<R: Rng>(&self, persona_id: &str, rng: &mut R) -> String {
        self.config
            .get_secrets(persona_id)
            .and_then(|s| s.private_shames.choose(rng))
            .cloned()
            .unwrap_or_else(|| "there are things I'd rather not get into".to_string())
    }

    fn self_doubt_of(&self, persona_id: &str) -> String {
        let fear = self
            .config
            .get_secrets(persona_id)
            .map(|s| s.core_fear.clone())
            .unwrap_or_default();
        if fear.is_empty() {
            "did I get something wrong somewhere?".to_string()
        } else {
            fear
        }
    }

    fn betrayal_hint_of(&self, persona_id: &str) -> String {
        self.config
            .get_secrets(persona_id)
            .map(|s| s.betrayal.statement.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "I don't entirely disagree with them".to_string())
    }
}

/// Summed trigger probability for one roll.
pub(crate) fn trigger_chance(rivals_present: usize, emotion_value: i32, recent_conflict: bool) -> f64 {
    let mut chance =
        PrivateMessageEngine::BASE_TRIGGER_CHANCE + PrivateMessageEngine::RIVALRY_BOOST * rivals_present as f64;
    if emotion_value < 40 {
        chance += PrivateMessageEngine::LOW_EMOTION_BOOST;
    }
    if recent_conflict {
        chance += PrivateMessageEngine::CONFLICT_BOOST;
    }
    chance
}

fn options_for(kind: PrivateMessageKind) -> [String; 3] {
    let options: [&str; 3] = match kind {
        PrivateMessageKind::Alliance => [
            "Agree to the alliance, gang up on them",
            "Stay neutral, help neither side",
            "Screenshot this and post it in the group chat",
        ],
        PrivateMessageKind::Gossip => [
            "Interesting. Noted",
            "Don't talk behind people's backs",
            "Ask them in the group chat if it's true",
        ],
        PrivateMessageKind::Complaint => [
            "Comfort them",
            "True, that was a bit much",
            "Honestly, you had it coming",
        ],
        PrivateMessageKind::SecretReveal => [
            "Thanks for trusting me",
            "Your secret is safe with me",
            "Hold on, let me screenshot this...",
        ],
        PrivateMessageKind::BetrayalHint => [
            "Understood. Everyone has layers",
            "Oh? Go on",
            "Interesting. I'm telling them",
        ],
        PrivateMessageKind::Manipulation => [
            "Sure, I'll help you out",
            "I'm not getting in the middle of this",
            "Say it yourself, leave me out of it",
        ],
    };
    options.map(String::from)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}

/// Index 0 sides with the sender, 1 stays neutral, 2 exposes the message.
fn consequence_table(sender_name: &str) -> [Consequence; 3] {
    [
        Consequence {
            sender_emotion: 10,
            relation: 5,
            target_emotion: 0,
            description: format!("You sided with {sender_name}"),
        },
        Consequence {
            sender_emotion: 0,
            relation: 0,
            target_emotion: 0,
            description: "You stayed neutral".to_string(),
        },
        Consequence {
            sender_emotion: -20,
            relation: -15,
            target_emotion: 5,
            description: "You picked the dangerous option...".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> PrivateMessageEngine {
        PrivateMessageEngine::new(Arc::new(ConfigStore::default_roster()))
    }

    #[test]
    fn test_trigger_chance_sums_bonuses() {
        // Base 0.25 + one rival 0.15 + low emotion 0.1, no recent conflict.
        let chance = trigger_chance(1, 35, false);
        assert!((chance - 0.5).abs() < 1e-9);

        assert!((trigger_chance(0, 50, false) - 0.25).abs() < 1e-9);
        assert!((trigger_chance(2, 10, true) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_maybe_trigger_fires_iff_draw_below_chance() {
        let engine = engine();
        for seed in 0..50u64 {
            // Sample the draw the engine is about to make from a twin rng.
            let mut probe = StdRng::seed_from_u64(seed);
            let draw: f64 = probe.gen();

            let mut rng = StdRng::seed_from_u64(seed);
            let fired = engine.maybe_trigger("clip", &["sage"], 35, false, &mut rng);
            assert_eq!(fired, draw < 0.5, "seed {seed}");
        }
    }

    #[test]
    fn test_rivalry_restricts_message_kinds() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..40 {
            let event = engine.generate("clip", "sage", &mut rng);
            assert!(
                matches!(
                    event.kind,
                    PrivateMessageKind::Alliance | PrivateMessageKind::Gossip
                ),
                "unexpected kind {:?} for a rivalry pair",
                event.kind
            );
        }
    }

    #[test]
    fn test_warm_relations_restrict_message_kinds() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..40 {
            let event = engine.generate("buzz", "clip", &mut rng);
            assert!(
                matches!(
                    event.kind,
                    PrivateMessageKind::Gossip | PrivateMessageKind::SecretReveal
                ),
                "unexpected kind {:?} for a warm pair",
                event.kind
            );
        }
    }

    #[test]
    fn test_event_shape() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(9);
        let event = engine.generate("glow", "relic", &mut rng);

        assert_eq!(event.options.len(), 3);
        assert!(!event.body.is_empty());
        // Fixed consequence table regardless of kind.
        assert_eq!(event.consequences[0].sender_emotion, 10);
        assert_eq!(event.consequences[0].relation, 5);
        assert_eq!(event.consequences[1].sender_emotion, 0);
        assert_eq!(event.consequences[2].sender_emotion, -20);
        assert_eq!(event.consequences[2].relation, -15);
        assert_eq!(event.consequences[2].target_emotion, 5);
    }
}
