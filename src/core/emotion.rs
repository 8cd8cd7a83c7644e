use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ConfigStore;
use crate::core::event::EmotionSource;

/// Mood bands over the 0-100 emotion value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLevel {
    Excited,
    Happy,
    Neutral,
    Annoyed,
    Angry,
    Broken,
}

impl EmotionLevel {
    pub fn from_state(state: &EmotionState) -> Self {
        if state.broken {
            return EmotionLevel::Broken;
        }
        match state.value {
            v if v >= 80 => EmotionLevel::Excited,
            v if v >= 60 => EmotionLevel::Happy,
            v if v >= 40 => EmotionLevel::Neutral,
            v if v >= 20 => EmotionLevel::Annoyed,
            v if v >= 10 => EmotionLevel::Angry,
            _ => EmotionLevel::Broken,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            EmotionLevel::Excited => "excited",
            EmotionLevel::Happy => "happy",
            EmotionLevel::Neutral => "neutral",
            EmotionLevel::Annoyed => "annoyed",
            EmotionLevel::Angry => "angry",
            EmotionLevel::Broken => "broken",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            EmotionLevel::Excited => "🤩",
            EmotionLevel::Happy => "😊",
            EmotionLevel::Neutral => "😐",
            EmotionLevel::Annoyed => "😤",
            EmotionLevel::Angry => "😠",
            EmotionLevel::Broken => "😭💔",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EmotionLevel::Excited => "buzzing",
            EmotionLevel::Happy => "in a good mood",
            EmotionLevel::Neutral => "business as usual",
            EmotionLevel::Annoyed => "getting irritated",
            EmotionLevel::Angry => "barely holding it together",
            EmotionLevel::Broken => "broken down",
        }
    }

    /// How the mood colors the persona's delivery.
    pub fn modifier(&self) -> StyleModifier {
        match self {
            EmotionLevel::Excited => StyleModifier {
                speed: 1.3,
                exclamation_boost: true,
                emoji_boost: true,
                hint: "very excited, talks fast, heavy on exclamation marks",
            },
            EmotionLevel::Happy => StyleModifier {
                speed: 1.1,
                exclamation_boost: false,
                emoji_boost: true,
                hint: "relaxed and friendly",
            },
            EmotionLevel::Neutral => StyleModifier {
                speed: 1.0,
                exclamation_boost: false,
                emoji_boost: false,
                hint: "normal register",
            },
            EmotionLevel::Annoyed => StyleModifier {
                speed: 1.1,
                exclamation_boost: true,
                emoji_boost: false,
                hint: "irritated, clipped and snappy",
            },
            EmotionLevel::Angry => StyleModifier {
                speed: 1.2,
                exclamation_boost: true,
                emoji_boost: false,
                hint: "angry, may lash out",
            },
            EmotionLevel::Broken => StyleModifier {
                speed: 0.8,
                exclamation_boost: true,
                emoji_boost: false,
                hint: "emotionally collapsed, blurts out raw truths",
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct StyleModifier {
    pub speed: f32,
    pub exclamation_boost: bool,
    pub emoji_boost: bool,
    pub hint: &'static str,
}

/// One persona's mood within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionState {
    pub value: i32,
    pub broken: bool,
    pub broken_count: u32,
}

impl EmotionState {
    pub fn new(value: i32) -> Self {
        EmotionState {
            value: value.clamp(0, 100),
            broken: false,
            broken_count: 0,
        }
    }

    pub fn level(&self) -> EmotionLevel {
        EmotionLevel::from_state(self)
    }

    /// Ten-segment mood bar for console display.
    pub fn bar(&self) -> String {
        let filled = (self.value / 10).clamp(0, 10) as usize;
        format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
    }
}

/// A single matched trigger or healing phrase and its mood delta.
#[derive(Debug, Clone)]
pub struct EmotionEvent {
    pub trigger: String,
    pub delta: i32,
}

/// Evaluates trigger phrases and applies bounded mood deltas. Stateless:
/// all mutable mood lives in the session that owns the `EmotionState`s.
pub struct EmotionEngine {
    config: Arc<ConfigStore>,
}

impl EmotionEngine {
    pub const TRIGGER_DAMAGE: i32 = 15;
    pub const RIVAL_ATTACK_DAMAGE: i32 = 20;
    pub const USER_ATTACK_DAMAGE: i32 = 25;
    pub const SUPPORT_HEAL: i32 = 10;
    pub const TURN_REGEN: i32 = 2;
    pub const BREAKDOWN_THRESHOLD: i32 = 15;
    pub const RECOVERY_FLOOR: i32 = 30;

    const FALLBACK_BREAKDOWN_LINE: &'static str = "...I don't want to talk anymore.";

    pub fn new(config: Arc<ConfigStore>) -> Self {
        EmotionEngine { config }
    }

    /// Fresh state at the persona's configured starting value. Calling it
    /// again for the same persona simply resets the state.
    pub fn initialize(&self, persona_id: &str) -> EmotionState {
        let start = self
            .config
            .persona(persona_id)
            .map(|p| p.initial_emotion)
            .unwrap_or(50);
        EmotionState::new(start)
    }

    /// Scan `text` for the persona's breakdown triggers and healing words.
    /// Damage scales with who said it: the user hurts most, a rival more
    /// than a neutral peer. All matches are collected, never short-circuited.
    pub fn evaluate_triggers(
        &self,
        persona_id: &str,
        text: &str,
        source: &EmotionSource,
    ) -> Vec<EmotionEvent> {
        let Some(secrets) = self.config.get_secrets(persona_id) else {
            tracing::debug!(persona_id, "no secret profile; skipping trigger scan");
            return Vec::new();
        };

        let lower = text.to_lowercase();
        let mut events = Vec::new();

        for trigger in &secrets.breakdown_triggers {
            if lower.contains(&trigger.to_lowercase()) {
                let damage = match source {
                    EmotionSource::User => Self::USER_ATTACK_DAMAGE,
                    EmotionSource::Persona(other) if self.config.is_rival(persona_id, other) => {
                        Self::RIVAL_ATTACK_DAMAGE
                    }
                    EmotionSource::Persona(_) => Self::TRIGGER_DAMAGE,
                };
                events.push(EmotionEvent {
                    trigger: trigger.clone(),
                    delta: -damage,
                });
            }
        }

        for word in &secrets.healing_words {
            if lower.contains(&word.to_lowercase()) {
                events.push(EmotionEvent {
                    trigger: word.clone(),
                    delta: Self::SUPPORT_HEAL,
                });
            }
        }

        events
    }

    /// Clamp the new value into [0, 100] and report whether this delta
    /// crossed into breakdown. The crossing fires exactly once per episode;
    /// further negative deltas while broken do not re-fire.
    pub fn apply(&self, state: &mut EmotionState, delta: i32) -> (i32, bool) {
        state.value = (state.value + delta).clamp(0, 100);

        let mut crossed = false;
        if state.value <= Self::BREAKDOWN_THRESHOLD && !state.broken {
            state.broken = true;
            state.broken_count += 1;
            crossed = true;
        }

        (state.value, crossed)
    }

    /// One line from the persona's breakdown pool, uniformly at random.
    pub fn breakdown_response<R: Rng>(&self, persona_id: &str, rng: &mut R) -> String {
        self.config
            .get_secrets(persona_id)
            .and_then(|s| s.breakdown_responses.choose(rng))
            .cloned()
            .unwrap_or_else(|| Self::FALLBACK_BREAKDOWN_LINE.to_string())
    }

    /// Hard reset out of breakdown. Always lands on the recovery floor.
    pub fn recover(&self, state: &mut EmotionState) {
        state.broken = false;
        state.value = Self::RECOVERY_FLOOR;
    }

    /// Style hint for the responder, honoring per-persona overrides.
    pub fn style_hint(&self, persona_id: &str, state: &EmotionState) -> String {
        let level = state.level();
        self.config
            .persona(persona_id)
            .and_then(|p| p.style_hints.get(level.key()))
            .cloned()
            .unwrap_or_else(|| level.modifier().hint.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> EmotionEngine {
        EmotionEngine::new(Arc::new(ConfigStore::default_roster()))
    }

    #[test]
    fn test_apply_clamps_to_bounds() {
        let engine = engine();
        let mut state = EmotionState::new(50);

        let (value, _) = engine.apply(&mut state, -1000);
        assert_eq!(value, 0);

        let (value, _) = engine.apply(&mut state, 1000);
        assert_eq!(value, 100);
    }

    #[test]
    fn test_breakdown_is_edge_triggered() {
        // Three -20 hits from 50: breakdown fires at the second (50-20-20=10),
        // not again at the third, and the value bottoms out clamped at 0.
        let engine = engine();
        let mut state = EmotionState::new(50);

        let (value, crossed) = engine.apply(&mut state, -20);
        assert_eq!((value, crossed), (30, false));

        let (value, crossed) = engine.apply(&mut state, -20);
        assert_eq!((value, crossed), (10, true));

        let (value, crossed) = engine.apply(&mut state, -20);
        assert_eq!((value, crossed), (0, false));
        assert_eq!(state.broken_count, 1);
    }

    #[test]
    fn test_recover_is_a_hard_reset() {
        let engine = engine();
        let mut state = EmotionState::new(50);
        engine.apply(&mut state, -50);
        assert!(state.broken);

        engine.recover(&mut state);
        assert_eq!(state.value, EmotionEngine::RECOVERY_FLOOR);
        assert!(!state.broken);

        // Recovery lands on the floor no matter where the value was.
        let mut high = EmotionState::new(90);
        high.broken = true;
        engine.recover(&mut high);
        assert_eq!(high.value, 30);
    }

    #[test]
    fn test_damage_scales_with_source() {
        let engine = engine();

        let from_user = engine.evaluate_triggers("clip", "pure brain rot", &EmotionSource::User);
        assert_eq!(from_user.len(), 1);
        assert_eq!(from_user[0].delta, -EmotionEngine::USER_ATTACK_DAMAGE);

        // sage is clip's configured rival.
        let from_rival = engine.evaluate_triggers(
            "clip",
            "pure brain rot",
            &EmotionSource::Persona("sage".to_string()),
        );
        assert_eq!(from_rival[0].delta, -EmotionEngine::RIVAL_ATTACK_DAMAGE);

        let from_peer = engine.evaluate_triggers(
            "clip",
            "pure brain rot",
            &EmotionSource::Persona("buzz".to_string()),
        );
        assert_eq!(from_peer[0].delta, -EmotionEngine::TRIGGER_DAMAGE);
    }

    #[test]
    fn test_triggers_and_healing_are_summed() {
        let engine = engine();
        let events = engine.evaluate_triggers(
            "clip",
            "it's brain rot but honestly so fun",
            &EmotionSource::User,
        );
        let total: i32 = events.iter().map(|e| e.delta).sum();
        assert_eq!(
            total,
            -EmotionEngine::USER_ATTACK_DAMAGE + EmotionEngine::SUPPORT_HEAL
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let engine = engine();
        let events = engine.evaluate_triggers("clip", "BRAIN ROT content", &EmotionSource::User);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_breakdown_response_falls_back_when_unconfigured() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(1);
        let line = engine.breakdown_response("nobody", &mut rng);
        assert_eq!(line, "...I don't want to talk anymore.");

        let configured = engine.breakdown_response("clip", &mut rng);
        assert!(!configured.is_empty());
        assert_ne!(configured, "...I don't want to talk anymore.");
    }

    #[test]
    fn test_initialize_uses_configured_start() {
        let engine = engine();
        assert_eq!(engine.initialize("clip").value, 60);
        assert_eq!(engine.initialize("unknown").value, 50);
    }
}
