use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ConfigStore;
use crate::core::event::BetrayalEvent;

/// Per-persona betrayal bookkeeping, owned by the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetrayalState {
    pub cooldown: u32,
    pub count: u32,
}

/// Decides, per turn, whether a persona publicly flips its stance.
pub struct BetrayalEngine {
    config: Arc<ConfigStore>,
}

impl BetrayalEngine {
    pub const COOLDOWN_TURNS: u32 = 5;

    const STANCE_FALLBACK: &'static str = "...maybe the other side has a point after all.";

    pub fn new(config: Arc<ConfigStore>) -> Self {
        BetrayalEngine { config }
    }

    /// Low mood plus a sensitive topic makes a flip more likely. Returns
    /// `None` without rolling while the persona is cooling down.
    pub fn check<R: Rng>(
        &self,
        persona_id: &str,
        topic_text: &str,
        current_emotion: i32,
        state: &mut BetrayalState,
        rng: &mut R,
    ) -> Option<BetrayalEvent> {
        if state.cooldown > 0 {
            return None;
        }

        let secrets = self.config.get_secrets(persona_id)?;
        let betrayal = &secrets.betrayal;
        if betrayal.statement.is_empty() {
            return None;
        }

        let topic_lower = topic_text.to_lowercase();
        let matched: Vec<&String> = betrayal
            .keywords
            .iter()
            .filter(|kw| topic_lower.contains(&kw.to_lowercase()))
            .collect();
        if matched.is_empty() {
            return None;
        }

        let probability = betrayal_probability(betrayal.probability, current_emotion, matched.len());
        let draw: f64 = rng.gen();
        if draw > probability {
            return None;
        }

        let trigger_keyword = matched[0].clone();
        let event = self.build_event(persona_id, betrayal, &trigger_keyword, state.count);

        state.cooldown = Self::COOLDOWN_TURNS;
        state.count += 1;
        tracing::debug!(persona_id, keyword = %trigger_keyword, "betrayal fired");

        Some(event)
    }

    fn build_event(
        &self,
        persona_id: &str,
        betrayal: &crate::config::BetrayalConfig,
        trigger_keyword: &str,
        prior_count: u32,
    ) -> BetrayalEvent {
        let original_stance = self
            .config
            .persona(persona_id)
            .map(|p| truncate_chars(&p.core_identity, 50))
            .unwrap_or_default();

        let new_stance = betrayal
            .stances
            .iter()
            .find(|s| trigger_keyword.contains(&s.keyword) || s.keyword.contains(trigger_keyword))
            .map(|s| s.line.clone())
            .unwrap_or_else(|| Self::STANCE_FALLBACK.to_string());

        let shock_value = self.shock_value(betrayal, trigger_keyword, prior_count);

        BetrayalEvent {
            persona_id: persona_id.to_string(),
            trigger_keyword: trigger_keyword.to_string(),
            original_stance,
            new_stance,
            statement: betrayal.statement.clone(),
            shock_value,
        }
    }

    /// Base 5, +3 when the keyword touches the persona's core topics,
    /// +2 for the first betrayal of the session, capped at 10.
    fn shock_value(
        &self,
        betrayal: &crate::config::BetrayalConfig,
        trigger_keyword: &str,
        prior_count: u32,
    ) -> u8 {
        let mut shock: u8 = 5;
        if betrayal
            .core_topics
            .iter()
            .any(|topic| trigger_keyword.contains(topic.as_str()) || topic.contains(trigger_keyword))
        {
            shock += 3;
        }
        if prior_count == 0 {
            shock += 2;
        }
        shock.min(10)
    }

    /// Called exactly once per turn. Saturates at zero.
    pub fn tick_cooldowns<'a>(states: impl Iterator<Item = &'a mut BetrayalState>) {
        for state in states {
            state.cooldown = state.cooldown.saturating_sub(1);
        }
    }
}

/// The probability formula, fixed order: emotion bonus is clamped at 0.8
/// before the keyword bonus is added, then the whole thing at 0.9.
pub(crate) fn betrayal_probability(base: f64, current_emotion: i32, matched_keywords: usize) -> f64 {
    let emotion_bonus = (50 - current_emotion).max(0) as f64 / 100.0 * 0.3;
    let before_keywords = (base + emotion_bonus).min(0.8);
    (before_keywords + 0.1 * matched_keywords as f64).min(0.9)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> BetrayalEngine {
        BetrayalEngine::new(Arc::new(ConfigStore::default_roster()))
    }

    #[test]
    fn test_probability_clamp_order() {
        // Emotion bonus clamps at 0.8 first, keyword bonus after, then 0.9.
        assert_eq!(betrayal_probability(0.85, 0, 0), 0.8);
        assert_eq!(betrayal_probability(0.85, 0, 2), 0.9);
        // Below both clamps, everything adds up plainly.
        let p = betrayal_probability(0.2, 30, 1);
        assert!((p - (0.2 + 0.06 + 0.1)).abs() < 1e-9);
        // High mood contributes nothing; negative bonus never subtracts.
        let p = betrayal_probability(0.2, 90, 1);
        assert!((p - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_cooldown_blocks_unconditionally() {
        let engine = engine();
        let mut state = BetrayalState {
            cooldown: 3,
            count: 0,
        };
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            // Matching topic, rock-bottom mood: still no roll during cooldown.
            let result = engine.check("clip", "the algorithm is pure addiction", 0, &mut state, &mut rng);
            assert!(result.is_none());
        }
    }

    #[test]
    fn test_no_keywords_means_no_event() {
        let engine = engine();
        let mut state = BetrayalState::default();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            let result = engine.check("clip", "lovely weather today", 0, &mut state, &mut rng);
            assert!(result.is_none());
        }
    }

    #[test]
    fn test_successful_betrayal_sets_cooldown_and_counter() {
        let engine = engine();
        let mut state = BetrayalState::default();
        // Keep drawing until the roll lands; probability is well above zero.
        let mut rng = StdRng::seed_from_u64(42);
        let mut event = None;
        for _ in 0..200 {
            if let Some(ev) = engine.check("clip", "the algorithm is pure addiction", 5, &mut state, &mut rng)
            {
                event = Some(ev);
                break;
            }
        }
        let event = event.expect("betrayal should fire within 200 attempts");
        assert_eq!(state.cooldown, BetrayalEngine::COOLDOWN_TURNS);
        assert_eq!(state.count, 1);
        assert_eq!(event.persona_id, "clip");
        assert!(!event.statement.is_empty());
        // "algorithm" is on clip's core topic list and this was the first
        // betrayal: 5 + 3 + 2.
        assert_eq!(event.shock_value, 10);
        assert!(event.original_stance.chars().count() <= 53);
    }

    #[test]
    fn test_cooldown_holds_for_five_ticks() {
        let engine = engine();
        let mut state = BetrayalState {
            cooldown: BetrayalEngine::COOLDOWN_TURNS,
            count: 1,
        };
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..BetrayalEngine::COOLDOWN_TURNS {
            assert!(engine
                .check("clip", "the algorithm is pure addiction", 0, &mut state, &mut rng)
                .is_none());
            BetrayalEngine::tick_cooldowns(std::iter::once(&mut state));
        }
        assert_eq!(state.cooldown, 0);
    }

    #[test]
    fn test_tick_is_a_noop_at_zero() {
        let mut state = BetrayalState::default();
        BetrayalEngine::tick_cooldowns(std::iter::once(&mut state));
        assert_eq!(state.cooldown, 0);
    }

    #[test]
    fn test_stance_lookup_falls_back() {
        let engine = engine();
        let store = ConfigStore::default_roster();
        let betrayal = store.get_secrets("clip").unwrap().betrayal.clone();
        // "doomscroll" has no stance entry for clip.
        let event = engine.build_event("clip", &betrayal, "doomscroll", 3);
        assert_eq!(event.new_stance, BetrayalEngine::STANCE_FALLBACK);
        // Repeat betrayal off core topics: base shock only.
        assert_eq!(event.shock_value, 5);
    }
}
