use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ConfigStore;
use crate::core::event::Behavior;

const HIGH_WEIGHT: f64 = 3.0;
const MEDIUM_WEIGHT: f64 = 1.5;
const LOW_WEIGHT: f64 = 0.5;
const PATTERN_WEIGHT: f64 = 2.0;

const ALLIANCE_BOOST: f64 = 10.0;
const ALLIANCE_RIVAL_PENALTY: f64 = -5.0;

/// Accumulating per-persona tallies, kept in config persona order so that
/// ties and iteration stay deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoulScores {
    entries: Vec<(String, f64)>,
}

impl SoulScores {
    pub fn new(config: &ConfigStore) -> Self {
        SoulScores {
            entries: config
                .persona_order()
                .map(|id| (id.to_string(), 0.0))
                .collect(),
        }
    }

    /// Tallies never go negative; penalties floor at zero.
    pub fn add(&mut self, persona_id: &str, delta: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|(id, _)| id == persona_id) {
            entry.1 = (entry.1 + delta).max(0.0);
        }
    }

    pub fn get(&self, persona_id: &str) -> f64 {
        self.entries
            .iter()
            .find(|(id, _)| id == persona_id)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(id, v)| (id.as_str(), *v))
    }
}

/// One slice of the final composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoulComponent {
    pub persona_id: String,
    pub persona_name: String,
    pub percentage: f64,
    pub traits: Vec<String>,
    pub description: String,
}

/// The end-of-session verdict on whose style the user's soul resembles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoulReport {
    /// Every persona's share, in config order.
    pub percentages: Vec<(String, f64)>,
    /// Shares above 5%, largest first.
    pub components: Vec<SoulComponent>,
    pub dominant: String,
    pub soul_type: String,
    pub soul_type_description: String,
    pub special_traits: Vec<String>,
    pub roast: String,
    pub advice: String,
    pub quick_summary: String,
}

struct CompiledProfile {
    persona_id: String,
    high: Vec<String>,
    medium: Vec<String>,
    low: Vec<String>,
    patterns: Vec<Regex>,
}

/// Scores user utterances and behaviors against per-persona style tables,
/// then aggregates everything into the soul report.
pub struct SoulScoringEngine {
    config: Arc<ConfigStore>,
    profiles: Vec<CompiledProfile>,
}

impl SoulScoringEngine {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        let profiles = config
            .persona_order()
            .map(|id| {
                let profile = config.soul_profile(id).cloned().unwrap_or_default();
                let patterns = profile
                    .patterns
                    .iter()
                    .filter_map(|source| match Regex::new(source) {
                        Ok(re) => Some(re),
                        Err(err) => {
                            tracing::warn!(persona_id = id, %source, %err, "skipping bad soul pattern");
                            None
                        }
                    })
                    .collect();
                CompiledProfile {
                    persona_id: id.to_string(),
                    high: lowercased(&profile.high_weight),
                    medium: lowercased(&profile.medium_weight),
                    low: lowercased(&profile.low_weight),
                    patterns,
                }
            })
            .collect();

        SoulScoringEngine { config, profiles }
    }

    /// Per-persona increments for one utterance: weighted keyword
    /// occurrences plus stylistic pattern hits. No normalization here.
    pub fn score_utterance(&self, text: &str) -> Vec<(String, f64)> {
        let lower = text.to_lowercase();

        self.profiles
            .iter()
            .map(|profile| {
                let mut score = 0.0;
                for kw in &profile.high {
                    score += HIGH_WEIGHT * lower.matches(kw.as_str()).count() as f64;
                }
                for kw in &profile.medium {
                    score += MEDIUM_WEIGHT * lower.matches(kw.as_str()).count() as f64;
                }
                for kw in &profile.low {
                    score += LOW_WEIGHT * lower.matches(kw.as_str()).count() as f64;
                }
                for pattern in &profile.patterns {
                    if pattern.is_match(text) {
                        score += PATTERN_WEIGHT;
                    }
                }
                (profile.persona_id.clone(), score)
            })
            .collect()
    }

    pub fn apply_utterance(&self, text: &str, tallies: &mut SoulScores) {
        for (persona_id, score) in self.score_utterance(text) {
            if score > 0.0 {
                tallies.add(&persona_id, score);
            }
        }
    }

    /// Fixed adjustments for recorded user behavior. Alliances are dynamic
    /// (boost the ally, ding its fiercest rival); the rest come from the
    /// configured table.
    pub fn score_behavior(&self, behavior: &Behavior, tallies: &mut SoulScores) {
        if let Behavior::AllianceWith { ally } = behavior {
            tallies.add(ally, ALLIANCE_BOOST);
            if let Some(rival) = self.config.strongest_rival(ally) {
                tallies.add(&rival, ALLIANCE_RIVAL_PENALTY);
            }
            return;
        }

        for adjustment in self.config.behavior_adjustments(behavior.key()) {
            tallies.add(&adjustment.persona, adjustment.delta);
        }
    }

    /// Normalize tallies into the final report. A session with nothing
    /// scorable gets an equal split rather than a divide-by-zero.
    pub fn finalize<R: Rng>(
        &self,
        tallies: &SoulScores,
        behaviors: &[Behavior],
        rng: &mut R,
    ) -> SoulReport {
        let percentages = self.percentages(tallies);

        // Ties go to the earlier persona in config order.
        let mut dominant = String::new();
        let mut best = f64::MIN;
        for (id, pct) in &percentages {
            if *pct > best {
                best = *pct;
                dominant = id.clone();
            }
        }

        let (soul_type, soul_type_description) = self.soul_type(&percentages);
        let special_traits = self.special_traits(&percentages, behaviors);
        let components = self.components(&percentages);

        let dominant_persona = self.config.persona(&dominant);
        let roast = dominant_persona
            .and_then(|p| p.roasts.choose(rng))
            .cloned()
            .unwrap_or_else(|| "You are a complicated person. Even mockery fails.".to_string());
        let advice = dominant_persona
            .and_then(|p| p.advice.choose(rng))
            .cloned()
            .unwrap_or_else(|| "Stay balanced, stay curious.".to_string());

        let quick_summary = {
            let mut sorted: Vec<_> = percentages.clone();
            sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
            let parts: Vec<String> = sorted
                .iter()
                .take(3)
                .map(|(id, pct)| format!("{:.0}% {}", pct, self.config.persona_name(id)))
                .collect();
            format!("Your soul is forged from {}", parts.join(" + "))
        };

        SoulReport {
            percentages,
            components,
            dominant,
            soul_type,
            soul_type_description,
            special_traits,
            roast,
            advice,
            quick_summary,
        }
    }

    fn percentages(&self, tallies: &SoulScores) -> Vec<(String, f64)> {
        let total = tallies.total();
        if total == 0.0 {
            let n = self.profiles.len().max(1);
            let share = round1(100.0 / n as f64);
            return tallies.iter().map(|(id, _)| (id.to_string(), share)).collect();
        }

        tallies
            .iter()
            .map(|(id, score)| (id.to_string(), round1(score / total * 100.0)))
            .collect()
    }

    /// First matching rule wins; the order is part of the contract.
    fn soul_type(&self, percentages: &[(String, f64)]) -> (String, String) {
        for (id, pct) in percentages {
            if *pct > 50.0 {
                if let Some(persona) = self.config.persona(id) {
                    return (
                        persona.soul_type_name.clone(),
                        persona.soul_type_description.clone(),
                    );
                }
            }
        }

        let max = percentages.iter().map(|(_, p)| *p).fold(f64::MIN, f64::max);
        let min = percentages.iter().map(|(_, p)| *p).fold(f64::MAX, f64::min);
        if max - min < 20.0 {
            return (
                "Balanced Soul".to_string(),
                "A little of every platform's poison, none of it fatal.".to_string(),
            );
        }

        if percentages.iter().filter(|(_, p)| *p > 20.0).count() >= 4 {
            return (
                "Chaos Agent".to_string(),
                "Your soul is a stew of styles that switch without warning.".to_string(),
            );
        }

        (
            "Unclassified Complex Soul".to_string(),
            "No known pattern quite fits you. Impressive, honestly.".to_string(),
        )
    }

    fn special_traits(&self, percentages: &[(String, f64)], behaviors: &[Behavior]) -> Vec<String> {
        let pct = |id: &str| {
            percentages
                .iter()
                .find(|(pid, _)| pid == id)
                .map(|(_, p)| *p)
                .unwrap_or(0.0)
        };

        let mut traits = Vec::new();
        for rule in &self.config.trait_rules {
            if rule.requires.iter().all(|(id, min)| pct(id) > *min) {
                traits.push(rule.label.clone());
            }
        }

        let exposes = behaviors
            .iter()
            .filter(|b| matches!(b, Behavior::ExposePrivate { .. }))
            .count();
        if exposes > 0 {
            traits.push("📢 Loose lips: secrets are not safe with you".to_string());
        }

        let neutrals = behaviors
            .iter()
            .filter(|b| matches!(b, Behavior::StayNeutral))
            .count();
        if neutrals >= 2 {
            traits.push("🧘 Career fence-sitter: never picks a side".to_string());
        }

        traits.truncate(5);
        traits
    }

    fn components(&self, percentages: &[(String, f64)]) -> Vec<SoulComponent> {
        let mut sorted: Vec<_> = percentages.to_vec();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

        sorted
            .into_iter()
            .filter(|(_, pct)| *pct >= 5.0)
            .map(|(id, pct)| {
                let name = self.config.persona_name(&id);
                let traits = self
                    .config
                    .persona(&id)
                    .map(|p| p.traits.iter().take(3).cloned().collect())
                    .unwrap_or_default();
                let description = if pct > 30.0 {
                    format!("{name} runs deep in you")
                } else if pct > 15.0 {
                    format!("a steady streak of {name} in there")
                } else {
                    format!("just a trace of {name}")
                };
                SoulComponent {
                    persona_id: id,
                    persona_name: name,
                    percentage: pct,
                    traits,
                    description,
                }
            })
            .collect()
    }
}

fn lowercased(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (SoulScoringEngine, SoulScores) {
        let config = Arc::new(ConfigStore::default_roster());
        let engine = SoulScoringEngine::new(config.clone());
        let scores = SoulScores::new(&config);
        (engine, scores)
    }

    #[test]
    fn test_empty_session_gets_equal_split() {
        let (engine, scores) = setup();
        let mut rng = StdRng::seed_from_u64(0);
        let report = engine.finalize(&scores, &[], &mut rng);

        for (_, pct) in &report.percentages {
            assert!((pct - 16.7).abs() < 1e-9);
        }
        let sum: f64 = report.percentages.iter().map(|(_, p)| p).sum();
        assert!((sum - 100.0).abs() < 0.5);
        // Equal split spreads under 20: balanced.
        assert_eq!(report.soul_type, "Balanced Soul");
    }

    #[test]
    fn test_keyword_occurrences_count_individually() {
        let (engine, _) = setup();
        let scores = engine.score_utterance("iconic, truly iconic");
        let clip = scores.iter().find(|(id, _)| id == "clip").unwrap();
        // Two occurrences of a high-weight keyword.
        assert!(clip.1 >= 2.0 * HIGH_WEIGHT);
    }

    #[test]
    fn test_pattern_hits_score_once_per_pattern() {
        let (engine, _) = setup();
        // Short burst with stacked exclamation marks trips clip's shape rule.
        let scores = engine.score_utterance("this!!!");
        let clip = scores.iter().find(|(id, _)| id == "clip").unwrap();
        assert!(clip.1 >= PATTERN_WEIGHT);
    }

    #[test]
    fn test_behavior_adjustments_follow_table() {
        let (engine, mut scores) = setup();
        engine.score_behavior(
            &Behavior::ExposePrivate {
                sender: "clip".into(),
                target: "sage".into(),
            },
            &mut scores,
        );
        assert_eq!(scores.get("buzz"), 5.0);
        // Penalty floors at zero instead of going negative.
        assert_eq!(scores.get("sage"), 0.0);
    }

    #[test]
    fn test_alliance_boosts_ally_and_dings_rival() {
        let (engine, mut scores) = setup();
        scores.add("sage", 20.0);
        engine.score_behavior(&Behavior::AllianceWith { ally: "clip".into() }, &mut scores);
        assert_eq!(scores.get("clip"), 10.0);
        assert_eq!(scores.get("sage"), 15.0);
    }

    #[test]
    fn test_soul_type_rules_apply_in_order() {
        let (engine, _) = setup();

        // A single persona above 50% wins its personal type.
        let dominant = vec![
            ("clip".to_string(), 60.0),
            ("sage".to_string(), 10.0),
            ("glow".to_string(), 10.0),
            ("buzz".to_string(), 10.0),
            ("orbit".to_string(), 5.0),
            ("relic".to_string(), 5.0),
        ];
        assert_eq!(engine.soul_type(&dominant).0, "Pure Dopamine Chaser");

        // Tight spread: balanced, even though nobody dominates.
        let balanced = vec![
            ("clip".to_string(), 20.0),
            ("sage".to_string(), 18.0),
            ("glow".to_string(), 17.0),
            ("buzz".to_string(), 16.0),
            ("orbit".to_string(), 15.0),
            ("relic".to_string(), 14.0),
        ];
        assert_eq!(engine.soul_type(&balanced).0, "Balanced Soul");

        // Wide spread with four personas above 20: chaotic.
        let chaotic = vec![
            ("clip".to_string(), 26.0),
            ("sage".to_string(), 25.0),
            ("glow".to_string(), 24.0),
            ("buzz".to_string(), 21.0),
            ("orbit".to_string(), 3.0),
            ("relic".to_string(), 1.0),
        ];
        assert_eq!(engine.soul_type(&chaotic).0, "Chaos Agent");

        // None of the rules: the fallback bucket.
        let odd = vec![
            ("clip".to_string(), 45.0),
            ("sage".to_string(), 40.0),
            ("glow".to_string(), 10.0),
            ("buzz".to_string(), 5.0),
            ("orbit".to_string(), 0.0),
            ("relic".to_string(), 0.0),
        ];
        assert_eq!(engine.soul_type(&odd).0, "Unclassified Complex Soul");
    }

    #[test]
    fn test_finalize_type_is_deterministic() {
        let (engine, mut scores) = setup();
        scores.add("clip", 30.0);
        scores.add("sage", 10.0);

        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(999);
        let a = engine.finalize(&scores, &[], &mut rng_a);
        let b = engine.finalize(&scores, &[], &mut rng_b);
        // Type and dominant never depend on the rng; only roast/advice picks do.
        assert_eq!(a.soul_type, b.soul_type);
        assert_eq!(a.dominant, b.dominant);
    }

    #[test]
    fn test_dominant_tie_breaks_by_config_order() {
        let (engine, mut scores) = setup();
        // Equal tallies for two personas; clip precedes sage in config order.
        scores.add("sage", 10.0);
        scores.add("clip", 10.0);
        let mut rng = StdRng::seed_from_u64(0);
        let report = engine.finalize(&scores, &[], &mut rng);
        assert_eq!(report.dominant, "clip");
    }

    #[test]
    fn test_components_skip_trace_amounts() {
        let (engine, mut scores) = setup();
        scores.add("clip", 97.0);
        scores.add("sage", 3.0);
        let mut rng = StdRng::seed_from_u64(0);
        let report = engine.finalize(&scores, &[], &mut rng);

        assert_eq!(report.components.len(), 1);
        assert_eq!(report.components[0].persona_id, "clip");
        assert_eq!(report.components[0].percentage, 97.0);
    }

    #[test]
    fn test_behavior_traits_appear() {
        let (engine, scores) = setup();
        let behaviors = vec![
            Behavior::ExposePrivate {
                sender: "clip".into(),
                target: "sage".into(),
            },
            Behavior::StayNeutral,
            Behavior::StayNeutral,
        ];
        let mut rng = StdRng::seed_from_u64(0);
        let report = engine.finalize(&scores, &behaviors, &mut rng);
        assert!(report.special_traits.iter().any(|t| t.contains("Loose lips")));
        assert!(report.special_traits.iter().any(|t| t.contains("fence-sitter")));
        assert!(report.special_traits.len() <= 5);
    }
}
