use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::config::{ConfigStore, Topic};
use crate::core::betrayal::{BetrayalEngine, BetrayalState};
use crate::core::emotion::{EmotionEngine, EmotionState};
use crate::core::error::{ChatError, Result};
use crate::core::event::{
    Behavior, BetrayalEvent, BreakdownHighlight, ConsequenceResult, EmotionSource, Message,
    PrivateMessageEvent, PrivateMessageKind, TurnEffect,
};
use crate::core::private_msg::PrivateMessageEngine;
use crate::core::soul::{SoulReport, SoulScores, SoulScoringEngine};
use crate::responder::{Responder, ReplyRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Ended,
}

/// Per-persona mutable state within one session.
#[derive(Debug, Clone)]
pub struct PersonaRuntime {
    pub emotion: EmotionState,
    pub betrayal: BetrayalState,
    /// Standing with the user, 0-100. Feeds the end-of-session review.
    pub rapport: i32,
}

/// Everything a caller gets back from one turn.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub messages: Vec<Message>,
    pub pending_private: Option<PrivateMessageEvent>,
    pub effects: Vec<TurnEffect>,
}

#[derive(Debug, Clone)]
pub struct PersonaReview {
    pub persona_id: String,
    pub persona_name: String,
    pub text: String,
}

/// The end-of-session package: soul report plus the session's drama.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub topic_title: String,
    pub turn_count: u32,
    pub soul: SoulReport,
    pub reviews: Vec<PersonaReview>,
    pub betrayal_summary: String,
    pub betrayal_events: Vec<BetrayalEvent>,
    pub breakdown_highlights: Vec<BreakdownHighlight>,
}

enum PersonaAction {
    Breakdown(String),
    Betrayal(BetrayalEvent),
    Reply,
}

/// One live conversation. Engines are stateless; everything mutable about
/// the conversation lives here, so independent sessions never share state.
pub struct Session {
    pub id: Uuid,
    config: Arc<ConfigStore>,
    soul_engine: Arc<SoulScoringEngine>,
    responder: Arc<dyn Responder>,
    phase: SessionPhase,
    persona_ids: [String; 2],
    topic: Topic,
    turn_count: u32,
    history: Vec<Message>,
    runtimes: HashMap<String, PersonaRuntime>,
    soul_scores: SoulScores,
    behaviors: Vec<Behavior>,
    pending_private: Option<PrivateMessageEvent>,
    alliances: HashSet<String>,
    choice_log: Vec<ConsequenceResult>,
    breakdown_highlights: Vec<BreakdownHighlight>,
    betrayal_events: Vec<BetrayalEvent>,
    last_turn_conflict: bool,
    broke_last_turn: HashSet<String>,
    pending_drama: Option<(String, String)>,
    rng: StdRng,
}

impl Session {
    pub fn start(
        config: Arc<ConfigStore>,
        soul_engine: Arc<SoulScoringEngine>,
        responder: Arc<dyn Responder>,
        persona_a: &str,
        persona_b: &str,
        topic: Topic,
    ) -> Result<(Self, Vec<Message>)> {
        Self::start_with_rng(
            config,
            soul_engine,
            responder,
            persona_a,
            persona_b,
            topic,
            StdRng::from_entropy(),
        )
    }

    /// Seeded construction for deterministic tests.
    pub fn start_with_seed(
        config: Arc<ConfigStore>,
        soul_engine: Arc<SoulScoringEngine>,
        responder: Arc<dyn Responder>,
        persona_a: &str,
        persona_b: &str,
        topic: Topic,
        seed: u64,
    ) -> Result<(Self, Vec<Message>)> {
        Self::start_with_rng(
            config,
            soul_engine,
            responder,
            persona_a,
            persona_b,
            topic,
            StdRng::seed_from_u64(seed),
        )
    }

    fn start_with_rng(
        config: Arc<ConfigStore>,
        soul_engine: Arc<SoulScoringEngine>,
        responder: Arc<dyn Responder>,
        persona_a: &str,
        persona_b: &str,
        topic: Topic,
        mut rng: StdRng,
    ) -> Result<(Self, Vec<Message>)> {
        // All selection errors are rejected here, before any state exists.
        if persona_a == persona_b {
            return Err(ChatError::InvalidSelection(
                "pick two different platforms".to_string(),
            ));
        }
        for id in [persona_a, persona_b] {
            if config.persona(id).is_none() {
                return Err(ChatError::InvalidSelection(format!("unknown platform: {id}")));
            }
        }
        if topic.title.trim().is_empty() {
            return Err(ChatError::InvalidSelection("a topic is required".to_string()));
        }

        let emotion_engine = EmotionEngine::new(config.clone());
        let mut runtimes = HashMap::new();
        for id in [persona_a, persona_b] {
            runtimes.insert(
                id.to_string(),
                PersonaRuntime {
                    emotion: emotion_engine.initialize(id),
                    betrayal: BetrayalState::default(),
                    rapport: 50,
                },
            );
        }

        let mut opening = vec![Message::system(format!(
            "🎭 {} and {} joined the chat\n📢 Today's topic: {}",
            config.persona_name(persona_a),
            config.persona_name(persona_b),
            topic.title
        ))];
        for id in [persona_a, persona_b] {
            let line = config
                .persona(id)
                .and_then(|p| p.openings.choose(&mut rng))
                .cloned()
                .unwrap_or_else(|| "Let's get into it.".to_string());
            opening.push(Message::persona(id, line));
        }

        let soul_scores = SoulScores::new(&config);
        let session = Session {
            id: Uuid::new_v4(),
            config,
            soul_engine,
            responder,
            phase: SessionPhase::Active,
            persona_ids: [persona_a.to_string(), persona_b.to_string()],
            topic,
            turn_count: 0,
            history: opening.clone(),
            runtimes,
            soul_scores,
            behaviors: Vec::new(),
            pending_private: None,
            alliances: HashSet::new(),
            choice_log: Vec::new(),
            breakdown_highlights: Vec::new(),
            betrayal_events: Vec::new(),
            last_turn_conflict: false,
            broke_last_turn: HashSet::new(),
            pending_drama: None,
            rng,
        };

        Ok((session, opening))
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn persona_ids(&self) -> &[String; 2] {
        &self.persona_ids
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn pending_private(&self) -> Option<&PrivateMessageEvent> {
        self.pending_private.as_ref()
    }

    pub fn runtime(&self, persona_id: &str) -> Option<&PersonaRuntime> {
        self.runtimes.get(persona_id)
    }

    /// Choices the user has made on private messages, oldest first.
    pub fn choice_log(&self) -> &[ConsequenceResult] {
        &self.choice_log
    }

    /// Personas the user has allied with via private messages.
    pub fn allies(&self) -> impl Iterator<Item = &str> {
        self.alliances.iter().map(|id| id.as_str())
    }

    /// Process one user message: score it, shift moods, let each persona
    /// break down / betray / reply, then maybe open a private side channel.
    pub async fn send(&mut self, text: &str) -> Result<TurnOutput> {
        if self.phase != SessionPhase::Active {
            return Err(ChatError::SessionNotActive);
        }

        let emotion_engine = EmotionEngine::new(self.config.clone());
        let betrayal_engine = BetrayalEngine::new(self.config.clone());
        let pm_engine = PrivateMessageEngine::new(self.config.clone());

        let context_before: Vec<String> = {
            let mut tail: Vec<String> =
                self.history.iter().rev().take(3).map(|m| m.text.clone()).collect();
            tail.reverse();
            tail
        };

        let mut messages = vec![Message::user(text)];
        let mut effects = Vec::new();
        let mut this_turn_conflict = false;

        self.soul_engine.apply_utterance(text, &mut self.soul_scores);

        // Reactions to a private message the user exposed last turn.
        if let Some((sender, target)) = self.pending_drama.take() {
            let sender_line = *EXPOSED_SENDER_LINES.choose(&mut self.rng).unwrap_or(&EXPOSED_SENDER_LINES[0]);
            let target_line = *EXPOSED_TARGET_LINES.choose(&mut self.rng).unwrap_or(&EXPOSED_TARGET_LINES[0]);
            messages.push(Message::persona(sender, sender_line));
            messages.push(Message::persona(target, target_line));
            this_turn_conflict = true;
        }

        // Steps 1-2: trigger evaluation and mood application, both personas.
        let broke_last: HashSet<String> = self.broke_last_turn.drain().collect();
        let mut triggers_this_turn: HashMap<String, Vec<String>> = HashMap::new();
        for pid in self.persona_ids.clone() {
            let events = emotion_engine.evaluate_triggers(&pid, text, &EmotionSource::User);

            if broke_last.contains(&pid) {
                if events.iter().any(|e| e.delta > 0) {
                    self.record_behavior(Behavior::SupportBroken { persona: pid.clone() });
                }
                if events.iter().any(|e| e.delta < 0) {
                    self.record_behavior(Behavior::AttackBroken { persona: pid.clone() });
                }
            }

            let had_negative = events.iter().any(|e| e.delta < 0);
            let had_positive = events.iter().any(|e| e.delta > 0);
            if had_negative {
                this_turn_conflict = true;
            }

            let mut delta: i32 = events.iter().map(|e| e.delta).sum();
            if !had_negative {
                // Ambient recovery when nothing stung this turn.
                delta += EmotionEngine::TURN_REGEN;
            }

            let Some(runtime) = self.runtimes.get_mut(&pid) else {
                continue;
            };
            let old_value = runtime.emotion.value;
            let (new_value, _) = emotion_engine.apply(&mut runtime.emotion, delta);

            // Rapport drifts with how the user treats them.
            if had_negative {
                runtime.rapport = (runtime.rapport - 5).clamp(0, 100);
            } else if had_positive {
                runtime.rapport = (runtime.rapport + 3).clamp(0, 100);
            }

            let triggers: Vec<String> = events
                .iter()
                .filter(|e| e.delta < 0)
                .map(|e| e.trigger.clone())
                .collect();
            let supports: Vec<String> = events
                .iter()
                .filter(|e| e.delta > 0)
                .map(|e| e.trigger.clone())
                .collect();
            triggers_this_turn.insert(pid.clone(), triggers.clone());

            effects.push(TurnEffect::EmotionShift {
                persona_id: pid.clone(),
                old_value,
                new_value,
                triggers,
                supports,
            });
        }

        // Steps 2-3: breakdown beats betrayal beats a normal reply.
        let betrayal_text = format!("{} {}", self.topic.title, text);
        let mut actions: Vec<(String, PersonaAction)> = Vec::new();
        for pid in self.persona_ids.clone() {
            let Some(runtime) = self.runtimes.get_mut(&pid) else {
                continue;
            };

            if runtime.emotion.broken {
                let response = emotion_engine.breakdown_response(&pid, &mut self.rng);
                emotion_engine.recover(&mut runtime.emotion);
                self.broke_last_turn.insert(pid.clone());
                this_turn_conflict = true;

                let trigger = triggers_this_turn
                    .get(&pid)
                    .and_then(|t| t.first())
                    .cloned()
                    .unwrap_or_default();
                self.breakdown_highlights.push(BreakdownHighlight {
                    persona_id: pid.clone(),
                    trigger,
                    context: context_before.clone(),
                    response: response.clone(),
                    recorded_at: Utc::now(),
                });

                actions.push((pid, PersonaAction::Breakdown(response)));
                continue;
            }

            if let Some(event) = betrayal_engine.check(
                &pid,
                &betrayal_text,
                runtime.emotion.value,
                &mut runtime.betrayal,
                &mut self.rng,
            ) {
                this_turn_conflict = true;
                self.betrayal_events.push(event.clone());
                actions.push((pid, PersonaAction::Betrayal(event)));
                continue;
            }

            actions.push((pid, PersonaAction::Reply));
        }

        // Step 4: responder calls, concurrent for the pair, merged back in
        // selection order.
        let reply_requests: Vec<(String, ReplyRequest)> = actions
            .iter()
            .filter(|(_, action)| matches!(action, PersonaAction::Reply))
            .map(|(pid, _)| (pid.clone(), self.build_reply_request(pid, text)))
            .collect();
        let replies = self.gather_replies(reply_requests).await;

        for (pid, action) in actions {
            match action {
                PersonaAction::Breakdown(response) => {
                    messages.push(Message::persona(pid.as_str(), response.as_str()).flag_breakdown());
                    effects.push(TurnEffect::Breakdown {
                        persona_id: pid,
                        response,
                    });
                }
                PersonaAction::Betrayal(event) => {
                    messages.push(Message::persona(pid.as_str(), event.statement.as_str()).flag_betrayal());
                    effects.push(TurnEffect::Betrayal(event));
                }
                PersonaAction::Reply => {
                    let reply = replies.get(&pid).cloned().unwrap_or_default();
                    let multi_part = self
                        .config
                        .persona(&pid)
                        .map(|p| p.multi_part)
                        .unwrap_or(false);
                    if multi_part && reply.contains('\n') {
                        for part in reply.split('\n').map(str::trim).filter(|p| !p.is_empty()) {
                            messages.push(Message::persona(pid.as_str(), part).flag_multi_part());
                        }
                    } else {
                        messages.push(Message::persona(pid.as_str(), reply));
                    }
                }
            }
        }

        // Step 5: one private-message roll, blocked while one is pending.
        let mut pending_out = None;
        if self.pending_private.is_none() {
            let sender_index = self.rng.gen_range(0..2usize);
            let sender = self.persona_ids[sender_index].clone();
            let target = self.persona_ids[1 - sender_index].clone();
            let emotion_value = self
                .runtimes
                .get(&sender)
                .map(|rt| rt.emotion.value)
                .unwrap_or(50);
            let recent_conflict = this_turn_conflict || self.last_turn_conflict;

            if pm_engine.maybe_trigger(
                &sender,
                &[target.as_str()],
                emotion_value,
                recent_conflict,
                &mut self.rng,
            ) {
                let event = pm_engine.generate(&sender, &target, &mut self.rng);
                self.pending_private = Some(event.clone());
                pending_out = Some(event);
            }
        }

        self.last_turn_conflict = this_turn_conflict;

        // Step 6: cooldowns tick exactly once per turn.
        BetrayalEngine::tick_cooldowns(self.runtimes.values_mut().map(|rt| &mut rt.betrayal));

        // Step 7.
        self.turn_count += 1;
        self.history.extend(messages.iter().cloned());

        Ok(TurnOutput {
            messages,
            pending_private: pending_out,
            effects,
        })
    }

    fn build_reply_request(&self, persona_id: &str, user_text: &str) -> ReplyRequest {
        let persona = self.config.persona(persona_id);
        let other_id = if self.persona_ids[0] == persona_id {
            &self.persona_ids[1]
        } else {
            &self.persona_ids[0]
        };
        let emotion_engine = EmotionEngine::new(self.config.clone());
        let runtime = self.runtimes.get(persona_id);

        let recent_history: Vec<Message> = {
            let mut tail: Vec<Message> = self.history.iter().rev().take(6).cloned().collect();
            tail.reverse();
            tail
        };

        ReplyRequest {
            persona_id: persona_id.to_string(),
            persona_name: self.config.persona_name(persona_id),
            core_identity: persona.map(|p| p.core_identity.clone()).unwrap_or_default(),
            speech_patterns: persona.map(|p| p.speech_patterns.clone()).unwrap_or_default(),
            quirks: persona.map(|p| p.quirks.clone()).unwrap_or_default(),
            multi_part: persona.map(|p| p.multi_part).unwrap_or(false),
            topic_title: self.topic.title.clone(),
            emotion_value: runtime.map(|rt| rt.emotion.value).unwrap_or(50),
            style_hint: runtime
                .map(|rt| emotion_engine.style_hint(persona_id, &rt.emotion))
                .unwrap_or_default(),
            relationship_description: self
                .config
                .relationship_between(persona_id, other_id)
                .description,
            other_persona_name: self.config.persona_name(other_id),
            recent_history,
            user_text: user_text.to_string(),
        }
    }

    /// Run the pending responder calls, two at a time when both personas
    /// reply. A failed call degrades to the persona's fallback line.
    async fn gather_replies(
        &self,
        requests: Vec<(String, ReplyRequest)>,
    ) -> HashMap<String, String> {
        let mut replies = HashMap::new();

        let mut resolved = Vec::new();
        match requests.len() {
            0 => {}
            1 => {
                let (pid, request) = &requests[0];
                resolved.push((pid.clone(), self.responder.reply(request).await));
            }
            _ => {
                let (first_pid, first_request) = &requests[0];
                let (second_pid, second_request) = &requests[1];
                let (first, second) = tokio::join!(
                    self.responder.reply(first_request),
                    self.responder.reply(second_request)
                );
                resolved.push((first_pid.clone(), first));
                resolved.push((second_pid.clone(), second));
            }
        }

        for (pid, outcome) in resolved {
            let reply = match outcome {
                Ok(reply) => reply,
                Err(err) => {
                    tracing::warn!(persona_id = %pid, %err, "responder failed, using fallback line");
                    self.config
                        .persona(&pid)
                        .map(|p| p.fallback_line.clone())
                        .unwrap_or_else(|| "...".to_string())
                }
            };
            replies.insert(pid, reply);
        }

        replies
    }

    fn record_behavior(&mut self, behavior: Behavior) {
        self.soul_engine.score_behavior(&behavior, &mut self.soul_scores);
        self.behaviors.push(behavior);
    }

    /// Apply the user's three-way choice on the pending private message.
    /// Stale or repeated calls are rejected without side effects.
    pub fn resolve_private_choice(&mut self, choice_index: usize) -> Result<ConsequenceResult> {
        if self.phase != SessionPhase::Active {
            return Err(ChatError::SessionNotActive);
        }
        if self.pending_private.is_none() {
            return Err(ChatError::StalePrivateChoice);
        }
        if choice_index > 2 {
            return Err(ChatError::InvalidChoice(choice_index));
        }

        let event = match self.pending_private.take() {
            Some(event) => event,
            None => return Err(ChatError::StalePrivateChoice),
        };
        let consequence = event.consequences[choice_index].clone();

        let emotion_engine = EmotionEngine::new(self.config.clone());
        if let Some(runtime) = self.runtimes.get_mut(&event.sender_id) {
            if consequence.sender_emotion != 0 {
                emotion_engine.apply(&mut runtime.emotion, consequence.sender_emotion);
            }
            runtime.rapport = (runtime.rapport + consequence.relation).clamp(0, 100);
        }
        if consequence.target_emotion != 0 {
            if let Some(runtime) = self.runtimes.get_mut(&event.target_id) {
                emotion_engine.apply(&mut runtime.emotion, consequence.target_emotion);
            }
        }

        let exposed = choice_index == 2;
        let alliance_formed = choice_index == 0 && event.kind == PrivateMessageKind::Alliance;

        if alliance_formed {
            self.alliances.insert(event.sender_id.clone());
            self.record_behavior(Behavior::AllianceWith {
                ally: event.sender_id.clone(),
            });
        } else if exposed {
            self.pending_drama = Some((event.sender_id.clone(), event.target_id.clone()));
            self.record_behavior(Behavior::ExposePrivate {
                sender: event.sender_id.clone(),
                target: event.target_id.clone(),
            });
        } else if choice_index == 1 {
            self.record_behavior(Behavior::StayNeutral);
        }

        let result = ConsequenceResult {
            sender_id: event.sender_id.clone(),
            target_id: event.target_id.clone(),
            choice_label: event.options[choice_index].clone(),
            description: consequence.description.clone(),
            sender_emotion_delta: consequence.sender_emotion,
            relation_delta: consequence.relation,
            target_emotion_delta: consequence.target_emotion,
            exposed,
            alliance_formed,
        };
        self.choice_log.push(result.clone());

        Ok(result)
    }

    /// Close the session: no further mutation is accepted afterwards.
    pub fn end(&mut self) -> Result<SessionSummary> {
        if self.phase != SessionPhase::Active {
            return Err(ChatError::SessionNotActive);
        }
        self.phase = SessionPhase::Ended;

        let soul = self
            .soul_engine
            .finalize(&self.soul_scores, &self.behaviors, &mut self.rng);

        let mut reviews = Vec::new();
        for pid in &self.persona_ids {
            let rapport = self.runtimes.get(pid).map(|rt| rt.rapport).unwrap_or(50);
            let review = self
                .config
                .persona(pid)
                .and_then(|p| {
                    let pool = if rapport > 70 {
                        &p.reviews_good
                    } else if rapport > 40 {
                        &p.reviews_neutral
                    } else {
                        &p.reviews_bad
                    };
                    pool.choose(&mut self.rng).cloned()
                })
                .unwrap_or_else(|| "An ordinary user.".to_string());
            reviews.push(PersonaReview {
                persona_id: pid.clone(),
                persona_name: self.config.persona_name(pid),
                text: review,
            });
        }

        let betrayal_summary = if self.betrayal_events.is_empty() {
            "Nobody flipped this time. Everyone held the line!".to_string()
        } else {
            let mut lines = vec!["Betrayals on the record:".to_string()];
            for event in &self.betrayal_events {
                lines.push(format!(
                    "- {} wavered when \"{}\" came up",
                    self.config.persona_name(&event.persona_id),
                    event.trigger_keyword
                ));
            }
            lines.join("\n")
        };

        Ok(SessionSummary {
            topic_title: self.topic.title.clone(),
            turn_count: self.turn_count,
            soul,
            reviews,
            betrayal_summary,
            betrayal_events: self.betrayal_events.clone(),
            breakdown_highlights: self.breakdown_highlights.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn inject_private_event(&mut self, event: PrivateMessageEvent) {
        self.pending_private = Some(event);
    }
}

const EXPOSED_SENDER_LINES: [&str; 3] = [
    "you... you actually posted the screenshot?! that was PRIVATE!",
    "I was just venting! posting it here is a whole other level!",
    "fine. gloves off. I have receipts too, you know!",
];

const EXPOSED_TARGET_LINES: [&str; 3] = [
    "oh, so THAT'S what gets said behind my back?",
    "ha. I knew the whispering was about me.",
    "anything you'd like to say to my face, then?",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::core::event::{Consequence, MessageRole};
    use crate::responder::{Responder, ResponderError, ScriptedResponder};
    use async_trait::async_trait;

    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        async fn reply(
            &self,
            _request: &ReplyRequest,
        ) -> std::result::Result<String, ResponderError> {
            Err(ResponderError::Unavailable("wire down".to_string()))
        }
    }

    fn topic() -> Topic {
        Topic {
            category: "test".into(),
            title: "a perfectly calm topic".into(),
            conflict_level: Some(0.1),
        }
    }

    fn start_session(responder: Arc<dyn Responder>, seed: u64) -> (Session, Vec<Message>) {
        let config = Arc::new(ConfigStore::default_roster());
        let soul = Arc::new(SoulScoringEngine::new(config.clone()));
        Session::start_with_seed(config, soul, responder, "clip", "sage", topic(), seed)
            .expect("session should start")
    }

    fn sample_event(kind: PrivateMessageKind) -> PrivateMessageEvent {
        let consequence = |s: i32, r: i32, t: i32| Consequence {
            sender_emotion: s,
            relation: r,
            target_emotion: t,
            description: "test".into(),
        };
        PrivateMessageEvent {
            id: Uuid::new_v4(),
            sender_id: "clip".into(),
            target_id: "sage".into(),
            kind,
            body: "psst".into(),
            options: ["a".into(), "b".into(), "c".into()],
            consequences: [consequence(10, 5, 0), consequence(0, 0, 0), consequence(-20, -15, 5)],
        }
    }

    #[test]
    fn test_start_rejects_bad_selections() {
        let config = Arc::new(ConfigStore::default_roster());
        let soul = Arc::new(SoulScoringEngine::new(config.clone()));
        let responder: Arc<dyn Responder> = Arc::new(ScriptedResponder::new());

        let same = Session::start(
            config.clone(),
            soul.clone(),
            responder.clone(),
            "clip",
            "clip",
            topic(),
        );
        assert!(matches!(same, Err(ChatError::InvalidSelection(_))));

        let unknown = Session::start(
            config.clone(),
            soul.clone(),
            responder.clone(),
            "clip",
            "myspace",
            topic(),
        );
        assert!(matches!(unknown, Err(ChatError::InvalidSelection(_))));

        let blank_topic = Session::start(
            config,
            soul,
            responder,
            "clip",
            "sage",
            Topic {
                category: "t".into(),
                title: "  ".into(),
                conflict_level: None,
            },
        );
        assert!(matches!(blank_topic, Err(ChatError::InvalidSelection(_))));
    }

    #[test]
    fn test_opening_messages_shape() {
        let (_, opening) = start_session(Arc::new(ScriptedResponder::new()), 1);
        assert_eq!(opening.len(), 3);
        assert_eq!(opening[0].role, MessageRole::System);
        assert_eq!(opening[1].persona_id.as_deref(), Some("clip"));
        assert_eq!(opening[2].persona_id.as_deref(), Some("sage"));
    }

    #[tokio::test]
    async fn test_turn_orders_user_first_then_personas() {
        let (mut session, _) = start_session(Arc::new(ScriptedResponder::new()), 2);
        let output = session.send("hello everyone").await.unwrap();

        assert_eq!(output.messages[0].role, MessageRole::User);
        let persona_order: Vec<_> = output
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::Persona)
            .filter_map(|m| m.persona_id.clone())
            .collect();
        // clip's bubbles (possibly several) all precede sage's.
        let first_sage = persona_order.iter().position(|id| id == "sage");
        let last_clip = persona_order.iter().rposition(|id| id == "clip");
        if let (Some(first_sage), Some(last_clip)) = (first_sage, last_clip) {
            assert!(last_clip < first_sage);
        }
        assert_eq!(session.turn_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_line_splits_into_multi_part() {
        // clip's fallback line contains a newline and clip is multi_part.
        let (mut session, _) = start_session(Arc::new(FailingResponder), 3);
        let output = session.send("hello there").await.unwrap();

        let clip_parts: Vec<_> = output
            .messages
            .iter()
            .filter(|m| m.persona_id.as_deref() == Some("clip"))
            .collect();
        assert_eq!(clip_parts.len(), 2);
        assert!(clip_parts.iter().all(|m| m.multi_part));
        assert_eq!(clip_parts[0].text, "hm okay");
        assert_eq!(clip_parts[1].text, "kinda true though");
    }

    #[tokio::test]
    async fn test_breakdown_fires_and_recovers() {
        let (mut session, _) = start_session(Arc::new(FailingResponder), 4);

        // clip starts at 60; "brain rot" from the user costs 25 per turn.
        session.send("this is brain rot").await.unwrap();
        let output = session.send("still brain rot").await.unwrap();

        let breakdown_msg = output
            .messages
            .iter()
            .find(|m| m.breakdown)
            .expect("breakdown message expected on the second hit");
        assert_eq!(breakdown_msg.persona_id.as_deref(), Some("clip"));

        // Hard reset to the recovery floor afterwards.
        let runtime = session.runtime("clip").unwrap();
        assert_eq!(runtime.emotion.value, EmotionEngine::RECOVERY_FLOOR);
        assert!(!runtime.emotion.broken);
        assert_eq!(session.breakdown_highlights.len(), 1);
    }

    #[tokio::test]
    async fn test_supporting_a_broken_persona_is_recorded() {
        let (mut session, _) = start_session(Arc::new(FailingResponder), 5);
        session.send("this is brain rot").await.unwrap();
        session.send("still brain rot").await.unwrap(); // breakdown turn

        session.send("hey, your videos are so fun actually").await.unwrap();
        assert!(session
            .behaviors
            .iter()
            .any(|b| matches!(b, Behavior::SupportBroken { persona } if persona == "clip")));
    }

    #[test]
    fn test_resolve_choice_two_always_exposes() {
        for kind in PrivateMessageKind::ALL {
            let (mut session, _) = start_session(Arc::new(ScriptedResponder::new()), 6);
            session.inject_private_event(sample_event(kind));

            let before = session.runtime("clip").unwrap().emotion.value;
            let result = session.resolve_private_choice(2).unwrap();

            assert!(result.exposed);
            assert!(!result.alliance_formed);
            assert_eq!(result.sender_emotion_delta, -20);
            let after = session.runtime("clip").unwrap().emotion.value;
            assert_eq!(after, (before - 20).clamp(0, 100));
        }
    }

    #[test]
    fn test_alliance_forms_only_for_alliance_kind() {
        let (mut session, _) = start_session(Arc::new(ScriptedResponder::new()), 7);
        session.inject_private_event(sample_event(PrivateMessageKind::Gossip));
        let result = session.resolve_private_choice(0).unwrap();
        assert!(!result.alliance_formed);

        session.inject_private_event(sample_event(PrivateMessageKind::Alliance));
        let result = session.resolve_private_choice(0).unwrap();
        assert!(result.alliance_formed);
        assert!(session.alliances.contains("clip"));
        assert!(session
            .behaviors
            .iter()
            .any(|b| matches!(b, Behavior::AllianceWith { ally } if ally == "clip")));
    }

    #[test]
    fn test_stale_and_double_resolution_rejected() {
        let (mut session, _) = start_session(Arc::new(ScriptedResponder::new()), 8);

        // Nothing pending yet.
        assert!(matches!(
            session.resolve_private_choice(0),
            Err(ChatError::StalePrivateChoice)
        ));

        session.inject_private_event(sample_event(PrivateMessageKind::Gossip));

        // Out-of-range index leaves the event pending and untouched.
        assert!(matches!(
            session.resolve_private_choice(5),
            Err(ChatError::InvalidChoice(5))
        ));
        assert!(session.pending_private().is_some());

        session.resolve_private_choice(1).unwrap();
        // Second resolution of the same event: rejected, no side effects.
        let behaviors_before = session.behaviors.len();
        assert!(matches!(
            session.resolve_private_choice(1),
            Err(ChatError::StalePrivateChoice)
        ));
        assert_eq!(session.behaviors.len(), behaviors_before);
    }

    #[tokio::test]
    async fn test_no_new_private_roll_while_one_is_pending() {
        let (mut session, _) = start_session(Arc::new(FailingResponder), 9);
        session.inject_private_event(sample_event(PrivateMessageKind::Gossip));

        for _ in 0..10 {
            let output = session.send("just chatting").await.unwrap();
            assert!(output.pending_private.is_none());
        }
        assert!(session.pending_private().is_some());
    }

    #[tokio::test]
    async fn test_exposure_drama_surfaces_next_turn() {
        let (mut session, _) = start_session(Arc::new(FailingResponder), 10);
        session.inject_private_event(sample_event(PrivateMessageKind::Gossip));
        session.resolve_private_choice(2).unwrap();

        let output = session.send("well that happened").await.unwrap();
        // User message, then the exposed sender's and target's reactions.
        assert_eq!(output.messages[1].persona_id.as_deref(), Some("clip"));
        assert_eq!(output.messages[2].persona_id.as_deref(), Some("sage"));
    }

    #[tokio::test]
    async fn test_ended_session_rejects_everything() {
        let (mut session, _) = start_session(Arc::new(ScriptedResponder::new()), 11);
        session.send("one message").await.unwrap();
        let summary = session.end().unwrap();
        assert_eq!(summary.turn_count, 1);

        assert!(matches!(session.end(), Err(ChatError::SessionNotActive)));
        assert!(matches!(
            session.send("hello?").await,
            Err(ChatError::SessionNotActive)
        ));
        assert!(matches!(
            session.resolve_private_choice(0),
            Err(ChatError::SessionNotActive)
        ));
    }

    #[tokio::test]
    async fn test_summary_reflects_session_drama() {
        let (mut session, _) = start_session(Arc::new(FailingResponder), 12);
        session.send("this is brain rot").await.unwrap();
        session.send("still brain rot").await.unwrap();

        let summary = session.end().unwrap();
        assert_eq!(summary.breakdown_highlights.len(), 1);
        assert_eq!(summary.reviews.len(), 2);
        // The user has been attacking clip; rapport sits below the bad-review bar.
        let clip_review = summary
            .reviews
            .iter()
            .find(|r| r.persona_id == "clip")
            .unwrap();
        assert!(!clip_review.text.is_empty());
        // Percentages always cover the full roster.
        assert_eq!(summary.soul.percentages.len(), 6);
    }
}
