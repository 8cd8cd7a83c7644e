use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::{ConfigStore, Topic};
use crate::core::error::{ChatError, Result};
use crate::core::event::{ConsequenceResult, Message};
use crate::core::session::{Session, SessionSummary, TurnOutput};
use crate::core::soul::SoulScoringEngine;
use crate::responder::Responder;

/// Hosts any number of independent sessions over one shared read-only
/// configuration. Sessions never see each other's state.
pub struct SessionManager {
    config: Arc<ConfigStore>,
    soul_engine: Arc<SoulScoringEngine>,
    responder: Arc<dyn Responder>,
    sessions: HashMap<Uuid, Session>,
}

impl SessionManager {
    pub fn new(config: ConfigStore, responder: Arc<dyn Responder>) -> Self {
        let config = Arc::new(config);
        let soul_engine = Arc::new(SoulScoringEngine::new(config.clone()));
        SessionManager {
            config,
            soul_engine,
            responder,
            sessions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn start(
        &mut self,
        persona_a: &str,
        persona_b: &str,
        topic: Topic,
    ) -> Result<(Uuid, Vec<Message>)> {
        let (session, opening) = Session::start(
            self.config.clone(),
            self.soul_engine.clone(),
            self.responder.clone(),
            persona_a,
            persona_b,
            topic,
        )?;
        let id = session.id;
        self.sessions.insert(id, session);
        tracing::info!(session_id = %id, persona_a, persona_b, "session started");
        Ok((id, opening))
    }

    /// Seeded variant so hosts and tests can pin down the dice.
    pub fn start_with_seed(
        &mut self,
        persona_a: &str,
        persona_b: &str,
        topic: Topic,
        seed: u64,
    ) -> Result<(Uuid, Vec<Message>)> {
        let (session, opening) = Session::start_with_seed(
            self.config.clone(),
            self.soul_engine.clone(),
            self.responder.clone(),
            persona_a,
            persona_b,
            topic,
            seed,
        )?;
        let id = session.id;
        self.sessions.insert(id, session);
        Ok((id, opening))
    }

    pub fn session(&self, id: Uuid) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub async fn send(&mut self, id: Uuid, text: &str) -> Result<TurnOutput> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(ChatError::SessionNotFound(id))?;
        session.send(text).await
    }

    pub fn resolve_private_choice(&mut self, id: Uuid, choice_index: usize) -> Result<ConsequenceResult> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(ChatError::SessionNotFound(id))?;
        session.resolve_private_choice(choice_index)
    }

    /// Finish a session and drop its state, keeping only the summary.
    pub fn end(&mut self, id: Uuid) -> Result<SessionSummary> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(ChatError::SessionNotFound(id))?;
        let summary = session.end()?;
        self.sessions.remove(&id);
        tracing::info!(session_id = %id, turns = summary.turn_count, "session ended");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::ScriptedResponder;

    fn manager() -> SessionManager {
        SessionManager::new(ConfigStore::default_roster(), Arc::new(ScriptedResponder::new()))
    }

    fn topic() -> Topic {
        Topic {
            category: "test".into(),
            title: "anything at all".into(),
            conflict_level: None,
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let mut manager = manager();
        let (first, _) = manager.start_with_seed("clip", "sage", topic(), 1).unwrap();
        let (second, _) = manager.start_with_seed("glow", "relic", topic(), 2).unwrap();

        // Batter clip in the first session only.
        manager.send(first, "this is brain rot").await.unwrap();
        manager.send(first, "still brain rot").await.unwrap();

        let untouched = manager.session(second).unwrap().runtime("glow").unwrap();
        assert_eq!(untouched.emotion.value, 62);
        assert_eq!(manager.session(second).unwrap().turn_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_session_is_reported() {
        let mut manager = manager();
        let ghost = Uuid::new_v4();
        assert!(matches!(
            manager.send(ghost, "hi").await,
            Err(ChatError::SessionNotFound(_))
        ));
        assert!(matches!(
            manager.end(ghost),
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_end_removes_the_session() {
        let mut manager = manager();
        let (id, _) = manager.start_with_seed("clip", "sage", topic(), 3).unwrap();
        manager.send(id, "hello").await.unwrap();

        let summary = manager.end(id).unwrap();
        assert_eq!(summary.turn_count, 1);

        // Gone afterwards.
        assert!(matches!(
            manager.send(id, "anyone?").await,
            Err(ChatError::SessionNotFound(_))
        ));
    }
}
