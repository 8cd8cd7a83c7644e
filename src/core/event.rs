use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Persona,
    System,
}

/// One chat bubble. Append-only once pushed into a session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub text: String,
    pub persona_id: Option<String>,
    #[serde(default)]
    pub breakdown: bool,
    #[serde(default)]
    pub betrayal: bool,
    #[serde(default)]
    pub multi_part: bool,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message {
            role: MessageRole::User,
            text: text.into(),
            persona_id: None,
            breakdown: false,
            betrayal: false,
            multi_part: false,
            sent_at: Utc::now(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Message {
            role: MessageRole::System,
            text: text.into(),
            persona_id: None,
            breakdown: false,
            betrayal: false,
            multi_part: false,
            sent_at: Utc::now(),
        }
    }

    pub fn persona(persona_id: impl Into<String>, text: impl Into<String>) -> Self {
        Message {
            role: MessageRole::Persona,
            text: text.into(),
            persona_id: Some(persona_id.into()),
            breakdown: false,
            betrayal: false,
            multi_part: false,
            sent_at: Utc::now(),
        }
    }

    pub fn flag_breakdown(mut self) -> Self {
        self.breakdown = true;
        self
    }

    pub fn flag_betrayal(mut self) -> Self {
        self.betrayal = true;
        self
    }

    pub fn flag_multi_part(mut self) -> Self {
        self.multi_part = true;
        self
    }
}

/// Where a piece of text came from, for damage amplification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmotionSource {
    User,
    Persona(String),
}

/// A persona publicly reversing its stance on the current topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetrayalEvent {
    pub persona_id: String,
    pub trigger_keyword: String,
    pub original_stance: String,
    pub new_stance: String,
    pub statement: String,
    pub shock_value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivateMessageKind {
    Alliance,
    Gossip,
    Complaint,
    SecretReveal,
    BetrayalHint,
    Manipulation,
}

impl PrivateMessageKind {
    pub const ALL: [PrivateMessageKind; 6] = [
        PrivateMessageKind::Alliance,
        PrivateMessageKind::Gossip,
        PrivateMessageKind::Complaint,
        PrivateMessageKind::SecretReveal,
        PrivateMessageKind::BetrayalHint,
        PrivateMessageKind::Manipulation,
    ];
}

/// What picking one of the three options does to the involved parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consequence {
    pub sender_emotion: i32,
    pub relation: i32,
    pub target_emotion: i32,
    pub description: String,
}

/// A side-channel message from one persona about the other, offered to the
/// user with exactly three canned responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessageEvent {
    pub id: Uuid,
    pub sender_id: String,
    pub target_id: String,
    pub kind: PrivateMessageKind,
    pub body: String,
    pub options: [String; 3],
    pub consequences: [Consequence; 3],
}

/// Outcome handed back to the caller after the user picks an option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsequenceResult {
    pub sender_id: String,
    pub target_id: String,
    pub choice_label: String,
    pub description: String,
    pub sender_emotion_delta: i32,
    pub relation_delta: i32,
    pub target_emotion_delta: i32,
    pub exposed: bool,
    pub alliance_formed: bool,
}

/// User behavior worth remembering for the soul report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Behavior {
    AllianceWith { ally: String },
    ExposePrivate { sender: String, target: String },
    StayNeutral,
    SupportBroken { persona: String },
    AttackBroken { persona: String },
}

impl Behavior {
    /// Key into the configured adjustment table.
    pub fn key(&self) -> &'static str {
        match self {
            Behavior::AllianceWith { .. } => "alliance_with",
            Behavior::ExposePrivate { .. } => "expose_private",
            Behavior::StayNeutral => "stay_neutral",
            Behavior::SupportBroken { .. } => "support_broken",
            Behavior::AttackBroken { .. } => "attack_broken",
        }
    }
}

/// Side effects of one turn, for callers that render more than plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnEffect {
    EmotionShift {
        persona_id: String,
        old_value: i32,
        new_value: i32,
        triggers: Vec<String>,
        supports: Vec<String>,
    },
    Breakdown {
        persona_id: String,
        response: String,
    },
    Betrayal(BetrayalEvent),
}

/// A breakdown moment kept for the end-of-session highlight reel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownHighlight {
    pub persona_id: String,
    pub trigger: String,
    pub context: Vec<String>,
    pub response: String,
    pub recorded_at: DateTime<Utc>,
}
