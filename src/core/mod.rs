pub mod betrayal;
pub mod emotion;
pub mod error;
pub mod event;
pub mod private_msg;
pub mod session;
pub mod soul;

pub use betrayal::{BetrayalEngine, BetrayalState};
pub use emotion::{EmotionEngine, EmotionLevel, EmotionState};
pub use error::{ChatError, Result};
pub use event::{
    Behavior, BetrayalEvent, BreakdownHighlight, Consequence, ConsequenceResult, EmotionSource,
    Message, MessageRole, PrivateMessageEvent, PrivateMessageKind, TurnEffect,
};
pub use private_msg::PrivateMessageEngine;
pub use session::{PersonaReview, Session, SessionSummary, TurnOutput};
pub use soul::{SoulReport, SoulScores, SoulScoringEngine};
