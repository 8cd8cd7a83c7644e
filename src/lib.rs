pub mod cli;
pub mod config;
pub mod core;
pub mod formatter;
pub mod manager;
pub mod responder;
pub mod shell;

pub use self::config::{ConfigStore, PersonaConfig, Relationship, Topic};
pub use self::core::{ChatError, Message, Session, SessionSummary, TurnOutput};
pub use self::manager::SessionManager;
pub use self::responder::{HttpResponder, Responder, ResponderError, ScriptedResponder};
