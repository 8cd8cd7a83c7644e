use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

use crate::config::ConfigStore;
use crate::manager::SessionManager;
use crate::responder::{HttpResponder, Responder, ScriptedResponder};
use crate::shell::{pick_topic, ShellMode};

#[derive(Parser)]
#[command(name = "soulchat", about = "Persona group chat simulator")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat with two platform personas
    Chat {
        /// First persona id (see `soulchat personas`)
        persona_a: String,
        /// Second persona id
        persona_b: String,
        /// Topic title; a random configured topic if omitted
        #[arg(long)]
        topic: Option<String>,
        /// Seed for deterministic dice
        #[arg(long)]
        seed: Option<u64>,
        /// Responder backend (scripted, or a provider name from config)
        #[arg(long, default_value = "scripted")]
        provider: String,
        /// Model override for HTTP providers
        #[arg(long)]
        model: Option<String>,
        /// Data directory path
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// List the configured personas
    Personas {
        /// Data directory path
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// List the configured topics
    Topics {
        /// Data directory path
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

pub async fn handle_chat(
    persona_a: String,
    persona_b: String,
    topic: Option<String>,
    seed: Option<u64>,
    provider: String,
    model: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let config = ConfigStore::load(data_dir)?;
    let responder = build_responder(&config, &provider, model)?;
    let manager = SessionManager::new(config, responder);

    let topic = pick_topic(&manager, topic.as_deref())?;
    let mut shell = ShellMode::start(manager, &persona_a, &persona_b, topic, seed)?;
    shell.run().await
}

fn build_responder(
    config: &ConfigStore,
    provider: &str,
    model: Option<String>,
) -> Result<Arc<dyn Responder>> {
    if provider == "scripted" {
        return Ok(Arc::new(ScriptedResponder::new()));
    }

    let provider_config = config
        .providers
        .get(provider)
        .ok_or_else(|| anyhow::anyhow!("Unknown provider: {}", provider))?;
    let base_url = provider_config
        .host
        .clone()
        .unwrap_or_else(|| "https://api.openai.com".to_string());
    let model = model.unwrap_or_else(|| provider_config.default_model.clone());

    Ok(Arc::new(HttpResponder::new(
        base_url,
        provider_config.api_key.clone(),
        model,
    )))
}

pub fn handle_personas(data_dir: Option<PathBuf>) -> Result<()> {
    let config = ConfigStore::load(data_dir)?;

    println!("{}", "Configured personas".cyan().bold());
    for persona in &config.personas {
        println!(
            "  {} {:8} {} {}",
            persona.avatar,
            persona.id,
            persona.name.bold(),
            format!("({})", persona.traits.join(", ")).dimmed(),
        );
    }
    Ok(())
}

pub fn handle_topics(data_dir: Option<PathBuf>) -> Result<()> {
    let config = ConfigStore::load(data_dir)?;

    println!("{}", "Configured topics".cyan().bold());
    for topic in config.list_topics() {
        let heat = topic
            .conflict_level
            .map(|level| format!(" 🔥{:.1}", level))
            .unwrap_or_default();
        println!("  [{}] {}{}", topic.category.dimmed(), topic.title, heat);
    }
    Ok(())
}
