use clap::Parser;
use tracing_subscriber::EnvFilter;

use soulchat::cli::{self, Args, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Chat {
            persona_a,
            persona_b,
            topic,
            seed,
            provider,
            model,
            data_dir,
        } => cli::handle_chat(persona_a, persona_b, topic, seed, provider, model, data_dir).await,
        Commands::Personas { data_dir } => cli::handle_personas(data_dir),
        Commands::Topics { data_dir } => cli::handle_topics(data_dir),
    };

    if let Err(err) = result {
        eprintln!("❌ {}", err);
        std::process::exit(1);
    }
}
