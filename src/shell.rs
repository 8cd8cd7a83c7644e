use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use uuid::Uuid;

use crate::config::Topic;
use crate::core::event::TurnEffect;
use crate::formatter;
use crate::manager::SessionManager;

/// Interactive console session: one conversation, driven line by line.
pub struct ShellMode {
    manager: SessionManager,
    session_id: Uuid,
    editor: DefaultEditor,
    private_pending: bool,
}

impl ShellMode {
    pub fn start(
        mut manager: SessionManager,
        persona_a: &str,
        persona_b: &str,
        topic: Topic,
        seed: Option<u64>,
    ) -> Result<Self> {
        let (session_id, opening) = match seed {
            Some(seed) => manager.start_with_seed(persona_a, persona_b, topic, seed)?,
            None => manager.start(persona_a, persona_b, topic)?,
        };

        for message in &opening {
            println!("{}", formatter::render_message(manager.config(), message));
        }
        println!();
        println!(
            "{}",
            "commands: /status /help /exit  (1-3 answers a private message)".dimmed()
        );

        Ok(ShellMode {
            manager,
            session_id,
            editor: DefaultEditor::new()?,
            private_pending: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            let prompt = if self.private_pending {
                "reply 1-3> ".to_string()
            } else {
                "> ".to_string()
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(&line);

                    match line.as_str() {
                        "/exit" | "/quit" => {
                            self.finish()?;
                            break;
                        }
                        "/status" => {
                            if let Some(session) = self.manager.session(self.session_id) {
                                println!("{}", formatter::emotion_status(self.manager.config(), session));
                            }
                        }
                        "/help" => {
                            println!("/status  mood and rapport overview");
                            println!("/exit    end the session and print the soul report");
                            println!("1-3      answer a pending private message");
                        }
                        other => self.handle_input(other).await?,
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    self.finish()?;
                    break;
                }
                Err(err) => {
                    eprintln!("readline error: {}", err);
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_input(&mut self, line: &str) -> Result<()> {
        // A pending private message captures 1-3 as the choice.
        if self.private_pending {
            if let Ok(choice) = line.parse::<usize>() {
                if (1..=3).contains(&choice) {
                    match self.manager.resolve_private_choice(self.session_id, choice - 1) {
                        Ok(result) => {
                            println!("{}", result.description.magenta());
                            if result.exposed {
                                println!("{}", "🚨 you posted the screenshot in the group chat!".red());
                            }
                            self.private_pending = false;
                        }
                        Err(err) => println!("{}", err.to_string().red()),
                    }
                    return Ok(());
                }
            }
            println!("{}", "answer the private message first (1-3)".dimmed());
            return Ok(());
        }

        let output = match self.manager.send(self.session_id, line).await {
            Ok(output) => output,
            Err(err) => {
                println!("{}", err.to_string().red());
                return Ok(());
            }
        };

        // Skip echoing the user's own message back.
        for message in output.messages.iter().skip(1) {
            println!("{}", formatter::render_message(self.manager.config(), message));
        }

        for effect in &output.effects {
            if let TurnEffect::Betrayal(event) = effect {
                println!("{}", formatter::render_betrayal(self.manager.config(), event));
            }
        }

        if let Some(event) = output.pending_private {
            println!("{}", formatter::render_private_prompt(self.manager.config(), &event));
            self.private_pending = true;
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let summary = self.manager.end(self.session_id)?;
        println!("{}", formatter::render_summary(self.manager.config(), &summary));
        Ok(())
    }
}

/// Pick the session topic: by exact title when given, at random otherwise.
pub fn pick_topic(manager: &SessionManager, requested: Option<&str>) -> Result<Topic> {
    use rand::seq::SliceRandom;

    match requested {
        Some(title) => manager
            .config()
            .find_topic(title)
            .cloned()
            .or_else(|| {
                // Free-form topics are allowed too.
                let trimmed = title.trim();
                (!trimmed.is_empty()).then(|| Topic {
                    category: "custom".to_string(),
                    title: trimmed.to_string(),
                    conflict_level: None,
                })
            })
            .ok_or_else(|| anyhow::anyhow!("empty topic")),
        None => {
            let mut rng = rand::thread_rng();
            manager
                .config()
                .list_topics()
                .choose(&mut rng)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no topics configured"))
        }
    }
}
