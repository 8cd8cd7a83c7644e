use colored::*;

use crate::config::ConfigStore;
use crate::core::event::{BetrayalEvent, Message, MessageRole, PrivateMessageEvent};
use crate::core::session::{Session, SessionSummary};

pub fn render_message(config: &ConfigStore, message: &Message) -> String {
    match message.role {
        MessageRole::User => format!("{} {}", "👤 you:".bold(), message.text),
        MessageRole::System => message.text.dimmed().to_string(),
        MessageRole::Persona => {
            let id = message.persona_id.as_deref().unwrap_or("?");
            let avatar = config
                .persona(id)
                .map(|p| p.avatar.clone())
                .unwrap_or_else(|| "🤖".to_string());
            let name = config.persona_name(id);
            let mut line = format!("{} {}: {}", avatar, name.cyan().bold(), message.text);
            if message.breakdown {
                line = format!("{} {}", line, "💔 [breakdown]".red());
            }
            if message.betrayal {
                line = format!("{} {}", line, "🔄 [stance flip]".yellow());
            }
            line
        }
    }
}

/// Mood bars for both personas, teacher-style progress display.
pub fn emotion_status(config: &ConfigStore, session: &Session) -> String {
    let mut lines = vec!["Mood check".cyan().bold().to_string()];
    for id in session.persona_ids() {
        if let Some(runtime) = session.runtime(id) {
            let level = runtime.emotion.level();
            lines.push(format!(
                "{} {:10} [{}] {}/100 {} {}",
                level.emoji(),
                config.persona_name(id),
                runtime.emotion.bar(),
                runtime.emotion.value,
                level.label(),
                format!("(rapport {})", runtime.rapport).dimmed(),
            ));
        }
    }
    lines.join("\n")
}

pub fn render_private_prompt(config: &ConfigStore, event: &PrivateMessageEvent) -> String {
    let sender = config.persona_name(&event.sender_id);
    let mut out = String::new();
    out.push_str(&format!("{}\n", "╔══════════════════════════════════════╗".magenta()));
    out.push_str(&format!("  🔒 private message from {}\n", sender.magenta().bold()));
    out.push_str(&format!("{}\n", "╠══════════════════════════════════════╣".magenta()));
    out.push_str(&format!("\n  {}\n\n", event.body));
    out.push_str("  your move:\n");
    for (index, option) in event.options.iter().enumerate() {
        out.push_str(&format!("  [{}] {}\n", index + 1, option));
    }
    out.push_str(&format!("{}", "╚══════════════════════════════════════╝".magenta()));
    out
}

pub fn render_betrayal(config: &ConfigStore, event: &BetrayalEvent) -> String {
    let name = config.persona_name(&event.persona_id);
    let shock = event.shock_value.min(10) as usize;
    let shock_bar = format!("{}{}", "⚡".repeat(shock), "○".repeat(10 - shock));
    format!(
        "{}\n  🔄 {} is wavering!\n\n  trigger: \"{}\"\n  they used to say: {}\n  now: {}\n\n  shock meter: [{}] {}/10\n{}",
        "╔═══════════════════════════════════════════╗".yellow(),
        name.yellow().bold(),
        event.trigger_keyword,
        event.original_stance,
        event.new_stance,
        shock_bar,
        event.shock_value,
        "╚═══════════════════════════════════════════╝".yellow(),
    )
}

pub fn render_summary(config: &ConfigStore, summary: &SessionSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{}\n",
        "🔮 S O U L   C O M P O S I T I O N 🔮".magenta().bold()
    ));
    out.push_str(&format!(
        "{}\n\n",
        format!("after {} turns on \"{}\"", summary.turn_count, summary.topic_title).dimmed()
    ));

    for component in &summary.soul.components {
        let filled = (component.percentage / 5.0) as usize;
        let bar = format!("{}{}", "█".repeat(filled.min(20)), "░".repeat(20usize.saturating_sub(filled)));
        out.push_str(&format!(
            "  {:10} [{}] {:.1}%\n             {}\n",
            component.persona_name,
            bar,
            component.percentage,
            component.description.dimmed(),
        ));
    }

    out.push_str(&format!(
        "\n  🏷️  soul type: {}\n      {}\n",
        summary.soul.soul_type.cyan().bold(),
        summary.soul.soul_type_description.dimmed(),
    ));
    if !summary.soul.special_traits.is_empty() {
        out.push_str("\n  ✨ special traits:\n");
        for special in &summary.soul.special_traits {
            out.push_str(&format!("     • {}\n", special));
        }
    }
    out.push_str(&format!("\n  😈 roast: \"{}\"\n", summary.soul.roast.red()));
    out.push_str(&format!("  💡 advice: \"{}\"\n", summary.soul.advice.green()));
    out.push_str(&format!("\n  {}\n", summary.soul.quick_summary.bold()));

    out.push_str(&format!("\n{}\n", "What they really think of you".cyan().bold()));
    for review in &summary.reviews {
        let avatar = config
            .persona(&review.persona_id)
            .map(|p| p.avatar.clone())
            .unwrap_or_default();
        out.push_str(&format!("  {} {}: {}\n", avatar, review.persona_name, review.text));
    }

    out.push_str(&format!("\n{}\n", summary.betrayal_summary.dimmed()));

    if !summary.breakdown_highlights.is_empty() {
        out.push_str(&format!("\n{}\n", "💔 Breakdown highlight reel".red().bold()));
        for highlight in &summary.breakdown_highlights {
            out.push_str(&format!(
                "  {} broke on \"{}\": {}\n",
                config.persona_name(&highlight.persona_id),
                highlight.trigger,
                highlight.response,
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::Message;

    #[test]
    fn test_render_message_shows_persona_name() {
        let config = ConfigStore::default_roster();
        let rendered = render_message(&config, &Message::persona("clip", "hello"));
        assert!(rendered.contains("ClipClip"));
        assert!(rendered.contains("hello"));
    }

    #[test]
    fn test_render_flags_are_visible() {
        let config = ConfigStore::default_roster();
        let broken = Message::persona("sage", "...").flag_breakdown();
        assert!(render_message(&config, &broken).contains("breakdown"));

        let flipped = Message::persona("sage", "fine, you win").flag_betrayal();
        assert!(render_message(&config, &flipped).contains("stance flip"));
    }

    #[test]
    fn test_private_prompt_lists_three_options() {
        let config = ConfigStore::default_roster();
        let engine = crate::core::PrivateMessageEngine::new(std::sync::Arc::new(
            ConfigStore::default_roster(),
        ));
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(5);
        let event = engine.generate("clip", "sage", &mut rng);
        let rendered = render_private_prompt(&config, &event);
        assert!(rendered.contains("[1]"));
        assert!(rendered.contains("[2]"));
        assert!(rendered.contains("[3]"));
    }
}
