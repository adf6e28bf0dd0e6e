//! Slash command definitions and dispatch names.

use {serenity::all::CreateCommand, tally_counting::Command};

/// A slash command the bot responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    /// Liveness check; never touches the engine.
    Ping,
    /// Forwarded to the counting engine.
    Engine(Command),
}

impl SlashCommand {
    /// Parse an interaction's command name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ping" => Some(Self::Ping),
            "count" => Some(Self::Engine(Command::Count)),
            "record" => Some(Self::Engine(Command::Record)),
            "start" => Some(Self::Engine(Command::Start)),
            "stop" => Some(Self::Engine(Command::Stop)),
            _ => None,
        }
    }
}

/// Commands registered per guild when the bot joins.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("ping").description("Replies with pong"),
        CreateCommand::new("count").description("Replies with the channel count"),
        CreateCommand::new("record").description("Replies with the channel record"),
        CreateCommand::new("start").description("Starts counting in this channel"),
        CreateCommand::new("stop").description("Stops counting in this channel"),
    ]
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_commands() {
        assert_eq!(SlashCommand::parse("ping"), Some(SlashCommand::Ping));
        assert_eq!(
            SlashCommand::parse("count"),
            Some(SlashCommand::Engine(Command::Count))
        );
        assert_eq!(
            SlashCommand::parse("stop"),
            Some(SlashCommand::Engine(Command::Stop))
        );
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(SlashCommand::parse("help"), None);
    }

    #[test]
    fn one_definition_per_command() {
        let defs = definitions();
        assert_eq!(defs.len(), 5);
    }
}
