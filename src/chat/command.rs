//! Chat command parsing.
//!
//! Syntax:
//! - /add_mod <catalog id>
//! - /dependencies <name or catalog id>
//! - /dependents <name or catalog id>
//! - /help

/// Parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Propose adding a catalog item (opens a vote)
    AddMod { catalog_id: String },

    /// List what an installed mod requires
    Dependencies { identifier: String },

    /// List installed mods that require the given one
    Dependents { identifier: String },

    /// Show help
    Help,

    /// Recognised command with bad arguments; carries the usage line
    Usage(&'static str),

    /// Anything else
    Unknown(String),
}

pub const ADD_MOD_USAGE: &str = "Usage: /add_mod <catalog id> (digits only)";
const DEPENDENCIES_USAGE: &str = "Usage: /dependencies <mod name or catalog id>";
const DEPENDENTS_USAGE: &str = "Usage: /dependents <mod name or catalog id>";

/// Parse a text message into a command.
///
/// Commands may carry a `@botname` suffix (`/add_mod@warden 123`).
pub fn parse_command(text: &str) -> Command {
    let text = text.trim();

    if !text.starts_with('/') {
        return Command::Unknown(text.to_string());
    }

    let parts: Vec<&str> = text.split_whitespace().collect();
    let Some(head) = parts.first() else {
        return Command::Unknown(text.to_string());
    };
    let name = head.split('@').next().unwrap_or(head);
    // Everything after the command name, as a single argument
    let rest = parts[1..].join(" ");

    match name {
        "/add_mod" => {
            if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
                return Command::Usage(ADD_MOD_USAGE);
            }
            Command::AddMod { catalog_id: rest }
        }
        "/dependencies" => {
            if rest.is_empty() {
                return Command::Usage(DEPENDENCIES_USAGE);
            }
            Command::Dependencies { identifier: rest }
        }
        "/dependents" => {
            if rest.is_empty() {
                return Command::Usage(DEPENDENTS_USAGE);
            }
            Command::Dependents { identifier: rest }
        }
        "/help" | "/start" => Command::Help,
        _ => Command::Unknown(text.to_string()),
    }
}

/// Help text listing every chat command
pub fn help_text() -> String {
    [
        "Available commands:",
        "/add_mod <catalog id> - start a vote to add a mod to the server",
        "/dependencies <name or id> - list the mods it requires",
        "/dependents <name or id> - list the installed mods that require it",
        "/help - show this message",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_mod() {
        assert_eq!(
            parse_command("/add_mod 2894412760"),
            Command::AddMod {
                catalog_id: "2894412760".to_string()
            }
        );
        assert_eq!(
            parse_command("/add_mod@warden_bot 123"),
            Command::AddMod {
                catalog_id: "123".to_string()
            }
        );
    }

    #[test]
    fn test_parse_add_mod_rejects_non_numeric() {
        assert_eq!(parse_command("/add_mod"), Command::Usage(ADD_MOD_USAGE));
        assert_eq!(parse_command("/add_mod abc"), Command::Usage(ADD_MOD_USAGE));
        // Two ids are not accepted either
        assert_eq!(
            parse_command("/add_mod 123 456"),
            Command::Usage(ADD_MOD_USAGE)
        );
    }

    #[test]
    fn test_parse_queries_keep_spaces_in_names() {
        assert_eq!(
            parse_command("/dependencies Brita's Weapon Pack"),
            Command::Dependencies {
                identifier: "Brita's Weapon Pack".to_string()
            }
        );
        assert_eq!(
            parse_command("/dependents 456"),
            Command::Dependents {
                identifier: "456".to_string()
            }
        );
        assert!(matches!(parse_command("/dependents"), Command::Usage(_)));
    }

    #[test]
    fn test_parse_other() {
        assert_eq!(parse_command("/help"), Command::Help);
        assert_eq!(
            parse_command("hello"),
            Command::Unknown("hello".to_string())
        );
        assert_eq!(
            parse_command("/restart_server"),
            Command::Unknown("/restart_server".to_string())
        );
    }

    #[test]
    fn test_help_text_covers_commands() {
        let help = help_text();
        for cmd in ["/add_mod", "/dependencies", "/dependents", "/help"] {
            assert!(help.contains(cmd), "help text is missing {}", cmd);
        }
    }
}
