use crate::session::Mode;

/// Commands understood by the admin bot, with their menu descriptions.
pub const COMMANDS: &[(&str, &str)] = &[
    ("addsource", "Add a chat to relay from"),
    ("removesource", "Remove a source chat"),
    ("adddest", "Add a chat to relay to"),
    ("removedest", "Remove a destination chat"),
    ("showconfig", "Show sources and destinations"),
    ("cancel", "Abort the current dialog"),
    ("help", "Show available commands"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start(Mode),
    ShowConfig,
    Cancel,
    Help,
}

impl Command {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "addsource" => Self::Start(Mode::AddSource),
            "removesource" => Self::Start(Mode::RemoveSource),
            "adddest" => Self::Start(Mode::AddDest),
            "removedest" => Self::Start(Mode::RemoveDest),
            "showconfig" => Self::ShowConfig,
            "cancel" => Self::Cancel,
            "help" => Self::Help,
            _ => return None,
        })
    }
}

/// Classified admin input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Command(Command),
    /// Starts with `/` but is not one of ours.
    UnknownCommand,
    /// Anything else, trimmed.
    Text(&'a str),
}

impl<'a> Input<'a> {
    /// The first word decides. A `@botname` suffix on the command is accepted
    /// since Telegram clients append it when picking from the menu in groups.
    pub fn parse(text: &'a str) -> Self {
        let text = text.trim();
        let Some(rest) = text.strip_prefix('/') else {
            return Self::Text(text);
        };
        let token = rest.split_whitespace().next().unwrap_or_default();
        let name = token.split_once('@').map_or(token, |(name, _)| name);
        Command::from_name(name).map_or(Self::UnknownCommand, Self::Command)
    }
}

pub(crate) fn help_text() -> String {
    let mut out = String::from("Commands:");
    for (name, description) in COMMANDS {
        out.push_str(&format!("\n/{name} - {description}"));
    }
    out
}
