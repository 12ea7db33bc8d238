//! Line commands read from stdin.
//!
//! One command per line:
//! `up | down | left | right | back | tap <n> | edit <name>|<dob> | go <id> | show | help | quit`.

use swipetree_core::model::meta::PersonMeta;
use swipetree_core::{Intent, SwipeDirection};

pub const HELP: &str =
    "commands: up | down | left | right | back | tap <n> | edit <name>|<dob> | go <id> | show | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Intent(Intent),
    /// Long press answered with the given edit; `None` cancels the editor.
    Edit(Option<PersonMeta>),
    Go(String),
    Show,
    Help,
    Quit,
}

/// Parses one input line; blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "up" => Command::Intent(SwipeDirection::Up.into()),
        "down" => Command::Intent(SwipeDirection::Down.into()),
        "left" => Command::Intent(SwipeDirection::Left.into()),
        "right" => Command::Intent(SwipeDirection::Right.into()),
        "back" => Command::Intent(Intent::Back),
        "tap" => {
            let index = rest
                .parse::<usize>()
                .map_err(|_| format!("tap expects a tile index, got `{rest}`"))?;
            Command::Intent(Intent::TapTile(index))
        }
        "edit" => Command::Edit(parse_edit(rest)),
        "go" if !rest.is_empty() => Command::Go(rest.to_string()),
        "go" => return Err("go expects an identifier".to_string()),
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command `{other}`; {HELP}")),
    };
    Ok(Some(command))
}

fn parse_edit(rest: &str) -> Option<PersonMeta> {
    if rest.is_empty() {
        return None;
    }
    let (name, dob) = rest.split_once('|').unwrap_or((rest, ""));
    let field = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };
    Some(PersonMeta::new(field(name), field(dob)))
}
