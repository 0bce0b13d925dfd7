//! Line commands typed at the prompt.
//!
//! Each line maps to one [`Command`]. Pointer commands take world
//! coordinates; `draw` is shorthand for a full down/move/up gesture.

#[cfg(test)]
#[path = "repl_test.rs"]
mod repl_test;

use canvas::doc::{ObjectPatch, ShapeName};
use canvas::input::{Key, Modifiers, Point, Tool};

use crate::error::ClientError;

pub const HELP: &str = "\
commands:
  pen | eraser | select | text | shape <rectangle|oval|triangle|star>
  down <x> <y> | move <x> <y> | up | draw <x1> <y1> <x2> <y2>
  pick <id> | unpick | patch <id> <json> | delete
  key <name> [ctrl] [meta] [shift] [alt]
  undo | redo | reset | say <text> | list | help | leave | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Tool(Tool),
    Down(Point),
    Move(Point),
    Up,
    Draw { from: Point, to: Point },
    Select(Option<String>),
    Patch { id: String, patch: ObjectPatch },
    Delete,
    Key { key: Key, mods: Modifiers },
    Undo,
    Redo,
    Reset,
    Say(String),
    List,
    Help,
    /// Leave the room, then end the session.
    Leave,
    Quit,
}

impl Command {
    /// Whether the command reads or changes the canvas. These wait while the
    /// session is syncing so they land on the synced state.
    #[must_use]
    pub fn touches_canvas(&self) -> bool {
        !matches!(self, Self::Say(_) | Self::List | Self::Help | Self::Leave | Self::Quit)
    }

    /// Whether the command ends the session.
    #[must_use]
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::Leave | Self::Quit)
    }
}

/// Parse one input line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns [`ClientError::UnknownCommand`] or [`ClientError::Usage`] for
/// lines that do not form a command, and [`ClientError::Json`] for a bad
/// patch body.
pub fn parse_line(line: &str) -> Result<Option<Command>, ClientError> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let command = match word {
        "" => return Ok(None),
        "pen" => Command::Tool(Tool::Pen),
        "eraser" => Command::Tool(Tool::Eraser),
        "select" => Command::Tool(Tool::Select),
        "text" => Command::Tool(Tool::Text),
        "shape" => Command::Tool(Tool::Shape(shape_name(rest)?)),
        "down" => Command::Down(point("down", "down <x> <y>", rest)?),
        "move" => Command::Move(point("move", "move <x> <y>", rest)?),
        "up" => Command::Up,
        "draw" => {
            let nums = numbers("draw", "draw <x1> <y1> <x2> <y2>", rest, 4)?;
            Command::Draw { from: Point::new(nums[0], nums[1]), to: Point::new(nums[2], nums[3]) }
        }
        "pick" if !rest.is_empty() => Command::Select(Some(rest.to_owned())),
        "pick" => return Err(ClientError::Usage { command: "pick", usage: "pick <id>" }),
        "unpick" => Command::Select(None),
        "patch" => {
            let Some((id, body)) = rest.split_once(char::is_whitespace) else {
                return Err(ClientError::Usage { command: "patch", usage: "patch <id> <json>" });
            };
            Command::Patch { id: id.to_owned(), patch: serde_json::from_str(body.trim())? }
        }
        "delete" => Command::Delete,
        "key" => key_chord(rest)?,
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "reset" => Command::Reset,
        "say" if !rest.is_empty() => Command::Say(rest.to_owned()),
        "say" => return Err(ClientError::Usage { command: "say", usage: "say <text>" }),
        "list" => Command::List,
        "help" | "?" => Command::Help,
        "leave" => Command::Leave,
        "quit" | "exit" => Command::Quit,
        other => return Err(ClientError::UnknownCommand(other.to_owned())),
    };
    Ok(Some(command))
}

fn shape_name(rest: &str) -> Result<ShapeName, ClientError> {
    match rest {
        "rectangle" | "rect" => Ok(ShapeName::Rectangle),
        "oval" => Ok(ShapeName::Oval),
        "triangle" => Ok(ShapeName::Triangle),
        "star" => Ok(ShapeName::Star),
        _ => Err(ClientError::Usage { command: "shape", usage: "shape <rectangle|oval|triangle|star>" }),
    }
}

fn point(command: &'static str, usage: &'static str, rest: &str) -> Result<Point, ClientError> {
    let nums = numbers(command, usage, rest, 2)?;
    Ok(Point::new(nums[0], nums[1]))
}

fn numbers(command: &'static str, usage: &'static str, rest: &str, count: usize) -> Result<Vec<f64>, ClientError> {
    let parsed: Result<Vec<f64>, _> = rest.split_whitespace().map(str::parse::<f64>).collect();
    match parsed {
        Ok(nums) if nums.len() == count => Ok(nums),
        _ => Err(ClientError::Usage { command, usage }),
    }
}

fn key_chord(rest: &str) -> Result<Command, ClientError> {
    let usage = ClientError::Usage { command: "key", usage: "key <name> [ctrl] [meta] [shift] [alt]" };
    let mut parts = rest.split_whitespace();
    let Some(name) = parts.next() else {
        return Err(usage);
    };
    let mut mods = Modifiers::default();
    for part in parts {
        match part {
            "ctrl" => mods.ctrl = true,
            "meta" | "cmd" => mods.meta = true,
            "shift" => mods.shift = true,
            "alt" => mods.alt = true,
            _ => return Err(usage),
        }
    }
    Ok(Command::Key { key: Key(name.to_owned()), mods })
}
