//! Terminal conflict prompts.

use std::io;
use std::path::Path;

use merge_engine::{Choice, ConflictHandler, ConflictRecord, MergeNode, Strategy};

const CONFLICT_MENU: [&str; 5] = [
    "Use template value",
    "Keep existing value",
    "Merge (template wins at this point)",
    "Enter a value",
    "Decide later",
];

const FILE_MENU: [&str; 3] = ["Use template file", "Keep existing file", "Decide later"];

/// Asks on the terminal, one conflict at a time.
#[derive(Default)]
pub struct DialoguerHandler {
    asked: usize,
}

impl DialoguerHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConflictHandler for DialoguerHandler {
    fn choose(&mut self, conflict: &ConflictRecord) -> io::Result<Option<Choice>> {
        self.asked += 1;
        eprintln!();
        eprintln!("Conflict #{} at {}", self.asked, conflict.path_display());
        eprintln!("  template: {}", conflict.source);
        eprintln!("  existing: {}", conflict.target);

        let picked = dialoguer::Select::new()
            .with_prompt("Resolve with")
            .items(&CONFLICT_MENU)
            .default(2)
            .interact()
            .map_err(io::Error::other)?;

        let choice = match picked {
            0 => Choice::Strategy(Strategy::UseSource),
            1 => Choice::Strategy(Strategy::UseTarget),
            2 => Choice::Strategy(Strategy::Merge),
            3 => {
                let text: String = dialoguer::Input::new()
                    .with_prompt("Value (JSON, or plain text)")
                    .with_initial_text(conflict.target.to_string())
                    .interact_text()
                    .map_err(io::Error::other)?;
                Choice::Value(parse_entered_value(&text))
            }
            _ => Choice::Strategy(Strategy::Manual),
        };
        Ok(Some(choice))
    }

    fn choose_file(&mut self, target: &Path, diff: &str) -> io::Result<Option<Strategy>> {
        eprintln!();
        eprintln!("{} cannot be merged structurally.", target.display());
        eprint!("{}", diff);

        let picked = dialoguer::Select::new()
            .with_prompt("Resolve with")
            .items(&FILE_MENU)
            .default(2)
            .interact()
            .map_err(io::Error::other)?;

        Ok(match picked {
            0 => Some(Strategy::UseSource),
            1 => Some(Strategy::UseTarget),
            _ => Some(Strategy::Manual),
        })
    }
}

/// JSON when it parses as JSON, otherwise the raw text as a string.
pub fn parse_entered_value(text: &str) -> MergeNode {
    match serde_json::from_str::<serde_json::Value>(text.trim()) {
        Ok(value) => MergeNode::from_json_value(value),
        Err(_) => MergeNode::String(text.to_string()),
    }
}
