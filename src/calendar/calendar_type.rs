use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CALENDAR_COLOR: &str = "#3b82f6";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Calendar {
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            id: slugify(name),
            name: name.to_string(),
            color: color.to_string(),
        }
    }

    /// Builds a calendar for an id that appeared in imported data without a definition.
    pub fn from_id(id: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: display_name_from_id(id),
            color: color.to_string(),
        }
    }

    pub fn apply(&mut self, update: &CalendarUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(color) = &update.color {
            self.color = color.clone();
        }
    }
}

impl CalendarUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            color: None,
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            name: None,
            color: Some(color.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

pub fn slugify(name: &str) -> String {
    whitespace_runs()
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

pub fn display_name_from_id(id: &str) -> String {
    id.split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
