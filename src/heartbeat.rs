use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Kind of thing a heartbeat was recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    File,
    App,
    Domain,
}

impl EntityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::App => "app",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity category, serialized with the collector's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "coding")]
    Coding,
    #[serde(rename = "building")]
    Building,
    #[serde(rename = "indexing")]
    Indexing,
    #[serde(rename = "debugging")]
    Debugging,
    #[serde(rename = "running tests")]
    RunningTests,
    #[serde(rename = "writing tests")]
    WritingTests,
    #[serde(rename = "manual testing")]
    ManualTesting,
    #[serde(rename = "code reviewing")]
    CodeReviewing,
    #[serde(rename = "browsing")]
    Browsing,
    #[serde(rename = "designing")]
    Designing,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coding => "coding",
            Self::Building => "building",
            Self::Indexing => "indexing",
            Self::Debugging => "debugging",
            Self::RunningTests => "running tests",
            Self::WritingTests => "writing tests",
            Self::ManualTesting => "manual testing",
            Self::CodeReviewing => "code reviewing",
            Self::Browsing => "browsing",
            Self::Designing => "designing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed activity event.
///
/// The serialized form is what gets handed to the collector: unset optional
/// fields are left out entirely and `dependencies` only shows up when it has
/// entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartBeat {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub branch: Option<String>,
    pub category: Category,
    #[serde(rename = "cursorpos", skip_serializing_if = "Option::is_none", default)]
    pub cursor_position: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub dependencies: Vec<String>,
    pub entity: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_write: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    #[serde(rename = "lineno", skip_serializing_if = "Option::is_none", default)]
    pub line_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lines: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project: Option<String>,
    /// Fractional unix epoch seconds.
    pub time: f64,
    pub user_agent: String,
}

impl HeartBeat {
    /// Minimal heartbeat with every optional field unset.
    pub fn new(
        entity: impl Into<String>,
        entity_type: EntityType,
        category: Category,
        time: f64,
        user_agent: impl Into<String>,
    ) -> Self {
        HeartBeat {
            branch: None,
            category,
            cursor_position: None,
            dependencies: Vec::new(),
            entity: entity.into(),
            entity_type,
            is_write: None,
            language: None,
            line_number: None,
            lines: None,
            project: None,
            time,
            user_agent: user_agent.into(),
        }
    }

    /// Deduplication key built from time, type, category, project, branch,
    /// entity and is_write. Other fields don't take part.
    ///
    /// `-` and `\` inside project, branch and entity are backslash-escaped,
    /// so distinct tuples never render the same key.
    pub fn id(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}-{}-{}",
            self.time,
            self.entity_type,
            self.category,
            escape_id_part(self.project.as_deref().unwrap_or_default()),
            escape_id_part(self.branch.as_deref().unwrap_or_default()),
            escape_id_part(&self.entity),
            self.is_write.unwrap_or(false),
        )
    }
}

fn escape_id_part(part: &str) -> Cow<'_, str> {
    if !part.contains(['-', '\\']) {
        return Cow::Borrowed(part);
    }

    let mut escaped = String::with_capacity(part.len() + 4);
    for c in part.chars() {
        if c == '-' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    Cow::Owned(escaped)
}

/// Delivery outcome for one heartbeat, produced by a [`crate::handle::Sender`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    pub status: u16,
    pub heartbeat: HeartBeat,
}
