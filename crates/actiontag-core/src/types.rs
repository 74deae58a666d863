//! Action values extracted from model output and the results of running them.
//!
//! An [`Action`] is plain data: it is produced once by the parser and never
//! mutated afterwards. Handlers receive the variant payload by reference.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Action payloads
// =============================================================================

/// Read a file, optionally a window of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadAction {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Overwrite (or create) a file with the given content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAction {
    pub path: String,
    pub content: String,
}

/// Create a new file; hosts typically refuse if it already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAction {
    pub path: String,
    pub content: String,
}

/// Replace one occurrence (or every occurrence) of `search` with `replace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditAction {
    pub path: String,
    pub search: String,
    pub replace: String,
    #[serde(default)]
    pub replace_all: bool,
}

/// Run a shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BashAction {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub background: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// Search file contents for a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepAction {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default)]
    pub case_insensitive: bool,
}

/// Find files by glob pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobAction {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// List a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAction {
    pub path: String,
    #[serde(default)]
    pub recursive: bool,
}

/// Fetch a URL, optionally with a question about its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchAction {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// What a scheduled job runs when it fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// The payload is a shell command.
    #[default]
    Command,
    /// The payload is a prompt handed to the model.
    Prompt,
}

impl ScheduleKind {
    /// Interpret a `type="..."` attribute value.
    ///
    /// `prompt` and `llm` select [`ScheduleKind::Prompt`]; anything else,
    /// including a missing attribute, is a shell command.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("prompt") | Some("llm") => ScheduleKind::Prompt,
            _ => ScheduleKind::Command,
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Command => write!(f, "command"),
            ScheduleKind::Prompt => write!(f, "prompt"),
        }
    }
}

/// Register a recurring job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAction {
    pub name: String,
    pub cron: String,
    pub kind: ScheduleKind,
    pub payload: String,
}

/// Remove a recurring job by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnscheduleAction {
    pub name: String,
}

/// Push a notification to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyAction {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// Speak text to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SayAction {
    pub text: String,
}

/// Finish the current agent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Invoke a named skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillAction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

/// Delegate a prompt to a sub-agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAction {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Record an ordered plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub steps: Vec<String>,
}

/// Configure the Telegram connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfigAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Configure the Discord connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordConfigAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

// =============================================================================
// Action union
// =============================================================================

/// One unit of host-side work requested by model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Read(ReadAction),
    Write(WriteAction),
    Create(CreateAction),
    Edit(EditAction),
    Bash(BashAction),
    Grep(GrepAction),
    Glob(GlobAction),
    List(ListAction),
    Fetch(FetchAction),
    Schedule(ScheduleAction),
    Unschedule(UnscheduleAction),
    Notify(NotifyAction),
    Say(SayAction),
    End(EndAction),
    Skill(SkillAction),
    Task(TaskAction),
    Plan(PlanAction),
    TelegramConfig(TelegramConfigAction),
    DiscordConfig(DiscordConfigAction),
}

/// Fieldless discriminant of [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Read,
    Write,
    Create,
    Edit,
    Bash,
    Grep,
    Glob,
    List,
    Fetch,
    Schedule,
    Unschedule,
    Notify,
    Say,
    End,
    Skill,
    Task,
    Plan,
    TelegramConfig,
    DiscordConfig,
}

impl ActionKind {
    /// Every kind, in declaration order.
    pub const ALL: [ActionKind; 19] = [
        ActionKind::Read,
        ActionKind::Write,
        ActionKind::Create,
        ActionKind::Edit,
        ActionKind::Bash,
        ActionKind::Grep,
        ActionKind::Glob,
        ActionKind::List,
        ActionKind::Fetch,
        ActionKind::Schedule,
        ActionKind::Unschedule,
        ActionKind::Notify,
        ActionKind::Say,
        ActionKind::End,
        ActionKind::Skill,
        ActionKind::Task,
        ActionKind::Plan,
        ActionKind::TelegramConfig,
        ActionKind::DiscordConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Read => "read",
            ActionKind::Write => "write",
            ActionKind::Create => "create",
            ActionKind::Edit => "edit",
            ActionKind::Bash => "bash",
            ActionKind::Grep => "grep",
            ActionKind::Glob => "glob",
            ActionKind::List => "list",
            ActionKind::Fetch => "fetch",
            ActionKind::Schedule => "schedule",
            ActionKind::Unschedule => "unschedule",
            ActionKind::Notify => "notify",
            ActionKind::Say => "say",
            ActionKind::End => "end",
            ActionKind::Skill => "skill",
            ActionKind::Task => "task",
            ActionKind::Plan => "plan",
            ActionKind::TelegramConfig => "telegram-config",
            ActionKind::DiscordConfig => "discord-config",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown action type: {}", s))
    }
}

const LABEL_MAX_CHARS: usize = 60;

fn truncate(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= LABEL_MAX_CHARS {
        single_line
    } else {
        let cut: String = single_line.chars().take(LABEL_MAX_CHARS).collect();
        format!("{}...", cut)
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Read(_) => ActionKind::Read,
            Action::Write(_) => ActionKind::Write,
            Action::Create(_) => ActionKind::Create,
            Action::Edit(_) => ActionKind::Edit,
            Action::Bash(_) => ActionKind::Bash,
            Action::Grep(_) => ActionKind::Grep,
            Action::Glob(_) => ActionKind::Glob,
            Action::List(_) => ActionKind::List,
            Action::Fetch(_) => ActionKind::Fetch,
            Action::Schedule(_) => ActionKind::Schedule,
            Action::Unschedule(_) => ActionKind::Unschedule,
            Action::Notify(_) => ActionKind::Notify,
            Action::Say(_) => ActionKind::Say,
            Action::End(_) => ActionKind::End,
            Action::Skill(_) => ActionKind::Skill,
            Action::Task(_) => ActionKind::Task,
            Action::Plan(_) => ActionKind::Plan,
            Action::TelegramConfig(_) => ActionKind::TelegramConfig,
            Action::DiscordConfig(_) => ActionKind::DiscordConfig,
        }
    }

    /// Human-readable label used as [`ActionResult::action`].
    pub fn label(&self) -> String {
        match self {
            Action::Read(a) => format!("Read {}", a.path),
            Action::Write(a) => format!("Write {}", a.path),
            Action::Create(a) => format!("Create {}", a.path),
            Action::Edit(a) => format!("Edit {}", a.path),
            Action::Bash(a) => match &a.description {
                Some(d) => format!("Bash: {}", truncate(d)),
                None => format!("Bash: {}", truncate(&a.command)),
            },
            Action::Grep(a) => format!("Grep {}", truncate(&a.pattern)),
            Action::Glob(a) => format!("Glob {}", a.pattern),
            Action::List(a) => format!("List {}", a.path),
            Action::Fetch(a) => format!("Fetch {}", a.url),
            Action::Schedule(a) => format!("Schedule {} ({})", a.name, a.cron),
            Action::Unschedule(a) => format!("Unschedule {}", a.name),
            Action::Notify(a) => match &a.title {
                Some(t) => format!("Notify: {}", truncate(t)),
                None => format!("Notify: {}", truncate(&a.message)),
            },
            Action::Say(a) => format!("Say: {}", truncate(&a.text)),
            Action::End(_) => "End".to_string(),
            Action::Skill(a) => format!("Skill {}", a.name),
            Action::Task(a) => match &a.description {
                Some(d) => format!("Task: {}", truncate(d)),
                None => format!("Task: {}", truncate(&a.prompt)),
            },
            Action::Plan(a) => format!("Plan ({} steps)", a.steps.len()),
            Action::TelegramConfig(_) => "Configure Telegram".to_string(),
            Action::DiscordConfig(_) => "Configure Discord".to_string(),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of executing one action.
///
/// `error` is `Some` exactly when `success` is false; use the constructors
/// to keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: String,
    pub success: bool,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(action: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            success: true,
            result: result.into(),
            error: None,
        }
    }

    pub fn failed(action: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            action: action.into(),
            success: false,
            result: format!("Error: {}", error),
            error: Some(error),
        }
    }
}
