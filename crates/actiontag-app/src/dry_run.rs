//! Handlers that stage actions instead of performing them.
//!
//! Every capability is wired, so `run` reports what a real host would do
//! for each parsed action without touching the filesystem, shell or network.

use actiontag_core::error::ActionError;
use actiontag_core::types::Action;
use actiontag_executor::ActionHandlers;

macro_rules! stage_all {
    ($handlers:expr, $( $on:ident => $variant:ident ),* $(,)?) => {
        $handlers $( .$on(|a| async move { stage(Action::$variant(a)) }) )*
    };
}

/// A handler table where every capability describes its action.
pub fn staged_handlers() -> ActionHandlers {
    stage_all!(
        ActionHandlers::new(),
        on_read => Read,
        on_write => Write,
        on_create => Create,
        on_edit => Edit,
        on_bash => Bash,
        on_grep => Grep,
        on_glob => Glob,
        on_list => List,
        on_fetch => Fetch,
        on_schedule => Schedule,
        on_unschedule => Unschedule,
        on_notify => Notify,
        on_say => Say,
        on_end => End,
        on_skill => Skill,
        on_task => Task,
        on_plan => Plan,
        on_telegram_config => TelegramConfig,
        on_discord_config => DiscordConfig,
    )
}

fn stage(action: Action) -> Result<String, ActionError> {
    if let Action::Bash(ref bash) = action {
        if bash.command.trim().is_empty() {
            return Err(ActionError::InvalidPayload(
                "Shell command must not be empty".to_string(),
            ));
        }
    }
    let label = action.label();
    tracing::info!(action = %label, kind = action.kind().as_str(), "Action staged");
    Ok(format!("Staged: {}", label))
}
