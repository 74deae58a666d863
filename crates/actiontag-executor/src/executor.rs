//! The dispatch loop.
//!
//! Actions run strictly one after another, so each observes the side
//! effects of the ones before it. There is no cancellation here; a handler
//! that needs a timeout enforces it itself.

use std::any::Any;
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{debug, info, warn};

use actiontag_core::config::ExecutorConfig;
use actiontag_core::types::{Action, ActionResult};

use crate::handler::{ActionHandlers, Handler};

/// Runs parsed actions against a handler table.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `actions` honoring the configured one-at-a-time mode.
    pub async fn run(&self, actions: &[Action], handlers: &ActionHandlers) -> Vec<ActionResult> {
        execute_actions(actions, handlers, self.config.one_at_a_time).await
    }
}

/// Execute `actions` in order.
///
/// With `one_at_a_time` only the first action runs, so the caller sees one
/// result before the model picks its next step. Actions whose capability is
/// not wired produce no result.
pub async fn execute_actions(
    actions: &[Action],
    handlers: &ActionHandlers,
    one_at_a_time: bool,
) -> Vec<ActionResult> {
    let batch = if one_at_a_time {
        &actions[..actions.len().min(1)]
    } else {
        actions
    };
    if one_at_a_time && actions.len() > 1 {
        debug!(
            deferred = actions.len() - 1,
            "One-at-a-time mode: executing first action only"
        );
    }

    let mut results = Vec::with_capacity(batch.len());
    for action in batch {
        if let Some(result) = execute_action(action, handlers).await {
            results.push(result);
        }
    }
    results
}

/// Execute one action. `None` means no handler is wired for its type.
pub async fn execute_action(action: &Action, handlers: &ActionHandlers) -> Option<ActionResult> {
    let label = action.label();
    match action {
        Action::Read(a) => invoke(handlers.read.as_ref(), a, label).await,
        Action::Write(a) => invoke(handlers.write.as_ref(), a, label).await,
        Action::Create(a) => invoke(handlers.create.as_ref(), a, label).await,
        Action::Edit(a) => invoke(handlers.edit.as_ref(), a, label).await,
        Action::Bash(a) => invoke(handlers.bash.as_ref(), a, label).await,
        Action::Grep(a) => invoke(handlers.grep.as_ref(), a, label).await,
        Action::Glob(a) => invoke(handlers.glob.as_ref(), a, label).await,
        Action::List(a) => invoke(handlers.list.as_ref(), a, label).await,
        Action::Fetch(a) => invoke(handlers.fetch.as_ref(), a, label).await,
        Action::Schedule(a) => invoke(handlers.schedule.as_ref(), a, label).await,
        Action::Unschedule(a) => invoke(handlers.unschedule.as_ref(), a, label).await,
        Action::Notify(a) => invoke(handlers.notify.as_ref(), a, label).await,
        Action::Say(a) => invoke(handlers.say.as_ref(), a, label).await,
        Action::End(a) => invoke(handlers.end.as_ref(), a, label).await,
        Action::Skill(a) => invoke(handlers.skill.as_ref(), a, label).await,
        Action::Task(a) => invoke(handlers.task.as_ref(), a, label).await,
        Action::Plan(a) => invoke(handlers.plan.as_ref(), a, label).await,
        Action::TelegramConfig(a) => invoke(handlers.telegram_config.as_ref(), a, label).await,
        Action::DiscordConfig(a) => invoke(handlers.discord_config.as_ref(), a, label).await,
    }
}

/// Run `handler` on its own task so a panic surfaces as a `JoinError`
/// instead of unwinding through the dispatch loop.
async fn invoke<A>(
    handler: Option<&Arc<dyn Handler<A>>>,
    payload: &A,
    label: String,
) -> Option<ActionResult>
where
    A: Clone + Send + Sync + 'static,
{
    let Some(handler) = handler else {
        debug!(action = %label, "No handler wired, skipping");
        return None;
    };

    let handler = Arc::clone(handler);
    let payload = payload.clone();
    let outcome = tokio::spawn(async move { handler.handle(&payload).await }).await;

    let result = match outcome {
        Ok(Ok(output)) => ActionResult::ok(label, output),
        Ok(Err(e)) => {
            warn!(action = %label, error = %e, "Action failed");
            ActionResult::failed(label, e.to_string())
        }
        Err(e) => {
            let message = join_error_message(e);
            warn!(action = %label, error = %message, "Action handler panicked");
            ActionResult::failed(label, message)
        }
    };
    info!(action = %result.action, success = result.success, "Action executed");
    Some(result)
}

fn join_error_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "Handler task was cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => format!("Handler panicked: {}", panic_text(payload.as_ref())),
        Err(err) => err.to_string(),
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actiontag_core::error::ActionError;
    use actiontag_core::types::{BashAction, EditAction, ReadAction, SayAction};
    use std::sync::Mutex;

    fn read(path: &str) -> Action {
        Action::Read(ReadAction {
            path: path.to_string(),
            offset: None,
            limit: None,
        })
    }

    fn bash(command: &str) -> Action {
        Action::Bash(BashAction {
            command: command.to_string(),
            timeout_ms: None,
            background: false,
            description: None,
            cwd: None,
        })
    }

    fn say(text: &str) -> Action {
        Action::Say(SayAction {
            text: text.to_string(),
        })
    }

    fn reader() -> ActionHandlers {
        ActionHandlers::new().on_read(|a: ReadAction| async move { Ok(format!("contents of {}", a.path)) })
    }

    // ---- one-at-a-time ----

    #[tokio::test]
    async fn test_one_at_a_time_runs_first_only() {
        let actions = vec![read("/file1.ts"), read("/file2.ts")];
        let results = execute_actions(&actions, &reader(), true).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].action, "Read /file1.ts");
        assert_eq!(results[0].result, "contents of /file1.ts");
        assert!(results[0].success);
    }

    #[tokio::test]
    async fn test_batch_mode_runs_all_in_order() {
        let actions = vec![read("/a"), read("/b"), read("/c")];
        let results = execute_actions(&actions, &reader(), false).await;
        let labels: Vec<_> = results.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(labels, vec!["Read /a", "Read /b", "Read /c"]);
    }

    #[tokio::test]
    async fn test_empty_action_list() {
        assert!(execute_actions(&[], &reader(), true).await.is_empty());
        assert!(execute_actions(&[], &reader(), false).await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_runs_sequentially() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let handlers = ActionHandlers::new().on_bash(move |b: BashAction| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(format!("start {}", b.command));
                tokio::task::yield_now().await;
                sink.lock().unwrap().push(format!("end {}", b.command));
                Ok(String::new())
            }
        });
        let actions = vec![bash("one"), bash("two")];
        execute_actions(&actions, &handlers, false).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start one", "end one", "start two", "end two"]
        );
    }

    // ---- missing handlers ----

    #[tokio::test]
    async fn test_missing_handler_is_skipped() {
        let actions = vec![say("hi"), read("/a")];
        let results = execute_actions(&actions, &reader(), false).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].action, "Read /a");
    }

    #[tokio::test]
    async fn test_missing_handler_in_one_at_a_time_mode_yields_nothing() {
        let actions = vec![say("hi"), read("/a")];
        assert!(execute_actions(&actions, &reader(), true).await.is_empty());
    }

    #[tokio::test]
    async fn test_execute_action_returns_none_without_handler() {
        let action = Action::Edit(EditAction {
            path: "a".to_string(),
            search: "x".to_string(),
            replace: "y".to_string(),
            replace_all: false,
        });
        assert!(execute_action(&action, &ActionHandlers::new()).await.is_none());
    }

    // ---- failures ----

    #[tokio::test]
    async fn test_handler_error_becomes_failed_result() {
        let handlers = ActionHandlers::new().on_read(|a: ReadAction| async move {
            Err(ActionError::HandlerFailed(format!("{} not found", a.path)))
        });
        let result = execute_action(&read("/missing"), &handlers).await.unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Action handler failed: /missing not found")
        );
        assert_eq!(result.result, "Error: Action handler failed: /missing not found");
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_failed_result() {
        let handlers = ActionHandlers::new()
            .on_bash(|_: BashAction| async move {
                if true {
                    panic!("boom");
                }
                Ok(String::new())
            })
            .on_read(|_: ReadAction| async move { Ok("still running".to_string()) });

        let actions = vec![bash("explode"), read("/after")];
        let results = execute_actions(&actions, &handlers, false).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("boom"));
        assert!(results[1].success);
        assert_eq!(results[1].result, "still running");
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let handlers = ActionHandlers::new().on_read(|a: ReadAction| async move {
            if a.path == "/bad" {
                Err(ActionError::InvalidPayload("bad path".to_string()))
            } else {
                Ok(a.path)
            }
        });
        let actions = vec![read("/bad"), read("/good")];
        let results = execute_actions(&actions, &handlers, false).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[1].success);
        for r in &results {
            assert_eq!(r.error.is_some(), !r.success);
        }
    }

    // ---- Executor ----

    #[tokio::test]
    async fn test_executor_uses_configured_mode() {
        let actions = vec![read("/a"), read("/b")];

        let single = Executor::default();
        assert!(single.config().one_at_a_time);
        assert_eq!(single.run(&actions, &reader()).await.len(), 1);

        let batch = Executor::new(ExecutorConfig {
            one_at_a_time: false,
        });
        assert_eq!(batch.run(&actions, &reader()).await.len(), 2);
    }

    #[test]
    fn test_panic_text() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_text(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_text(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_text(s.as_ref()), "unknown panic");
    }
}
