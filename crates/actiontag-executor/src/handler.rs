//! Handler trait and the per-capability handler table.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use actiontag_core::error::ActionError;
use actiontag_core::types::{
    ActionKind, BashAction, CreateAction, DiscordConfigAction, EditAction, EndAction, FetchAction,
    GlobAction, GrepAction, ListAction, NotifyAction, PlanAction, ReadAction, SayAction,
    ScheduleAction, SkillAction, TaskAction, TelegramConfigAction, UnscheduleAction, WriteAction,
};

/// Host-side implementation of one capability.
///
/// `Ok` carries the text reported back to the model; `Err` becomes a failed
/// result with the error's display string.
#[async_trait]
pub trait Handler<A>: Send + Sync {
    async fn handle(&self, action: &A) -> Result<String, ActionError>;
}

/// Adapts an async closure taking the payload by value into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

pub fn fn_handler<F>(f: F) -> FnHandler<F> {
    FnHandler { f }
}

#[async_trait]
impl<A, F, Fut> Handler<A> for FnHandler<F>
where
    A: Clone + Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ActionError>> + Send,
{
    async fn handle(&self, action: &A) -> Result<String, ActionError> {
        (self.f)(action.clone()).await
    }
}

macro_rules! capabilities {
    ($( $kind:ident => $field:ident, $with:ident, $on:ident: $payload:ty; )*) => {
        /// One optional handler per capability. An absent handler means the
        /// capability is not available in this host, and actions needing it
        /// are skipped.
        #[derive(Clone, Default)]
        pub struct ActionHandlers {
            $( pub $field: Option<Arc<dyn Handler<$payload>>>, )*
        }

        impl ActionHandlers {
            pub fn new() -> Self {
                Self::default()
            }

            $(
                pub fn $with<H>(mut self, handler: H) -> Self
                where
                    H: Handler<$payload> + 'static,
                {
                    self.$field = Some(Arc::new(handler));
                    self
                }

                pub fn $on<F, Fut>(self, f: F) -> Self
                where
                    F: Fn($payload) -> Fut + Send + Sync + 'static,
                    Fut: Future<Output = Result<String, ActionError>> + Send + 'static,
                {
                    self.$with(fn_handler(f))
                }
            )*

            /// Whether a handler is wired for `kind`.
            pub fn supports(&self, kind: ActionKind) -> bool {
                match kind {
                    $( ActionKind::$kind => self.$field.is_some(), )*
                }
            }
        }
    };
}

capabilities! {
    Read => read, with_read, on_read: ReadAction;
    Write => write, with_write, on_write: WriteAction;
    Create => create, with_create, on_create: CreateAction;
    Edit => edit, with_edit, on_edit: EditAction;
    Bash => bash, with_bash, on_bash: BashAction;
    Grep => grep, with_grep, on_grep: GrepAction;
    Glob => glob, with_glob, on_glob: GlobAction;
    List => list, with_list, on_list: ListAction;
    Fetch => fetch, with_fetch, on_fetch: FetchAction;
    Schedule => schedule, with_schedule, on_schedule: ScheduleAction;
    Unschedule => unschedule, with_unschedule, on_unschedule: UnscheduleAction;
    Notify => notify, with_notify, on_notify: NotifyAction;
    Say => say, with_say, on_say: SayAction;
    End => end, with_end, on_end: EndAction;
    Skill => skill, with_skill, on_skill: SkillAction;
    Task => task, with_task, on_task: TaskAction;
    Plan => plan, with_plan, on_plan: PlanAction;
    TelegramConfig => telegram_config, with_telegram_config, on_telegram_config: TelegramConfigAction;
    DiscordConfig => discord_config, with_discord_config, on_discord_config: DiscordConfigAction;
}

impl ActionHandlers {
    /// Capabilities with a handler wired, in declaration order.
    pub fn wired(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .iter()
            .copied()
            .filter(|k| self.supports(*k))
            .collect()
    }
}

impl fmt::Debug for ActionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandlers")
            .field("wired", &self.wired())
            .finish()
    }
}
