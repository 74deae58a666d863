//! Dispatch of parsed actions to host-provided handlers.
//!
//! The host wires one optional [`Handler`] per capability into an
//! [`ActionHandlers`] table. The executor looks up the handler for each
//! action, runs it, and folds every outcome into an
//! [`ActionResult`](actiontag_core::ActionResult). Missing handlers are
//! skipped; handler errors and panics become failed results.

pub mod executor;
pub mod handler;

pub use executor::{execute_action, execute_actions, Executor};
pub use handler::{fn_handler, ActionHandlers, FnHandler, Handler};
