//! Completion intake path: broker consumption and per-record dispatch.
//!
//! Workers report task-execution completions to the durable queue declared in
//! [`crate::broker::TASK_EXECUTION_QUEUE`]. The [`CompletionIntake`] consumer
//! decodes each delivery and hands it to the [`CompletionDispatcher`], which
//! writes the metrics point and routes the record through the scheduler hub,
//! retrying until some stage scheduler accepts it. Only confirmed handling
//! acknowledges the delivery; everything else relies on broker redelivery.

mod consumer;
mod dispatcher;

pub use consumer::{CompletionIntake, IntakeConfig};
pub use dispatcher::{CompletionDispatcher, DispatchError, DISPATCH_RETRY_DELAY};
