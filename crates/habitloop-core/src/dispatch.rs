//! Fired-event dispatch.
//!
//! The host hands over a fired wake-up as a raw key string plus a
//! [`CompletionToken`] it uses to keep the process alive until the work
//! is done. The token is a drop guard: it signals the host on *every*
//! exit path, including an unparsable key, a handler error, or a panic
//! inside the blocking work, so the host never waits on a finish signal
//! that was lost to an early return.
//!
//! Handler work is synchronous port I/O, so the dispatcher moves it onto
//! the blocking pool rather than stalling the async runtime.

use std::sync::Arc;

use tracing::warn;

use crate::handlers::FireHandlers;
use crate::keys::AlarmKey;

/// Keep-alive handle for one fired wake-up.
///
/// The host is signalled exactly once, either by [`release`] or when the
/// token is dropped.
///
/// [`release`]: CompletionToken::release
pub struct CompletionToken {
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl CompletionToken {
    pub fn new(on_release: impl FnOnce() + Send + 'static) -> Self {
        Self { on_release: Some(Box::new(on_release)) }
    }

    /// Token for hosts with no keep-alive protocol.
    pub fn noop() -> Self {
        Self { on_release: None }
    }

    /// Signal the host explicitly.
    pub fn release(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(f) = self.on_release.take() {
            f();
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        self.fire();
    }
}

pub struct Dispatcher {
    handlers: Arc<FireHandlers>,
}

impl Dispatcher {
    pub fn new(handlers: Arc<FireHandlers>) -> Self {
        Self { handlers }
    }

    /// Route one fired wake-up to its handler, then release the token.
    pub async fn dispatch(&self, raw_key: &str, token: CompletionToken) {
        let Some(key) = AlarmKey::try_parse(raw_key) else {
            warn!(raw_key, "fired wake-up key does not parse, dropping");
            return;
        };

        let handlers = self.handlers.clone();
        let result = tokio::task::spawn_blocking(move || match key {
            AlarmKey::Due(habit_id) => handlers.on_due_fire(habit_id),
            AlarmKey::Overdue(habit_id, offset_hours) => {
                handlers.on_overdue_fire(habit_id, offset_hours)
            }
            AlarmKey::DailyCheck => handlers.on_daily_check_fire(),
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%key, error = %e, "fire handler failed"),
            Err(e) => warn!(%key, error = %e, "fire handler panicked"),
        }
        token.release();
    }
}
