//! Client-side quiz core: unique-item fetching, countdown, hints and the
//! session state machine that ties them together.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod cancel;
pub mod fetcher;
pub mod hints;
pub mod session;
pub mod source;
pub mod timer;

pub use cancel::CancelSignal;
pub use fetcher::{fetch_unique, Fetched};
pub use hints::HintTracker;
pub use session::{AdvanceOutcome, LoadOutcome, QuizRules, QuizSession, QuizSessionBuilder};
pub use source::ItemSource;
pub use timer::{CountdownTimer, TimerStatus};

/// State behind these mutexes stays consistent between statements, so a
/// poisoned lock is recovered rather than propagated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
