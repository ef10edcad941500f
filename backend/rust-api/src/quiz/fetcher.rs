use std::collections::HashSet;
use std::future::Future;

use futures::future::join_all;

use super::cancel::CancelSignal;
use crate::error::{FetchError, ItemSourceError};
use crate::models::Pokemon;

pub const MAX_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_ATTEMPTS: usize = 50;

/// Result of a cancellable operation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Complete(T),
    Cancelled,
}

/// Collects `count` Pokémon with distinct ids by issuing parallel batches of
/// `draw` calls.
///
/// Each batch requests twice the number still missing (at most
/// `MAX_BATCH_SIZE`). Failed or empty draws count toward `max_attempts` and
/// are not retried individually. Items keep the order in which they were
/// first seen, so the first element is the one the caller should treat as
/// the target.
///
/// # Errors
///
/// `FetchError::InsufficientUniqueItems` when the attempt budget runs out.
/// `FetchError::Source` when no draw produced an item at all and the source
/// reported a network failure.
pub async fn fetch_unique<F, Fut>(
    count: usize,
    mut draw: F,
    max_attempts: usize,
    cancel: &CancelSignal,
) -> Result<Fetched<Vec<Pokemon>>, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<Pokemon>, ItemSourceError>>,
{
    let mut unique: Vec<Pokemon> = Vec::with_capacity(count);
    let mut seen: HashSet<u32> = HashSet::with_capacity(count);
    let mut attempts = 0usize;
    let mut produced_any = false;
    let mut last_network_error: Option<ItemSourceError> = None;

    while unique.len() < count && attempts < max_attempts {
        if cancel.is_cancelled() {
            return Ok(Fetched::Cancelled);
        }

        let remaining = count - unique.len();
        let batch_size = (remaining * 2).min(MAX_BATCH_SIZE);
        let batch = join_all((0..batch_size).map(|_| draw()));

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Fetched::Cancelled),
            results = batch => results,
        };
        attempts += batch_size;

        let mut misses = 0usize;
        for result in results {
            match result {
                Ok(Some(pokemon)) => {
                    produced_any = true;
                    if seen.insert(pokemon.id) {
                        unique.push(pokemon);
                        if unique.len() >= count {
                            break;
                        }
                    }
                }
                Ok(None) => misses += 1,
                Err(err) => {
                    misses += 1;
                    tracing::debug!("Random draw failed: {}", err);
                    if !err.is_not_found() {
                        last_network_error = Some(err);
                    }
                }
            }
        }

        tracing::debug!(
            "Fetch batch done: batch_size={}, misses={}, unique={}/{}, attempts={}",
            batch_size,
            misses,
            unique.len(),
            count,
            attempts
        );
    }

    if cancel.is_cancelled() {
        return Ok(Fetched::Cancelled);
    }

    if unique.len() < count {
        if !produced_any {
            if let Some(err) = last_network_error {
                return Err(FetchError::Source(err));
            }
        }
        return Err(FetchError::InsufficientUniqueItems {
            needed: count,
            got: unique.len(),
            attempts,
        });
    }

    Ok(Fetched::Complete(unique))
}
