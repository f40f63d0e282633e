// Diet session store
//
// Selections live in a Moka cache keyed by session id. An entry expires
// after the configured idle time, which is what ends a session that the
// client never explicitly closes.

#[cfg(feature = "api")]
use crate::diet::DietSelection;
#[cfg(feature = "api")]
use crate::error::FoodDataError;
#[cfg(feature = "api")]
use moka::future::Cache;
#[cfg(feature = "api")]
use moka::ops::compute::Op;
#[cfg(feature = "api")]
use std::time::Duration;

#[cfg(feature = "api")]
const MAX_SESSIONS: u64 = 10_000;

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct DietSessions {
    cache: Cache<String, DietSelection>,
}

#[cfg(feature = "api")]
impl DietSessions {
    pub fn new(idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(idle)
            .build();
        Self { cache }
    }

    pub async fn get(&self, session_id: &str) -> Option<DietSelection> {
        self.cache.get(session_id).await
    }

    /// Current selection, empty for a new session
    pub async fn get_or_default(&self, session_id: &str) -> DietSelection {
        self.get(session_id).await.unwrap_or_default()
    }

    /// Apply `change` to the session's selection and store the result
    ///
    /// Read, change and write happen under the entry lock, so concurrent
    /// updates of one session do not overwrite each other. Nothing is
    /// stored when `change` fails.
    pub async fn update<F, T>(&self, session_id: &str, change: F) -> Result<T, FoodDataError>
    where
        F: FnOnce(&mut DietSelection) -> Result<T, FoodDataError>,
    {
        let mut outcome: Option<Result<T, FoodDataError>> = None;

        self.cache
            .entry_by_ref(session_id)
            .and_compute_with(|entry| {
                let mut selection = entry.map(|e| e.into_value()).unwrap_or_default();
                let op = match change(&mut selection) {
                    Ok(output) => {
                        outcome = Some(Ok(output));
                        Op::Put(selection)
                    }
                    Err(e) => {
                        outcome = Some(Err(e));
                        Op::Nop
                    }
                };
                std::future::ready(op)
            })
            .await;

        outcome.unwrap_or_else(|| {
            Err(FoodDataError::Frame(format!("session '{}' was not updated", session_id)))
        })
    }

    /// End a session; returns whether it existed
    pub async fn remove(&self, session_id: &str) -> bool {
        self.cache.remove(session_id).await.is_some()
    }
}
