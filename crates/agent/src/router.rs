use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use hrbot_core::{ApplicationError, BackingStore, ThreadId};

use crate::runtime::{AgentResponse, AgentRuntime};

type LockTable = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

fn lock_table(table: &LockTable) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One async mutex per thread id, created on demand and dropped once no turn
/// holds or waits on it.
#[derive(Default)]
pub struct TurnLocks {
    table: LockTable,
}

pub struct TurnGuard {
    thread_id: String,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TurnLocks {
    pub async fn acquire(&self, thread_id: &ThreadId) -> TurnGuard {
        let key = thread_id.as_str().to_string();
        let lock = lock_table(&self.table).entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        TurnGuard { thread_id: key, table: self.table.clone(), guard: Some(guard) }
    }

    pub fn active(&self) -> usize {
        lock_table(&self.table).len()
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = lock_table(&self.table);
        if table.get(&self.thread_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            table.remove(&self.thread_id);
        }
    }
}

/// Whether the caller brought the thread id or the server just minted it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadOrigin {
    Generated,
    Supplied,
}

/// Dispatches turns to the runtime bound to each backing store.
#[derive(Default)]
pub struct AgentRouter {
    mongodb: Option<Arc<AgentRuntime>>,
    postgres: Option<Arc<AgentRuntime>>,
    turn_locks: TurnLocks,
}

impl AgentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `runtime` to the store it was built for, replacing any earlier binding.
    pub fn with_runtime(mut self, runtime: AgentRuntime) -> Self {
        let store = runtime.store();
        let runtime = Some(Arc::new(runtime));
        match store {
            BackingStore::MongoDb => self.mongodb = runtime,
            BackingStore::Postgres => self.postgres = runtime,
        }
        self
    }

    fn slot(&self, store: BackingStore) -> Option<&Arc<AgentRuntime>> {
        match store {
            BackingStore::MongoDb => self.mongodb.as_ref(),
            BackingStore::Postgres => self.postgres.as_ref(),
        }
    }

    pub fn route(&self, store: BackingStore) -> Result<&Arc<AgentRuntime>, ApplicationError> {
        self.slot(store).ok_or_else(|| {
            ApplicationError::Configuration(format!("no agent is configured for {store}"))
        })
    }

    pub fn configured_stores(&self) -> Vec<BackingStore> {
        BackingStore::ALL.into_iter().filter(|store| self.slot(*store).is_some()).collect()
    }

    /// Runs one turn on `thread_id` under that thread's turn lock.
    ///
    /// A thread belongs to the store that saw its first turn; asking another
    /// store to continue it fails with `ThreadStoreMismatch`. Generated ids
    /// and threads the requested store already holds skip the other stores.
    pub async fn execute(
        &self,
        store: BackingStore,
        query: &str,
        thread_id: &ThreadId,
        origin: ThreadOrigin,
    ) -> Result<AgentResponse, ApplicationError> {
        let runtime = self.route(store)?;
        let _turn = self.turn_locks.acquire(thread_id).await;

        if origin == ThreadOrigin::Supplied && !runtime.holds_thread(thread_id).await? {
            self.ensure_not_pinned_elsewhere(store, thread_id).await?;
        }

        runtime.execute(query, thread_id).await
    }

    /// An unreachable store cannot pin anything, so its failure does not
    /// block turns on the requested store.
    async fn ensure_not_pinned_elsewhere(
        &self,
        store: BackingStore,
        thread_id: &ThreadId,
    ) -> Result<(), ApplicationError> {
        for other in BackingStore::ALL.into_iter().filter(|other| *other != store) {
            let Some(other_runtime) = self.slot(other) else {
                continue;
            };
            match other_runtime.holds_thread(thread_id).await {
                Ok(false) => {}
                Ok(true) => {
                    warn!(
                        event_name = "agent.router.store_mismatch",
                        thread_id = %thread_id,
                        pinned = %other,
                        requested = %store,
                        "thread belongs to a different backing store"
                    );
                    return Err(ApplicationError::ThreadStoreMismatch {
                        thread_id: thread_id.to_string(),
                        pinned: other,
                        requested: store,
                    });
                }
                Err(error) => {
                    warn!(
                        event_name = "agent.router.pin_check_skipped",
                        thread_id = %thread_id,
                        unavailable = %other,
                        requested = %store,
                        error = %error,
                        "could not check whether another store holds the thread"
                    );
                }
            }
        }
        Ok(())
    }
}
