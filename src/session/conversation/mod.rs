use crate::config::SessionConfig;
use crate::errors::ParleyError;
use crate::session::store::SessionStore;
use crate::session::{ChatMessage, Session, SessionKey};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Upper bound on how often writes sweep idle sessions out of the cache.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Per-key state. `loaded` is false until the durable store has been
/// consulted; afterwards `session` is authoritative (`None` = no history).
struct SlotState {
    loaded: bool,
    session: Option<Session>,
    last_access: Instant,
}

struct Slot {
    state: tokio::sync::Mutex<SlotState>,
}

impl Slot {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: tokio::sync::Mutex::new(SlotState {
                loaded: false,
                session: None,
                last_access: Instant::now(),
            }),
        })
    }
}

/// Bounded, TTL'd conversation history per `(userId, tenantId)`.
///
/// Two tiers: an LRU of per-key slots in front of a durable [`SessionStore`].
/// Writers to one key are serialized by the slot's async mutex, which is held
/// across the durable write, so stored order equals arrival order. Evicting a
/// slot never touches durable data. Slots still held by an in-flight request
/// stay reachable through a weak map, so a writer and a concurrent reader
/// never see two copies of one session. Writes sweep idle slots out of the
/// cache at most once per minute (or per TTL, if shorter).
pub struct ConversationStore {
    cache: Mutex<LruCache<SessionKey, Arc<Slot>>>,
    live: Mutex<HashMap<SessionKey, Weak<Slot>>>,
    store: Arc<dyn SessionStore>,
    max_messages: usize,
    history_limit: usize,
    ttl: Duration,
    last_sweep: Mutex<Instant>,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_cached_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            live: Mutex::new(HashMap::new()),
            store,
            max_messages: config.max_messages.max(1),
            history_limit: config.history_limit,
            ttl: config.ttl(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Idle time after which a cached session may be evicted.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Number of sessions currently cached.
    pub fn cached(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn slot(&self, key: &SessionKey) -> Result<Arc<Slot>, ParleyError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| ParleyError::Session("session cache lock poisoned".into()))?;
        if let Some(slot) = cache.get(key) {
            return Ok(slot.clone());
        }

        let mut live = self
            .live
            .lock()
            .map_err(|_| ParleyError::Session("session slot map lock poisoned".into()))?;
        let slot = match live.get(key).and_then(Weak::upgrade) {
            Some(slot) => slot,
            None => {
                let slot = Slot::new();
                live.insert(key.clone(), Arc::downgrade(&slot));
                slot
            }
        };
        if live.len() > cache.cap().get().saturating_mul(2) {
            live.retain(|_, weak| weak.strong_count() > 0);
        }
        if let Some((evicted, _)) = cache.push(key.clone(), slot.clone())
            && evicted != *key
        {
            debug!("evicted session {} from cache", evicted);
        }
        Ok(slot)
    }

    async fn ensure_loaded(
        &self,
        key: &SessionKey,
        state: &mut SlotState,
    ) -> Result<(), ParleyError> {
        if !state.loaded {
            let session = self
                .store
                .load(key)
                .await
                .map_err(|e| ParleyError::Session(format!("failed to load {}: {:#}", key, e)))?;
            state.session = session.map(|mut s| {
                if s.messages.len() > self.max_messages {
                    let excess = s.messages.len() - self.max_messages;
                    s.messages.drain(..excess);
                }
                s
            });
            state.loaded = true;
        }
        state.last_access = Instant::now();
        Ok(())
    }

    /// The most recent `limit` messages (default `session.historyLimit`),
    /// oldest first.
    pub async fn get_history(
        &self,
        user_id: &str,
        tenant_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChatMessage>, ParleyError> {
        let key = SessionKey::new(user_id, tenant_id);
        let slot = self.slot(&key)?;
        let mut state = slot.state.lock().await;
        self.ensure_loaded(&key, &mut state).await?;
        let limit = limit.unwrap_or(self.history_limit);
        Ok(state
            .session
            .as_ref()
            .map(|s| s.recent(limit).to_vec())
            .unwrap_or_default())
    }

    /// Append, trim to `maxMessages` (oldest first) and persist before
    /// releasing the key.
    pub async fn add_message(
        &self,
        user_id: &str,
        tenant_id: &str,
        message: ChatMessage,
    ) -> Result<(), ParleyError> {
        self.add_messages(user_id, tenant_id, vec![message]).await
    }

    /// Append several messages as one unit, so a request's user and
    /// assistant turns stay adjacent under concurrent writers.
    pub async fn add_messages(
        &self,
        user_id: &str,
        tenant_id: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<(), ParleyError> {
        self.sweep_if_due();
        let key = SessionKey::new(user_id, tenant_id);
        let slot = self.slot(&key)?;
        let mut state = slot.state.lock().await;
        self.ensure_loaded(&key, &mut state).await?;

        let session = state.session.get_or_insert_with(|| Session::new(&key));
        for message in messages {
            session.push(message, self.max_messages);
        }
        let snapshot = session.clone();

        self.store.save(&snapshot).await.map_err(|e| {
            warn!("failed to persist session {}: {:#}", key, e);
            ParleyError::Session(format!("failed to persist {}", key))
        })
    }

    /// Delete the session from both tiers.
    pub async fn clear_history(&self, user_id: &str, tenant_id: &str) -> Result<(), ParleyError> {
        let key = SessionKey::new(user_id, tenant_id);
        let slot = self.slot(&key)?;
        let mut state = slot.state.lock().await;
        self.store
            .delete(&key)
            .await
            .map_err(|e| ParleyError::Session(format!("failed to clear {}: {:#}", key, e)))?;
        state.session = None;
        state.loaded = true;
        state.last_access = Instant::now();
        debug!("cleared session {}", key);
        Ok(())
    }

    fn sweep_if_due(&self) {
        let interval = SWEEP_INTERVAL.min(self.ttl);
        {
            let Ok(mut last) = self.last_sweep.lock() else {
                return;
            };
            if last.elapsed() < interval {
                return;
            }
            *last = Instant::now();
        }
        self.evict_idle();
    }

    /// Drop cached sessions idle for longer than the TTL. Durable data is
    /// untouched; slots locked by an in-flight request are skipped.
    pub fn evict_idle(&self) -> usize {
        let Ok(mut cache) = self.cache.lock() else {
            return 0;
        };
        let idle: Vec<SessionKey> = cache
            .iter()
            .filter(|(_, slot)| {
                slot.state
                    .try_lock()
                    .is_ok_and(|state| state.last_access.elapsed() >= self.ttl)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &idle {
            cache.pop(key);
        }
        if !idle.is_empty() {
            debug!("evicted {} idle sessions", idle.len());
        }
        idle.len()
    }
}

#[cfg(test)]
mod tests;
