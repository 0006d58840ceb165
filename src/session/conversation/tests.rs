use super::*;
use crate::session::MessageRole;
use crate::session::store::MemorySessionStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

fn config(max_messages: usize, max_cached: usize) -> SessionConfig {
    SessionConfig {
        max_messages,
        max_cached_sessions: max_cached,
        ttl_hours: 1,
        history_limit: 10,
        ..SessionConfig::default()
    }
}

fn conversation(max_messages: usize, max_cached: usize) -> (ConversationStore, Arc<MemorySessionStore>) {
    let durable = Arc::new(MemorySessionStore::new());
    let store = ConversationStore::new(durable.clone(), &config(max_messages, max_cached));
    (store, durable)
}

fn contents(messages: &[ChatMessage]) -> Vec<String> {
    messages.iter().map(|m| m.content.clone()).collect()
}

#[tokio::test]
async fn test_history_is_bounded_oldest_first() {
    let (store, durable) = conversation(5, 10);
    for i in 0..8 {
        store
            .add_message("u1", "acme", ChatMessage::user(format!("m{}", i)))
            .await
            .unwrap();
    }
    let history = store.get_history("u1", "acme", Some(100)).await.unwrap();
    assert_eq!(contents(&history), vec!["m3", "m4", "m5", "m6", "m7"]);

    let saved = durable
        .load(&SessionKey::new("u1", "acme"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.messages.len(), 5);
}

#[tokio::test]
async fn test_default_history_limit() {
    let (store, _) = conversation(50, 10);
    for i in 0..15 {
        store
            .add_message("u1", "acme", ChatMessage::user(format!("m{}", i)))
            .await
            .unwrap();
    }
    let history = store.get_history("u1", "acme", None).await.unwrap();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].content, "m5");
}

#[tokio::test]
async fn test_unknown_session_is_empty() {
    let (store, _) = conversation(5, 10);
    assert!(store.get_history("nobody", "acme", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sessions_isolated_by_tenant() {
    let (store, _) = conversation(5, 10);
    store
        .add_message("u1", "acme", ChatMessage::user("acme only"))
        .await
        .unwrap();
    assert!(store.get_history("u1", "globex", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_eviction_keeps_durable_data() {
    let (store, _) = conversation(10, 1);
    store
        .add_message("u1", "acme", ChatMessage::user("first"))
        .await
        .unwrap();
    store
        .add_message("u2", "acme", ChatMessage::user("second"))
        .await
        .unwrap();
    assert_eq!(store.cached(), 1);

    let history = store.get_history("u1", "acme", None).await.unwrap();
    assert_eq!(contents(&history), vec!["first"]);
}

#[tokio::test]
async fn test_clear_history_removes_both_tiers() {
    let (store, durable) = conversation(10, 10);
    let key = SessionKey::new("u1", "acme");
    store
        .add_message("u1", "acme", ChatMessage::user("hello"))
        .await
        .unwrap();
    store.clear_history("u1", "acme").await.unwrap();

    assert!(store.get_history("u1", "acme", None).await.unwrap().is_empty());
    assert!(durable.load(&key).await.unwrap().is_none());

    store
        .add_message("u1", "acme", ChatMessage::user("again"))
        .await
        .unwrap();
    assert_eq!(
        contents(&store.get_history("u1", "acme", None).await.unwrap()),
        vec!["again"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_evict_idle_after_ttl() {
    let (store, _) = conversation(10, 10);
    store
        .add_message("u1", "acme", ChatMessage::user("hello"))
        .await
        .unwrap();
    assert_eq!(store.ttl(), Duration::from_secs(3600));
    assert_eq!(store.evict_idle(), 0);

    tokio::time::advance(Duration::from_secs(3601)).await;
    assert_eq!(store.evict_idle(), 1);
    assert_eq!(store.cached(), 0);

    // Reloaded from the durable tier
    let history = store.get_history("u1", "acme", None).await.unwrap();
    assert_eq!(contents(&history), vec!["hello"]);
}

#[tokio::test(start_paused = true)]
async fn test_writes_sweep_idle_sessions() {
    let (store, _) = conversation(10, 10);
    store
        .add_message("u1", "acme", ChatMessage::user("hello"))
        .await
        .unwrap();
    store
        .add_message("u2", "acme", ChatMessage::user("hi"))
        .await
        .unwrap();
    assert_eq!(store.cached(), 2);

    tokio::time::advance(Duration::from_secs(3601)).await;
    store
        .add_message("u3", "acme", ChatMessage::user("morning"))
        .await
        .unwrap();
    assert_eq!(store.cached(), 1);

    // Swept sessions come back from the durable tier
    let history = store.get_history("u1", "acme", None).await.unwrap();
    assert_eq!(contents(&history), vec!["hello"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_keep_per_sender_order() {
    let (store, durable) = conversation(1000, 2);
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for task in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for seq in 0..25 {
                store
                    .add_message("u1", "acme", ChatMessage::user(format!("{}:{}", task, seq)))
                    .await
                    .unwrap();
                // Churn the cache with another key
                store
                    .add_message(&format!("noise{}", task), "acme", ChatMessage::user("x"))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let history = store.get_history("u1", "acme", Some(1000)).await.unwrap();
    assert_eq!(history.len(), 200);
    for task in 0..8 {
        let seqs: Vec<u32> = history
            .iter()
            .filter_map(|m| m.content.split_once(':'))
            .filter(|(t, _)| *t == task.to_string())
            .map(|(_, s)| s.parse().unwrap())
            .collect();
        assert_eq!(seqs, (0..25).collect::<Vec<u32>>());
    }

    let saved = durable
        .load(&SessionKey::new("u1", "acme"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contents(&saved.messages), contents(&history));
}

struct FailingStore {
    fail: AtomicBool,
    inner: MemorySessionStore,
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn load(&self, key: &SessionKey) -> anyhow::Result<Option<Session>> {
        self.inner.load(key).await
    }

    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.save(session).await
    }

    async fn delete(&self, key: &SessionKey) -> anyhow::Result<()> {
        self.inner.delete(key).await
    }

    async fn purge_stale(&self, older_than: Duration) -> anyhow::Result<usize> {
        self.inner.purge_stale(older_than).await
    }
}

#[tokio::test]
async fn test_persist_failure_is_reported() {
    let durable = Arc::new(FailingStore {
        fail: AtomicBool::new(true),
        inner: MemorySessionStore::new(),
    });
    let store = ConversationStore::new(durable.clone(), &config(10, 10));
    let err = store
        .add_message("u1", "acme", ChatMessage::user("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, ParleyError::Session(_)));

    durable.fail.store(false, Ordering::SeqCst);
    store
        .add_message("u1", "acme", ChatMessage::user("again"))
        .await
        .unwrap();
    let saved = durable
        .load(&SessionKey::new("u1", "acme"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contents(&saved.messages), vec!["hello", "again"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exchanges_stay_adjacent() {
    let (store, _) = conversation(500, 10);
    let store = Arc::new(store);
    let mut tasks = Vec::new();
    for t in 0..6 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..10 {
                store
                    .add_messages(
                        "u1",
                        "acme",
                        vec![
                            ChatMessage::user(format!("q{}-{}", t, i)),
                            ChatMessage::assistant(format!("a{}-{}", t, i)),
                        ],
                    )
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    let history = store.get_history("u1", "acme", Some(500)).await.unwrap();
    assert_eq!(history.len(), 120);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[1].role, MessageRole::Assistant);
        assert_eq!(pair[0].content[1..], pair[1].content[1..]);
    }
}
