use crate::session::{ChatMessage, MessageRole, Session, SessionKey};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Durable session backend consulted on cache misses.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &SessionKey) -> Result<Option<Session>>;

    /// Replace the stored session with `session`, messages included.
    async fn save(&self, session: &Session) -> Result<()>;

    async fn delete(&self, key: &SessionKey) -> Result<()>;

    /// Delete sessions not updated within `older_than`; returns how many.
    async fn purge_stale(&self, older_than: Duration) -> Result<usize>;
}

fn cutoff(older_than: Duration) -> Result<DateTime<Utc>> {
    let age = chrono::Duration::from_std(older_than).context("purge age out of range")?;
    Ok(Utc::now() - age)
}

/// SQLite-backed store. Blocking calls run on the blocking pool.
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            crate::utils::ensure_dir(parent)?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at: {}", db_path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=3000;
             PRAGMA foreign_keys=ON;",
        )?;
        Self::with_connection(conn).with_context(|| {
            format!(
                "Failed to initialize database schema at: {}",
                db_path.display()
            )
        })
    }

    /// Private in-memory database, for tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, tenant_id)
            );
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, id);
            CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&mut conn)
        })
        .await
        .context("session database task failed")?
    }
}

/// Fixed-width UTC timestamps; SQL string comparison must order them.
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("bad timestamp '{}'", value))?
        .with_timezone(&Utc))
}

fn load_session(conn: &Connection, key: &SessionKey) -> Result<Option<Session>> {
    let row = conn
        .query_row(
            "SELECT id, created_at, updated_at FROM sessions WHERE user_id = ?1 AND tenant_id = ?2",
            params![key.user_id, key.tenant_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((id, created_at, updated_at)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT role, content, timestamp FROM messages WHERE session_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    let mut messages = Vec::new();
    for row in rows {
        let (role, content, timestamp) = row?;
        messages.push(ChatMessage {
            role: role.parse::<MessageRole>()?,
            content,
            timestamp: parse_time(&timestamp)?,
        });
    }

    Ok(Some(Session {
        id,
        user_id: key.user_id.clone(),
        tenant_id: key.tenant_id.clone(),
        messages,
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    }))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<Session>> {
        let key = key.clone();
        self.with_conn(move |conn| load_session(conn, &key)).await
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let session = session.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            // A cleared-then-recreated session gets a new id for the same key
            tx.execute(
                "DELETE FROM sessions WHERE user_id = ?1 AND tenant_id = ?2 AND id != ?3",
                params![session.user_id, session.tenant_id, session.id],
            )?;
            tx.execute(
                "INSERT INTO sessions (id, user_id, tenant_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
                params![
                    session.id,
                    session.user_id,
                    session.tenant_id,
                    format_time(&session.created_at),
                    format_time(&session.updated_at),
                ],
            )?;
            tx.execute(
                "DELETE FROM messages WHERE session_id = ?1",
                params![session.id],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO messages (session_id, role, content, timestamp) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for message in &session.messages {
                    stmt.execute(params![
                        session.id,
                        message.role.as_str(),
                        message.content,
                        format_time(&message.timestamp),
                    ])?;
                }
            }
            tx.commit()?;
            debug!(
                "saved session {} ({} messages)",
                session.key(),
                session.messages.len()
            );
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        let key = key.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM sessions WHERE user_id = ?1 AND tenant_id = ?2",
                params![key.user_id, key.tenant_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn purge_stale(&self, older_than: Duration) -> Result<usize> {
        let cutoff = format_time(&cutoff(older_than)?);
        let purged = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM sessions WHERE updated_at < ?1",
                    params![cutoff],
                )?)
            })
            .await?;
        info!("purged {} stale sessions", purged);
        Ok(purged)
    }
}

/// Non-durable store for tests and `databasePath = ":memory:"`.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> Result<std::sync::MutexGuard<'_, HashMap<SessionKey, Session>>> {
        self.sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("session map lock poisoned: {}", e))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<Session>> {
        Ok(self.sessions()?.get(key).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions()?.insert(session.key(), session.clone());
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        self.sessions()?.remove(key);
        Ok(())
    }

    async fn purge_stale(&self, older_than: Duration) -> Result<usize> {
        let cutoff = cutoff(older_than)?;
        let mut sessions = self.sessions()?;
        let before = sessions.len();
        sessions.retain(|_, s| s.updated_at >= cutoff);
        Ok(before - sessions.len())
    }
}
