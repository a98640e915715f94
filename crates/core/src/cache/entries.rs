//! Versioned entry storage.
//!
//! A [`CacheStore`] is a handle onto one version namespace of the shared
//! database. Entries are whole-response snapshots keyed by method + URL;
//! every write replaces the full row, so concurrent writers for the same key
//! settle on last-write-wins.

use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

use super::connection::CacheDb;
use super::key::EntryKey;
use crate::Error;
use crate::request::WorkerRequest;

/// A captured response.
///
/// The body is snapshotted once from the network stream, so the stored entry
/// and the value handed back to the caller are independent of the transport.
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header value, if present.
    pub content_type: Option<String>,
    /// Response headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Full body bytes.
    pub body: Bytes,
    /// URL the request was issued for.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// RFC 3339 capture timestamp.
    pub fetched_at: String,
}

impl ResponseSnapshot {
    /// Whether the response status permits caching (exactly 200).
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Whether the response ultimately came from the same origin the
    /// request targeted. Redirected-elsewhere responses fail this check and
    /// are never cached by the static strategy.
    pub fn same_origin(&self, request: &WorkerRequest) -> bool {
        Url::parse(&self.final_url)
            .map(|u| u.origin() == request.url.origin())
            .unwrap_or(false)
    }
}

/// Handle onto one version namespace of the cache database.
#[derive(Clone, Debug)]
pub struct CacheStore {
    db: CacheDb,
    version: String,
}

impl CacheStore {
    /// Open the namespace for `version`. Idempotent; the namespace exists
    /// as soon as the first entry is written into it.
    pub fn open(db: CacheDb, version: &str) -> Self {
        Self { db, version: version.to_string() }
    }

    /// The version tag this handle is scoped to.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The underlying shared database.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Insert or overwrite the snapshot stored under `key`.
    pub async fn put(&self, key: &EntryKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        let version = self.version.clone();
        let row = EntryRow::encode(key, snapshot)?;
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                insert_row(conn, &version, &row)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Exact-key lookup. No partial or prefix matching.
    pub async fn get(&self, key: &EntryKey) -> Result<Option<ResponseSnapshot>, Error> {
        let version = self.version.clone();
        let key_hash = key.hash();
        self.db
            .conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, content_type, headers_json, body, url, final_url, fetched_at
                     FROM entries WHERE version = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![version, key_hash], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((status, content_type, headers_json, body, url, final_url, fetched_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::InvalidInput(format!("corrupt headers_json: {e}")))?;
                        Ok(Some(ResponseSnapshot {
                            status,
                            content_type,
                            headers,
                            body: Bytes::from(body),
                            url,
                            final_url,
                            fetched_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Write a batch of entries in a single transaction.
    ///
    /// Either every entry lands or none does; install pre-population relies
    /// on this to fail atomically.
    pub async fn put_all(&self, entries: &[(EntryKey, ResponseSnapshot)]) -> Result<(), Error> {
        let version = self.version.clone();
        let rows = entries
            .iter()
            .map(|(key, snapshot)| EntryRow::encode(key, snapshot))
            .collect::<Result<Vec<_>, _>>()?;
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    insert_row(&tx, &version, row)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

/// Flattened row ready for binding.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    content_type: Option<String>,
    headers_json: String,
    body: Vec<u8>,
    final_url: String,
    fetched_at: String,
}

impl EntryRow {
    fn encode(key: &EntryKey, snapshot: &ResponseSnapshot) -> Result<Self, Error> {
        let headers_json = serde_json::to_string(&snapshot.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;
        Ok(Self {
            key_hash: key.hash(),
            method: key.method.clone(),
            url: key.url.clone(),
            status: snapshot.status,
            content_type: snapshot.content_type.clone(),
            headers_json,
            body: snapshot.body.to_vec(),
            final_url: snapshot.final_url.clone(),
            fetched_at: snapshot.fetched_at.clone(),
        })
    }
}

fn insert_row(conn: &rusqlite::Connection, version: &str, row: &EntryRow) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO entries (
            version, key_hash, method, url, status, content_type,
            headers_json, body, final_url, fetched_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(version, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            final_url = excluded.final_url,
            fetched_at = excluded.fetched_at",
        params![
            version,
            row.key_hash,
            row.method,
            row.url,
            row.status,
            row.content_type,
            row.headers_json,
            row.body,
            row.final_url,
            row.fetched_at,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot(url: &str, body: &str) -> (EntryKey, ResponseSnapshot) {
        let parsed = Url::parse(url).unwrap();
        let key = EntryKey::new("GET", &parsed);
        let snapshot = ResponseSnapshot {
            status: 200,
            content_type: Some("application/json".to_string()),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::copy_from_slice(body.as_bytes()),
            url: url.to_string(),
            final_url: url.to_string(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        };
        (key, snapshot)
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = CacheStore::open(db, "vendavoa-v1");
        let (key, snapshot) = make_snapshot("http://localhost:8000/cars/42", r#"{"id":42}"#);

        store.put(&key, &snapshot).await.unwrap();

        let cached = store.get(&key).await.unwrap().unwrap();
        assert_eq!(cached.status, 200);
        assert_eq!(cached.body, snapshot.body);
        assert_eq!(cached.headers, snapshot.headers);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = CacheStore::open(db, "vendavoa-v1");
        let (key, _) = make_snapshot("http://localhost:8000/cars/42", "{}");

        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_whole_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = CacheStore::open(db, "vendavoa-v1");
        let (key, first) = make_snapshot("http://localhost:8000/cars/42", r#"{"id":42,"sold":false}"#);
        let (_, second) = make_snapshot("http://localhost:8000/cars/42", r#"{"id":42,"sold":true}"#);

        store.put(&key, &first).await.unwrap();
        store.put(&key, &second).await.unwrap();

        let cached = store.get(&key).await.unwrap().unwrap();
        assert_eq!(cached.body, second.body);
    }

    #[tokio::test]
    async fn test_versions_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = CacheStore::open(db.clone(), "vendavoa-v1");
        let v2 = CacheStore::open(db, "vendavoa-v2");
        let (key, snapshot) = make_snapshot("http://localhost:8000/dashboard", "<html></html>");

        v1.put(&key, &snapshot).await.unwrap();

        assert!(v1.get(&key).await.unwrap().is_some());
        assert!(v2.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_version_unreachable_after() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = CacheStore::open(db.clone(), "vendavoa-v1");
        let new = CacheStore::open(db.clone(), "vendavoa-v2");
        let (key, snapshot) = make_snapshot("http://localhost:8000/", "<html></html>");

        old.put(&key, &snapshot).await.unwrap();
        new.put(&key, &snapshot).await.unwrap();

        let deleted = db.delete_version("vendavoa-v1").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(old.get(&key).await.unwrap().is_none());
        assert!(new.get(&key).await.unwrap().is_some());
        assert_eq!(db.list_versions().await.unwrap(), vec!["vendavoa-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_put_all_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = CacheStore::open(db, "vendavoa-v1");
        let entries = vec![
            make_snapshot("http://localhost:8000/", "<html>shell</html>"),
            make_snapshot("http://localhost:8000/static/css/style.css", "body{}"),
        ];

        store.put_all(&entries).await.unwrap();

        for (key, _) in &entries {
            assert!(store.get(key).await.unwrap().is_some());
        }
    }

    #[test]
    fn test_same_origin() {
        let request = WorkerRequest::get("http://localhost:8000/static/logo.png").unwrap();
        let (_, mut snapshot) = make_snapshot("http://localhost:8000/static/logo.png", "png");
        assert!(snapshot.same_origin(&request));

        snapshot.final_url = "https://cdn.example.com/logo.png".to_string();
        assert!(!snapshot.same_origin(&request));
    }
}
