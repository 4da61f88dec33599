use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use postrepo_types::Post;
use rusqlite::Connection;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::{error::Error, repository::PostRepository};
use store::{StoreInner, StoreRequest};

pub mod schema;
mod store;

/// Configuration for the local repository.
/// path: Database file. None opens a private in-memory store. (default: None)
/// busy_timeout_ms: How long to wait on a locked database file. (default: 5000)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
}

impl Config {
    const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

    pub fn new(path: Option<PathBuf>, busy_timeout_ms: Option<u64>) -> Self {
        Config {
            path,
            busy_timeout_ms,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(path.into()), None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.unwrap_or(Self::DEFAULT_BUSY_TIMEOUT_MS))
    }
}

/// Posts mirrored in a local SQLite table.
///
/// The connection lives on a dedicated store thread and is only reached
/// through a request channel, so reads and writes never interleave. Dropping
/// the repository closes the channel and releases the connection.
#[derive(Debug)]
pub struct LocalRepository {
    sender: mpsc::Sender<StoreRequest>,
}

impl LocalRepository {
    const CHANNEL_CAPACITY: usize = 100;

    pub fn open(cfg: Config) -> Result<Self, Error> {
        let started_at = Instant::now();
        let mut conn = match cfg.path() {
            Some(path) => {
                info!("Opening post store at {}", path.display());
                Connection::open(path)?
            }
            None => {
                info!("Opening in-memory post store");
                Connection::open_in_memory()?
            }
        };
        conn.busy_timeout(cfg.busy_timeout())?;
        schema::ensure_schema(&mut conn)?;

        let (tx, rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        std::thread::Builder::new()
            .name("post-store".to_string())
            .spawn(move || StoreInner::new(conn).run(rx))?;
        info!(
            "Post store ready in {} ms",
            started_at.elapsed().as_millis()
        );
        Ok(Self { sender: tx })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Self::open(Config::default())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, Error>>) -> StoreRequest,
    ) -> Result<T, Error> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::StoreClosed)?;
        rx.await.map_err(|_| Error::StoreClosed)?
    }

    /// Deletes every row in one transaction. Returns the number of rows removed.
    pub async fn clear(&self) -> Result<usize, Error> {
        let removed = self.request(StoreRequest::Clear).await?;
        info!("Cleared {} posts from store", removed);
        Ok(removed)
    }

    /// Inserts or replaces `posts` in one transaction; nothing is written if any post is invalid.
    pub async fn store_all(&self, posts: &[Post]) -> Result<usize, Error> {
        let posts = posts.to_vec();
        self.request(|tx| StoreRequest::StoreAll(posts, tx)).await
    }

    /// Copies everything `source` currently serves into this store.
    pub async fn mirror_from(&self, source: &dyn PostRepository) -> Result<usize, Error> {
        let posts = source.get_all().await?;
        let stored = self.store_all(&posts).await?;
        info!("Mirrored {} posts into store", stored);
        Ok(stored)
    }
}

#[async_trait]
impl PostRepository for LocalRepository {
    async fn get_by_id(&self, id: i32) -> Result<Post, Error> {
        debug!("Store lookup: {}", id);
        self.request(|tx| StoreRequest::GetById(id, tx)).await
    }

    async fn get_all(&self) -> Result<Vec<Post>, Error> {
        self.request(StoreRequest::GetAll).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn posts() -> Vec<Post> {
        vec![
            Post::new(1, 3, "third", "c"),
            Post::new(1, 1, "first", "a"),
            Post::new(2, 2, "", ""),
        ]
    }

    #[test]
    fn test_config_defaults() {
        let cfg = Config::default();
        assert!(cfg.path().is_none());
        assert_eq!(cfg.busy_timeout(), Duration::from_secs(5));
        assert_eq!(
            Config::file("/tmp/posts.db").path(),
            Some(Path::new("/tmp/posts.db"))
        );
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_empty_store() {
        let repo = LocalRepository::open_in_memory().unwrap();
        assert!(repo.get_all().await.unwrap().is_empty());
        let err = repo.get_by_id(1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(1)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_store_and_read() {
        let repo = LocalRepository::open_in_memory().unwrap();
        assert_eq!(repo.store_all(&posts()).await.unwrap(), 3);

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(repo.get_by_id(3).await.unwrap(), Post::new(1, 3, "third", "c"));
        assert!(repo.get_by_id(4).await.unwrap_err().is_not_found());
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_clear_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.db");

        let repo = LocalRepository::open(Config::file(&path)).unwrap();
        repo.store_all(&posts()).await.unwrap();
        assert_eq!(repo.clear().await.unwrap(), 3);
        assert!(repo.get_all().await.unwrap().is_empty());
        drop(repo);

        let reopened = LocalRepository::open(Config::file(&path)).unwrap();
        assert!(reopened.get_all().await.unwrap().is_empty());
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.db");

        let repo = LocalRepository::open(Config::file(&path)).unwrap();
        repo.store_all(&posts()).await.unwrap();
        drop(repo);

        let reopened = LocalRepository::open(Config::file(&path)).unwrap();
        assert_eq!(reopened.get_all().await.unwrap().len(), 3);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_null_columns_written_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.db");
        let repo = LocalRepository::open(Config::file(&path)).unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute(
            "INSERT INTO posts (userId, id, title, body) VALUES (5, 8, NULL, NULL);",
            [],
        )
        .unwrap();

        assert_eq!(repo.get_by_id(8).await.unwrap(), Post::new(5, 8, "", ""));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_concurrent_callers_share_one_store() {
        let repo = std::sync::Arc::new(LocalRepository::open_in_memory().unwrap());
        repo.store_all(&posts()).await.unwrap();

        let mut set = tokio::task::JoinSet::new();
        for id in 1..=3 {
            let repo = repo.clone();
            set.spawn(async move { repo.get_by_id(id).await.map(|p| p.id) });
        }
        let mut ids = vec![];
        while let Some(res) = set.join_next().await {
            ids.push(res.unwrap().unwrap());
        }
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
