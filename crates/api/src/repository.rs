use std::sync::Arc;

use async_trait::async_trait;
use postrepo_types::Post;
use tracing::info;

use super::{error::Error, local, local::LocalRepository, remote, remote::RemoteRepository};

/// Read access to posts, independent of where they are stored.
///
/// Implementations must be interchangeable: a caller holding an
/// `Arc<dyn PostRepository>` behaves the same whichever source is wired in.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Fails with [`Error::NotFound`] when the source has no post with this id.
    async fn get_by_id(&self, id: i32) -> Result<Post, Error>;

    /// All posts in source order. An empty source yields an empty vec.
    async fn get_all(&self) -> Result<Vec<Post>, Error>;
}

/// Selects the backing source at composition time.
#[derive(Debug, Clone)]
pub enum RepositoryConfig {
    Remote(remote::Config),
    Local(local::Config),
}

impl RepositoryConfig {
    pub fn build(self) -> Result<Arc<dyn PostRepository>, Error> {
        match self {
            RepositoryConfig::Remote(cfg) => {
                info!("Wiring remote repository: {}", cfg.base_url());
                Ok(Arc::new(RemoteRepository::new(Some(cfg))?))
            }
            RepositoryConfig::Local(cfg) => {
                info!("Wiring local repository");
                Ok(Arc::new(LocalRepository::open(cfg)?))
            }
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig::Remote(remote::Config::default())
    }
}
