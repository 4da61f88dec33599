use std::sync::{Arc, Mutex, PoisonError};

use postrepo_api::{PostRepository, RepositoryConfig};
use postrepo_types::Post;
use tokio::sync::{
    oneshot::{self, error::TryRecvError},
    watch,
};
use tracing::{debug, error, info};

use super::{
    error::Error,
    state::{LoadStatus, PostListState},
};

/// What a failed load publishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Publish `LoadStatus::Failed` with the error message.
    #[default]
    Propagate,
    /// Log the error and publish an empty `Loaded` list.
    Suppress,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub error_policy: Option<ErrorPolicy>,
}

impl Config {
    const DEFAULT_ERROR_POLICY: ErrorPolicy = ErrorPolicy::Propagate;

    pub fn new(error_policy: Option<ErrorPolicy>) -> Config {
        Config { error_policy }
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy.unwrap_or(Self::DEFAULT_ERROR_POLICY)
    }
}

/// Holds the post list a screen renders and loads it once on activation.
///
/// State is published through a watch channel: [`subscribe`](Self::subscribe)
/// for continuous updates, [`load`](Self::load) for a one-shot result.
/// Dropping the view-model abandons an in-flight fetch.
pub struct PostListViewModel {
    cfg: Config,
    repo: Mutex<Arc<dyn PostRepository>>,
    state_tx: Arc<watch::Sender<PostListState>>,
    kill_switch: Mutex<Option<oneshot::Sender<()>>>,
}

impl PostListViewModel {
    pub fn new(repo: Arc<dyn PostRepository>, cfg: Config) -> Self {
        let (state_tx, _) = watch::channel(PostListState::default());
        PostListViewModel {
            cfg,
            repo: Mutex::new(repo),
            state_tx: Arc::new(state_tx),
            kill_switch: Mutex::new(None),
        }
    }

    pub fn from_config(repo_cfg: RepositoryConfig, cfg: Config) -> Result<Self, Error> {
        Ok(Self::new(repo_cfg.build()?, cfg))
    }

    pub fn subscribe(&self) -> watch::Receiver<PostListState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PostListState {
        self.state_tx.borrow().clone()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state_tx.borrow().posts.clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.state_tx.borrow().status.clone()
    }

    /// Replaces the wired repository. Has no effect once activated.
    pub fn set_repository(&self, repo: Arc<dyn PostRepository>) {
        *self.repo.lock().unwrap_or_else(PoisonError::into_inner) = repo;
    }

    /// Starts the load on first call and returns `true`; later calls return `false`.
    /// Outside a Tokio runtime nothing happens and the state stays `Idle`.
    pub fn activate(&self) -> bool {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Cannot activate post list: {}", e);
                return false;
            }
        };
        let triggered = self.state_tx.send_if_modified(|state| {
            if state.status == LoadStatus::Idle {
                state.status = LoadStatus::Loading;
                true
            } else {
                false
            }
        });
        if !triggered {
            debug!("Post list already activated");
            return false;
        }

        info!("Activating post list");
        let repo = self
            .repo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let (kill_tx, mut kill_rx) = oneshot::channel();
        *self
            .kill_switch
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(kill_tx);
        let state_tx = self.state_tx.clone();
        let policy = self.cfg.error_policy();
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = &mut kill_rx => debug!("Post list disposed before the load finished"),
                result = repo.get_all() => {
                    // The view-model may have been dropped while the fetch resolved.
                    if matches!(kill_rx.try_recv(), Err(TryRecvError::Empty)) {
                        Self::publish(&state_tx, policy, result);
                    } else {
                        debug!("Post list disposed, dropping load result");
                    }
                }
            }
        });
        true
    }

    /// Activates if needed and waits for the load to settle.
    pub async fn load(&self) -> Result<Vec<Post>, Error> {
        self.activate();
        let mut rx = self.subscribe();
        let state = rx
            .wait_for(|state| state.status.is_settled())
            .await
            .map_err(|_| Error::Closed)?;
        match &state.status {
            LoadStatus::Failed(message) => Err(Error::Failed(message.clone())),
            _ => Ok(state.posts.clone()),
        }
    }

    fn publish(
        state_tx: &watch::Sender<PostListState>,
        policy: ErrorPolicy,
        result: Result<Vec<Post>, postrepo_api::Error>,
    ) {
        let next = match (result, policy) {
            (Ok(posts), _) => {
                info!("Loaded {} posts", posts.len());
                PostListState {
                    posts,
                    status: LoadStatus::Loaded,
                }
            }
            (Err(e), ErrorPolicy::Propagate) => {
                error!("Error loading posts: {}", e);
                PostListState {
                    posts: vec![],
                    status: LoadStatus::Failed(e.to_string()),
                }
            }
            (Err(e), ErrorPolicy::Suppress) => {
                error!("Error loading posts, showing none: {}", e);
                PostListState {
                    posts: vec![],
                    status: LoadStatus::Loaded,
                }
            }
        };
        state_tx.send_replace(next);
    }
}

impl Drop for PostListViewModel {
    fn drop(&mut self) {
        if let Some(kill_switch) = self
            .kill_switch
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = kill_switch.send(());
        }
    }
}
