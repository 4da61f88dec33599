#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Repository error: {0}")]
    Repository(#[from] postrepo_api::Error),

    #[error("Load failed: {0}")]
    Failed(String),

    #[error("View-model closed")]
    Closed,
}
