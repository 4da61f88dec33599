use postrepo_types::Post;

/// Where a view-model is in its one-shot load.
/// Only `Idle` can move to `Loading`; `Loaded` and `Failed` are final.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

impl LoadStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadStatus::Loaded | LoadStatus::Failed(_))
    }
}

/// The state a presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostListState {
    pub posts: Vec<Post>,
    pub status: LoadStatus,
}

impl PostListState {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
