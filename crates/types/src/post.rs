use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostValidationError {
    #[error("Negative post id: {0}")]
    NegativeId(i32),
}

/// A single post, as served by the remote endpoint and mirrored in the local store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "userId")]
    pub user_id: i32,
    pub id: i32,
    pub title: String,
    pub body: String,
}

impl Post {
    pub fn new(user_id: i32, id: i32, title: impl Into<String>, body: impl Into<String>) -> Self {
        Post {
            user_id,
            id,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Builds a post from nullable store columns. Missing text is read as empty.
    pub fn from_nullable(user_id: i32, id: i32, title: Option<String>, body: Option<String>) -> Self {
        Post {
            user_id,
            id,
            title: title.unwrap_or_default(),
            body: body.unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), PostValidationError> {
        if self.id < 0 {
            return Err(PostValidationError::NegativeId(self.id));
        }
        Ok(())
    }
}
