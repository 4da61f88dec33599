pub mod error;
pub mod state;
pub mod viewmodel;

pub use error::Error;
pub use state::{LoadStatus, PostListState};
pub use viewmodel::{Config, ErrorPolicy, PostListViewModel};
