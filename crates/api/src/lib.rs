pub mod endpoint;
pub mod error;
pub mod local;
pub mod remote;
pub mod repository;

pub use error::{Error, ErrorKind};
pub use local::LocalRepository;
pub use remote::RemoteRepository;
pub use repository::{PostRepository, RepositoryConfig};
