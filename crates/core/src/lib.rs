pub mod entities;
pub mod error;
pub mod provider;
pub mod validation;

pub use error::{ErrorKind, HubError, HubResult};
pub use provider::StorageProvider;
