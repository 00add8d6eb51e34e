mod store;
mod transfer;

pub use store::{ProjectStore, StoreState};
pub use transfer::EXPORT_FILE_NAME;
