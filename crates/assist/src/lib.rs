mod assistant;
mod model;

pub use assistant::Assistant;
pub use model::{LanguageModel, OpenRouterModel, DEFAULT_MODEL};
