pub mod entity_list;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod schema;

pub use handlers::{AppState, SERVICE_NAME, router};
pub use models::{Language, LanguageModel, ModelCatalog};
