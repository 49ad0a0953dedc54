mod json_store;
mod repository;

pub use json_store::{default_templates, quick_followup_defaults, JsonStore};
pub use repository::Storage;
