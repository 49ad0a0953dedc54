pub mod bulk;
pub mod error;
pub mod fetch;
pub mod generation;
pub mod settings;
pub mod stats;
pub mod types;

mod serde_tests;
