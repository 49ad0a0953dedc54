pub mod app_service;
pub mod bulk_sender;
pub mod fetch_worker;
