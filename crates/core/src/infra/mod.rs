pub mod csv_source;
pub mod fetcher;
pub mod journal;
pub mod metrics;
pub mod output;
pub mod rules;
pub mod storage;
pub mod template;
pub mod text_normalizer;
pub mod url_list;
