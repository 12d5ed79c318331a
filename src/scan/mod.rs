pub mod api;
pub mod cache;
pub mod client;

pub use api::{ClassificationApi, HttpClassificationApi};
pub use cache::ResultCache;
pub use client::ScanClient;
