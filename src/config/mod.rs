pub mod env;
mod loader;

pub use env::{
    ApiConfig, AppConfig, CacheConfig, DirectoryConfig, GuardConfig, LoggingConfig, RetryPolicy,
    TrustConfig,
};
pub use loader::load_config;
