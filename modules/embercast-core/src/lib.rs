pub mod config;
pub mod deps;
pub mod error;
pub mod platform;
pub mod types;

pub use config::AppConfig;
pub use deps::ServerDeps;
pub use error::ErrorBody;
pub use platform::{
    Credential, PlatformClient, PlatformRegistry, PlatformResponse, RefreshedTokens, RenderedPost,
};
pub use types::*;
