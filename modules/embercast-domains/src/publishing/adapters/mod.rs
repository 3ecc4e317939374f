pub mod linkedin;

pub use linkedin::{build_platform_registry, LinkedInPlatform, PROVIDER_LINKEDIN};
