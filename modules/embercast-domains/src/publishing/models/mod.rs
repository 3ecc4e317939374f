pub mod platform_credential;
pub mod publish_attempt;

pub use platform_credential::PlatformCredential;
pub use publish_attempt::PublishAttempt;
