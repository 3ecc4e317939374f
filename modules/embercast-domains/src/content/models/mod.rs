pub mod content_item;
pub mod signal;

pub use content_item::ContentItem;
pub use signal::{Signal, SourceWindowCount, WindowStats};
