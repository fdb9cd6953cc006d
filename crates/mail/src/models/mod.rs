//! Domain models exposed to callers

mod preview;

pub use preview::EmailPreview;
