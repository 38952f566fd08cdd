//! Content module - repository documents, post models and rendering

mod entry;
mod post;
pub mod reading_time;
mod richtext;

pub use entry::{Page, RawEntry};
pub use post::{PostDetail, PostSummary, RichTextBlock, Section, Span};
pub use richtext::RichTextRenderer;
