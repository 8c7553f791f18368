//! Content extraction adapters.

mod plain_text;

pub use plain_text::PlainTextExtractor;
