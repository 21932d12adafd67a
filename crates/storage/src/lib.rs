pub mod bind;
pub mod error;
pub mod pool;
pub mod reader;

pub use error::{Result, StorageError};
pub use pool::create_pool;
pub use reader::{malformed_span_policy, PgSpanReader, SpanReader};
