pub mod framing;
pub mod request;
pub mod response;
pub mod sink;

// Re-exports for convenience
pub use request::RequestTimeout;
pub use response::HttpResponse;
pub use sink::{BodySink, HeaderCollector, HeaderSink, ResponseBuffer};
