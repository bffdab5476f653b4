//! HTTP protocol layer module
//!
//! Response builders, CORS, conditional requests, byte ranges and content
//! types. Nothing in here knows about routing.

pub mod cache;
pub mod cors;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_400_response, build_403_response, build_404_response,
    build_413_response, build_416_response, build_500_response, build_moved_response,
    build_redirect_response_with_code, build_success_response,
};
