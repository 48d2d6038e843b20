//! Delivery of readings to the backend

pub mod http;
pub mod traits;

pub use http::HttpUploader;
pub use traits::{ReadingSink, UploadError};
