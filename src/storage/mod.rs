//! Local disk storage module
//!
//! Handles image uploads under the public uploads directory.

mod uploads;

pub use uploads::{MAX_UPLOAD_BYTES, UploadStorage, sanitize_file_name};
