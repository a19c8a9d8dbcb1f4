//! API layer
//!
//! HTTP handlers for:
//! - Site document read/write
//! - Image uploads
//! - Contact-form relay
//! - Generative-AI proxy
//! - Metrics (Prometheus)

mod contact;
mod gemini;
pub mod metrics;
mod site;
mod upload;

pub use contact::submit_contact;
pub use gemini::proxy_gemini;
pub use metrics::metrics_router;
pub use site::{get_site, save_site};
pub use upload::upload;
