//! HTTP API for uploading PDFs and asking questions about them.
//!
//! - `POST /api/pdf` takes a multipart `pdf` field and indexes the document
//!   under its file name.
//! - `POST /api/chat` takes `{ "query", "collectionName" }` and answers from
//!   that document.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
