//! HTTP server for restbay.
//!
//! Maps the HEAD/GET/POST/DELETE surface of a restic-style REST backend onto
//! the blob-store engine in `restbay-store`: an ordered route table extracts
//! (repo, type, name), the policy layer enforces private-repo and
//! append-only rules, and the content module delivers bodies with
//! single-range support. The transport itself (sockets, headers, TLS
//! termination) is axum/hyper's business.

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod handler;
pub mod routes;
pub mod server;

pub use auth::Identity;
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use handler::{ServerContext, MIME_V1, MIME_V2};
pub use server::{build_router, RestServer};
