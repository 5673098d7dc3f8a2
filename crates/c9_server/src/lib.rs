//! # C9 Server
//!
//! HTTP resource server for the C9 object repository.
//!
//! This crate provides:
//! - `/blob`: opaque binary objects, addressed by id
//! - `/user` and `/group`: JSON resources, addressed by id or name
//! - Entity tags on every representation and `If-Match` on every update
//! - TOML configuration and graceful shutdown
//!
//! # Status codes
//!
//! | condition                       | status |
//! |---------------------------------|--------|
//! | wrong media type                | 415    |
//! | malformed JSON, invalid field   | 400    |
//! | name already taken              | 409    |
//! | update without `If-Match`       | 428    |
//! | update with a stale `If-Match`  | 412    |
//! | unknown id, name or path        | 404    |
//! | method not served by the route  | 405    |

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod config;
mod error;
pub mod handlers;
pub mod model;
mod router;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handlers::AppState;
pub use model::{BlobRef, Group, GroupPatch, User, UserPatch};
pub use router::build_router;
pub use server::C9Server;
