//! # Feedline
//!
//! Session-aware API client for the feedline social backend.
//!
//! ## Overview
//!
//! Feedline talks to a REST backend serving feeds, posts, comments, follows
//! and notifications. Its core is the session: a short-lived access token held
//! in memory, a rotating refresh token kept in encrypted storage, and the
//! machinery that keeps the two fresh while many requests run at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ApiClient                            │
//! │  Attaches the bearer token, refreshes once on 401, replays  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SessionManager                         │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                   │
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │   TokenStore    │ │    Refresh      │ │    Renewal      │
//! │                 │ │  Coordinator    │ │   Scheduler     │
//! │ • Access token  │ │ • Single flight │ │ • Timer before  │
//! │ • Subscribers   │ │ • Waiter set    │ │   expiry        │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!                              │
//!                              ▼
//!                    ┌─────────────────┐
//!                    │ CredentialStore │
//!                    │ • Refresh token │
//!                    │ • AES-256-GCM   │
//!                    └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] — Request pipeline and backend endpoints
//! - [`auth`] — Durable refresh token storage
//! - [`config`] — Configuration management
//! - [`error`] — Error taxonomy
//! - [`models`] — Data models (User, Post, Comment, Notification)
//! - [`session`] — Token store, refresh coordination, renewal
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use feedline::{ApiClient, Config, EncryptedFileStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let client = ApiClient::from_config(&config, Arc::new(EncryptedFileStore::open()?))?;
//!
//! if !client.restore_session().await {
//!     client.login("linh", "hunter2").await?;
//! }
//! let feed = client.feed(None, 10).await?;
//! println!("{} posts", feed.posts.len());
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/feedline/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::significant_drop_tightening)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod paths;
pub mod session;

// Re-export main types for convenience
pub use api::{ApiClient, ApiClientBuilder, RequestOptions};
pub use auth::{CredentialStore, EncryptedFileStore, MemoryStore};
pub use config::{Config, Environment};
pub use error::{Error, Result};
pub use session::{AccessToken, SessionConfig, SessionManager, Subscription, TokenGrant};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
