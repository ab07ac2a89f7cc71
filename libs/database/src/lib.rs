//! Connection plumbing for the contact cache store.
//!
//! Only Redis is supported. The cache layer in `domain_contacts` talks to
//! Redis through the [`redis::ConnectionManager`] handed out here; the
//! `contacts-sync` binary uses the health helpers for its `health` command.
//!
//! # Features
//!
//! - `redis` (default) - Redis connector, health checks
//! - `config` - `RedisConfig::from_env` via `core_config::FromEnv`
//!
//! # Example
//!
//! ```ignore
//! use database::redis::{connect_with_retry, check_health};
//! use database::common::RetryConfig;
//!
//! let conn = connect_with_retry("redis://127.0.0.1:6379", Some(RetryConfig::new())).await?;
//! check_health(&mut conn.clone()).await?;
//! ```

pub mod common;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
