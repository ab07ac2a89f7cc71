//! Contacts Sync CLI
//!
//! Operator tool over the contacts and vector domains: sync an owner's
//! Google contacts, inspect or clear their cache entry, index them into the
//! vector store and run similarity searches.
//!
//! ## Architecture
//!
//! ```text
//! Cli (clap)
//!   ↓
//! App::bootstrap (explicit construction, no globals)
//!   ↓
//! ┌────────────────────┬──────────────────────┐
//! │ ContactSyncService │  RetrievalService    │
//! │   ContactCache     │  QdrantVectorStore   │
//! │ Redis | in-memory  │  OpenAIProvider      │
//! └────────────────────┴──────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `cli`: argument definitions
//! - `config`: environment-driven settings
//! - `app`: dependency construction and command execution

pub mod app;
pub mod cli;
pub mod config;

pub use app::{App, run};
pub use cli::{Cli, Command};
pub use config::Config;
