use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "contacts-sync")]
#[command(about = "Sync Google contacts, manage their cache and search the vector index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Fetch an owner's contacts, serving the cache when fresh
    Sync {
        /// Owner identity used as the cache key
        #[arg(long)]
        owner: String,

        /// Google OAuth access token for the owner
        #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        /// Skip the cache read and always call upstream
        #[arg(short, long)]
        force: bool,
    },

    /// Show the fresh cache entry for an owner
    Cached {
        #[arg(long)]
        owner: String,
    },

    /// Delete the cache entry for an owner
    Clear {
        #[arg(long)]
        owner: String,
    },

    /// Embed an owner's cached contacts into the vector store
    Index {
        #[arg(long)]
        owner: String,

        /// Defaults to VECTOR_DEFAULT_NAMESPACE
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Similarity search over one owner's indexed contacts
    Search {
        query: String,

        #[arg(long)]
        owner: String,

        /// Defaults to VECTOR_DEFAULT_TOP_K
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Best-effort sample of one owner's indexed contacts
    Sample {
        #[arg(long)]
        owner: String,

        #[arg(short, long)]
        namespace: Option<String>,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Check Redis and the vector store
    Health,
}
