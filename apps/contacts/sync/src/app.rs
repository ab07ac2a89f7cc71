//! Process bootstrap and command execution
//!
//! Every dependency is built once in [`App::bootstrap`] and passed down
//! explicitly; nothing here is a process-wide singleton.

use std::sync::Arc;

use clap::Parser;
use core_config::FromEnv;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::redis::{ConnectionManager, check_health_detailed, connect_with_retry};
use domain_contacts::{
    CacheBackend, CacheEntry, ContactCache, ContactIndexer, ContactSyncService,
    GoogleContactsClient, InMemoryCacheBackend, RedisCacheBackend, SyncOutcome,
};
use domain_vector::{
    EmbeddingModel, EmbeddingProvider, OpenAIProvider, QdrantVectorStore, QueryResult,
    RetrievalService,
};
use eyre::{Result, WrapErr, eyre};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::cli::{Cli, Command};
use crate::config::Config;

/// Parse arguments, bootstrap and run one command, printing JSON to stdout
pub async fn run() -> Result<()> {
    install_color_eyre();
    let cli = Cli::parse();

    let config = Config::from_env().wrap_err("Failed to load configuration")?;
    init_tracing(&config.environment);

    let app = App::bootstrap(config).await?;
    let output = app.execute(cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub struct App {
    redis: Option<ConnectionManager>,
    sync: ContactSyncService,
    google: GoogleContactsClient,
    retrieval: Arc<RetrievalService<QdrantVectorStore>>,
    config: Config,
}

impl App {
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let redis = match &config.redis {
            Some(redis_config) => {
                match connect_with_retry(&redis_config.build_url(), None).await {
                    Ok(manager) => Some(manager),
                    Err(e) => {
                        warn!(error = %e, "Redis unreachable, using in-memory contact cache");
                        None
                    }
                }
            }
            None => {
                warn!("Redis not configured, using in-memory contact cache");
                None
            }
        };

        let backend: Arc<dyn CacheBackend> = match &redis {
            Some(manager) => Arc::new(RedisCacheBackend::new(manager.clone())),
            None => Arc::new(InMemoryCacheBackend::new()),
        };
        let sync = ContactSyncService::new(ContactCache::new(backend, config.cache.clone()));

        let google = GoogleContactsClient::new(config.google.clone())
            .wrap_err("Failed to build Google contacts client")?;

        let provider: Option<Arc<dyn EmbeddingProvider>> = match OpenAIProvider::from_env() {
            Ok(provider) => {
                info!(model = %provider.model(), "OpenAI embedding provider configured");
                Some(Arc::new(provider))
            }
            Err(e) => {
                info!(reason = %e, "Embedding disabled; index and search will fail");
                None
            }
        };

        let dimension = provider
            .as_ref()
            .map_or(EmbeddingModel::default(), |p| p.model())
            .dimension() as usize;
        let store = QdrantVectorStore::new(config.qdrant.clone(), dimension)
            .wrap_err("Failed to configure Qdrant")?;

        let mut retrieval = RetrievalService::new(store, config.retrieval.clone());
        if let Some(provider) = provider {
            retrieval = retrieval.with_embedding_provider(provider);
        }

        Ok(Self {
            redis,
            sync,
            google,
            retrieval: Arc::new(retrieval),
            config,
        })
    }

    fn indexer(&self) -> ContactIndexer<QdrantVectorStore> {
        ContactIndexer::new(self.retrieval.clone())
    }

    fn namespace(&self, namespace: Option<String>) -> String {
        namespace.unwrap_or_else(|| self.config.retrieval.default_namespace.clone())
    }

    pub async fn execute(&self, command: Command) -> Result<Value> {
        match command {
            Command::Sync {
                owner,
                access_token,
                force,
            } => {
                let upstream = self.google.for_token(access_token);
                let outcome = if force {
                    self.sync.refresh(&owner, &upstream).await?
                } else {
                    self.sync.get_records_with_source(&owner, &upstream).await?
                };
                Ok(render_outcome(&owner, outcome))
            }

            Command::Cached { owner } => {
                let entry = self.sync.cached_records(&owner).await?;
                Ok(render_cached(&owner, entry))
            }

            Command::Clear { owner } => {
                self.sync.clear_cache(&owner).await?;
                Ok(json!({ "owner": owner, "cleared": true }))
            }

            Command::Index { owner, namespace } => {
                let namespace = self.namespace(namespace);
                let entry = self
                    .sync
                    .cached_records(&owner)
                    .await?
                    .ok_or_else(|| eyre!("No cached contacts for '{}'; run sync first", owner))?;

                let indexed = self.indexer().index(&owner, &entry.records, &namespace).await?;
                Ok(json!({ "owner": owner, "namespace": namespace, "indexed": indexed }))
            }

            Command::Search {
                query,
                owner,
                top_k,
                namespace,
            } => {
                let namespace = self.namespace(namespace);
                let top_k = top_k.unwrap_or(self.config.retrieval.default_top_k);
                let results = self
                    .indexer()
                    .search(&owner, &query, top_k, &namespace)
                    .await?;
                Ok(render_results(&owner, &namespace, results))
            }

            Command::Sample {
                owner,
                namespace,
                limit,
            } => {
                let namespace = self.namespace(namespace);
                let results = self.indexer().sample(&owner, &namespace, limit).await?;
                Ok(render_results(&owner, &namespace, results))
            }

            Command::Health => Ok(self.health().await),
        }
    }

    async fn health(&self) -> Value {
        let cache = match &self.redis {
            Some(manager) => {
                let status = check_health_detailed(&mut manager.clone()).await;
                json!({
                    "backend": "redis",
                    "healthy": status.healthy,
                    "message": status.message,
                    "responseTimeMs": status.response_time_ms,
                })
            }
            None => json!({ "backend": "memory", "healthy": true }),
        };

        let namespace = &self.config.retrieval.default_namespace;
        let vector = match self.retrieval.count(namespace).await {
            Ok(count) => json!({ "healthy": true, "namespace": namespace, "count": count }),
            Err(e) => json!({ "healthy": false, "message": e.to_string() }),
        };

        json!({ "cache": cache, "vectorStore": vector })
    }
}

fn render_outcome(owner: &str, outcome: SyncOutcome) -> Value {
    json!({
        "owner": owner,
        "source": outcome.source,
        "cachedAt": outcome.cached_at,
        "count": outcome.records.len(),
        "records": outcome.records,
    })
}

fn render_cached(owner: &str, entry: Option<CacheEntry>) -> Value {
    match entry {
        Some(entry) => json!({
            "owner": owner,
            "cached": true,
            "cachedAt": entry.cached_at,
            "count": entry.count,
            "records": entry.records,
        }),
        None => json!({ "owner": owner, "cached": false, "count": 0, "records": [] }),
    }
}

fn render_results(owner: &str, namespace: &str, results: Vec<QueryResult>) -> Value {
    json!({
        "owner": owner,
        "namespace": namespace,
        "count": results.len(),
        "results": results,
    })
}
