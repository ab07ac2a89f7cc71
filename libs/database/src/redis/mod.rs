//! Redis connector for the contact cache

mod config;
mod connector;
mod health;

pub use config::RedisConfig;
pub use connector::{connect, connect_with_retry};
pub use health::{
    DEFAULT_HEALTH_TIMEOUT, HealthStatus, check_health, check_health_detailed, check_health_within,
};

pub use redis::aio::ConnectionManager;
pub use redis::{AsyncCommands, Client, RedisResult};
