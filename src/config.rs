// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;

use crate::comments::cache::DEFAULT_MAX_ENTRIES;
use crate::comments::render::{INDENT_WIDTH, MAX_REPLY_DEPTH, RenderOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without one the server keeps comments
    /// in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    pub max_reply_depth: usize,
    pub indent_width: u32,
    /// Buffered invalidation events per subscriber.
    pub event_capacity: usize,
    /// Comment lists the cache holds before evicting the oldest.
    pub cache_entries: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            port: parse_or("PORT", 3000)?,
            max_reply_depth: parse_or("MAX_REPLY_DEPTH", MAX_REPLY_DEPTH)?,
            indent_width: parse_or("INDENT_WIDTH", INDENT_WIDTH)?,
            event_capacity: parse_or("EVENT_CAPACITY", 64)?,
            cache_entries: parse_or("CACHE_ENTRIES", DEFAULT_MAX_ENTRIES)?,
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_depth: self.max_reply_depth,
            indent_width: self.indent_width,
        }
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
