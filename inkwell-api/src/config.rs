use inkwell_common::{
    pagination::Paginator,
    util::{NonPositiveDurationError, PositiveDuration},
};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
};
use thiserror::Error;

pub const ENV_PREFIX: &str = "INKWELL_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("INKWELL_POSTS_PER_PAGE must be at least 1")]
    NoPostsPerPage,
    #[error("INKWELL_PAGE_CACHE_SECONDS is invalid: {0}")]
    PageCacheTtl(#[from] NonPositiveDurationError),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    pub database_url: String,
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,
    #[serde(default = "default_page_cache_seconds")]
    pub page_cache_seconds: u64,
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

fn default_posts_per_page() -> u32 {
    10
}

fn default_page_cache_seconds() -> u64 {
    20
}

fn default_login_url() -> String {
    "/auth/login/".to_owned()
}

impl Env {
    #[must_use]
    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.server_port)
    }

    pub fn paginator(&self) -> Result<Paginator, ConfigError> {
        NonZeroU32::new(self.posts_per_page)
            .map(Paginator::new)
            .ok_or(ConfigError::NoPostsPerPage)
    }

    pub fn page_cache_ttl(&self) -> Result<PositiveDuration, ConfigError> {
        Ok(PositiveDuration::from_seconds(self.page_cache_seconds)?)
    }
}
