use crate::game::installer::config::{
    current_timeout, DEFAULT_CONCURRENCY, LAUNCHER_NAME, LAUNCHER_VERSION,
};
use anyhow::Result;
use reqwest::Client;

/// Shared HTTP connection pool for one launcher run.
///
/// Created by the top-level run, passed by reference into every stage that talks to
/// the network, and released once through [`NetworkSession::close`].
#[derive(Debug)]
pub struct NetworkSession {
    client: Client,
}

impl NetworkSession {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(DEFAULT_CONCURRENCY)
            .tcp_keepalive(Some(std::time::Duration::from_secs(30)))
            .timeout(current_timeout())
            .user_agent(format!("{}/{}", LAUNCHER_NAME, LAUNCHER_VERSION))
            .build()?;
        log::debug!("Opened network session");
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Release the pool. Consumes the session so it cannot be closed twice.
    pub fn close(self) {
        drop(self.client);
        log::debug!("Closed network session");
    }
}
