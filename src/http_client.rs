use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

const USER_AGENT: &str = concat!("shotlight_terminal/", env!("CARGO_PKG_VERSION"));

/// Every request made through this client gives up after `timeout`, which
/// the config keeps below the poll interval.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build http client")
}
