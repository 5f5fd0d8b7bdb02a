//! HTTP client for Devantech-style Ethernet relay boards.
//!
//! The board exposes two endpoints:
//!
//! - `GET /dscript.cgi?V20944={n}` pulses relay `n` (1-based).
//! - `GET /index.xml` returns the full status document, with one
//!   `<RlyN>0|1</RlyN>` element per relay.

use std::time::Duration;

use async_trait::async_trait;

use crate::hardware::{HardwareError, RelayHardware};

/// Script variable the board firmware maps to "pulse relay N".
const PULSE_VARIABLE: &str = "V20944";

/// [`RelayHardware`] over the board's HTTP interface.
#[derive(Clone)]
pub struct DevantechClient {
    client: reqwest::Client,
}

impl DevantechClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn get(&self, url: String, timeout: Duration) -> Result<reqwest::Response, HardwareError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HardwareError::Timeout(timeout)
                } else {
                    HardwareError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HardwareError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

impl Default for DevantechClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Base URL for a board address, which may or may not carry a scheme.
pub fn base_url(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

#[async_trait]
impl RelayHardware for DevantechClient {
    async fn pulse(&self, address: &str, relay_number: usize, timeout: Duration) -> Result<(), HardwareError> {
        let url = format!("{}/dscript.cgi?{PULSE_VARIABLE}={relay_number}", base_url(address));
        self.get(url, timeout).await?;
        Ok(())
    }

    async fn fetch_status(&self, address: &str, timeout: Duration) -> Result<String, HardwareError> {
        let url = format!("{}/index.xml", base_url(address));
        let response = self.get(url, timeout).await?;
        response
            .text()
            .await
            .map_err(|e| HardwareError::Request(e.to_string()))
    }

    async fn ping(&self, address: &str, timeout: Duration) -> bool {
        let url = format!("{}/index.xml", base_url(address));
        match self.get(url, timeout).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(address, error = %e, "Board ping failed");
                false
            }
        }
    }
}
