//! OKX credentials and endpoint selection.

use serde::{Deserialize, Serialize};

pub const REST_URL: &str = "https://www.okx.com";
pub const WS_URL: &str = "wss://ws.okx.com:8443";
pub const WS_URL_SIM: &str = "wss://wspap.okx.com:8443";

pub const PUBLIC_PATH: &str = "/ws/v5/public";
pub const PRIVATE_PATH: &str = "/ws/v5/private";

/// Read-only after load; shared across the REST client and both streams.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OkxConfig {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
    /// Use the simulated-trading endpoints and header.
    pub sim: bool,
}

impl OkxConfig {
    pub fn ws_base(&self) -> &'static str {
        if self.sim {
            WS_URL_SIM
        } else {
            WS_URL
        }
    }
}
