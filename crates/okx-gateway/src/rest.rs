//! Signed REST client for the OKX v5 API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::auth;
use crate::config::{OkxConfig, REST_URL};
use crate::error::GatewayError;
use crate::types::{
    CancelOrderRequest, OkxAccount, OkxPendingOrder, OkxPosition, OkxResponse, OrderAck,
    SendOrderRequest,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One client per venue account. No retries: retry policy belongs to the
/// caller.
#[derive(Debug, Clone)]
pub struct OkxRest {
    client: Client,
    config: Arc<OkxConfig>,
}

impl OkxRest {
    pub fn new(config: Arc<OkxConfig>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("okx-trader/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Issue one signed request and return the raw response body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: &str,
    ) -> Result<String, GatewayError> {
        let timestamp = auth::now_timestamp();
        let sign = auth::sign(&timestamp, method.as_str(), path, body, &self.config.secret_key);

        let mut request = self
            .client
            .request(method, format!("{REST_URL}{path}"))
            .header(CONTENT_TYPE, "application/json")
            .header("OK-ACCESS-KEY", &self.config.api_key)
            .header("OK-ACCESS-SIGN", sign)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.config.passphrase);
        if self.config.sim {
            request = request.header("x-simulated-trading", "1");
        }
        if !body.is_empty() {
            request = request.body(body.to_owned());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Transport(format!("http status {status}: {text}")));
        }
        debug!(path, response = %text, "okx response");
        Ok(text)
    }

    pub async fn get_account(&self) -> Result<OkxAccount, GatewayError> {
        let body = self.request(Method::GET, "/api/v5/account/balance", "").await?;
        let mut data: Vec<OkxAccount> = decode_envelope(&body, false)?;
        if data.is_empty() {
            return Err(GatewayError::EmptyData("account balance"));
        }
        Ok(data.swap_remove(0))
    }

    pub async fn get_positions(&self) -> Result<Vec<OkxPosition>, GatewayError> {
        let body = self.request(Method::GET, "/api/v5/account/positions", "").await?;
        decode_envelope(&body, false)
    }

    pub async fn get_pending_orders(&self) -> Result<Vec<OkxPendingOrder>, GatewayError> {
        let body = self.request(Method::GET, "/api/v5/trade/orders-pending", "").await?;
        decode_envelope(&body, false)
    }

    /// Submit a batch of orders. The envelope accepts partial success
    /// (code 1/2); callers must inspect per-item `s_code`.
    pub async fn send_orders(
        &self,
        orders: &[SendOrderRequest],
    ) -> Result<Vec<OrderAck>, GatewayError> {
        let body = serde_json::to_string(orders)?;
        debug!(body = %body, "sending batch orders");
        let response = self.request(Method::POST, "/api/v5/trade/batch-orders", &body).await?;
        decode_envelope(&response, true)
    }

    pub async fn cancel_orders(
        &self,
        cancels: &[CancelOrderRequest],
    ) -> Result<Vec<OrderAck>, GatewayError> {
        let body = serde_json::to_string(cancels)?;
        let response = self
            .request(Method::POST, "/api/v5/trade/cancel-batch-orders", &body)
            .await?;
        decode_envelope(&response, true)
    }
}

/// Decode a `{code, msg, data}` envelope. `partial_ok` admits the batch
/// codes 1 and 2, whose per-item results carry their own `sCode`.
fn decode_envelope<T: DeserializeOwned + Default>(
    body: &str,
    partial_ok: bool,
) -> Result<Vec<T>, GatewayError> {
    let response: OkxResponse<T> = serde_json::from_str(body)?;
    let accepted = response.code == 0 || (partial_ok && matches!(response.code, 1 | 2));
    if !accepted {
        error!(code = response.code, msg = %response.msg, "venue rejected request");
        return Err(GatewayError::Envelope { code: response.code, msg: response.msg });
    }
    Ok(response.data)
}
