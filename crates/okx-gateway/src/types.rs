//! OKX wire model: REST envelopes and payloads, streaming frames, and the
//! outbound request shapes. Numeric fields arrive as strings on the wire
//! and decode through the codec helpers (empty string means zero).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::config::OkxConfig;

/// REST response envelope: `{code, msg, data: [...]}`. `code == 0` is
/// success; batch endpoints use 1/2 for whole/partial failure with
/// per-item `sCode` detail.
#[derive(Debug, Clone, Deserialize)]
pub struct OkxResponse<T> {
    #[serde(with = "crate::codec::i64_string")]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OkxBalanceDetail {
    #[serde(with = "crate::codec::u64_string")]
    pub u_time: u64,
    pub ccy: String,
    #[serde(with = "crate::codec::dec_string")]
    pub eq: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub cash_bal: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub avail_bal: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub frozen_bal: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OkxAccount {
    #[serde(with = "crate::codec::u64_string")]
    pub u_time: u64,
    #[serde(with = "crate::codec::dec_string")]
    pub total_eq: Decimal,
    /// Margin frozen for open orders, account-wide.
    #[serde(with = "crate::codec::dec_string")]
    pub ord_froz: Decimal,
    pub details: Vec<OkxBalanceDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OkxPosition {
    #[serde(with = "crate::codec::u64_string")]
    pub u_time: u64,
    pub inst_type: String,
    pub inst_id: String,
    pub pos_id: String,
    pub ccy: String,
    pub pos_side: String,
    #[serde(with = "crate::codec::dec_string")]
    pub pos: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub avail_pos: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub avg_px: Decimal,
    /// Unrealized P&L; the venue has no plain `pnl` field on positions.
    #[serde(with = "crate::codec::dec_string")]
    pub upl: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OkxPendingOrder {
    #[serde(with = "crate::codec::u64_string")]
    pub u_time: u64,
    pub inst_id: String,
    pub ord_id: String,
    pub side: String,
    pub ord_type: String,
    pub state: String,
    #[serde(with = "crate::codec::dec_string")]
    pub px: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub sz: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub acc_fill_sz: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub avg_px: Decimal,
}

/// One order line of a `POST /api/v5/trade/batch-orders` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOrderRequest {
    pub inst_id: String,
    pub td_mode: String,
    pub side: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_side: Option<String>,
    pub ord_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tgt_ccy: Option<String>,
    #[serde(
        serialize_with = "crate::codec::serialize_opt_dec",
        skip_serializing_if = "Option::is_none"
    )]
    pub px: Option<Decimal>,
    #[serde(serialize_with = "crate::codec::serialize_dec")]
    pub sz: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cl_ord_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// One line of a `POST /api/v5/trade/cancel-batch-orders` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    pub inst_id: String,
    pub ord_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cl_ord_id: Option<String>,
}

/// Per-item acknowledgement returned by the batch order and cancel
/// endpoints. `s_code != 0` marks that item as failed without failing the
/// batch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderAck {
    pub ord_id: String,
    pub cl_ord_id: String,
    pub tag: String,
    #[serde(with = "crate::codec::i64_string")]
    pub ts: i64,
    #[serde(with = "crate::codec::i64_string")]
    pub s_code: i64,
    pub s_msg: String,
}

/// Outbound streaming frame: `{op, args: [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WsRequest<T> {
    pub op: String,
    pub args: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeArg {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inst_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inst_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ccy: Option<String>,
}

impl SubscribeArg {
    pub fn instrument(channel: &str, inst_id: &str) -> Self {
        Self {
            channel: channel.into(),
            inst_id: Some(inst_id.into()),
            inst_type: None,
            ccy: None,
        }
    }

    pub fn instrument_type(channel: &str, inst_type: &str) -> Self {
        Self {
            channel: channel.into(),
            inst_id: None,
            inst_type: Some(inst_type.into()),
            ccy: None,
        }
    }

    pub fn bare(channel: &str) -> Self {
        Self {
            channel: channel.into(),
            inst_id: None,
            inst_type: None,
            ccy: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginArg {
    pub api_key: String,
    pub passphrase: String,
    pub timestamp: String,
    pub sign: String,
}

impl WsRequest<SubscribeArg> {
    pub fn subscribe(args: Vec<SubscribeArg>) -> Self {
        Self { op: "subscribe".into(), args }
    }
}

impl WsRequest<LoginArg> {
    /// Login frame with a freshly signed seconds-resolution timestamp.
    pub fn login(config: &OkxConfig, now_s: i64) -> Self {
        Self {
            op: "login".into(),
            args: vec![LoginArg {
                api_key: config.api_key.clone(),
                passphrase: config.passphrase.clone(),
                timestamp: now_s.to_string(),
                sign: auth::login_sign(now_s, &config.secret_key),
            }],
        }
    }
}

/// The `arg` object tagging inbound data frames.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsArg {
    pub channel: String,
    pub inst_id: String,
    pub inst_type: String,
    pub ccy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsTick {
    pub inst_id: String,
    pub inst_type: String,
    #[serde(with = "crate::codec::dec_string")]
    pub last: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub last_sz: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub bid_px: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub bid_sz: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub ask_px: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub ask_sz: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub open_24h: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub high_24h: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub low_24h: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub vol_ccy_24h: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub vol_24h: Decimal,
    #[serde(with = "crate::codec::i64_string")]
    pub ts: i64,
}

/// One `[price, size, liquidated, order_count]` row of a book side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WsBookRow {
    pub price: Decimal,
    pub size: Decimal,
    pub order_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsBook {
    pub bids: Vec<WsBookRow>,
    pub asks: Vec<WsBookRow>,
    #[serde(with = "crate::codec::i64_string")]
    pub ts: i64,
    #[serde(with = "crate::codec::i64_string")]
    pub seq_id: i64,
    #[serde(with = "crate::codec::i64_string")]
    pub prev_seq_id: i64,
    #[serde(with = "crate::codec::i64_string")]
    pub checksum: i64,
}

/// One update on the private `orders` channel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsOrder {
    pub inst_id: String,
    pub inst_type: String,
    pub ord_id: String,
    pub cl_ord_id: String,
    pub side: String,
    pub pos_side: String,
    pub ord_type: String,
    pub state: String,
    #[serde(with = "crate::codec::dec_string")]
    pub px: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub sz: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub acc_fill_sz: Decimal,
    #[serde(with = "crate::codec::dec_string")]
    pub avg_px: Decimal,
    #[serde(with = "crate::codec::u64_string")]
    pub u_time: u64,
    #[serde(with = "crate::codec::u64_string")]
    pub c_time: u64,
}

/// Channel payloads, one variant per private/public channel. Decided by
/// `arg.channel` when the frame is decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum WsPayload {
    Tickers(Vec<WsTick>),
    Books(Vec<WsBook>),
    Account(Vec<OkxAccount>),
    Positions(Vec<OkxPosition>),
    Orders(Vec<WsOrder>),
}

/// A decoded inbound streaming frame. Frames carry either an `event`
/// (error / ack / conn-count) or channel data tagged by `arg`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WsMessage {
    pub event: String,
    pub code: i64,
    pub msg: String,
    pub conn_id: String,
    pub conn_count: i64,
    pub arg: WsArg,
    pub action: String,
    pub payload: Option<WsPayload>,
}

impl WsMessage {
    pub fn is_event(&self) -> bool {
        !self.event.is_empty()
    }
}
