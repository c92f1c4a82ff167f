//! JSON transforms for the OKX wire model.
//!
//! The venue sends every number as a string, sometimes empty; the serde
//! helpers here accept string or numeric forms and map empty strings to
//! zero. [`decode_ws_message`] is the tagged decoder for inbound streaming
//! frames: the `data` field is typed by `arg.channel`.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serializer};
use serde_json::Value;

use crate::error::GatewayError;
use crate::types::{WsArg, WsMessage, WsPayload};

/// Parse a wire decimal; the venue uses `""` for absent values.
pub fn parse_dec(s: &str) -> Result<Decimal, rust_decimal::Error> {
    if s.is_empty() {
        return Ok(Decimal::ZERO);
    }
    s.parse()
}

pub fn serialize_dec<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

pub fn serialize_opt_dec<S: Serializer>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&v.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Decimal encoded as a string; accepts bare numbers too.
pub mod dec_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_dec(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        struct DecVisitor;

        impl Visitor<'_> for DecVisitor {
            type Value = Decimal;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a decimal number or numeric string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
                parse_dec(v).map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
                Decimal::try_from(v).map_err(|_| E::invalid_value(Unexpected::Float(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
                Ok(Decimal::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
                Ok(Decimal::from(v))
            }
        }

        deserializer.deserialize_any(DecVisitor)
    }
}

/// Signed integer encoded as a string; accepts bare numbers too.
pub mod i64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        struct IntVisitor;

        impl Visitor<'_> for IntVisitor {
            type Value = i64;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer or integer string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
                if v.is_empty() {
                    return Ok(0);
                }
                v.parse().map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
                Ok(v)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
                i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }
        }

        deserializer.deserialize_any(IntVisitor)
    }
}

/// Unsigned integer encoded as a string; accepts bare numbers too.
pub mod u64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        struct UintVisitor;

        impl Visitor<'_> for UintVisitor {
            type Value = u64;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an unsigned integer or integer string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
                if v.is_empty() {
                    return Ok(0);
                }
                v.parse().map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
                Ok(v)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
                u64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
            }
        }

        deserializer.deserialize_any(UintVisitor)
    }
}

impl<'de> Deserialize<'de> for crate::types::WsBookRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let row: Vec<String> = Vec::deserialize(deserializer)?;
        if row.len() < 2 {
            return Err(de::Error::invalid_length(row.len(), &"at least price and size"));
        }
        let price = parse_dec(&row[0]).map_err(de::Error::custom)?;
        let size = parse_dec(&row[1]).map_err(de::Error::custom)?;
        let order_count = row.get(3).and_then(|s| s.parse().ok()).unwrap_or_default();
        Ok(Self { price, size, order_count })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    conn_id: Option<String>,
    #[serde(default)]
    conn_count: Option<String>,
    #[serde(default)]
    arg: Option<WsArg>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Decode one inbound text frame into a tagged [`WsMessage`].
///
/// Frames with a non-empty `event` are acks, errors, or connection-count
/// notices and carry no data payload. Data frames are typed by
/// `arg.channel`; an unrecognized channel decodes with `payload == None`
/// so the watcher can log and drop it.
pub fn decode_ws_message(text: &str) -> Result<WsMessage, GatewayError> {
    let text = text.trim();
    if text == "pong" {
        return Ok(WsMessage { event: "pong".into(), ..WsMessage::default() });
    }

    let frame: RawFrame = serde_json::from_str(text)?;
    let mut message = WsMessage {
        event: frame.event.unwrap_or_default(),
        msg: frame.msg.unwrap_or_default(),
        conn_id: frame.conn_id.unwrap_or_default(),
        arg: frame.arg.unwrap_or_default(),
        action: frame.action.unwrap_or_default(),
        ..WsMessage::default()
    };
    if let Some(code) = frame.code {
        message.code = code.parse().unwrap_or_default();
    }
    if let Some(count) = frame.conn_count {
        message.conn_count = count.parse().unwrap_or_default();
    }

    if message.is_event() {
        return Ok(message);
    }

    let data = frame.data.unwrap_or(Value::Null);
    message.payload = match message.arg.channel.as_str() {
        "tickers" => Some(WsPayload::Tickers(serde_json::from_value(data)?)),
        "books" | "books5" => Some(WsPayload::Books(serde_json::from_value(data)?)),
        "account" => Some(WsPayload::Account(serde_json::from_value(data)?)),
        "positions" => Some(WsPayload::Positions(serde_json::from_value(data)?)),
        "orders" => Some(WsPayload::Orders(serde_json::from_value(data)?)),
        _ => None,
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OkxConfig;
    use crate::types::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn decodes_book_snapshot_frame() {
        let text = r#"{"arg":{"channel":"books","instId":"BTC-USDT"},"action":"snapshot","data":[{"bids":[["30000","1","0","0"],["29999","2","0","0"]],"asks":[["30001","1.5","0","0"]],"ts":"1700000000000"}]}"#;
        let msg = decode_ws_message(text).unwrap();

        assert!(!msg.is_event());
        assert_eq!(msg.arg.channel, "books");
        assert_eq!(msg.arg.inst_id, "BTC-USDT");
        assert_eq!(msg.action, "snapshot");

        let Some(WsPayload::Books(books)) = msg.payload else {
            panic!("expected a books payload");
        };
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].ts, 1_700_000_000_000);
        assert_eq!(books[0].bids.len(), 2);
        assert_eq!(books[0].bids[0].price, dec!(30000));
        assert_eq!(books[0].bids[0].size, dec!(1));
        assert_eq!(books[0].bids[1].price, dec!(29999));
        assert_eq!(books[0].asks[0].price, dec!(30001));
        assert_eq!(books[0].asks[0].size, dec!(1.5));
    }

    #[test]
    fn decodes_ticker_frame() {
        let text = r#"{"arg":{"channel":"tickers","instId":"BTC-USDT"},"data":[{"instId":"BTC-USDT","last":"30000.5","lastSz":"0.1","open24h":"29500","high24h":"30200","low24h":"29400","ts":"1700000001000"}]}"#;
        let msg = decode_ws_message(text).unwrap();

        let Some(WsPayload::Tickers(ticks)) = msg.payload else {
            panic!("expected a tickers payload");
        };
        assert_eq!(ticks[0].inst_id, "BTC-USDT");
        assert_eq!(ticks[0].last, dec!(30000.5));
        assert_eq!(ticks[0].last_sz, dec!(0.1));
        assert_eq!(ticks[0].open_24h, dec!(29500));
        assert_eq!(ticks[0].ts, 1_700_000_001_000);
    }

    #[test]
    fn decodes_error_frame() {
        let msg =
            decode_ws_message(r#"{"event":"error","code":"60012","msg":"Illegal request"}"#).unwrap();
        assert!(msg.is_event());
        assert_eq!(msg.event, "error");
        assert_eq!(msg.code, 60012);
        assert_eq!(msg.msg, "Illegal request");
        assert!(msg.payload.is_none());
    }

    #[test]
    fn decodes_login_and_subscribe_acks() {
        let login = decode_ws_message(r#"{"event":"login","code":"0","msg":"","connId":"a4d3ae55"}"#)
            .unwrap();
        assert_eq!(login.event, "login");
        assert_eq!(login.code, 0);
        assert_eq!(login.conn_id, "a4d3ae55");

        let sub = decode_ws_message(
            r#"{"event":"subscribe","arg":{"channel":"tickers","instId":"BTC-USDT"}}"#,
        )
        .unwrap();
        assert_eq!(sub.event, "subscribe");
        assert_eq!(sub.arg.channel, "tickers");
    }

    #[test]
    fn decodes_conn_count_frame() {
        let msg = decode_ws_message(r#"{"event":"channel-conn-count","channel":"orders","connCount":"2","connId":"abc"}"#).unwrap();
        assert_eq!(msg.event, "channel-conn-count");
        assert_eq!(msg.conn_count, 2);
    }

    #[test]
    fn decodes_positions_frame() {
        let text = r#"{"arg":{"channel":"positions","instType":"SWAP"},"data":[{"instType":"SWAP","instId":"BTC-USDT-SWAP","posId":"1","posSide":"long","pos":"10","availPos":"8","avgPx":"30000","upl":"12.5","ccy":"USDT","uTime":"1700000002000"}]}"#;
        let msg = decode_ws_message(text).unwrap();

        let Some(WsPayload::Positions(positions)) = msg.payload else {
            panic!("expected a positions payload");
        };
        assert_eq!(positions[0].inst_id, "BTC-USDT-SWAP");
        assert_eq!(positions[0].pos, dec!(10));
        assert_eq!(positions[0].avail_pos, dec!(8));
        assert_eq!(positions[0].upl, dec!(12.5));
        assert_eq!(positions[0].u_time, 1_700_000_002_000);
    }

    #[test]
    fn decodes_orders_frame() {
        let text = r#"{"arg":{"channel":"orders","instType":"SWAP"},"data":[{"instId":"BTC-USDT-SWAP","ordId":"312269865356374016","side":"buy","posSide":"long","px":"30000","sz":"1","accFillSz":"0","state":"live","ordType":"limit","uTime":"1700000003000"}]}"#;
        let msg = decode_ws_message(text).unwrap();

        let Some(WsPayload::Orders(orders)) = msg.payload else {
            panic!("expected an orders payload");
        };
        assert_eq!(orders[0].ord_id, "312269865356374016");
        assert_eq!(orders[0].state, "live");
        assert_eq!(orders[0].px, dec!(30000));
        assert_eq!(orders[0].acc_fill_sz, dec!(0));
    }

    #[test]
    fn decodes_account_frame() {
        let text = r#"{"arg":{"channel":"account"},"data":[{"uTime":"1700000004000","totalEq":"1000.5","ordFroz":"10","details":[{"ccy":"USDT","eq":"900","cashBal":"890","availBal":"880","frozenBal":"20","uTime":"1700000004000"}]}]}"#;
        let msg = decode_ws_message(text).unwrap();

        let Some(WsPayload::Account(accounts)) = msg.payload else {
            panic!("expected an account payload");
        };
        assert_eq!(accounts[0].total_eq, dec!(1000.5));
        assert_eq!(accounts[0].details[0].ccy, "USDT");
        assert_eq!(accounts[0].details[0].frozen_bal, dec!(20));
    }

    #[test]
    fn unknown_channel_has_no_payload() {
        let msg = decode_ws_message(
            r#"{"arg":{"channel":"open-interest","instId":"BTC-USDT"},"data":[{}]}"#,
        )
        .unwrap();
        assert_eq!(msg.arg.channel, "open-interest");
        assert!(msg.payload.is_none());
    }

    #[test]
    fn pong_text_decodes_to_event() {
        let msg = decode_ws_message("pong").unwrap();
        assert_eq!(msg.event, "pong");
    }

    #[test]
    fn malformed_frame_is_a_codec_error() {
        assert!(matches!(
            decode_ws_message("{not json"),
            Err(GatewayError::Codec(_))
        ));
    }

    #[test]
    fn empty_wire_strings_decode_to_zero() {
        let tick: WsTick =
            serde_json::from_str(r#"{"instId":"X","last":"","lastSz":"0.5","ts":""}"#).unwrap();
        assert_eq!(tick.last, Decimal::ZERO);
        assert_eq!(tick.last_sz, dec!(0.5));
        assert_eq!(tick.ts, 0);
    }

    #[test]
    fn book_row_deletion_size_is_preserved() {
        let book: WsBook =
            serde_json::from_str(r#"{"bids":[["30000","0","0","3"]],"asks":[],"ts":"1"}"#).unwrap();
        assert_eq!(book.bids[0].size, Decimal::ZERO);
        assert_eq!(book.bids[0].order_count, 3);
    }

    #[test]
    fn envelope_decodes_string_code() {
        let rsp: OkxResponse<OkxAccount> =
            serde_json::from_str(r#"{"code":"50000","msg":"server error","data":[]}"#).unwrap();
        assert_eq!(rsp.code, 50000);
        assert_eq!(rsp.msg, "server error");
        assert!(rsp.data.is_empty());
    }

    #[test]
    fn subscribe_request_serializes_expected_frames() {
        let frame = WsRequest::subscribe(vec![SubscribeArg::instrument("books", "BTC-USDT")]);
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({"op":"subscribe","args":[{"channel":"books","instId":"BTC-USDT"}]})
        );

        let frame = WsRequest::subscribe(vec![SubscribeArg::instrument_type("positions", "SWAP")]);
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({"op":"subscribe","args":[{"channel":"positions","instType":"SWAP"}]})
        );
    }

    #[test]
    fn login_request_carries_signed_args() {
        let config = OkxConfig {
            api_key: "key".into(),
            secret_key: "secret".into(),
            passphrase: "phrase".into(),
            sim: false,
        };
        let frame = WsRequest::login(&config, 1_700_000_000);
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["op"], "login");
        assert_eq!(value["args"][0]["apiKey"], "key");
        assert_eq!(value["args"][0]["timestamp"], "1700000000");
        assert_eq!(
            value["args"][0]["sign"],
            crate::auth::login_sign(1_700_000_000, "secret")
        );
    }
}
