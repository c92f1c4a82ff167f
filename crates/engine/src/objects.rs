//! Domain data model shared by every layer of the runtime.
//!
//! Every top-level record carries the common envelope: trading symbol,
//! venue name, and a millisecond timestamp. Records are value types; they
//! are produced once, wrapped into an [`crate::events::Event`], and
//! broadcast read-only to subscribers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Buy
    }
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

impl Default for OrderType {
    fn default() -> Self {
        OrderType::Limit
    }
}

/// Order lifecycle state.
///
/// Transitions only move forward: Submitting -> Pending -> PartialFilled ->
/// Filled, with Cancelled and Rejected reachable from any non-terminal
/// state. Filled, Cancelled, and Rejected absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Submitting,
    Pending,
    PartialFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Submitting
    }
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected)
    }

    fn rank(self) -> u8 {
        match self {
            OrderStatus::Submitting => 0,
            OrderStatus::Pending => 1,
            OrderStatus::PartialFilled => 2,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected => 3,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

/// One price level of an order book side. A zero volume marks a deletion
/// at that level and passes through to subscribers unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookItem {
    pub price: Decimal,
    pub volume: Decimal,
}

impl BookItem {
    pub fn new(price: Decimal, volume: Decimal) -> Self {
        Self { price, volume }
    }
}

/// Order book snapshot: bids descending, asks ascending by price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub symbol: String,
    pub exchange: String,
    pub timestamp_ms: i64,
    pub bids: Vec<BookItem>,
    pub asks: Vec<BookItem>,
}

/// Most-recent-trade summary plus 24h aggregates for one symbol.
///
/// `order_book` is the venue's latest book snapshot at emission time, or
/// `None` if no book has arrived yet for the symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub exchange: String,
    pub timestamp_ms: i64,

    pub last_price: Decimal,
    pub last_volume: Decimal,
    pub turnover: Decimal,

    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub last_close_price: Decimal,

    pub order_book: Option<Box<Book>>,
}

/// OHLCV aggregate over a fixed interval. Reserved for strategies that
/// build their own bars; the gateway does not produce these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub exchange: String,
    pub timestamp_ms: i64,

    pub interval_s: i64,
    pub volume: Decimal,

    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
}

/// One order line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub symbol: String,
    pub exchange: String,
    pub timestamp_ms: i64,

    /// Venue-assigned id; `None` until the venue accepts the order.
    pub order_id: Option<String>,
    pub direction: Direction,
    pub price: Decimal,
    pub volume: Decimal,
    pub filled_volume: Decimal,
    pub order_type: OrderType,
    pub status: OrderStatus,
}

/// One or more order line items submitted or reported together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub exchange: String,
    pub timestamp_ms: i64,
    pub items: Vec<OrderItem>,
}

/// A fill reported by the venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub exchange: String,
    pub timestamp_ms: i64,

    pub trade_id: String,
    pub direction: Direction,
    pub price: Decimal,
    pub volume: Decimal,
    pub order: Option<Box<Order>>,
}

/// One open position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionItem {
    pub symbol: String,
    pub volume: Decimal,
    pub direction: Direction,
    pub frozen_volume: Decimal,
    pub price: Decimal,
    pub pnl: Decimal,
}

/// Account position snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub exchange: String,
    pub timestamp_ms: i64,
    pub items: Vec<PositionItem>,
}

/// Balance of one currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceItem {
    pub symbol: String,
    pub balance: Decimal,
    pub frozen_balance: Decimal,
}

/// Account snapshot with per-currency detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub exchange: String,
    pub timestamp_ms: i64,

    pub account_id: String,
    pub balance: Decimal,
    pub frozen_balance: Decimal,
    pub items: Vec<BalanceItem>,
}

/// Request to subscribe one symbol on a streaming channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscribe {
    pub symbol: String,
    pub exchange: String,
    pub timestamp_ms: i64,
}

impl Subscribe {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

/// Free-form text message for the notification channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub exchange: String,
    pub timestamp_ms: i64,
    pub content: String,
}

impl Message {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_status_moves_forward() {
        use OrderStatus::*;
        assert!(Submitting.can_transition(Pending));
        assert!(Pending.can_transition(PartialFilled));
        assert!(Pending.can_transition(Filled));
        assert!(PartialFilled.can_transition(Filled));
        assert!(Pending.can_transition(Cancelled));
        assert!(Submitting.can_transition(Rejected));
        // repeated updates of the same non-terminal state are legal
        assert!(Pending.can_transition(Pending));
        assert!(PartialFilled.can_transition(PartialFilled));
    }

    #[test]
    fn order_status_rejects_backward() {
        use OrderStatus::*;
        assert!(!PartialFilled.can_transition(Pending));
        assert!(!Filled.can_transition(Pending));
        assert!(!Cancelled.can_transition(PartialFilled));
        assert!(!Rejected.can_transition(Pending));
        // terminal states absorb, including repeats
        assert!(!Filled.can_transition(Filled));
    }

    #[test]
    fn payloads_round_trip_through_json() {
        let book = Book {
            symbol: "BTC-USDT".into(),
            exchange: "okx".into(),
            timestamp_ms: 1_700_000_000_000,
            bids: vec![BookItem::new(dec!(30000), dec!(1))],
            asks: vec![BookItem::new(dec!(30001), dec!(1.5))],
        };
        let encoded = serde_json::to_string(&book).unwrap();
        let decoded: Book = serde_json::from_str(&encoded).unwrap();
        assert_eq!(book, decoded);

        let tick = Tick {
            symbol: "BTC-USDT".into(),
            exchange: "okx".into(),
            timestamp_ms: 1_700_000_001_000,
            last_price: dec!(30000.5),
            last_volume: dec!(0.1),
            turnover: dec!(3000.05),
            order_book: Some(Box::new(book)),
            ..Tick::default()
        };
        let encoded = serde_json::to_string(&tick).unwrap();
        let decoded: Tick = serde_json::from_str(&encoded).unwrap();
        assert_eq!(tick, decoded);
    }

    #[test]
    fn snapshots_round_trip_through_json() {
        let account = Account {
            exchange: "okx".into(),
            timestamp_ms: 1,
            balance: dec!(1000.5),
            frozen_balance: dec!(10),
            items: vec![BalanceItem {
                symbol: "USDT".into(),
                balance: dec!(900),
                frozen_balance: dec!(20),
            }],
            ..Account::default()
        };
        let decoded: Account =
            serde_json::from_str(&serde_json::to_string(&account).unwrap()).unwrap();
        assert_eq!(account, decoded);

        let position = Position {
            exchange: "okx".into(),
            timestamp_ms: 2,
            items: vec![PositionItem {
                symbol: "BTC-USDT-SWAP".into(),
                volume: dec!(10),
                direction: Direction::Sell,
                frozen_volume: dec!(2),
                price: dec!(30000),
                pnl: dec!(-5),
            }],
        };
        let decoded: Position =
            serde_json::from_str(&serde_json::to_string(&position).unwrap()).unwrap();
        assert_eq!(position, decoded);
    }

    #[test]
    fn order_round_trips_through_json() {
        let order = Order {
            exchange: "okx".into(),
            timestamp_ms: 1,
            items: vec![OrderItem {
                symbol: "BTC-USDT".into(),
                direction: Direction::Sell,
                price: dec!(30000),
                volume: dec!(0.01),
                order_type: OrderType::Limit,
                status: OrderStatus::Pending,
                ..OrderItem::default()
            }],
        };
        let decoded: Order =
            serde_json::from_str(&serde_json::to_string(&order).unwrap()).unwrap();
        assert_eq!(order, decoded);
    }
}
