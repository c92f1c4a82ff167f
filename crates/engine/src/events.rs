//! Event types and payload routing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::objects::{Account, Book, Message, Order, Position, Subscribe, Tick, Trade};

/// Every event type routed by the engine.
///
/// `All` is a wildcard: handlers registered under it receive every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Quit,

    SubscribeTick,
    Tick,

    SubscribeBook,
    Book,

    SendOrder,
    QueryOrder,
    Order,

    Trade,

    QueryPosition,
    Position,

    QueryAccount,
    Account,

    Message,

    All,
}

/// The payload carried by an event, one variant per payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Quit,
    Subscribe(Subscribe),
    Tick(Tick),
    Book(Book),
    Order(Order),
    Trade(Trade),
    Position(Position),
    Account(Account),
    QueryOrder,
    QueryPosition,
    QueryAccount,
    Message(Message),
}

impl Payload {
    /// Whether this payload variant is the one declared for `event_type`.
    ///
    /// The dispatcher checks this once at publish time; a mismatch is a
    /// programmer error and fails the publish.
    pub fn matches(&self, event_type: EventType) -> bool {
        matches!(
            (event_type, self),
            (EventType::Quit, Payload::Quit)
                | (EventType::SubscribeTick, Payload::Subscribe(_))
                | (EventType::SubscribeBook, Payload::Subscribe(_))
                | (EventType::Tick, Payload::Tick(_))
                | (EventType::Book, Payload::Book(_))
                | (EventType::SendOrder, Payload::Order(_))
                | (EventType::Order, Payload::Order(_))
                | (EventType::QueryOrder, Payload::QueryOrder)
                | (EventType::Trade, Payload::Trade(_))
                | (EventType::QueryPosition, Payload::QueryPosition)
                | (EventType::Position, Payload::Position(_))
                | (EventType::QueryAccount, Payload::QueryAccount)
                | (EventType::Account, Payload::Account(_))
                | (EventType::Message, Payload::Message(_))
                | (EventType::All, _)
        )
    }
}

/// An event released for dispatch. Cloning is cheap: the payload is
/// refcounted and immutable after publish.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub payload: Arc<Payload>,
}

impl Event {
    pub fn new(event_type: EventType, payload: Payload) -> Self {
        Self {
            event_type,
            payload: Arc::new(payload),
        }
    }
}
