//! Typed event bus and component runtime for the trading system.
//!
//! The [`Engine`] owns a registry of [`Component`]s and dispatches typed
//! [`Event`]s to registered callbacks over one cooperative executor. The
//! [`Gateway`] trait is the protocol-independent base that venue adapters
//! implement.

pub mod component;
pub mod engine;
pub mod events;
pub mod gateway;
pub mod objects;

pub use component::Component;
pub use engine::{Callback, Engine};
pub use events::{Event, EventType, Payload};
pub use gateway::{register_gateway_callbacks, register_weak_callback, Gateway};
pub use objects::{
    Account, BalanceItem, Bar, Book, BookItem, Direction, Message, Order, OrderItem, OrderStatus,
    OrderType, Position, PositionItem, Subscribe, Tick, Trade,
};
