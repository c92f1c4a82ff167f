//! Strategy base: receives typed snapshots, publishes request events.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;

use engine::{
    register_weak_callback, Account, Book, Component, Engine, EventType, Message, Order, Payload,
    Position, Subscribe, Tick,
};

/// Implemented by every trading strategy. The `recv_*` callbacks are
/// registered during `init` via [`register_strategy_callbacks`]; the
/// provided helpers publish the corresponding request events through the
/// engine. `run` is strategy-specific.
#[async_trait]
pub trait Strategy: Component {
    fn engine(&self) -> &Arc<Engine>;

    async fn recv_account(&self, account: &Account) -> Result<()>;
    async fn recv_position(&self, position: &Position) -> Result<()>;
    async fn recv_book(&self, book: &Book) -> Result<()>;
    async fn recv_tick(&self, tick: &Tick) -> Result<()>;
    async fn recv_order(&self, order: &Order) -> Result<()>;

    async fn request_account(&self) -> Result<()> {
        self.engine()
            .publish(EventType::QueryAccount, Payload::QueryAccount)
            .await
    }

    async fn request_position(&self) -> Result<()> {
        self.engine()
            .publish(EventType::QueryPosition, Payload::QueryPosition)
            .await
    }

    async fn request_order(&self) -> Result<()> {
        self.engine().publish(EventType::QueryOrder, Payload::QueryOrder).await
    }

    async fn subscribe_book(&self, symbol: &str) -> Result<()> {
        self.engine()
            .publish(EventType::SubscribeBook, Payload::Subscribe(Subscribe::new(symbol)))
            .await
    }

    async fn subscribe_tick(&self, symbol: &str) -> Result<()> {
        self.engine()
            .publish(EventType::SubscribeTick, Payload::Subscribe(Subscribe::new(symbol)))
            .await
    }

    async fn send_order(&self, order: Order) -> Result<()> {
        self.engine().publish(EventType::SendOrder, Payload::Order(order)).await
    }

    async fn notify(&self, text: &str) -> Result<()> {
        self.engine()
            .publish(EventType::Message, Payload::Message(Message::new(text)))
            .await
    }
}

/// Register the strategy's `recv_*` callbacks. Called from the
/// strategy's `init`; callbacks hold weak handles, so a dropped strategy
/// is skipped at dispatch time.
pub fn register_strategy_callbacks<S: Strategy + 'static>(strategy: &Arc<S>) {
    let engine = strategy.engine();

    register_weak_callback(engine, EventType::Account, Arc::downgrade(strategy), |s, event| {
        async move {
            let Payload::Account(account) = event.payload.as_ref() else {
                return Ok(());
            };
            s.recv_account(account).await
        }
        .boxed()
    });

    register_weak_callback(engine, EventType::Position, Arc::downgrade(strategy), |s, event| {
        async move {
            let Payload::Position(position) = event.payload.as_ref() else {
                return Ok(());
            };
            s.recv_position(position).await
        }
        .boxed()
    });

    register_weak_callback(engine, EventType::Book, Arc::downgrade(strategy), |s, event| {
        async move {
            let Payload::Book(book) = event.payload.as_ref() else {
                return Ok(());
            };
            s.recv_book(book).await
        }
        .boxed()
    });

    register_weak_callback(engine, EventType::Tick, Arc::downgrade(strategy), |s, event| {
        async move {
            let Payload::Tick(tick) = event.payload.as_ref() else {
                return Ok(());
            };
            s.recv_tick(tick).await
        }
        .boxed()
    });

    register_weak_callback(engine, EventType::Order, Arc::downgrade(strategy), |s, event| {
        async move {
            let Payload::Order(order) = event.payload.as_ref() else {
                return Ok(());
            };
            s.recv_order(order).await
        }
        .boxed()
    });
}
