//! Protocol-independent exchange gateway base.
//!
//! A venue adapter implements [`Gateway`]; the base wires the engine's
//! request events (orders, queries, subscriptions) to the adapter methods
//! and provides the upward helpers that publish venue data back into the
//! engine.

use std::sync::{Arc, Weak};

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::component::Component;
use crate::engine::Engine;
use crate::events::{Event, EventType, Payload};
use crate::objects::{Account, Book, Order, Position, Subscribe, Tick, Trade};

/// The adapter surface every venue gateway implements, plus the upward
/// publishing helpers shared by all of them.
#[async_trait]
pub trait Gateway: Component {
    fn engine(&self) -> &Arc<Engine>;

    /// Venue name stamped onto every outgoing record, e.g. `"okx"`.
    fn venue(&self) -> &str;

    /// Connect sessions and perform venue handshakes. Failures here are
    /// fatal and abort engine startup.
    async fn market_init(&self) -> Result<()>;

    async fn subscribe_book(&self, sub: Subscribe) -> Result<()>;
    async fn subscribe_tick(&self, sub: Subscribe) -> Result<()>;
    async fn send_orders(&self, order: Order) -> Result<()>;
    async fn cancel_orders(&self, order: Order) -> Result<()>;
    async fn query_account(&self) -> Result<()>;
    async fn query_position(&self) -> Result<()>;
    async fn query_order(&self) -> Result<()>;

    async fn on_tick(&self, tick: Tick) -> Result<()> {
        self.engine().publish(EventType::Tick, Payload::Tick(tick)).await
    }

    async fn on_book(&self, book: Book) -> Result<()> {
        self.engine().publish(EventType::Book, Payload::Book(book)).await
    }

    async fn on_order(&self, order: Order) -> Result<()> {
        self.engine().publish(EventType::Order, Payload::Order(order)).await
    }

    async fn on_trade(&self, trade: Trade) -> Result<()> {
        self.engine().publish(EventType::Trade, Payload::Trade(trade)).await
    }

    async fn on_position(&self, position: Position) -> Result<()> {
        self.engine()
            .publish(EventType::Position, Payload::Position(position))
            .await
    }

    async fn on_account(&self, account: Account) -> Result<()> {
        self.engine()
            .publish(EventType::Account, Payload::Account(account))
            .await
    }
}

/// Register a callback that holds only a weak handle to its component.
/// The dispatcher upgrades at invocation time and skips the call once the
/// component is gone.
pub fn register_weak_callback<C, F>(engine: &Engine, event_type: EventType, weak: Weak<C>, call: F)
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Event) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
{
    engine.register_callback(
        event_type,
        Arc::new(move |event| match weak.upgrade() {
            Some(component) => call(component, event),
            None => async { Ok(()) }.boxed(),
        }),
    );
}

/// Subscribe the adapter to the engine's request events. Called from the
/// adapter's `init`.
pub fn register_gateway_callbacks<G: Gateway + 'static>(gateway: &Arc<G>) {
    let engine = gateway.engine();

    register_weak_callback(engine, EventType::SendOrder, Arc::downgrade(gateway), |g, event| {
        async move {
            let Payload::Order(order) = event.payload.as_ref() else {
                return Ok(());
            };
            g.send_orders(order.clone()).await
        }
        .boxed()
    });

    register_weak_callback(engine, EventType::SubscribeBook, Arc::downgrade(gateway), |g, event| {
        async move {
            let Payload::Subscribe(sub) = event.payload.as_ref() else {
                return Ok(());
            };
            g.subscribe_book(sub.clone()).await
        }
        .boxed()
    });

    register_weak_callback(engine, EventType::SubscribeTick, Arc::downgrade(gateway), |g, event| {
        async move {
            let Payload::Subscribe(sub) = event.payload.as_ref() else {
                return Ok(());
            };
            g.subscribe_tick(sub.clone()).await
        }
        .boxed()
    });

    register_weak_callback(engine, EventType::QueryAccount, Arc::downgrade(gateway), |g, _event| {
        async move { g.query_account().await }.boxed()
    });

    register_weak_callback(engine, EventType::QueryPosition, Arc::downgrade(gateway), |g, _event| {
        async move { g.query_position().await }.boxed()
    });

    register_weak_callback(engine, EventType::QueryOrder, Arc::downgrade(gateway), |g, _event| {
        async move { g.query_order().await }.boxed()
    });
}
