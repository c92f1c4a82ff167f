//! OKX venue adapter.
//!
//! Implements the gateway contract over the signed REST client plus two
//! streaming sessions: the public one for `books`/`tickers`, the private
//! one (after login) for `account`/`positions`/`orders`. Inbound frames
//! are translated into the engine's data model; request events are
//! translated into REST calls or subscription frames.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use engine::{
    register_gateway_callbacks, Account, BalanceItem, Book, BookItem, Component, Direction,
    Engine, Gateway, Order, OrderItem, OrderStatus, OrderType, Position, PositionItem, Subscribe,
    Tick,
};
use market_cache::ConcurrentMap;

use crate::config::{OkxConfig, PRIVATE_PATH, PUBLIC_PATH};
use crate::error::GatewayError;
use crate::rest::OkxRest;
use crate::types::{
    CancelOrderRequest, OkxAccount, OkxPendingOrder, OkxPosition, SendOrderRequest, SubscribeArg,
    WsBook, WsMessage, WsOrder, WsPayload, WsRequest, WsTick,
};
use crate::ws::OkxWs;

const VENUE: &str = "okx";
const STREAM_QUEUE_SIZE: usize = 256;
const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Most-recent market data for one symbol: the book/tick join lives here.
#[derive(Debug, Clone, Default)]
pub struct SingleMarket {
    pub last_book: Option<Book>,
    pub last_tick: Option<Tick>,
}

pub struct OkxGateway {
    engine: Arc<Engine>,
    config: Arc<OkxConfig>,
    rest: OkxRest,
    public: OkxWs,
    private: OkxWs,
    markets: ConcurrentMap<String, SingleMarket>,
    order_states: Mutex<HashMap<String, OrderStatus>>,
}

impl OkxGateway {
    pub fn new(engine: Arc<Engine>, config: OkxConfig) -> Result<Self, GatewayError> {
        let config = Arc::new(config);
        let rest = OkxRest::new(config.clone())?;
        let public = OkxWs::new(config.ws_base(), PUBLIC_PATH, STREAM_QUEUE_SIZE, config.sim, None);
        let private = OkxWs::new(
            config.ws_base(),
            PRIVATE_PATH,
            STREAM_QUEUE_SIZE,
            config.sim,
            Some(config.clone()),
        );
        Ok(Self {
            engine,
            config,
            rest,
            public,
            private,
            markets: ConcurrentMap::new(),
            order_states: Mutex::new(HashMap::new()),
        })
    }

    /// Snapshot of the cached market data for one symbol.
    pub fn market(&self, symbol: &str) -> Option<SingleMarket> {
        self.markets.get(&symbol.to_owned())
    }

    async fn login(&self) -> Result<(), GatewayError> {
        let frame = WsRequest::login(&self.config, Utc::now().timestamp());
        self.private.write(&frame).await?;

        tokio::time::timeout(LOGIN_TIMEOUT, async {
            loop {
                let msg = self.private.read().await?;
                if msg.event == "login" {
                    if msg.code == 0 {
                        info!("private stream login acknowledged");
                        return Ok(());
                    }
                    return Err(GatewayError::Auth { code: msg.code, msg: msg.msg });
                }
                if msg.event == "error" {
                    return Err(GatewayError::Auth { code: msg.code, msg: msg.msg });
                }
                debug!(event = %msg.event, "frame before login ack");
            }
        })
        .await
        .map_err(|_| GatewayError::LoginTimeout)?
    }

    async fn watch_public(&self) -> Result<()> {
        loop {
            let msg = self.public.read().await?;
            if msg.event == "error" {
                error!(code = msg.code, msg = %msg.msg, "public stream error frame");
                continue;
            }
            if msg.is_event() {
                info!(event = %msg.event, "public stream event");
                continue;
            }
            match msg.arg.channel.as_str() {
                "books" | "books5" => self.handle_books(&msg).await?,
                "tickers" => self.handle_ticks(&msg).await?,
                channel => warn!(channel, "dropping frame from unknown public channel"),
            }
        }
    }

    async fn watch_private(&self) -> Result<()> {
        loop {
            let msg = self.private.read().await?;
            if msg.event == "error" {
                error!(code = msg.code, msg = %msg.msg, "private stream error frame");
                continue;
            }
            if msg.is_event() {
                info!(event = %msg.event, "private stream event");
                continue;
            }
            match msg.arg.channel.as_str() {
                "account" => self.handle_account(&msg).await?,
                "positions" => self.handle_positions(&msg).await?,
                "orders" => self.handle_orders(&msg).await?,
                channel => warn!(channel, "dropping frame from unknown private channel"),
            }
        }
    }

    async fn handle_books(&self, msg: &WsMessage) -> Result<()> {
        let Some(WsPayload::Books(books)) = &msg.payload else {
            return Ok(());
        };
        for ws_book in books {
            let book = translate_book(&msg.arg.inst_id, ws_book);
            self.markets.apply(|markets| {
                markets.entry(book.symbol.clone()).or_default().last_book = Some(book.clone());
            });
            self.on_book(book).await?;
        }
        Ok(())
    }

    async fn handle_ticks(&self, msg: &WsMessage) -> Result<()> {
        let Some(WsPayload::Tickers(ticks)) = &msg.payload else {
            return Ok(());
        };
        for ws_tick in ticks {
            let mut tick = translate_tick(&msg.arg.inst_id, ws_tick);
            self.markets.apply(|markets| {
                let market = markets.entry(tick.symbol.clone()).or_default();
                tick.order_book = market.last_book.clone().map(Box::new);
                market.last_tick = Some(tick.clone());
            });
            self.on_tick(tick).await?;
        }
        Ok(())
    }

    async fn handle_account(&self, msg: &WsMessage) -> Result<()> {
        let Some(WsPayload::Account(accounts)) = &msg.payload else {
            return Ok(());
        };
        for account in accounts {
            self.on_account(translate_account(account)).await?;
        }
        Ok(())
    }

    async fn handle_positions(&self, msg: &WsMessage) -> Result<()> {
        let Some(WsPayload::Positions(positions)) = &msg.payload else {
            return Ok(());
        };
        self.on_position(translate_positions(positions)).await
    }

    async fn handle_orders(&self, msg: &WsMessage) -> Result<()> {
        let Some(WsPayload::Orders(orders)) = &msg.payload else {
            return Ok(());
        };

        let mut items = Vec::new();
        let mut latest_ts = 0i64;
        for raw in orders {
            let Some(status) = order_status_from_state(&raw.state) else {
                warn!(state = %raw.state, order_id = %raw.ord_id, "unknown order state");
                continue;
            };
            if !self.track_order_status(&raw.ord_id, status) {
                warn!(order_id = %raw.ord_id, ?status, "dropping backward order state transition");
                continue;
            }
            latest_ts = latest_ts.max(raw.u_time as i64);
            items.push(translate_order_update(raw, status));
        }

        if items.is_empty() {
            return Ok(());
        }
        self.on_order(Order { exchange: VENUE.into(), timestamp_ms: latest_ts, items })
            .await
    }

    /// Record the order's new status; false means the update moves
    /// backward (or out of a terminal state) and must be dropped.
    fn track_order_status(&self, order_id: &str, next: OrderStatus) -> bool {
        let mut states = self.order_states.lock();
        match states.get(order_id) {
            Some(previous) if !previous.can_transition(next) => false,
            _ => {
                states.insert(order_id.to_owned(), next);
                true
            }
        }
    }
}

#[async_trait]
impl Component for OkxGateway {
    fn name(&self) -> &str {
        VENUE
    }

    async fn init(self: Arc<Self>) -> Result<()> {
        register_gateway_callbacks(&self);
        self.market_init().await
    }

    async fn run(self: Arc<Self>) -> Result<()> {
        let (public, private) = tokio::join!(self.watch_public(), self.watch_private());
        if let Err(e) = public {
            let chain = format!("{e:#}");
            error!(error = %chain, "public watcher exited");
        }
        if let Err(e) = private {
            let chain = format!("{e:#}");
            error!(error = %chain, "private watcher exited");
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for OkxGateway {
    fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    fn venue(&self) -> &str {
        VENUE
    }

    async fn market_init(&self) -> Result<()> {
        self.public.connect().await?;
        self.private.connect().await?;
        self.login().await?;

        self.private
            .write(&WsRequest::subscribe(vec![SubscribeArg::bare("account")]))
            .await?;
        self.private
            .write(&WsRequest::subscribe(vec![SubscribeArg::instrument_type(
                "positions", "SWAP",
            )]))
            .await?;
        self.private
            .write(&WsRequest::subscribe(vec![SubscribeArg::instrument_type(
                "orders", "SWAP",
            )]))
            .await?;
        info!("okx gateway initialized");
        Ok(())
    }

    async fn subscribe_book(&self, sub: Subscribe) -> Result<()> {
        self.public
            .write(&WsRequest::subscribe(vec![SubscribeArg::instrument("books", &sub.symbol)]))
            .await?;
        Ok(())
    }

    async fn subscribe_tick(&self, sub: Subscribe) -> Result<()> {
        self.public
            .write(&WsRequest::subscribe(vec![SubscribeArg::instrument(
                "tickers",
                &sub.symbol,
            )]))
            .await?;
        Ok(())
    }

    async fn send_orders(&self, order: Order) -> Result<()> {
        if order.items.is_empty() {
            return Ok(());
        }
        let requests: Vec<SendOrderRequest> =
            order.items.iter().map(build_order_request).collect();
        let acks = self.rest.send_orders(&requests).await?;
        for ack in &acks {
            if ack.s_code != 0 {
                error!(code = ack.s_code, msg = %ack.s_msg, "order rejected by venue");
            } else {
                info!(order_id = %ack.ord_id, "order accepted");
                self.track_order_status(&ack.ord_id, OrderStatus::Submitting);
            }
        }
        Ok(())
    }

    async fn cancel_orders(&self, order: Order) -> Result<()> {
        let cancels: Vec<CancelOrderRequest> = order
            .items
            .iter()
            .filter_map(|item| {
                item.order_id.as_ref().map(|id| CancelOrderRequest {
                    inst_id: item.symbol.clone(),
                    ord_id: id.clone(),
                    cl_ord_id: None,
                })
            })
            .collect();
        if cancels.is_empty() {
            return Ok(());
        }
        let acks = self.rest.cancel_orders(&cancels).await?;
        for ack in &acks {
            if ack.s_code != 0 {
                error!(code = ack.s_code, msg = %ack.s_msg, order_id = %ack.ord_id, "cancel rejected by venue");
            }
        }
        Ok(())
    }

    async fn query_account(&self) -> Result<()> {
        let account = self.rest.get_account().await?;
        self.on_account(translate_account(&account)).await
    }

    async fn query_position(&self) -> Result<()> {
        let positions = self.rest.get_positions().await?;
        self.on_position(translate_positions(&positions)).await
    }

    async fn query_order(&self) -> Result<()> {
        let orders = self.rest.get_pending_orders().await?;
        self.on_order(translate_pending_orders(&orders)).await
    }
}

fn translate_book(symbol: &str, ws: &WsBook) -> Book {
    Book {
        symbol: symbol.to_owned(),
        exchange: VENUE.into(),
        timestamp_ms: ws.ts,
        bids: ws.bids.iter().map(|row| BookItem::new(row.price, row.size)).collect(),
        asks: ws.asks.iter().map(|row| BookItem::new(row.price, row.size)).collect(),
    }
}

fn translate_tick(symbol: &str, ws: &WsTick) -> Tick {
    Tick {
        symbol: symbol.to_owned(),
        exchange: VENUE.into(),
        timestamp_ms: ws.ts,
        last_price: ws.last,
        last_volume: ws.last_sz,
        turnover: ws.last * ws.last_sz,
        open_price: ws.open_24h,
        high_price: ws.high_24h,
        low_price: ws.low_24h,
        // the venue reports no previous close; open24h is the stand-in
        last_close_price: ws.open_24h,
        order_book: None,
    }
}

fn translate_account(raw: &OkxAccount) -> Account {
    Account {
        exchange: VENUE.into(),
        timestamp_ms: raw.u_time as i64,
        account_id: String::new(),
        balance: raw.total_eq,
        frozen_balance: raw.ord_froz,
        items: raw
            .details
            .iter()
            .map(|detail| BalanceItem {
                symbol: detail.ccy.clone(),
                balance: detail.eq,
                frozen_balance: detail.frozen_bal,
            })
            .collect(),
    }
}

fn translate_positions(raw: &[OkxPosition]) -> Position {
    Position {
        exchange: VENUE.into(),
        timestamp_ms: raw.first().map(|p| p.u_time as i64).unwrap_or_default(),
        items: raw
            .iter()
            .map(|p| PositionItem {
                symbol: p.ccy.clone(),
                volume: p.pos,
                direction: if p.pos_side == "long" { Direction::Buy } else { Direction::Sell },
                frozen_volume: (p.pos - p.avail_pos).max(Decimal::ZERO),
                price: p.avg_px,
                pnl: p.upl,
            })
            .collect(),
    }
}

fn translate_order_update(raw: &WsOrder, status: OrderStatus) -> OrderItem {
    OrderItem {
        symbol: raw.inst_id.clone(),
        exchange: VENUE.into(),
        timestamp_ms: raw.u_time as i64,
        order_id: Some(raw.ord_id.clone()),
        direction: if raw.side == "sell" { Direction::Sell } else { Direction::Buy },
        price: raw.px,
        volume: raw.sz,
        filled_volume: raw.acc_fill_sz,
        order_type: if raw.ord_type == "market" { OrderType::Market } else { OrderType::Limit },
        status,
    }
}

fn translate_pending_orders(raw: &[OkxPendingOrder]) -> Order {
    Order {
        exchange: VENUE.into(),
        timestamp_ms: raw.iter().map(|o| o.u_time as i64).max().unwrap_or_default(),
        items: raw
            .iter()
            .map(|o| OrderItem {
                symbol: o.inst_id.clone(),
                exchange: VENUE.into(),
                timestamp_ms: o.u_time as i64,
                order_id: Some(o.ord_id.clone()),
                direction: if o.side == "sell" { Direction::Sell } else { Direction::Buy },
                price: o.px,
                volume: o.sz,
                filled_volume: o.acc_fill_sz,
                order_type: if o.ord_type == "market" {
                    OrderType::Market
                } else {
                    OrderType::Limit
                },
                status: order_status_from_state(&o.state).unwrap_or(OrderStatus::Pending),
            })
            .collect(),
    }
}

fn order_status_from_state(state: &str) -> Option<OrderStatus> {
    match state {
        "live" => Some(OrderStatus::Pending),
        "partially_filled" => Some(OrderStatus::PartialFilled),
        "filled" => Some(OrderStatus::Filled),
        "canceled" => Some(OrderStatus::Cancelled),
        "rejected" | "reject" => Some(OrderStatus::Rejected),
        _ => None,
    }
}

/// Map one order line to the venue request shape. Symbols containing
/// `SWAP` are derivatives: cross margin with an explicit position side.
/// Spot lines use cash margin with a base-currency target size.
fn build_order_request(item: &OrderItem) -> SendOrderRequest {
    let swap = item.symbol.contains("SWAP");
    SendOrderRequest {
        inst_id: item.symbol.clone(),
        td_mode: if swap { "cross" } else { "cash" }.into(),
        side: match item.direction {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
        .into(),
        pos_side: swap.then(|| {
            match item.direction {
                Direction::Buy => "long",
                Direction::Sell => "short",
            }
            .into()
        }),
        ord_type: match item.order_type {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
        }
        .into(),
        tgt_ccy: (!swap).then(|| "base_ccy".into()),
        px: (item.order_type == OrderType::Limit).then_some(item.price),
        sz: item.volume,
        cl_ord_id: None,
        tag: None,
    }
}
