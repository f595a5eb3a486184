// ============================================================================
// Exchange Facade
// External entry point: accounts, listings, orders and subscriptions,
// routed to the per-instrument matching engines
// ============================================================================

use crate::domain::config::EngineConfig;
use crate::domain::{
    Account, AccountId, AccountRegistry, AccountSnapshot, Instrument, InstrumentId, Order,
    OrderBookSnapshot, OrderId, OrderKind, OrderStatusReport, OrderType, Side, Symbol, Trade,
    MAX_ORDER_QUANTITY,
};
use crate::engine::{create_from_config, CancelOutcome, MatchingEngine};
use crate::errors::{ExchangeError, ExchangeResult, ValidationError};
use crate::interfaces::{EventHandler, FanOutEventHandler};
use crate::numeric::{is_on_tick, notional, Cash, Price, Quantity};
use crate::service::notifications::{Notification, NotificationHub, SubscriptionFilter};
use crossbeam::channel::Receiver;
use crossbeam_skiplist::SkipMap;
use rust_decimal::Decimal;
use std::sync::Arc;

/// The exchange: one shared instance per process, passed to every caller.
///
/// Each listed instrument owns a [`MatchingEngine`] with its own lock, so
/// order flow on different symbols never contends.
pub struct Exchange {
    config: EngineConfig,
    accounts: Arc<AccountRegistry>,
    books: SkipMap<Symbol, Arc<MatchingEngine>>,
    orders: SkipMap<OrderId, Arc<Order>>,
    notifications: Arc<NotificationHub>,
    event_handler: Arc<dyn EventHandler>,
}

impl Exchange {
    pub fn new(config: EngineConfig) -> ExchangeResult<Self> {
        config.validate()?;
        let notifications = Arc::new(NotificationHub::new(config.notification_capacity));
        let event_handler: Arc<dyn EventHandler> = notifications.clone();
        Ok(Self::assemble(config, notifications, event_handler))
    }

    /// Like [`Exchange::new`], additionally forwarding every engine event to
    /// `handler` (after subscribers have been notified).
    pub fn with_event_handler(
        config: EngineConfig,
        handler: Arc<dyn EventHandler>,
    ) -> ExchangeResult<Self> {
        config.validate()?;
        let notifications = Arc::new(NotificationHub::new(config.notification_capacity));
        let hub: Arc<dyn EventHandler> = notifications.clone();
        let fan_out = FanOutEventHandler::new(vec![hub, handler]);
        Ok(Self::assemble(config, notifications, Arc::new(fan_out)))
    }

    fn assemble(
        config: EngineConfig,
        notifications: Arc<NotificationHub>,
        event_handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            config,
            accounts: Arc::new(AccountRegistry::new()),
            books: SkipMap::new(),
            orders: SkipMap::new(),
            notifications,
            event_handler,
        }
    }

    // ========================================================================
    // Accounts and listings
    // ========================================================================

    pub fn open_account(&self, initial_cash: Cash) -> ExchangeResult<AccountId> {
        if initial_cash < Decimal::ZERO {
            return Err(ValidationError::NegativeCash(initial_cash).into());
        }
        let account = self.accounts.open(initial_cash);
        tracing::info!(account_id = %account.id(), %initial_cash, "account opened");
        Ok(account.id())
    }

    /// Seed an account with shares of a listed instrument
    pub fn grant_position(
        &self,
        account_id: AccountId,
        symbol: &str,
        quantity: Quantity,
    ) -> ExchangeResult<()> {
        let engine = self.engine(symbol)?;
        let account = self.account(account_id)?;
        account.ledger().add_position(engine.symbol(), quantity)?;
        tracing::info!(%account_id, symbol, quantity, "position granted");
        Ok(())
    }

    pub fn list_instrument(
        &self,
        symbol: impl Into<Symbol>,
        initial_price: Price,
    ) -> ExchangeResult<InstrumentId> {
        let symbol = symbol.into();
        if symbol.as_str().is_empty() {
            return Err(ValidationError::EmptySymbol.into());
        }
        if initial_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(initial_price).into());
        }

        let instrument = Arc::new(Instrument::new(symbol.clone(), initial_price));
        let engine = Arc::new(create_from_config(
            &self.config,
            Arc::clone(&instrument),
            Arc::clone(&self.accounts),
            Arc::clone(&self.event_handler),
        )?);

        // Whoever inserts first owns the listing
        let entry = self.books.get_or_insert(symbol.clone(), Arc::clone(&engine));
        if !Arc::ptr_eq(entry.value(), &engine) {
            return Err(ExchangeError::DuplicateInstrument(symbol));
        }

        tracing::info!(%symbol, %initial_price, "instrument listed");
        Ok(instrument.id())
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Validate, pre-check and submit an order.
    ///
    /// Pre-checks reserve nothing: a limit buy needs cash for
    /// `quantity * limit`, a market buy for `quantity * reference price`, a
    /// sell needs the shares. Settlement checks again at trade time.
    pub fn submit_order(
        &self,
        account_id: AccountId,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        limit_price: Option<Price>,
    ) -> ExchangeResult<OrderId> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }
        if quantity > MAX_ORDER_QUANTITY {
            return Err(ValidationError::QuantityTooLarge {
                max: MAX_ORDER_QUANTITY,
            }
            .into());
        }
        let kind = OrderKind::from_request(order_type, limit_price)?;
        if let (Some(tick_size), Some(price)) = (self.config.tick_size, kind.limit_price()) {
            if !is_on_tick(price, tick_size) {
                return Err(ValidationError::OffTick { price, tick_size }.into());
            }
        }

        let engine = self.engine(symbol)?;
        let account = self.account(account_id)?;

        {
            let ledger = account.ledger();
            match (side, kind) {
                (Side::Buy, OrderKind::Limit { limit_price }) => {
                    ledger.ensure_funds(notional(limit_price, quantity)?)?
                },
                (Side::Buy, OrderKind::Market) => {
                    ledger.ensure_funds(notional(engine.instrument().price(), quantity)?)?
                },
                (Side::Sell, _) => ledger.ensure_position(engine.symbol(), quantity)?,
            }
        }

        let order = Arc::new(Order::new(
            account_id,
            engine.symbol().clone(),
            side,
            kind,
            quantity,
        ));
        let order_id = order.id;

        // Index first so a status query racing the engine's events finds it
        self.orders.insert(order_id, Arc::clone(&order));
        if let Err(err) = engine.submit(order) {
            self.orders.remove(&order_id);
            return Err(err);
        }
        account.record_order(order_id);

        Ok(order_id)
    }

    pub fn cancel_order(&self, order_id: OrderId) -> ExchangeResult<CancelOutcome> {
        let order = self.order(order_id)?;
        let engine = self.engine(order.symbol.as_str())?;
        engine.cancel(&order)
    }

    pub fn get_order_status(&self, order_id: OrderId) -> ExchangeResult<OrderStatusReport> {
        Ok(self.order(order_id)?.status_report())
    }

    /// The order itself, retained after it finishes
    pub fn order(&self, order_id: OrderId) -> ExchangeResult<Arc<Order>> {
        self.orders
            .get(&order_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ExchangeError::OrderNotFound(order_id))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_account_snapshot(&self, account_id: AccountId) -> ExchangeResult<AccountSnapshot> {
        Ok(self.account(account_id)?.snapshot())
    }

    /// Orders the account has placed, oldest first
    pub fn account_orders(&self, account_id: AccountId) -> ExchangeResult<Vec<OrderId>> {
        Ok(self.account(account_id)?.order_ids())
    }

    pub fn instrument_price(&self, symbol: &str) -> ExchangeResult<Price> {
        Ok(self.engine(symbol)?.instrument().price())
    }

    /// Trades on `symbol` in execution order
    pub fn trades(&self, symbol: &str) -> ExchangeResult<Vec<Trade>> {
        Ok(self.engine(symbol)?.trades())
    }

    /// Aggregated book; `None` uses the configured default depth
    pub fn book_snapshot(
        &self,
        symbol: &str,
        depth: Option<usize>,
    ) -> ExchangeResult<OrderBookSnapshot> {
        let depth = depth.unwrap_or(self.config.snapshot_depth);
        Ok(self.engine(symbol)?.snapshot(depth))
    }

    /// Listed symbols, sorted
    pub fn symbols(&self) -> Vec<Symbol> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn accounts(&self) -> &Arc<AccountRegistry> {
        &self.accounts
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Status changes of the account's orders
    pub fn subscribe_account(&self, account_id: AccountId) -> ExchangeResult<Receiver<Notification>> {
        self.account(account_id)?;
        Ok(self
            .notifications
            .subscribe(SubscriptionFilter::Account(account_id)))
    }

    /// Price changes of one instrument
    pub fn subscribe_prices(&self, symbol: &str) -> ExchangeResult<Receiver<Notification>> {
        let engine = self.engine(symbol)?;
        Ok(self
            .notifications
            .subscribe(SubscriptionFilter::Prices(engine.symbol().clone())))
    }

    pub fn subscribe_all(&self) -> Receiver<Notification> {
        self.notifications.subscribe(SubscriptionFilter::All)
    }

    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    fn engine(&self, symbol: &str) -> ExchangeResult<Arc<MatchingEngine>> {
        self.books
            .get(symbol)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ExchangeError::InstrumentNotFound(Symbol::from(symbol)))
    }

    fn account(&self, account_id: AccountId) -> ExchangeResult<Arc<Account>> {
        self.accounts
            .get(account_id)
            .ok_or(ExchangeError::AccountNotFound(account_id))
    }
}

impl Default for Exchange {
    fn default() -> Self {
        let config = EngineConfig::default();
        let notifications = Arc::new(NotificationHub::new(config.notification_capacity));
        let event_handler: Arc<dyn EventHandler> = notifications.clone();
        Self::assemble(config, notifications, event_handler)
    }
}
