// ============================================================================
// Matching Engine
// One book per instrument; submissions, cancels and matching run under a
// single per-instrument lock
// ============================================================================

use crate::domain::config::{EngineConfig, MarketOrderPolicy, SettlementFailurePolicy};
use crate::domain::{
    AccountRegistry, Instrument, Order, OrderBook, OrderBookSnapshot, OrderStatus, Symbol, Trade,
};
use crate::engine::settlement::{SettlementError, TradeExecutor};
use crate::errors::{ExchangeError, ExchangeResult};
use crate::interfaces::{EventHandler, MatchProposal, MatchingAlgorithm, OrderEvent};
use crate::numeric::Price;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;

/// Result of a cancel request that reached the book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The order had already finished; nothing changed
    AlreadyTerminal(OrderStatus),
}

impl CancelOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CancelOutcome::Cancelled)
    }

    /// Treat "already terminal" as an error, for callers that expect the
    /// cancel to take effect.
    pub fn into_result(self, order: &Order) -> ExchangeResult<()> {
        match self {
            CancelOutcome::Cancelled => Ok(()),
            CancelOutcome::AlreadyTerminal(status) => Err(ExchangeError::AlreadyTerminalOrder {
                order_id: order.id,
                status,
            }),
        }
    }
}

/// Everything guarded by the instrument lock
struct EngineState {
    book: OrderBook,
    trades: Vec<Trade>,
    next_sequence: u64,
}

/// What the matching loop does after one proposal
enum Step {
    Continue,
    Halt,
}

/// Per-instrument matching engine with pluggable matching algorithm
pub struct MatchingEngine {
    instrument: Arc<Instrument>,

    /// Book, trade history and sequence counter
    state: Mutex<EngineState>,

    /// Pluggable matching algorithm
    algorithm: Box<dyn MatchingAlgorithm>,

    executor: TradeExecutor,

    market_order_policy: MarketOrderPolicy,
    settlement_failure_policy: SettlementFailurePolicy,

    /// Ledgers of every participant, looked up per trade
    accounts: Arc<AccountRegistry>,

    /// Receives every event, called with the instrument lock held
    event_handler: Arc<dyn EventHandler>,
}

impl MatchingEngine {
    /// Create a new matching engine
    pub fn new(
        instrument: Arc<Instrument>,
        algorithm: Box<dyn MatchingAlgorithm>,
        accounts: Arc<AccountRegistry>,
        event_handler: Arc<dyn EventHandler>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            state: Mutex::new(EngineState {
                book: OrderBook::new(instrument.symbol().clone()),
                trades: Vec::new(),
                next_sequence: 0,
            }),
            instrument,
            algorithm,
            executor: TradeExecutor::new(),
            market_order_policy: config.market_order_policy,
            settlement_failure_policy: config.settlement_failure_policy,
            accounts,
            event_handler,
        }
    }

    /// Add an OPEN order to the book and match to a fixed point.
    ///
    /// Funds and holdings are not checked here; settlement re-checks every
    /// trade. Returns the events produced, in order.
    pub fn submit(&self, order: Arc<Order>) -> ExchangeResult<Vec<OrderEvent>> {
        if &order.symbol != self.symbol() {
            return Err(ExchangeError::InstrumentNotFound(order.symbol.clone()));
        }
        debug_assert_eq!(order.get_sequence_number(), 0, "order submitted twice");

        let mut state = self.state.lock();
        let mut events = Vec::new();

        if order.is_market_order()
            && self.market_order_policy == MarketOrderPolicy::RejectWithoutLiquidity
            && state.book.side(order.side.opposite()).is_empty()
        {
            tracing::debug!(order_id = %order.id, symbol = %self.symbol(), "market order rejected, no liquidity");
            events.push(OrderEvent::OrderRejected {
                order_id: order.id,
                reason: "no opposite liquidity".to_string(),
                timestamp: Utc::now(),
            });
            self.event_handler.on_events(events);
            return Err(ExchangeError::NoLiquidity(self.symbol().clone()));
        }

        state.next_sequence += 1;
        let sequence = state.next_sequence;
        order.set_sequence_number(sequence);

        tracing::debug!(
            order_id = %order.id,
            symbol = %self.symbol(),
            side = ?order.side,
            kind = ?order.kind,
            quantity = order.quantity,
            sequence,
            "order accepted"
        );
        events.push(OrderEvent::OrderAccepted {
            order_id: order.id,
            account_id: order.account_id,
            symbol: order.symbol.clone(),
            side: order.side,
            kind: order.kind,
            quantity: order.quantity,
            sequence,
            timestamp: Utc::now(),
        });

        state.book.add_order(order);
        self.run_matching(&mut state, &mut events);

        // Dispatch before releasing the lock so subscribers see per-instrument
        // events in book order
        self.event_handler.on_events(events.clone());
        Ok(events)
    }

    /// Cancel a resting order.
    ///
    /// Succeeds only if the order is still non-terminal once the instrument
    /// lock is held; a fill that got there first wins.
    pub fn cancel(&self, order: &Order) -> ExchangeResult<CancelOutcome> {
        if &order.symbol != self.symbol() {
            return Err(ExchangeError::OrderNotFound(order.id));
        }

        let mut state = self.state.lock();
        match order.try_cancel() {
            Ok(()) => {
                state.book.remove_order(order);
                tracing::debug!(order_id = %order.id, symbol = %self.symbol(), "order cancelled");
                let event = Self::status_changed(order);
                self.event_handler.on_event(event);
                Ok(CancelOutcome::Cancelled)
            },
            Err(status) => {
                tracing::debug!(order_id = %order.id, ?status, "cancel on terminal order ignored");
                Ok(CancelOutcome::AlreadyTerminal(status))
            },
        }
    }

    /// Get order book snapshot
    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        self.state.lock().book.snapshot(depth)
    }

    /// Trades in execution order
    pub fn trades(&self) -> Vec<Trade> {
        self.state.lock().trades.clone()
    }

    /// Every order still resting, bids then asks, each in priority order
    pub fn open_orders(&self) -> Vec<Arc<Order>> {
        let state = self.state.lock();
        let mut orders = state.book.bids.orders();
        orders.extend(state.book.asks.orders());
        orders
    }

    pub fn instrument(&self) -> &Arc<Instrument> {
        &self.instrument
    }

    pub fn symbol(&self) -> &Symbol {
        self.instrument.symbol()
    }

    pub fn algorithm_name(&self) -> &str {
        self.algorithm.name()
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    /// Every iteration either fills at least one unit or cancels at least one
    /// order, so this always terminates.
    fn run_matching(&self, state: &mut EngineState, events: &mut Vec<OrderEvent>) {
        loop {
            // Read fresh each round: the previous trade may have moved it
            let reference_price = self.instrument.price();
            let Some(proposal) = self.algorithm.next_match(&state.book, reference_price) else {
                break;
            };

            let step = match self.settle(&proposal) {
                Ok(previous_price) => self.apply_fill(state, &proposal, previous_price, events),
                Err(err) => self.handle_settlement_failure(state, &proposal, err, events),
            };

            if let Step::Halt = step {
                break;
            }
        }
    }

    fn settle(
        &self,
        proposal: &MatchProposal,
    ) -> Result<Option<Price>, SettlementError> {
        let buyer = self
            .accounts
            .get(proposal.buy.account_id)
            .ok_or(SettlementError::UnknownAccount(proposal.buy.account_id))?;
        let seller = self
            .accounts
            .get(proposal.sell.account_id)
            .ok_or(SettlementError::UnknownAccount(proposal.sell.account_id))?;

        let settlement = self.executor.settle(
            &buyer,
            &seller,
            &self.instrument,
            proposal.quantity,
            proposal.price,
        )?;
        Ok(settlement.previous_price)
    }

    fn apply_fill(
        &self,
        state: &mut EngineState,
        proposal: &MatchProposal,
        previous_price: Option<Price>,
        events: &mut Vec<OrderEvent>,
    ) -> Step {
        let MatchProposal {
            buy,
            sell,
            quantity,
            price,
        } = proposal;

        // Only this engine writes fills, and only under the lock, so both
        // orders still have at least `quantity` left.
        let (Some(_), Some(_)) = (buy.try_fill(*quantity), sell.try_fill(*quantity)) else {
            tracing::error!(
                buy_order_id = %buy.id,
                sell_order_id = %sell.id,
                quantity,
                "fill rejected after settlement; book is inconsistent"
            );
            debug_assert!(false, "fill rejected after settlement");
            return Step::Halt;
        };

        state.book.record_fill(buy, *quantity);
        state.book.record_fill(sell, *quantity);

        let trade = Trade::new(
            self.symbol().clone(),
            buy.id,
            sell.id,
            buy.account_id,
            sell.account_id,
            *price,
            *quantity,
        );
        tracing::debug!(
            trade_id = %trade.id,
            symbol = %self.symbol(),
            %price,
            quantity,
            buy_order_id = %buy.id,
            sell_order_id = %sell.id,
            "orders matched"
        );
        state.trades.push(trade.clone());

        let timestamp = trade.timestamp;
        events.push(OrderEvent::OrderMatched { trade, timestamp });
        events.push(Self::status_changed(buy));
        events.push(Self::status_changed(sell));
        if let Some(previous_price) = previous_price {
            events.push(OrderEvent::PriceChanged {
                symbol: self.symbol().clone(),
                previous_price,
                price: *price,
                timestamp,
            });
        }

        Step::Continue
    }

    fn handle_settlement_failure(
        &self,
        state: &mut EngineState,
        proposal: &MatchProposal,
        err: SettlementError,
        events: &mut Vec<OrderEvent>,
    ) -> Step {
        let MatchProposal { buy, sell, .. } = proposal;

        let (mut cancel_buy, mut cancel_sell) = match self.settlement_failure_policy {
            SettlementFailurePolicy::CancelBoth => (true, true),
            SettlementFailurePolicy::CancelOffending => (
                err.buyer_at_fault(buy.account_id),
                err.seller_at_fault(sell.account_id),
            ),
        };
        if !cancel_buy && !cancel_sell {
            // Retrying the same pair would loop forever
            cancel_buy = true;
            cancel_sell = true;
        }

        tracing::warn!(
            symbol = %self.symbol(),
            buy_order_id = %buy.id,
            sell_order_id = %sell.id,
            reason = %err,
            cancel_buy,
            cancel_sell,
            "settlement failed, cancelling offending order"
        );
        events.push(OrderEvent::SettlementFailed {
            buy_order_id: buy.id,
            sell_order_id: sell.id,
            reason: err.to_string(),
            timestamp: Utc::now(),
        });

        let offending = [(cancel_buy, buy), (cancel_sell, sell)];
        for order in offending
            .into_iter()
            .filter_map(|(cancel, order)| cancel.then_some(order))
        {
            if order.try_cancel().is_ok() {
                state.book.remove_order(order);
                events.push(Self::status_changed(order));
            }
        }

        Step::Continue
    }

    fn status_changed(order: &Order) -> OrderEvent {
        let report = order.status_report();
        OrderEvent::OrderStatusChanged {
            order_id: order.id,
            account_id: order.account_id,
            symbol: order.symbol.clone(),
            status: report.status,
            remaining_quantity: report.remaining_quantity,
            timestamp: Utc::now(),
        }
    }
}
