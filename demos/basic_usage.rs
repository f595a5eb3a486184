// ============================================================================
// Basic Usage Example
// Run with: cargo run --example basic_usage --features logging
// ============================================================================

use exchange_engine::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

fn main() -> Result<(), ExchangeError> {
    #[cfg(feature = "logging")]
    exchange_engine::logging::init_logging();

    println!("=== Exchange Engine Example ===\n");

    let exchange =
        Exchange::with_event_handler(EngineConfig::default(), Arc::new(LoggingEventHandler))?;
    exchange.list_instrument("AAPL", Decimal::from(50))?;
    println!("Listed AAPL at 50\n");

    let alice = exchange.open_account(Decimal::from(1_000))?;
    let bob = exchange.open_account(Decimal::from(1_000))?;
    let carol = exchange.open_account(Decimal::ZERO)?;
    exchange.grant_position(carol, "AAPL", 20)?;

    let carol_updates = exchange.subscribe_account(carol)?;
    let prices = exchange.subscribe_prices("AAPL")?;

    // Two resting bids at different prices
    println!("Adding buy orders...");
    let alice_buy = exchange.submit_order(
        alice,
        "AAPL",
        Side::Buy,
        OrderType::Limit,
        10,
        Some(Decimal::from(55)),
    )?;
    let bob_buy = exchange.submit_order(
        bob,
        "AAPL",
        Side::Buy,
        OrderType::Limit,
        10,
        Some(Decimal::from(52)),
    )?;

    let snapshot = exchange.book_snapshot("AAPL", None)?;
    println!("Bids: {:?}", snapshot.bids);
    println!("Best bid: {:?}\n", snapshot.best_bid());

    // One aggressive sell sweeps both levels
    println!("Carol sells 20 @ 50...");
    let carol_sell = exchange.submit_order(
        carol,
        "AAPL",
        Side::Sell,
        OrderType::Limit,
        20,
        Some(Decimal::from(50)),
    )?;

    println!("\n=== Trades ===");
    for trade in exchange.trades("AAPL")? {
        println!(
            "  {} x {} @ {} (buy {} / sell {})",
            trade.symbol, trade.quantity, trade.price, trade.buy_order_id, trade.sell_order_id
        );
    }

    println!("\n=== Order Status ===");
    for (name, order_id) in [("alice", alice_buy), ("bob", bob_buy), ("carol", carol_sell)] {
        let report = exchange.get_order_status(order_id)?;
        println!(
            "  {name}: {:?}, remaining {}",
            report.status, report.remaining_quantity
        );
    }

    println!("\n=== Accounts ===");
    for (name, account) in [("alice", alice), ("bob", bob), ("carol", carol)] {
        let snapshot = exchange.get_account_snapshot(account)?;
        println!(
            "  {name}: cash {}, AAPL {}",
            snapshot.cash_balance,
            snapshot.position("AAPL")
        );
    }

    println!("\n=== Notifications ===");
    for notification in carol_updates.try_iter().chain(prices.try_iter()) {
        println!("  {notification:?}");
    }

    // Cancelling a finished order changes nothing
    let outcome = exchange.cancel_order(alice_buy)?;
    println!("\nCancel alice's filled order: {outcome:?}");
    println!("AAPL last price: {}", exchange.instrument_price("AAPL")?);

    println!("\n=== Example Complete ===");
    Ok(())
}
