//! Integration tests for the daily simulation loop.
//!
//! Tests:
//! 1. Single-key round trip: buy, mark, sell
//! 2. Composite keys: long target, short acquirer on one day
//! 3. Missing prices: fatal for orders, a zero-valued gap for holdings
//! 4. Days without orders: invested capital moves only with prices
//! 5. Replay determinism

use arblab_core::data::{DuplicatePolicy, PriceOracle, TradingCalendar};
use arblab_core::domain::{InstrumentKey, Leg, Order, PriceRecord};
use arblab_core::engine::{simulate, OrderBook, Simulation, SimulationConfig, SimulationState};
use arblab_core::SimError;
use chrono::NaiveDate;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn build(records: &[PriceRecord]) -> (TradingCalendar, PriceOracle) {
    let oracle = PriceOracle::build(records, DuplicatePolicy::Fail).unwrap();
    (oracle.calendar(), oracle)
}

// ── 1. Single-key round trip ─────────────────────────────────────────

#[test]
fn aapl_buy_mark_sell() {
    let aapl = InstrumentKey::single("AAPL");
    let (calendar, oracle) = build(&[
        PriceRecord::new(d("2024-01-02"), aapl.clone(), 150.0),
        PriceRecord::new(d("2024-01-03"), aapl.clone(), 160.0),
        PriceRecord::new(d("2024-01-04"), aapl.clone(), 160.0),
    ]);
    let book = OrderBook::new(vec![
        Order::new(d("2024-01-02"), aapl.clone(), 100),
        Order::new(d("2024-01-04"), aapl.clone(), -100),
    ]);

    let config = SimulationConfig::with_capital(100_000.0);
    let out = simulate(&calendar, &oracle, &book, config).unwrap();

    assert_eq!(out.trace.values(), vec![100_000.0, 101_000.0, 101_000.0]);
    assert_eq!(out.trace.invested(), vec![15_000.0, 16_000.0, 0.0]);
    assert_eq!(out.final_cash, 101_000.0);
    assert!(out.final_positions.is_empty());

    let last = out.trace.last().unwrap();
    assert!(last.holdings.is_empty());
    assert_eq!(last.cash, 101_000.0);
}

// ── 2. Composite keys ────────────────────────────────────────────────

#[test]
fn composite_long_short_pair() {
    let target = InstrumentKey::composite("0", Leg::Target);
    let acquirer = InstrumentKey::composite("0", Leg::Acquirer);
    let day = d("2024-03-01");
    let (calendar, oracle) = build(&[
        PriceRecord::new(day, target.clone(), 50.0),
        PriceRecord::new(day, acquirer.clone(), 80.0),
    ]);
    let book = OrderBook::new(vec![
        Order::new(day, target.clone(), 1000),
        Order::new(day, acquirer.clone(), -1000),
    ]);

    let out = simulate(&calendar, &oracle, &book, SimulationConfig::with_capital(0.0)).unwrap();
    let record = out.trace.get(day).unwrap();

    assert_eq!(record.invested_capital, -30_000.0);
    assert_eq!(record.cash, 30_000.0);
    assert_eq!(record.value, 0.0);
    assert_eq!(record.gross_exposure, 130_000.0);
    assert_eq!(record.holdings.get(&target), Some(&1000));
    assert_eq!(record.holdings.get(&acquirer), Some(&-1000));
}

#[test]
fn composite_and_single_keys_do_not_collide() {
    let composite = InstrumentKey::composite("1", Leg::Target);
    let lookalike = InstrumentKey::single("1:target");
    let day = d("2024-03-01");
    let (calendar, oracle) = build(&[PriceRecord::new(day, composite.clone(), 10.0)]);
    let book = OrderBook::new(vec![Order::new(day, lookalike.clone(), 1)]);

    let err = simulate(&calendar, &oracle, &book, SimulationConfig::default()).unwrap_err();
    assert_eq!(err, SimError::MissingPrice { date: day, key: lookalike });
}

// ── 3. Missing prices ────────────────────────────────────────────────

#[test]
fn missing_order_price_is_fatal_and_names_date_and_key() {
    let a = InstrumentKey::single("A");
    let b = InstrumentKey::single("B");
    let (calendar, oracle) = build(&[
        PriceRecord::new(d("2024-01-02"), a.clone(), 10.0),
        PriceRecord::new(d("2024-01-03"), a.clone(), 10.0),
    ]);
    let book = OrderBook::new(vec![Order::new(d("2024-01-03"), b.clone(), 5)]);

    let mut sim = Simulation::new(&calendar, &oracle, &book, SimulationConfig::default()).unwrap();
    assert!(sim.step().unwrap().is_some());
    let err = sim.step().unwrap_err();
    assert_eq!(err, SimError::MissingPrice { date: d("2024-01-03"), key: b });
    assert_eq!(err.to_string(), "price not found for B on 2024-01-03");
    assert_eq!(sim.state(), SimulationState::Aborted);
    assert_eq!(sim.trace().len(), 1);
}

#[test]
fn held_position_without_price_is_a_gap_not_an_error() {
    let a = InstrumentKey::single("A");
    let b = InstrumentKey::single("B");
    let (calendar, oracle) = build(&[
        PriceRecord::new(d("2024-01-02"), a.clone(), 10.0),
        PriceRecord::new(d("2024-01-02"), b.clone(), 20.0),
        PriceRecord::new(d("2024-01-03"), a.clone(), 12.0),
    ]);
    let book = OrderBook::new(vec![
        Order::new(d("2024-01-02"), a.clone(), 10),
        Order::new(d("2024-01-02"), b.clone(), 10),
    ]);

    let out = simulate(&calendar, &oracle, &book, SimulationConfig::with_capital(1_000.0)).unwrap();
    let gap = out.trace.get(d("2024-01-03")).unwrap();

    assert_eq!(gap.invested_capital, 120.0);
    assert_eq!(gap.cash, 700.0);
    assert_eq!(gap.unpriced, vec![b.clone()]);
    assert_eq!(gap.holdings.get(&b), Some(&10));
}

// ── 4. Days without orders ───────────────────────────────────────────

#[test]
fn quiet_days_change_invested_only_by_price() {
    let x = InstrumentKey::single("X");
    let prices = [10.0, 10.5, 9.75, 11.0];
    let dates = ["2024-02-01", "2024-02-02", "2024-02-05", "2024-02-06"];
    let records: Vec<_> = dates
        .iter()
        .zip(prices)
        .map(|(day, p)| PriceRecord::new(d(day), x.clone(), p))
        .collect();
    let (calendar, oracle) = build(&records);
    let book = OrderBook::new(vec![Order::new(d("2024-02-01"), x.clone(), 40)]);

    let out = simulate(&calendar, &oracle, &book, SimulationConfig::default()).unwrap();
    for (record, price) in out.trace.iter().zip(prices) {
        assert_eq!(record.invested_capital, 40.0 * price);
        assert_eq!(record.cash, 1_000_000.0 - 400.0);
    }
}

// ── 5. Replay determinism ────────────────────────────────────────────

#[test]
fn identical_inputs_replay_bit_identically() {
    let keys: Vec<_> = (0..12).map(|i| InstrumentKey::single(format!("K{i}"))).collect();
    let mut records = Vec::new();
    let mut orders = Vec::new();
    for day in 0..30u32 {
        let date = d("2024-01-01") + chrono::Duration::days(day as i64);
        for (i, key) in keys.iter().enumerate() {
            let price = 10.0 + (day as f64 * 0.37 + i as f64).sin() * 3.1;
            records.push(PriceRecord::new(date, key.clone(), price));
            if (day as usize + i) % 7 == 0 {
                let qty = if day % 2 == 0 { 33 } else { -17 };
                orders.push(Order::new(date, key.clone(), qty));
            }
        }
    }
    let (calendar, oracle) = build(&records);
    let book = OrderBook::new(orders);

    let first = simulate(&calendar, &oracle, &book, SimulationConfig::default()).unwrap();
    let second = simulate(&calendar, &oracle, &book, SimulationConfig::default()).unwrap();

    let bits = |out: &arblab_core::engine::SimulationOutput| -> Vec<u64> {
        out.trace.values().iter().map(|v| v.to_bits()).collect()
    };
    assert_eq!(bits(&first), bits(&second));
    assert_eq!(first.trace, second.trace);
}

#[test]
fn stepping_can_pause_and_resume() {
    let x = InstrumentKey::single("X");
    let records: Vec<_> = (0..5)
        .map(|i| {
            let date = d("2024-05-01") + chrono::Duration::days(i);
            PriceRecord::new(date, x.clone(), 1.0 + i as f64)
        })
        .collect();
    let (calendar, oracle) = build(&records);
    let book = OrderBook::new(vec![Order::new(d("2024-05-02"), x.clone(), 3)]);

    let mut sim = Simulation::new(&calendar, &oracle, &book, SimulationConfig::default()).unwrap();
    while sim.next_index() < 2 {
        sim.step().unwrap();
    }
    assert_eq!(sim.trace().len(), 2);

    let resumed = sim.run().unwrap();
    let straight = simulate(&calendar, &oracle, &book, SimulationConfig::default()).unwrap();
    assert_eq!(resumed.trace, straight.trace);
}
