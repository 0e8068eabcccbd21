use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ultimate_matching::{
    Config, Exchange, ExchangeError, InMemoryLastTradesRepository, InMemoryOrdersRepository,
    InMemoryUsersRepository, Side, Symbol,
};

fn eth_usd() -> Symbol {
    Symbol::new("ETH", "USD")
}

fn balances(pairs: &[(&str, Decimal)]) -> HashMap<String, Decimal> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn new_exchange() -> Exchange {
    Exchange::new(
        &Config::default(),
        Arc::new(InMemoryOrdersRepository::new()),
        Arc::new(InMemoryUsersRepository::new()),
        Arc::new(InMemoryLastTradesRepository::new()),
    )
}

fn rich(exchange: &Exchange, user: &str) {
    exchange
        .register_user(user, balances(&[("ETH", dec!(10_000)), ("USD", dec!(10_000_000))]))
        .unwrap();
}

fn rest_s1_asks(exchange: &Exchange) {
    exchange.place_limit_and_persist("john", &eth_usd(), Side::Ask, dec!(1000), dec!(1)).unwrap();
    exchange.place_limit_and_persist("jim", &eth_usd(), Side::Ask, dec!(900), dec!(1)).unwrap();
    exchange.place_limit_and_persist("jane", &eth_usd(), Side::Ask, dec!(1100), dec!(4)).unwrap();
    exchange.place_limit_and_persist("jun", &eth_usd(), Side::Ask, dec!(1005), dec!(9)).unwrap();
    exchange.place_limit_and_persist("jack", &eth_usd(), Side::Ask, dec!(1005), dec!(9)).unwrap();
}

#[test]
fn s1_price_time_priority_across_levels() {
    let exchange = new_exchange();
    for user in ["john", "jim", "jane", "jun", "jack", "lily"] {
        rich(&exchange, user);
    }
    rest_s1_asks(&exchange);

    let trades = exchange.place_market_and_settle("lily", &eth_usd(), Side::Bid, dec!(23.5)).unwrap();

    let expected = [
        (dec!(900), dec!(1)),
        (dec!(1000), dec!(1)),
        (dec!(1005), dec!(9)),
        (dec!(1005), dec!(9)),
        (dec!(1100), dec!(3.5)),
    ];
    assert_eq!(trades.len(), expected.len());
    for (trade, (price, size)) in trades.iter().zip(expected) {
        assert_eq!(trade.price, price);
        assert_eq!(trade.size, size);
    }
    assert_eq!(exchange.best_ask_price(&eth_usd()), Some(dec!(1100)));
}

#[test]
fn s2_single_fill_market() {
    let exchange = new_exchange();
    rich(&exchange, "sellOrder");
    rich(&exchange, "taker");
    exchange.place_limit_and_persist("sellOrder", &eth_usd(), Side::Ask, dec!(10000), dec!(20)).unwrap();

    let trades = exchange.place_market_and_settle("taker", &eth_usd(), Side::Bid, dec!(4)).unwrap();

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, dec!(10000));
    assert_eq!(trades[0].size, dec!(4));
    assert_eq!(exchange.best_ask_price(&eth_usd()), Some(dec!(10000)));
}

#[test]
fn s3_insufficient_liquidity_leaves_book_unchanged() {
    let exchange = new_exchange();
    rich(&exchange, "seller");
    rich(&exchange, "taker");
    exchange.place_limit_and_persist("seller", &eth_usd(), Side::Ask, dec!(10000), dec!(20)).unwrap();

    let err = exchange.place_market_and_settle("taker", &eth_usd(), Side::Bid, dec!(400)).unwrap_err();

    assert!(matches!(err, ExchangeError::InsufficientLiquidity { .. }));
    assert_eq!(exchange.best_ask_price(&eth_usd()), Some(dec!(10000)));
}

#[test]
fn s4_cancel_then_match_skips_cancelled_level() {
    let exchange = new_exchange();
    for user in ["john", "jim", "jane", "jun", "jack", "lily"] {
        rich(&exchange, user);
    }
    let jim_eth_before = exchange.user_balance("jim", "ETH").unwrap();
    let jim_order = exchange.place_limit_and_persist("jim", &eth_usd(), Side::Ask, dec!(900), dec!(1)).unwrap();
    exchange.place_limit_and_persist("john", &eth_usd(), Side::Ask, dec!(1000), dec!(1)).unwrap();
    exchange.place_limit_and_persist("jane", &eth_usd(), Side::Ask, dec!(1100), dec!(4)).unwrap();
    exchange.place_limit_and_persist("jun", &eth_usd(), Side::Ask, dec!(1005), dec!(9)).unwrap();
    exchange.place_limit_and_persist("jack", &eth_usd(), Side::Ask, dec!(1005), dec!(9)).unwrap();

    exchange.cancel_and_release(&eth_usd(), jim_order.id).unwrap();
    assert_eq!(exchange.user_balance("jim", "ETH").unwrap(), jim_eth_before);

    let trades = exchange.place_market_and_settle("lily", &eth_usd(), Side::Bid, dec!(1)).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, dec!(1000));
}

struct S5Outcome {
    orders_repo: Arc<InMemoryOrdersRepository>,
    users_repo: Arc<InMemoryUsersRepository>,
    trades_repo: Arc<InMemoryLastTradesRepository>,
    config: Config,
}

fn run_s5() -> S5Outcome {
    let orders_repo = Arc::new(InMemoryOrdersRepository::new());
    let users_repo = Arc::new(InMemoryUsersRepository::new());
    let trades_repo = Arc::new(InMemoryLastTradesRepository::new());
    let config = Config::default();

    let exchange = Exchange::new(&config, orders_repo.clone(), users_repo.clone(), trades_repo.clone());
    for user in ["john", "jim", "jane", "jun", "jack", "lily"] {
        exchange
            .register_user(user, balances(&[("ETH", dec!(2000)), ("USD", dec!(2000))]))
            .unwrap();
    }

    // Price ladder pinned to the settlement scenario's own expected dollar
    // figures (see DESIGN.md: S1's narrative prices are ten times these).
    exchange.place_limit_and_persist("john", &eth_usd(), Side::Ask, dec!(100), dec!(1)).unwrap();
    exchange.place_limit_and_persist("jim", &eth_usd(), Side::Ask, dec!(90), dec!(1)).unwrap();
    exchange.place_limit_and_persist("jane", &eth_usd(), Side::Ask, dec!(110), dec!(4)).unwrap();
    exchange.place_limit_and_persist("jun", &eth_usd(), Side::Ask, dec!(105), dec!(9)).unwrap();
    exchange.place_limit_and_persist("jack", &eth_usd(), Side::Ask, dec!(105), dec!(9)).unwrap();
    exchange.place_market_and_settle("lily", &eth_usd(), Side::Bid, dec!(1)).unwrap();

    assert_s5_balances(&exchange);

    for _ in 0..50 {
        if !trades_repo.read_all().unwrap().is_empty() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    drop(exchange);

    S5Outcome { orders_repo, users_repo, trades_repo, config }
}

fn assert_s5_balances(exchange: &Exchange) {
    assert_eq!(exchange.user_balance("john", "ETH").unwrap(), dec!(1999));
    assert_eq!(exchange.user_balance("john", "USD").unwrap(), dec!(2000));
    assert_eq!(exchange.user_balance("jim", "ETH").unwrap(), dec!(1999));
    assert_eq!(exchange.user_balance("jim", "USD").unwrap(), dec!(2090));
    assert_eq!(exchange.user_balance("jane", "ETH").unwrap(), dec!(1996));
    assert_eq!(exchange.user_balance("jun", "ETH").unwrap(), dec!(1991));
    assert_eq!(exchange.user_balance("jack", "ETH").unwrap(), dec!(1991));
    assert_eq!(exchange.user_balance("lily", "ETH").unwrap(), dec!(2001));
    assert_eq!(exchange.user_balance("lily", "USD").unwrap(), dec!(1910));
}

#[test]
fn s5_balance_settlement_matches_expected_values() {
    run_s5();
}

#[test]
fn s6_recovery_equivalence() {
    let outcome = run_s5();

    let recovered = Exchange::new(&outcome.config, outcome.orders_repo, outcome.users_repo, outcome.trades_repo);
    recovered.recover().unwrap();

    assert_s5_balances(&recovered);
    assert_eq!(recovered.best_ask_price(&eth_usd()), Some(dec!(100)));
    assert_eq!(recovered.last_traded_price(&eth_usd()), Some(dec!(90)));
}
