//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The order book for a single symbol: two side books, a bounded trade log, a
// last-traded-price cache, and the matching algorithm that ties them together.
//--------------------------------------------------------------------------------------------------

pub mod orderbook;
pub mod price_level;
pub mod side_book;

pub use orderbook::OrderBook;

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the order book itself (symbol-local, below the exchange's
/// user/balance concerns).
#[derive(Debug, Error, PartialEq)]
pub enum OrderBookError {
    #[error("order {0} not found in book")]
    UnknownOrder(u64),
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: Decimal, available: Decimal },
    #[error("price must be strictly positive")]
    InvalidPrice,
    #[error("quantity must be strictly positive")]
    InvalidQuantity,
    #[error("order symbol does not match this book")]
    WrongSymbol,
}
