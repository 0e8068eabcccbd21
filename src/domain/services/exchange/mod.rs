//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The exchange: a multi-symbol registry of order books and user accounts,
// fund reservation and settlement, the single coarse-grained concurrency
// gate, and journal replay on startup.
//--------------------------------------------------------------------------------------------------

pub mod exchange;
pub mod journal;

pub use exchange::Exchange;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::services::orderbook::OrderBookError;

/// Flattened error taxonomy surfaced at the exchange boundary. All errors are
/// returned as values; the engine never panics or crashes on any of these —
/// only true invariant violations (programming errors) may abort the process.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("insufficient funds: need {needed} {asset}, have {available}")]
    InsufficientFunds { asset: String, needed: Decimal, available: Decimal },
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: Decimal, available: Decimal },
    #[error("unknown order: {0}")]
    UnknownOrder(u64),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

impl From<OrderBookError> for ExchangeError {
    fn from(err: OrderBookError) -> Self {
        match err {
            OrderBookError::InsufficientLiquidity { requested, available } => {
                ExchangeError::InsufficientLiquidity { requested, available }
            }
            OrderBookError::UnknownOrder(id) => ExchangeError::UnknownOrder(id),
            other => ExchangeError::BadRequest(other.to_string()),
        }
    }
}
