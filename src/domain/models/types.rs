//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the matching engine,
// including orders, trades, symbols, and the per-user account.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Side, OrderKind, OrderStatus.                                     |
// | STRUCTS            | Symbol, Order, Trade, UserAccount.                                |
// | Potential Errors   | Errors related to type construction and parsing.                 |
// | TESTS              | Unit tests for the defined types.                                 |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The side of an order (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// A buy order.
    Bid,
    /// A sell order.
    Ask,
}

impl Side {
    /// Returns the side a resting counterparty must be on to match this side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }
}

/// The kind of an order. Only plain limit and market orders are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Rests on the book at a declared price until matched or cancelled.
    Limit,
    /// Consumes resting liquidity immediately, at whatever price is available.
    Market,
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Resting on the book, no fills yet.
    Open,
    /// Resting on the book with some fills applied.
    PartiallyFilled,
    /// Fully filled; no longer resting.
    Filled,
    /// Removed by cancellation before being fully filled.
    Cancelled,
}

/// A trading pair, e.g. `ETH/USD`. `base` is the commodity, `quote` is the currency
/// it is priced in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Parses a `BASE/QUOTE` string. Anything without exactly one `/` is malformed.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let mut parts = raw.split('/');
        let base = parts.next().filter(|s| !s.is_empty());
        let quote = parts.next().filter(|s| !s.is_empty());
        if parts.next().is_some() {
            return Err(TypeError::InvalidSymbol(raw.to_string()));
        }
        match (base, quote) {
            (Some(base), Some(quote)) => Ok(Self::new(base, quote)),
            _ => Err(TypeError::InvalidSymbol(raw.to_string())),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// An intention to trade. Resting orders are owned by exactly one price level;
/// an incoming market order is owned by the matching routine until it fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub user_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    /// `None` for market orders.
    pub price: Option<Decimal>,
    pub remaining_size: Decimal,
    pub original_size: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: u64,
        user_id: impl Into<String>,
        symbol: Symbol,
        side: Side,
        kind: OrderKind,
        price: Option<Decimal>,
        size: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            symbol,
            side,
            kind,
            price,
            remaining_size: size,
            original_size: size,
            status: OrderStatus::Open,
            created_at,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_size.is_zero()
    }

    /// Limit price, for levels that require one. Market orders have none.
    pub fn limit_price(&self) -> Result<Decimal, TypeError> {
        self.price.ok_or(TypeError::MissingRequiredPrice)
    }
}

/// An immutable record of a fill, with buyer/seller fields captured by value so
/// they remain valid after the maker order is removed from the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: Symbol,
    pub buyer_order_id: u64,
    pub buyer_user_id: String,
    pub seller_order_id: u64,
    pub seller_user_id: String,
    pub price: Decimal,
    pub size: Decimal,
    /// True iff the buyer's order was already resting before this trade.
    pub is_buyer_maker: bool,
    pub executed_at: DateTime<Utc>,
}

/// A registered user's per-asset balances and open-order bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: String,
    pub balances: HashMap<String, Decimal>,
    /// Order id -> symbol, for releasing/settling funds on cancel and recovery.
    pub open_orders: HashMap<u64, Symbol>,
}

impl UserAccount {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            balances: HashMap::new(),
            open_orders: HashMap::new(),
        }
    }

    pub fn balance(&self, asset: &str) -> Decimal {
        self.balances.get(asset).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Errors raised while constructing or parsing core domain types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("order requires a limit price")]
    MissingRequiredPrice,
    #[error("quantity must be strictly positive")]
    InvalidQuantity,
    #[error("price must be strictly positive")]
    InvalidPrice,
}
