pub mod config;
pub mod domain;

pub use config::Config;
pub use domain::models::types::{
    Order, OrderKind, OrderStatus, Side, Symbol, Trade, TypeError, UserAccount,
};
pub use domain::repositories::{
    InMemoryLastTradesRepository, InMemoryOrdersRepository, InMemoryUsersRepository,
    LastTradesRepository, OrdersRepository, UsersRepository,
};
pub use domain::services::exchange::{Exchange, ExchangeError};
pub use domain::services::orderbook::{OrderBook, OrderBookError};
