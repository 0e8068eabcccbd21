//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Persistence seams consumed by the exchange for orders, users, and trades.
// The engine depends only on these traits; any durable key-value, relational,
// or append-only store can back them. This crate ships one concrete backing
// store, an in-memory implementation, since the SQL layer is out of scope.
//--------------------------------------------------------------------------------------------------

pub mod memory;

use crate::domain::models::types::{Order, Side, Trade, UserAccount};

pub use memory::{InMemoryLastTradesRepository, InMemoryOrdersRepository, InMemoryUsersRepository};

/// Persists resting orders for crash recovery.
pub trait OrdersRepository: Send + Sync {
    fn create(&self, order: &Order) -> anyhow::Result<()>;
    fn update(&self, order: &Order) -> anyhow::Result<()>;
    fn delete(&self, order_id: u64) -> anyhow::Result<()>;
    /// All resting orders on one side, for recovery replay.
    fn read_all(&self, side: Side) -> anyhow::Result<Vec<Order>>;
}

/// Persists per-user balances and open-order bookkeeping.
#[cfg_attr(test, mockall::automock)]
pub trait UsersRepository: Send + Sync {
    fn create(&self, user: &UserAccount) -> anyhow::Result<()>;
    fn update(&self, user: &UserAccount) -> anyhow::Result<()>;
    fn read_all(&self) -> anyhow::Result<Vec<UserAccount>>;
}

/// Append-only trade journal, unbounded regardless of the in-memory trade
/// log's retention policy.
pub trait LastTradesRepository: Send + Sync {
    fn create(&self, trade: &Trade) -> anyhow::Result<()>;
    fn read_all(&self) -> anyhow::Result<Vec<Trade>>;
}
