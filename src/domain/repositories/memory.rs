//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// In-memory reference implementations of the three repository traits, guarded
// by the same `parking_lot::Mutex` discipline used everywhere else in this
// crate. These are production-usable on their own (the spec never requires a
// durable backend) and double as the default fixture under test.
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::models::types::{Order, Side, Trade, UserAccount};

use super::{LastTradesRepository, OrdersRepository, UsersRepository};

#[derive(Debug, Default)]
pub struct InMemoryOrdersRepository {
    orders: Mutex<HashMap<u64, Order>>,
}

impl InMemoryOrdersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrdersRepository for InMemoryOrdersRepository {
    fn create(&self, order: &Order) -> anyhow::Result<()> {
        self.orders.lock().insert(order.id, order.clone());
        Ok(())
    }

    fn update(&self, order: &Order) -> anyhow::Result<()> {
        self.orders.lock().insert(order.id, order.clone());
        Ok(())
    }

    fn delete(&self, order_id: u64) -> anyhow::Result<()> {
        self.orders.lock().remove(&order_id);
        Ok(())
    }

    fn read_all(&self, side: Side) -> anyhow::Result<Vec<Order>> {
        Ok(self
            .orders
            .lock()
            .values()
            .filter(|o| o.side == side)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUsersRepository {
    users: Mutex<HashMap<String, UserAccount>>,
}

impl InMemoryUsersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsersRepository for InMemoryUsersRepository {
    fn create(&self, user: &UserAccount) -> anyhow::Result<()> {
        self.users.lock().insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    fn update(&self, user: &UserAccount) -> anyhow::Result<()> {
        self.users.lock().insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    fn read_all(&self) -> anyhow::Result<Vec<UserAccount>> {
        Ok(self.users.lock().values().cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLastTradesRepository {
    trades: Mutex<Vec<Trade>>,
}

impl InMemoryLastTradesRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LastTradesRepository for InMemoryLastTradesRepository {
    fn create(&self, trade: &Trade) -> anyhow::Result<()> {
        self.trades.lock().push(trade.clone());
        Ok(())
    }

    fn read_all(&self) -> anyhow::Result<Vec<Trade>> {
        Ok(self.trades.lock().clone())
    }
}
