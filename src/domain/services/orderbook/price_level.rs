//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// A single price level: a FIFO queue of resting orders that all share a price
// and a side, plus the aggregated resting volume at that price.
//--------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use rust_decimal::Decimal;

use crate::domain::models::types::Order;

/// FIFO of resting orders at one price. `total_volume` is maintained
/// incrementally rather than recomputed, so it stays O(1) per mutation.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    orders: VecDeque<Order>,
    total_volume: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_volume: Decimal::ZERO,
        }
    }

    /// Appends a resting order to the tail of the queue.
    pub fn add(&mut self, order: Order) {
        self.total_volume += order.remaining_size;
        self.orders.push_back(order);
    }

    /// The oldest order at this level, the only one eligible to match next.
    pub fn head(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn head_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    /// Removes and returns the head order once it is fully filled.
    pub fn pop_head(&mut self) -> Option<Order> {
        let order = self.orders.pop_front()?;
        self.total_volume -= order.remaining_size;
        Some(order)
    }

    /// Removes a resting order by id, wherever it sits in the queue.
    /// The caller is expected to already know the order is in this level.
    pub fn remove(&mut self, order_id: u64) -> Option<Order> {
        let position = self.orders.iter().position(|o| o.id == order_id)?;
        let order = self.orders.remove(position)?;
        self.total_volume -= order.remaining_size;
        Some(order)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn total_volume(&self) -> Decimal {
        self.total_volume
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::{OrderKind, Side, Symbol};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: u64, size: Decimal) -> Order {
        Order::new(
            id,
            "john",
            Symbol::new("ETH", "USD"),
            Side::Ask,
            OrderKind::Limit,
            Some(dec!(1000)),
            size,
            Utc::now(),
        )
    }

    #[test]
    fn add_accumulates_volume_and_preserves_fifo_order() {
        let mut level = PriceLevel::new(dec!(1000));
        level.add(order(1, dec!(1)));
        level.add(order(2, dec!(2)));
        assert_eq!(level.total_volume(), dec!(3));
        assert_eq!(level.head().unwrap().id, 1);
    }

    #[test]
    fn pop_head_decrements_volume_in_fifo_order() {
        let mut level = PriceLevel::new(dec!(1000));
        level.add(order(1, dec!(1)));
        level.add(order(2, dec!(2)));
        let popped = level.pop_head().unwrap();
        assert_eq!(popped.id, 1);
        assert_eq!(level.total_volume(), dec!(2));
        assert_eq!(level.head().unwrap().id, 2);
    }

    #[test]
    fn remove_by_id_from_middle_of_queue() {
        let mut level = PriceLevel::new(dec!(1000));
        level.add(order(1, dec!(1)));
        level.add(order(2, dec!(2)));
        level.add(order(3, dec!(3)));
        let removed = level.remove(2).unwrap();
        assert_eq!(removed.id, 2);
        assert_eq!(level.total_volume(), dec!(4));
        assert_eq!(level.order_count(), 2);
    }

    #[test]
    fn empty_level_reports_empty() {
        let mut level = PriceLevel::new(dec!(1000));
        level.add(order(1, dec!(1)));
        level.pop_head();
        assert!(level.is_empty());
    }
}
