//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading symbol.
// It maintains bid and ask side books in price-time priority and runs the
// market-order matching loop against them.
//
// | Component     | Description                                                     |
// |---------------|-------------------------------------------------------------------
// | OrderBook     | Pair of side books, trade log, id index, matching algorithm      |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                | Return Type           |
// |-----------------------|---------------------------------------------|----------------------|
// | place_limit_order     | Rests a limit order without matching        | Result<Order, _>     |
// | place_market_order    | Matches a market order against the book     | Result<Vec<Trade>,_> |
// | cancel_order          | Removes a resting order                     | Result<Order, _>     |
// | replay_resting_order  | Re-inserts a persisted order during recovery| Result<(), _>        |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::models::types::{Order, OrderKind, OrderStatus, Side, Symbol, Trade};

use super::side_book::SideBook;
use super::OrderBookError;

/// Book for a single symbol: bid/ask side books, a resting-order index keyed by
/// order id, a bounded trade log, and the last traded price.
#[derive(Debug)]
pub struct OrderBook {
    pub symbol: Symbol,
    bids: SideBook,
    asks: SideBook,
    /// order id -> (side, price) for resting orders only.
    id_index: HashMap<u64, (Side, Decimal)>,
    trade_log: VecDeque<Trade>,
    trade_log_capacity: usize,
    last_traded_price: Option<Decimal>,
}

impl OrderBook {
    pub fn new(symbol: Symbol, trade_log_capacity: usize) -> Self {
        Self {
            symbol,
            bids: SideBook::new(Side::Bid),
            asks: SideBook::new(Side::Ask),
            id_index: HashMap::new(),
            trade_log: VecDeque::with_capacity(trade_log_capacity.min(1024)),
            trade_log_capacity,
            last_traded_price: None,
        }
    }

    fn side_book(&self, side: Side) -> &SideBook {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_book_mut(&mut self, side: Side) -> &mut SideBook {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Rests a limit order at its declared price. Never matches against the
    /// opposite side — only `place_market_order` consumes resting liquidity.
    pub fn place_limit_order(&mut self, order: Order) -> Result<Order, OrderBookError> {
        self.insert_resting(order, true)
    }

    /// Re-inserts a persisted resting order during recovery, at its original
    /// id and timestamp, without touching user balances or the journal.
    pub fn replay_resting_order(&mut self, order: Order) -> Result<Order, OrderBookError> {
        self.insert_resting(order, false)
    }

    fn insert_resting(&mut self, order: Order, log: bool) -> Result<Order, OrderBookError> {
        if order.symbol != self.symbol {
            return Err(OrderBookError::WrongSymbol);
        }
        if order.kind != OrderKind::Limit {
            return Err(OrderBookError::InvalidQuantity);
        }
        let price = order.limit_price().map_err(|_| OrderBookError::InvalidPrice)?;
        if price <= Decimal::ZERO {
            return Err(OrderBookError::InvalidPrice);
        }
        if order.remaining_size <= Decimal::ZERO {
            return Err(OrderBookError::InvalidQuantity);
        }

        let id = order.id;
        let side = order.side;
        self.id_index.insert(id, (side, price));
        let level = self.side_book_mut(side).find_or_create(price);
        level.add(order.clone());
        if log {
            debug!(order_id = id, side = side_label(side), %price, "order rested on book");
        }
        Ok(order)
    }

    /// Matches a market order against the opposite side under price-time
    /// priority. Fails with `InsufficientLiquidity` and makes no changes if
    /// the opposite side cannot fully fill the requested size.
    pub fn place_market_order(&mut self, mut incoming: Order) -> Result<Vec<Trade>, OrderBookError> {
        if incoming.symbol != self.symbol {
            return Err(OrderBookError::WrongSymbol);
        }
        if incoming.kind != OrderKind::Market {
            return Err(OrderBookError::InvalidQuantity);
        }
        if incoming.remaining_size <= Decimal::ZERO {
            return Err(OrderBookError::InvalidQuantity);
        }

        let opposite_side = incoming.side.opposite();
        let available = self.side_book(opposite_side).total_volume();
        if available < incoming.remaining_size {
            return Err(OrderBookError::InsufficientLiquidity {
                requested: incoming.remaining_size,
                available,
            });
        }

        let mut trades = Vec::new();
        while incoming.remaining_size > Decimal::ZERO {
            let level_price = self
                .side_book(opposite_side)
                .best()
                .expect("pre-checked volume guarantees a best level exists");

            let level = self
                .side_book_mut(opposite_side)
                .get_mut(level_price)
                .expect("best-pointer must reference an existing level");

            let maker = level.head_mut().expect("non-empty level has a head order");
            let fill = maker.remaining_size.min(incoming.remaining_size);

            maker.remaining_size -= fill;
            incoming.remaining_size -= fill;

            let maker_fully_filled = maker.remaining_size.is_zero();
            let maker_id = maker.id;
            let maker_user_id = maker.user_id.clone();

            let (buyer_order_id, buyer_user_id, seller_order_id, seller_user_id) =
                match incoming.side {
                    Side::Bid => (incoming.id, incoming.user_id.clone(), maker_id, maker_user_id.clone()),
                    Side::Ask => (maker_id, maker_user_id.clone(), incoming.id, incoming.user_id.clone()),
                };

            trades.push(Trade {
                symbol: self.symbol.clone(),
                buyer_order_id,
                buyer_user_id,
                seller_order_id,
                seller_user_id,
                price: level_price,
                size: fill,
                is_buyer_maker: matches!(incoming.side, Side::Ask),
                executed_at: chrono::Utc::now(),
            });

            if maker_fully_filled {
                let level = self.side_book_mut(opposite_side).get_mut(level_price).unwrap();
                level.pop_head();
                self.id_index.remove(&maker_id);
                self.side_book_mut(opposite_side).remove_if_empty(level_price);
            } else {
                let level = self.side_book_mut(opposite_side).get_mut(level_price).unwrap();
                level.head_mut().unwrap().status = OrderStatus::PartiallyFilled;
            }
        }

        incoming.status = OrderStatus::Filled;

        if let Some(last) = trades.last() {
            self.last_traded_price = Some(last.price);
        }
        for trade in &trades {
            if self.trade_log.len() >= self.trade_log_capacity {
                self.trade_log.pop_front();
            }
            self.trade_log.push_back(trade.clone());
        }

        debug!(order_id = incoming.id, trades = trades.len(), "market order matched");
        Ok(trades)
    }

    /// Removes a resting order. Returns the removed order (with its final
    /// remaining size) so the caller can release reserved funds.
    pub fn cancel_order(&mut self, order_id: u64) -> Result<Order, OrderBookError> {
        let (side, price) = self
            .id_index
            .remove(&order_id)
            .ok_or(OrderBookError::UnknownOrder(order_id))?;

        let level = self
            .side_book_mut(side)
            .get_mut(price)
            .ok_or(OrderBookError::UnknownOrder(order_id))?;
        let order = level
            .remove(order_id)
            .ok_or(OrderBookError::UnknownOrder(order_id))?;
        self.side_book_mut(side).remove_if_empty(price);

        debug!(order_id, "order cancelled");
        Ok(order)
    }

    pub fn best_bid_price(&self) -> Option<Decimal> {
        self.bids.best()
    }

    pub fn best_ask_price(&self) -> Option<Decimal> {
        self.asks.best()
    }

    pub fn last_traded_price(&self) -> Option<Decimal> {
        self.last_traded_price
    }

    pub fn top_k_bids(&self, k: usize) -> Vec<(Decimal, Decimal)> {
        self.bids.top_k(k).into_iter().map(|l| (l.price, l.total_volume())).collect()
    }

    pub fn top_k_asks(&self, k: usize) -> Vec<(Decimal, Decimal)> {
        self.asks.top_k(k).into_iter().map(|l| (l.price, l.total_volume())).collect()
    }

    pub fn last_trades(&self, n: usize) -> Vec<Trade> {
        let len = self.trade_log.len();
        let skip = len.saturating_sub(n);
        self.trade_log.iter().skip(skip).cloned().collect()
    }

    /// All resting orders across both sides, in priority order.
    pub fn snapshot_book(&self) -> (Vec<Order>, Vec<Order>) {
        let bids = self
            .bids
            .levels_in_priority_order()
            .into_iter()
            .flat_map(|l| l.orders().cloned())
            .collect();
        let asks = self
            .asks
            .levels_in_priority_order()
            .into_iter()
            .flat_map(|l| l.orders().cloned())
            .collect();
        (bids, asks)
    }

    pub fn is_resting(&self, order_id: u64) -> bool {
        self.id_index.contains_key(&order_id)
    }

    pub fn get_resting_order(&self, order_id: u64) -> Option<Order> {
        let (side, price) = *self.id_index.get(&order_id)?;
        self.side_book(side)
            .get(price)?
            .orders()
            .find(|o| o.id == order_id)
            .cloned()
    }

    pub fn total_bid_volume(&self) -> Decimal {
        self.bids.total_volume()
    }

    pub fn total_ask_volume(&self) -> Decimal {
        self.asks.total_volume()
    }

    /// Appends a recovered trade to the log so `last_traded_price` and
    /// recent-trade queries are restored. Does not re-run matching.
    pub fn restore_trade(&mut self, trade: Trade) {
        self.last_traded_price = Some(trade.price);
        if self.trade_log.len() >= self.trade_log_capacity {
            self.trade_log.pop_front();
        }
        self.trade_log.push_back(trade);
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Bid => "bid",
        Side::Ask => "ask",
    }
}
