//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The exchange itself: a symbol -> order book registry and a user-id ->
// account registry behind one coarse-grained mutex, fund reservation and
// settlement wrapped around the order book's pure matching operations, and
// startup recovery from the three repositories.
//
// | Name                     | Description                                       |
// |--------------------------|----------------------------------------------------|
// | register_user            | Creates a new account with an initial balance set  |
// | place_limit_and_persist  | Reserves funds, rests a limit order, journals it    |
// | place_market_and_settle  | Matches a market order and settles both sides      |
// | cancel_and_release       | Cancels a resting order and releases its reserve   |
// | recover                  | Rebuilds in-memory state from the repositories      |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::domain::models::types::{Order, OrderKind, Side, Symbol, Trade, UserAccount};
use crate::domain::repositories::{LastTradesRepository, OrdersRepository, UsersRepository};
use crate::domain::services::orderbook::OrderBook;

use super::journal::{JournalEntry, JournalWriter};
use super::ExchangeError;

struct ExchangeState {
    books: HashMap<Symbol, OrderBook>,
    users: HashMap<String, UserAccount>,
}

/// Multi-symbol exchange: order admission, balance reservation, settlement,
/// cancellation, and crash recovery under concurrent request load.
pub struct Exchange {
    state: Mutex<ExchangeState>,
    next_order_id: AtomicU64,
    trade_log_capacity: usize,
    orders_repo: Arc<dyn OrdersRepository>,
    users_repo: Arc<dyn UsersRepository>,
    trades_repo: Arc<dyn LastTradesRepository>,
    journal: JournalWriter,
}

impl Exchange {
    pub fn new(
        config: &Config,
        orders_repo: Arc<dyn OrdersRepository>,
        users_repo: Arc<dyn UsersRepository>,
        trades_repo: Arc<dyn LastTradesRepository>,
    ) -> Self {
        let journal = JournalWriter::start(
            Arc::clone(&orders_repo),
            Arc::clone(&users_repo),
            Arc::clone(&trades_repo),
            config.journal_channel_capacity,
            config.journal_retry_limit,
        );
        Self {
            state: Mutex::new(ExchangeState {
                books: HashMap::new(),
                users: HashMap::new(),
            }),
            next_order_id: AtomicU64::new(1),
            trade_log_capacity: config.trade_log_capacity,
            orders_repo,
            users_repo,
            trades_repo,
            journal,
        }
    }

    fn next_id(&self) -> u64 {
        self.next_order_id.fetch_add(1, Ordering::SeqCst)
    }

    fn journal_best_effort(&self, entry: JournalEntry) {
        if self.journal.enqueue(entry).is_err() {
            warn!("journal writer channel closed; entry dropped");
        }
    }

    /// Creates a new account with the given initial per-asset balances.
    #[instrument(skip(self, initial_balances))]
    pub fn register_user(
        &self,
        user_id: impl Into<String>,
        initial_balances: HashMap<String, Decimal>,
    ) -> Result<(), ExchangeError> {
        let user_id = user_id.into();
        let mut state = self.state.lock();
        if state.users.contains_key(&user_id) {
            return Err(ExchangeError::BadRequest(format!("user {user_id} already registered")));
        }
        let mut account = UserAccount::new(user_id.clone());
        account.balances = initial_balances;
        state.users.insert(user_id, account.clone());
        drop(state);

        self.journal_best_effort(JournalEntry::UpsertUser(account));
        Ok(())
    }

    /// Reserves funds, rests a limit order, and journals the new state.
    #[instrument(skip(self))]
    pub fn place_limit_and_persist(
        &self,
        user_id: &str,
        symbol: &Symbol,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExchangeError> {
        if price <= Decimal::ZERO || size <= Decimal::ZERO {
            return Err(ExchangeError::BadRequest("price and size must be strictly positive".into()));
        }

        let mut state = self.state.lock();
        let user = state
            .users
            .get(user_id)
            .ok_or_else(|| ExchangeError::UnknownUser(user_id.to_string()))?
            .clone();

        let (asset, reserve) = match side {
            Side::Bid => (symbol.quote.clone(), size * price),
            Side::Ask => (symbol.base.clone(), size),
        };
        let available = user.balance(&asset);
        if available < reserve {
            return Err(ExchangeError::InsufficientFunds { asset, needed: reserve, available });
        }

        let order_id = self.next_id();
        let order = Order::new(order_id, user_id, symbol.clone(), side, OrderKind::Limit, Some(price), size, chrono::Utc::now());

        let book = state
            .books
            .entry(symbol.clone())
            .or_insert_with(|| OrderBook::new(symbol.clone(), self.trade_log_capacity));
        let resting = book.place_limit_order(order)?;

        let account = state.users.get_mut(user_id).expect("checked above");
        *account.balances.entry(asset).or_insert(Decimal::ZERO) -= reserve;
        account.open_orders.insert(order_id, symbol.clone());
        let account_snapshot = account.clone();
        drop(state);

        info!(order_id, "limit order admitted");
        self.journal_best_effort(JournalEntry::UpsertUser(account_snapshot));
        self.journal_best_effort(JournalEntry::UpsertOrder(resting.clone()));
        Ok(resting)
    }

    /// Matches a market order against the book and settles every resulting
    /// trade per the buyer/seller/taker/maker formulas of the settlement spec.
    #[instrument(skip(self))]
    pub fn place_market_and_settle(
        &self,
        user_id: &str,
        symbol: &Symbol,
        side: Side,
        size: Decimal,
    ) -> Result<Vec<Trade>, ExchangeError> {
        if size <= Decimal::ZERO {
            return Err(ExchangeError::BadRequest("size must be strictly positive".into()));
        }

        let mut state = self.state.lock();
        if !state.users.contains_key(user_id) {
            return Err(ExchangeError::UnknownUser(user_id.to_string()));
        }

        let order_id = self.next_id();
        let incoming = Order::new(order_id, user_id, symbol.clone(), side, OrderKind::Market, None, size, chrono::Utc::now());

        let book = state
            .books
            .get_mut(symbol)
            .ok_or_else(|| ExchangeError::BadRequest(format!("unknown symbol: {symbol}")))?;
        let trades = book.place_market_order(incoming)?;

        let mut touched_users = HashSet::new();
        let mut touched_makers = HashSet::new();

        for trade in &trades {
            let taker_is_buyer = trade.buyer_order_id == order_id;
            let taker_is_seller = trade.seller_order_id == order_id;

            if let Some(buyer) = state.users.get_mut(&trade.buyer_user_id) {
                *buyer.balances.entry(symbol.base.clone()).or_insert(Decimal::ZERO) += trade.size;
                if taker_is_buyer {
                    *buyer.balances.entry(symbol.quote.clone()).or_insert(Decimal::ZERO) -= trade.size * trade.price;
                }
            }
            touched_users.insert(trade.buyer_user_id.clone());

            if let Some(seller) = state.users.get_mut(&trade.seller_user_id) {
                *seller.balances.entry(symbol.quote.clone()).or_insert(Decimal::ZERO) += trade.size * trade.price;
                if taker_is_seller {
                    *seller.balances.entry(symbol.base.clone()).or_insert(Decimal::ZERO) -= trade.size;
                }
            }
            touched_users.insert(trade.seller_user_id.clone());

            let maker_order_id = if taker_is_buyer { trade.seller_order_id } else { trade.buyer_order_id };
            let maker_user_id = if taker_is_buyer { trade.seller_user_id.clone() } else { trade.buyer_user_id.clone() };
            touched_makers.insert((maker_order_id, maker_user_id));
        }

        let book = state.books.get(symbol).expect("symbol checked above");
        let mut maker_journal_entries = Vec::new();
        for (maker_order_id, maker_user_id) in touched_makers {
            if book.is_resting(maker_order_id) {
                if let Some(order) = book.get_resting_order(maker_order_id) {
                    maker_journal_entries.push(JournalEntry::UpsertOrder(order));
                }
            } else {
                if let Some(user) = state.users.get_mut(&maker_user_id) {
                    user.open_orders.remove(&maker_order_id);
                }
                maker_journal_entries.push(JournalEntry::DeleteOrder(maker_order_id));
            }
        }

        let user_snapshots: Vec<UserAccount> = touched_users
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect();
        drop(state);

        info!(order_id, trades = trades.len(), "market order settled");
        for entry in maker_journal_entries {
            self.journal_best_effort(entry);
        }
        for user in user_snapshots {
            self.journal_best_effort(JournalEntry::UpsertUser(user));
        }
        for trade in &trades {
            self.journal_best_effort(JournalEntry::RecordTrade(trade.clone()));
        }

        Ok(trades)
    }

    /// Cancels a resting order and releases its reserved funds.
    #[instrument(skip(self))]
    pub fn cancel_and_release(&self, symbol: &Symbol, order_id: u64) -> Result<Order, ExchangeError> {
        let mut state = self.state.lock();
        let book = state
            .books
            .get_mut(symbol)
            .ok_or_else(|| ExchangeError::BadRequest(format!("unknown symbol: {symbol}")))?;
        let cancelled = book.cancel_order(order_id)?;

        let asset = match cancelled.side {
            Side::Bid => symbol.quote.clone(),
            Side::Ask => symbol.base.clone(),
        };
        let released = match cancelled.side {
            Side::Bid => cancelled.remaining_size * cancelled.limit_price().expect("limit order has a price"),
            Side::Ask => cancelled.remaining_size,
        };

        let account_snapshot = {
            let account = state
                .users
                .get_mut(&cancelled.user_id)
                .ok_or_else(|| ExchangeError::UnknownUser(cancelled.user_id.clone()))?;
            *account.balances.entry(asset).or_insert(Decimal::ZERO) += released;
            account.open_orders.remove(&order_id);
            account.clone()
        };
        drop(state);

        info!(order_id, "order cancelled");
        self.journal_best_effort(JournalEntry::UpsertUser(account_snapshot));
        self.journal_best_effort(JournalEntry::DeleteOrder(order_id));
        Ok(cancelled)
    }

    /// Rebuilds in-memory state from the repositories at startup: users
    /// first, then resting orders replayed without re-reserving funds, then
    /// trades to restore each book's last-traded price.
    #[instrument(skip(self))]
    pub fn recover(&self) -> Result<(), ExchangeError> {
        let mut state = self.state.lock();

        let users = self
            .users_repo
            .read_all()
            .map_err(|e| ExchangeError::PersistenceFailed(e.to_string()))?;
        for user in users {
            state.users.insert(user.user_id.clone(), user);
        }

        let mut max_order_id = 0u64;
        for side in [Side::Bid, Side::Ask] {
            let orders = self
                .orders_repo
                .read_all(side)
                .map_err(|e| ExchangeError::PersistenceFailed(e.to_string()))?;
            for order in orders {
                max_order_id = max_order_id.max(order.id);
                let symbol = order.symbol.clone();
                let book = state
                    .books
                    .entry(symbol.clone())
                    .or_insert_with(|| OrderBook::new(symbol, self.trade_log_capacity));
                book.replay_resting_order(order)?;
            }
        }
        if max_order_id >= self.next_order_id.load(Ordering::SeqCst) {
            self.next_order_id.store(max_order_id + 1, Ordering::SeqCst);
        }

        let trades = self
            .trades_repo
            .read_all()
            .map_err(|e| ExchangeError::PersistenceFailed(e.to_string()))?;
        for trade in trades {
            let symbol = trade.symbol.clone();
            let book = state
                .books
                .entry(symbol.clone())
                .or_insert_with(|| OrderBook::new(symbol, self.trade_log_capacity));
            book.restore_trade(trade);
        }

        info!("recovery complete");
        Ok(())
    }

    /// Read-only access to a symbol's best bid, for callers that don't need
    /// the full mutex-guarded mutation surface.
    pub fn best_bid_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.state.lock().books.get(symbol).and_then(OrderBook::best_bid_price)
    }

    pub fn best_ask_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.state.lock().books.get(symbol).and_then(OrderBook::best_ask_price)
    }

    pub fn last_traded_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.state.lock().books.get(symbol).and_then(OrderBook::last_traded_price)
    }

    pub fn last_trades(&self, symbol: &Symbol, n: usize) -> Vec<Trade> {
        self.state.lock().books.get(symbol).map(|b| b.last_trades(n)).unwrap_or_default()
    }

    pub fn snapshot_book(&self, symbol: &Symbol) -> (Vec<Order>, Vec<Order>) {
        self.state.lock().books.get(symbol).map(OrderBook::snapshot_book).unwrap_or_default()
    }

    pub fn user_balance(&self, user_id: &str, asset: &str) -> Option<Decimal> {
        self.state.lock().users.get(user_id).map(|u| u.balance(asset))
    }

    pub fn persistence_failure_count(&self) -> u64 {
        self.journal.failure_count.load(Ordering::Relaxed)
    }
}
