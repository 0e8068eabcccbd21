//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Decouples the exchange's critical section from persistence I/O. Mutating
// calls enqueue journal entries after releasing the exchange mutex; a single
// background thread drains them in order, retrying transient failures up to
// a configured bound before logging and counting a persistence failure.
//--------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{error, warn};

use crate::domain::models::types::{Order, Trade, UserAccount};
use crate::domain::repositories::{LastTradesRepository, OrdersRepository, UsersRepository};

/// A single unit of durable state produced by a committed exchange mutation.
#[derive(Debug, Clone)]
pub enum JournalEntry {
    UpsertUser(UserAccount),
    UpsertOrder(Order),
    DeleteOrder(u64),
    RecordTrade(Trade),
}

/// Single-writer background persistence queue. Preserves FIFO order per
/// entity since entries are drained strictly in send order.
pub struct JournalWriter {
    sender: Option<Sender<JournalEntry>>,
    handle: Option<JoinHandle<()>>,
    /// Entries that exhausted their retry budget. Exposed for operator alerting.
    pub failure_count: Arc<AtomicU64>,
}

impl JournalWriter {
    pub fn start(
        orders_repo: Arc<dyn OrdersRepository>,
        users_repo: Arc<dyn UsersRepository>,
        trades_repo: Arc<dyn LastTradesRepository>,
        channel_capacity: usize,
        retry_limit: u32,
    ) -> Self {
        let (sender, receiver): (Sender<JournalEntry>, Receiver<JournalEntry>) =
            crossbeam_channel::bounded(channel_capacity);
        let failure_count = Arc::new(AtomicU64::new(0));
        let worker_failures = Arc::clone(&failure_count);

        let handle = std::thread::Builder::new()
            .name("journal-writer".to_string())
            .spawn(move || {
                for entry in receiver.iter() {
                    apply_with_retry(&entry, &orders_repo, &users_repo, &trades_repo, retry_limit, &worker_failures);
                }
            })
            .expect("failed to spawn journal writer thread");

        Self {
            sender: Some(sender),
            handle: Some(handle),
            failure_count,
        }
    }

    /// Enqueues an entry for the background writer. The only synchronous
    /// failure mode is the channel itself going away (writer thread died);
    /// transient repository failures are retried and logged by the writer,
    /// not surfaced to the caller.
    pub fn enqueue(&self, entry: JournalEntry) -> Result<(), crossbeam_channel::SendError<JournalEntry>> {
        match &self.sender {
            Some(sender) => sender.send(entry),
            None => Err(crossbeam_channel::SendError(entry)),
        }
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn apply_with_retry(
    entry: &JournalEntry,
    orders_repo: &Arc<dyn OrdersRepository>,
    users_repo: &Arc<dyn UsersRepository>,
    trades_repo: &Arc<dyn LastTradesRepository>,
    retry_limit: u32,
    failure_count: &Arc<AtomicU64>,
) {
    let mut attempt = 0;
    loop {
        let result = match entry {
            JournalEntry::UpsertUser(user) => users_repo.update(user).or_else(|_| users_repo.create(user)),
            JournalEntry::UpsertOrder(order) => orders_repo.update(order).or_else(|_| orders_repo.create(order)),
            JournalEntry::DeleteOrder(id) => orders_repo.delete(*id),
            JournalEntry::RecordTrade(trade) => trades_repo.create(trade),
        };
        match result {
            Ok(()) => return,
            Err(err) if attempt < retry_limit => {
                attempt += 1;
                warn!(attempt, %err, "journal write failed, retrying");
            }
            Err(err) => {
                failure_count.fetch_add(1, Ordering::Relaxed);
                error!(%err, "persistence failed after exhausting retries");
                return;
            }
        }
    }
}
