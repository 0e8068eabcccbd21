//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// All price levels for one side of one symbol, keyed by price and ordered by
// side-specific priority (bids descending, asks ascending), with O(1) best-price
// access via a cached pointer kept in sync on every mutation.
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::models::types::Side;

use super::price_level::PriceLevel;

/// Ordered index of price levels for one side. `BTreeMap` gives worst-case
/// O(log n) insert/find/remove for free, avoiding the unbalanced-tree pitfall
/// a hand-rolled BST would need to guard against.
#[derive(Debug)]
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Decimal, PriceLevel>,
    best: Option<Decimal>,
}

impl SideBook {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            best: None,
        }
    }

    /// Returns the level at `price`, creating an empty one if absent. Updates
    /// the best-pointer if the new level is better than the current best.
    pub fn find_or_create(&mut self, price: Decimal) -> &mut PriceLevel {
        let is_new = !self.levels.contains_key(&price);
        let level = self.levels.entry(price).or_insert_with(|| PriceLevel::new(price));
        if is_new {
            let better = match self.best {
                None => true,
                Some(best) => self.is_better(price, best),
            };
            if better {
                self.best = Some(price);
            }
        }
        level
    }

    pub fn get(&self, price: Decimal) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    pub fn get_mut(&mut self, price: Decimal) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    /// Removes a level known to be empty and recomputes the best-pointer.
    pub fn remove_if_empty(&mut self, price: Decimal) {
        if let Some(level) = self.levels.get(&price) {
            if level.is_empty() {
                self.levels.remove(&price);
                if self.best == Some(price) {
                    self.recompute_best();
                }
            }
        }
    }

    fn recompute_best(&mut self) {
        self.best = match self.side {
            Side::Bid => self.levels.keys().next_back().copied(),
            Side::Ask => self.levels.keys().next().copied(),
        };
    }

    pub fn best(&self) -> Option<Decimal> {
        self.best
    }

    pub fn best_level(&self) -> Option<&PriceLevel> {
        self.best.and_then(|price| self.levels.get(&price))
    }

    pub fn best_level_mut(&mut self) -> Option<&mut PriceLevel> {
        let price = self.best?;
        self.levels.get_mut(&price)
    }

    /// Up to `k` levels in priority order, for market-data snapshots.
    pub fn top_k(&self, k: usize) -> Vec<&PriceLevel> {
        match self.side {
            Side::Bid => self.levels.values().rev().take(k).collect(),
            Side::Ask => self.levels.values().take(k).collect(),
        }
    }

    /// All levels in priority order, for full book snapshots.
    pub fn levels_in_priority_order(&self) -> Vec<&PriceLevel> {
        match self.side {
            Side::Bid => self.levels.values().rev().collect(),
            Side::Ask => self.levels.values().collect(),
        }
    }

    pub fn total_volume(&self) -> Decimal {
        self.levels.values().map(PriceLevel::total_volume).sum()
    }

    fn is_better(&self, candidate: Decimal, current: Decimal) -> bool {
        match self.side {
            Side::Bid => candidate > current,
            Side::Ask => candidate < current,
        }
    }
}
