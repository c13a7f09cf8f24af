//! Running sums over a sequence of per-line weights.
//!
//! [`PrefixSumIndex`] keeps its weights in a [`SumTree`], so prefix sums,
//! reverse lookups and localized splices all cost O(log n) instead of
//! rebuilding a flat array of accumulated values after every edit.
//!
//! ```text
//! weights:      [1, 0, 3, 1]
//! prefix_sum:    0  1  1  4  5     (sum of slots before the index)
//! index_of(2) -> (2, 1)            (slot 2 owns accumulated values 1..4)
//! ```

use crate::error::{OutOfRangeSnafu, Result};
use snafu::ensure;
use sum_tree::{Bias, ContextLessSummary, Dimension, Dimensions, Item, SumTree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Weight(u32);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct WeightSummary {
    slots: usize,
    total: u32,
}

impl ContextLessSummary for WeightSummary {
    fn zero() -> Self {
        Self::default()
    }

    fn add_summary(&mut self, other: &Self) {
        self.slots += other.slots;
        self.total += other.total;
    }
}

impl Item for Weight {
    type Summary = WeightSummary;

    fn summary(&self, _: ()) -> Self::Summary {
        WeightSummary {
            slots: 1,
            total: self.0,
        }
    }
}

/// Number of slots preceding a cursor position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
struct SlotIndex(usize);

impl<'a> Dimension<'a, WeightSummary> for SlotIndex {
    fn zero(_: ()) -> Self {
        Self(0)
    }

    fn add_summary(&mut self, summary: &'a WeightSummary, _: ()) {
        self.0 += summary.slots;
    }
}

/// Sum of the weights preceding a cursor position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
struct Accumulated(u32);

impl<'a> Dimension<'a, WeightSummary> for Accumulated {
    fn zero(_: ()) -> Self {
        Self(0)
    }

    fn add_summary(&mut self, summary: &'a WeightSummary, _: ()) {
        self.0 += summary.total;
    }
}

/// A mutable sequence of non-negative weights with prefix-sum queries.
///
/// Slots are 0-based. Any index outside the sequence fails with
/// [`Error::OutOfRange`](crate::Error::OutOfRange).
#[derive(Clone)]
pub struct PrefixSumIndex {
    weights: SumTree<Weight>,
}

impl Default for PrefixSumIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrefixSumIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PrefixSumIndex {
    pub fn new() -> Self {
        Self {
            weights: SumTree::new(()),
        }
    }

    pub fn from_weights(weights: impl IntoIterator<Item = u32>) -> Self {
        Self {
            weights: SumTree::from_iter(weights.into_iter().map(Weight), ()),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.summary().slots
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of every weight in the sequence.
    pub fn total_sum(&self) -> u32 {
        self.weights.summary().total
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.weights.iter().map(|weight| weight.0)
    }

    pub fn get(&self, index: usize) -> Result<u32> {
        let len = self.len();
        ensure!(index < len, OutOfRangeSnafu { index, len });

        let mut cursor = self.weights.cursor::<SlotIndex>(());
        cursor.seek(&SlotIndex(index), Bias::Right);
        Ok(cursor.item().map_or(0, |weight| weight.0))
    }

    /// Sum of the weights in slots `[0, index)`.
    ///
    /// `index` may equal [`len`](Self::len), which yields the total.
    pub fn prefix_sum(&self, index: usize) -> Result<u32> {
        let len = self.len();
        ensure!(index <= len, OutOfRangeSnafu { index, len });

        let mut cursor = self
            .weights
            .cursor::<Dimensions<SlotIndex, Accumulated>>(());
        cursor.seek(&SlotIndex(index), Bias::Right);
        Ok(cursor.start().1 .0)
    }

    /// Sum of the weights in slots `[0, index]`.
    pub fn prefix_sum_through(&self, index: usize) -> Result<u32> {
        let len = self.len();
        ensure!(index < len, OutOfRangeSnafu { index, len });
        self.prefix_sum(index + 1)
    }

    /// Find the slot owning the 0-based accumulated `value`.
    ///
    /// Returns `(index, remainder)` where `remainder < weight(index)` and
    /// `prefix_sum(index) + remainder == value`. Zero-weight slots never own a
    /// value. `value` must be below [`total_sum`](Self::total_sum), so an empty
    /// or all-zero sequence has no valid input.
    pub fn index_of(&self, value: u32) -> Result<(usize, u32)> {
        let total = self.total_sum();
        ensure!(
            value < total,
            OutOfRangeSnafu {
                index: value as usize,
                len: total as usize,
            }
        );

        let mut cursor = self
            .weights
            .cursor::<Dimensions<Accumulated, SlotIndex>>(());
        cursor.seek(&Accumulated(value), Bias::Right);
        let start = cursor.start();
        Ok((start.1 .0, value - start.0 .0))
    }

    /// Replace the weight at `index`, returning the previous weight.
    pub fn set_value(&mut self, index: usize, weight: u32) -> Result<u32> {
        let len = self.len();
        ensure!(index < len, OutOfRangeSnafu { index, len });

        let (weights, previous) = {
            let mut cursor = self.weights.cursor::<SlotIndex>(());
            let mut weights = cursor.slice(&SlotIndex(index), Bias::Right);
            let previous = cursor.item().map_or(0, |weight| weight.0);
            cursor.next();
            weights.push(Weight(weight), ());
            weights.append(cursor.suffix(), ());
            (weights, previous)
        };
        self.weights = weights;
        Ok(previous)
    }

    /// Splice `new_weights` in so the first one lands at `index`.
    pub fn insert_values(&mut self, index: usize, new_weights: &[u32]) -> Result<()> {
        let len = self.len();
        ensure!(index <= len, OutOfRangeSnafu { index, len });
        if new_weights.is_empty() {
            return Ok(());
        }

        let weights = {
            let mut cursor = self.weights.cursor::<SlotIndex>(());
            let mut weights = cursor.slice(&SlotIndex(index), Bias::Right);
            weights.extend(new_weights.iter().copied().map(Weight), ());
            weights.append(cursor.suffix(), ());
            weights
        };
        self.weights = weights;
        Ok(())
    }

    /// Delete `count` slots starting at `index`.
    pub fn remove_values(&mut self, index: usize, count: usize) -> Result<()> {
        let len = self.len();
        ensure!(
            index + count <= len,
            OutOfRangeSnafu {
                index: index + count,
                len,
            }
        );
        if count == 0 {
            return Ok(());
        }

        let weights = {
            let mut cursor = self.weights.cursor::<SlotIndex>(());
            let mut weights = cursor.slice(&SlotIndex(index), Bias::Right);
            cursor.seek_forward(&SlotIndex(index + count), Bias::Right);
            weights.append(cursor.suffix(), ());
            weights
        };
        self.weights = weights;
        Ok(())
    }
}
