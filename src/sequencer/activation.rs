// Activation map - which bars of a track are active

/// Bar-indexed on/off flags of one track
///
/// Only the timeline flips bars (through `set`), so a map handed out by
/// reference can never drift away from the clock registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationMap {
    bars: Vec<bool>,
}

impl ActivationMap {
    /// All-inactive map of `length` bars
    pub fn new(length: usize) -> Self {
        Self {
            bars: vec![false; length],
        }
    }

    pub fn from_bars(bars: Vec<bool>) -> Self {
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bars
    }

    /// `false` for out-of-range bars
    pub fn is_active(&self, bar: usize) -> bool {
        self.bars.get(bar).copied().unwrap_or(false)
    }

    /// Active bar indices in ascending order
    pub fn active_bars(&self) -> Vec<usize> {
        self.bars
            .iter()
            .enumerate()
            .filter_map(|(i, &active)| active.then_some(i))
            .collect()
    }

    /// Active bar indices strictly after `bar`
    pub fn active_after(&self, bar: usize) -> Vec<usize> {
        self.bars
            .iter()
            .enumerate()
            .skip(bar + 1)
            .filter_map(|(i, &active)| active.then_some(i))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.bars.iter().filter(|&&active| active).count()
    }

    /// Pad with inactive bars or truncate
    ///
    /// Bars cut off by a shrink are gone for good.
    pub fn resize(&mut self, new_length: usize) {
        self.bars.resize(new_length, false);
    }

    pub(crate) fn set(&mut self, bar: usize, active: bool) {
        if let Some(slot) = self.bars.get_mut(bar) {
            *slot = active;
        }
    }
}
