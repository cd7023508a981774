// Unbounded sample history mirrored row-for-row by the CSV log
use crate::domain::reading::Reading;

/// Arrival-ordered record of every polled tick. Unlike the plot buffer,
/// missing samples stay missing here so the persisted log keeps its gaps.
#[derive(Debug, Default)]
pub struct SampleHistory {
    rows: Vec<Reading>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reading: Reading) {
        self.rows.push(reading);
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.rows.last()
    }

    pub fn rows(&self) -> &[Reading] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
