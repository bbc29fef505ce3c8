//! Append-only table of labeled window records.

use serde::{Deserialize, Serialize};

use crate::types::{ActivityLabel, LabeledRecord};

/// Ordered records, oldest first.
///
/// Insertion order is the order windows completed. Records are never
/// removed or edited; the only mutation is appending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<LabeledRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the end.
    pub fn push(&mut self, record: LabeledRecord) {
        self.records.push(record);
    }

    /// Append `records` at the end, preserving their order.
    pub fn extend_from_slice(&mut self, records: &[LabeledRecord]) {
        self.records.extend_from_slice(records);
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[LabeledRecord] {
        &self.records
    }

    /// Records appended at or after position `index`. Empty past the end.
    pub fn records_since(&self, index: usize) -> &[LabeledRecord] {
        self.records.get(index..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recently appended record.
    pub fn last(&self) -> Option<&LabeledRecord> {
        self.records.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabeledRecord> {
        self.records.iter()
    }

    /// Number of records carrying `label`.
    pub fn count_label(&self, label: ActivityLabel) -> usize {
        self.records.iter().filter(|r| r.activity == label).count()
    }
}

impl From<Vec<LabeledRecord>> for Dataset {
    fn from(records: Vec<LabeledRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<LabeledRecord> for Dataset {
    fn from_iter<I: IntoIterator<Item = LabeledRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a LabeledRecord;
    type IntoIter = std::slice::Iter<'a, LabeledRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
