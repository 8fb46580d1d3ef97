use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::parser::Record;

/// One record per tax id: the one with the latest date.
///
/// On equal dates the record seen first is kept, so the result depends only
/// on the relative order of records sharing a tax id.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConsolidatedSet {
    by_tax_id: BTreeMap<String, Record>,
}

impl ConsolidatedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the record was stored (new key or strictly newer date).
    pub fn insert(&mut self, record: Record) -> bool {
        match self.by_tax_id.entry(record.tax_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(mut slot) => {
                if record.date > slot.get().date {
                    slot.insert(record);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn get(&self, tax_id: &str) -> Option<&Record> {
        self.by_tax_id.get(tax_id)
    }

    pub fn len(&self) -> usize {
        self.by_tax_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tax_id.is_empty()
    }

    /// Records in ascending tax id order (plain string comparison).
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.by_tax_id.values()
    }
}

impl Extend<Record> for ConsolidatedSet {
    fn extend<T: IntoIterator<Item = Record>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl FromIterator<Record> for ConsolidatedSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
