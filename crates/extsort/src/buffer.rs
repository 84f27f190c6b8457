use record::FixedRecord;

/// A bounded, in-memory buffer of records awaiting a sorted flush.
///
/// The buffer never grows past its capacity: callers check
/// [`is_full`](RunBuffer::is_full) after every push and flush the sorted
/// contents to a run file before pushing more.
#[derive(Debug)]
pub struct RunBuffer<R> {
    records: Vec<R>,
    capacity: usize,
}

impl<R: FixedRecord> RunBuffer<R> {
    /// Creates an empty buffer holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a record. Returns `true` when the buffer is now full.
    pub fn push(&mut self, record: R) -> bool {
        debug_assert!(!self.is_full(), "push into a full run buffer");
        self.records.push(record);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sorts the buffered records ascending by key.
    ///
    /// The sort is stable: catalog-item runs repeat product ids, and the
    /// merge keeps the first item per product in arrival order.
    pub fn sort(&mut self) {
        self.records.sort_by_key(|r| r.key());
    }

    /// The buffered records, in their current order.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Removes all records, keeping the allocation for the next run.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use record::IndexEntry;

    fn entry(key: i64) -> IndexEntry {
        IndexEntry::new(key, 0)
    }

    #[test]
    fn push_reports_full_at_capacity() {
        let mut b = RunBuffer::new(3);
        assert!(!b.push(entry(1)));
        assert!(!b.push(entry(2)));
        assert!(b.push(entry(3)));
        assert!(b.is_full());
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut b = RunBuffer::<IndexEntry>::new(0);
        assert_eq!(b.capacity(), 1);
        assert!(b.push(entry(5)));
    }

    #[test]
    fn sort_orders_by_key() {
        let mut b = RunBuffer::new(10);
        for k in [42, -3, 17, 0, 8] {
            b.push(entry(k));
        }
        b.sort();
        let keys: Vec<i64> = b.records().iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![-3, 0, 8, 17, 42]);
    }

    #[test]
    fn equal_keys_keep_arrival_order() {
        let mut b = RunBuffer::new(64);
        for i in 0..60u64 {
            b.push(IndexEntry::new((i % 3) as i64, i));
        }
        b.sort();
        for pair in b.records().windows(2) {
            if pair[0].key == pair[1].key {
                assert!(pair[0].offset < pair[1].offset);
            }
        }
        assert_eq!(b.records()[0].offset, 0);
        assert_eq!(b.records()[20].offset, 1);
        assert_eq!(b.records()[40].offset, 2);
    }

    #[test]
    fn clear_then_reuse() {
        let mut b = RunBuffer::new(2);
        b.push(entry(1));
        b.push(entry(2));
        b.clear();
        assert!(b.is_empty());
        assert!(!b.push(entry(3)));
    }
}
