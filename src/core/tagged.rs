// Single-pass, two-level traversal over tagged output. Non-restartable by design:
// a consumed record or entry cannot be yielded again and no reset exists.
use std::sync::Arc;

use crate::core::context::TaggedRecord;

/// Cursor over a snapshot of tagged records.
///
/// `next_record` walks the outer record list; `next_entry` walks key/value
/// pairs within the record most recently yielded by `next_record`. Exhaustion
/// is permanent at both levels.
#[derive(Debug)]
pub struct TaggedCursor {
    records: Arc<[TaggedRecord]>,
    next_record: usize,
    current: Option<usize>,
    next_entry: usize,
}

impl TaggedCursor {
    pub(crate) fn snapshot(records: &[TaggedRecord]) -> Self {
        Self {
            records: records.into(),
            next_record: 0,
            current: None,
            next_entry: 0,
        }
    }

    /// Total number of records in the snapshot, independent of cursor position.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Advance to the next record, or `None` once the list is consumed.
    pub fn next_record(&mut self) -> Option<&TaggedRecord> {
        if self.next_record >= self.records.len() {
            self.current = None;
            return None;
        }
        let index = self.next_record;
        self.next_record += 1;
        self.current = Some(index);
        self.next_entry = 0;
        Some(&self.records[index])
    }

    /// Advance within the current record's entries. Returns `None` when the
    /// current record is exhausted, even if further records remain; the caller
    /// must call `next_record` to continue.
    pub fn next_entry(&mut self) -> Option<(&str, &str)> {
        let record = &self.records[self.current?];
        let entry = record.entries().get(self.next_entry)?;
        self.next_entry += 1;
        Some((entry.0.as_str(), entry.1.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use crate::core::context::CommandContext;

    fn context_with(records: &[&[(&str, &str)]]) -> CommandContext {
        let mut ctx = CommandContext::new(1);
        ctx.begin_populating();
        for record in records {
            ctx.begin_record();
            for (key, value) in *record {
                ctx.key_value(key, value);
            }
        }
        ctx.complete();
        ctx
    }

    #[test]
    fn traversal_is_insertion_ordered() {
        let ctx = context_with(&[
            &[("depotFile", "//depot/a"), ("rev", "3")],
            &[("depotFile", "//depot/b")],
        ]);
        let mut cursor = ctx.tagged_output();

        let first = cursor.next_record().expect("first record");
        assert_eq!(first.entries()[0].0, "depotFile");
        assert_eq!(cursor.next_entry(), Some(("depotFile", "//depot/a")));
        assert_eq!(cursor.next_entry(), Some(("rev", "3")));
        assert_eq!(cursor.next_entry(), None);
        // Entry exhaustion within a record does not end the record stream.
        assert!(cursor.next_record().is_some());
        assert_eq!(cursor.next_entry(), Some(("depotFile", "//depot/b")));
        assert_eq!(cursor.next_entry(), None);
        assert!(cursor.next_record().is_none());
    }

    #[test]
    fn exhausted_cursor_stays_exhausted() {
        let ctx = context_with(&[&[("key", "value")]]);
        let mut cursor = ctx.tagged_output();
        assert!(cursor.next_record().is_some());
        assert!(cursor.next_record().is_none());
        assert!(cursor.next_record().is_none());
        assert_eq!(cursor.next_entry(), None);
    }

    #[test]
    fn entry_before_first_record_is_none() {
        let ctx = context_with(&[&[("key", "value")]]);
        let mut cursor = ctx.tagged_output();
        assert_eq!(cursor.next_entry(), None);
    }

    #[test]
    fn five_hundred_records_yield_exactly_five_hundred() {
        let mut ctx = CommandContext::new(9);
        ctx.begin_populating();
        for i in 0..500 {
            ctx.begin_record();
            ctx.key_value("index", &i.to_string());
            if i % 2 == 0 {
                ctx.key_value("even", "yes");
            }
        }
        ctx.complete();

        let mut cursor = ctx.tagged_output();
        assert_eq!(cursor.record_count(), 500);
        let mut records = 0;
        while let Some(record) = cursor.next_record() {
            let expected = if records % 2 == 0 { 2 } else { 1 };
            assert_eq!(record.len(), expected);
            let mut entries = 0;
            while cursor.next_entry().is_some() {
                entries += 1;
            }
            assert_eq!(entries, expected);
            records += 1;
        }
        assert_eq!(records, 500);
        assert!(cursor.next_record().is_none());
    }

    #[test]
    fn snapshot_survives_context_rerun() {
        let mut ctx = context_with(&[&[("stale", "record")]]);
        let mut cursor = ctx.tagged_output();
        ctx.reset();
        ctx.begin_populating();
        ctx.begin_record();
        ctx.key_value("fresh", "record");
        ctx.complete();

        // The old cursor still sees its snapshot; a new cursor only sees the rerun.
        assert_eq!(cursor.next_record().map(|r| r.get("stale")), Some(Some("record")));
        let mut fresh = ctx.tagged_output();
        let record = fresh.next_record().expect("fresh record");
        assert_eq!(record.get("stale"), None);
        assert_eq!(record.get("fresh"), Some("record"));
        assert!(fresh.next_record().is_none());
    }
}
