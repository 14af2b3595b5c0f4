// In-memory log source
//
// Holds records bucketed per second in a BTreeMap. Used by tests, demos and
// anything that builds a log programmatically.
//
// For logs on disk, see sv_jsonl_source.rs

use std::collections::BTreeMap;

use crate::sv_error::ViewError;
use crate::sv_interface::{truncate_to_second, LogSource, SvTime};
use crate::sv_records::Record;

pub struct MemoryLogSource {
    seconds: BTreeMap<SvTime, Vec<Record>>,
}

impl MemoryLogSource {
    pub fn new() -> Self {
        Self {
            seconds: BTreeMap::new(),
        }
    }

    /// Add a record, keeping its second sorted by timestamp.
    /// Records with equal timestamps keep insertion order.
    pub fn push(&mut self, record: Record) {
        let bucket = self
            .seconds
            .entry(truncate_to_second(record.timestamp))
            .or_default();
        let pos = bucket.partition_point(|r| r.timestamp <= record.timestamp);
        bucket.insert(pos, record);
    }

    pub fn len(&self) -> usize {
        self.seconds.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }
}

impl Default for MemoryLogSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Record> for MemoryLogSource {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut source = Self::new();
        for record in iter {
            source.push(record);
        }
        source
    }
}

impl LogSource for MemoryLogSource {
    fn earliest_timestamp(&mut self) -> Result<Option<SvTime>, ViewError> {
        Ok(self
            .seconds
            .values()
            .next()
            .and_then(|bucket| bucket.first())
            .map(|r| r.timestamp))
    }

    fn last_timestamp(&mut self) -> Result<Option<SvTime>, ViewError> {
        Ok(self
            .seconds
            .values()
            .next_back()
            .and_then(|bucket| bucket.last())
            .map(|r| r.timestamp))
    }

    fn records_at(&mut self, second: SvTime) -> Result<Vec<Record>, ViewError> {
        Ok(self
            .seconds
            .get(&truncate_to_second(second))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sv_records::MessageKind;
    use chrono::NaiveDate;

    fn at_ms(sec: u32, ms: u32) -> SvTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_milli_opt(0, 0, sec, ms)
            .unwrap()
    }

    fn record(nid: &str, time: SvTime) -> Record {
        Record::new(nid, MessageKind::Links, time, b"{\"nids\":[]}".to_vec())
    }

    #[test]
    fn test_empty_source() {
        let mut source = MemoryLogSource::new();
        assert!(source.earliest_timestamp().unwrap().is_none());
        assert!(source.last_timestamp().unwrap().is_none());
        assert!(source.records_at(at_ms(0, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_records_grouped_by_whole_second() {
        let mut source: MemoryLogSource = vec![
            record("c", at_ms(1, 900)),
            record("a", at_ms(1, 100)),
            record("late", at_ms(2, 0)),
            record("b", at_ms(1, 500)),
        ]
        .into_iter()
        .collect();

        let ids: Vec<String> = source
            .records_at(at_ms(1, 0))
            .unwrap()
            .into_iter()
            .map(|r| r.node_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        // sub-second part of the query is ignored too
        assert_eq!(source.records_at(at_ms(1, 999)).unwrap().len(), 3);
        assert_eq!(source.len(), 4);
    }

    #[test]
    fn test_time_range() {
        let mut source: MemoryLogSource = vec![
            record("a", at_ms(5, 0)),
            record("b", at_ms(3, 250)),
            record("c", at_ms(9, 10)),
        ]
        .into_iter()
        .collect();

        assert_eq!(source.earliest_timestamp().unwrap(), Some(at_ms(3, 250)));
        assert_eq!(source.last_timestamp().unwrap(), Some(at_ms(9, 10)));
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let mut source = MemoryLogSource::new();
        source.push(record("first", at_ms(0, 0)));
        source.push(record("second", at_ms(0, 0)));
        let ids: Vec<String> = source
            .records_at(at_ms(0, 0))
            .unwrap()
            .into_iter()
            .map(|r| r.node_id)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }
}
