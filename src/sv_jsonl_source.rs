// JSON-lines log source
//
// Reads a simulation log exported one JSON object per line, each carrying the
// collection fields `nid`, `message`, `time` and `param` (extra fields such as
// `file`, `level` and `line` are ignored). Only the first 19 characters of
// `time` are significant, so sub-second precision and zone suffixes are
// dropped when bucketing.
//
// The file is tailed: asking for a second beyond what has been loaded reads
// any complete lines appended since, which is what follow mode relies on.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::debug;
use serde::Deserialize;

use crate::sv_error::ViewError;
use crate::sv_interface::{truncate_to_second, LogSource, NodeId, SvTime, TIME_FORMAT};
use crate::sv_records::{MessageKind, Record};

// length of "YYYY-MM-DDTHH:MM:SS"
const TIME_PREFIX_LEN: usize = 19;

#[derive(Debug, Deserialize)]
struct LogLine {
    nid: NodeId,
    message: String,
    time: String,
    #[serde(default)]
    param: serde_json::Value,
}

/// Parse the significant prefix of a log timestamp
pub fn parse_log_time(raw: &str) -> Option<SvTime> {
    let prefix = raw.get(..TIME_PREFIX_LEN)?;
    NaiveDateTime::parse_from_str(prefix, TIME_FORMAT).ok()
}

pub struct JsonLinesSource {
    path: PathBuf,
    reader: BufReader<File>,
    pending: String,
    // the unterminated last line was already loaded
    pending_taken: bool,
    line_no: usize,
    // raw time string kept for ordering inside a second
    seconds: BTreeMap<SvTime, Vec<(String, Record)>>,
}

impl JsonLinesSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ViewError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut source = Self {
            path,
            reader: BufReader::new(file),
            pending: String::new(),
            pending_taken: false,
            line_no: 0,
            seconds: BTreeMap::new(),
        };
        let loaded = source.poll()?;
        debug!("loaded {} records from {}", loaded, source.path.display());
        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read lines appended since the last poll.
    ///
    /// A trailing line without a newline is taken as soon as it holds a whole
    /// JSON object; otherwise it is kept until the writer finishes it.
    pub fn poll(&mut self) -> Result<usize, ViewError> {
        let mut loaded = 0;
        loop {
            let read = self.reader.read_line(&mut self.pending)?;
            if read == 0 || !self.pending.ends_with('\n') {
                break;
            }

            if !std::mem::take(&mut self.pending_taken) {
                self.line_no += 1;
            }
            let line = std::mem::take(&mut self.pending);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry = self.parse(line)?;
            self.insert(entry)?;
            loaded += 1;
        }

        let tail = self.pending.trim();
        if !tail.is_empty() {
            if let Ok(entry) = serde_json::from_str::<LogLine>(tail) {
                self.line_no += 1;
                self.pending.clear();
                self.pending_taken = true;
                self.insert(entry)?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    fn parse(&self, line: &str) -> Result<LogLine, ViewError> {
        serde_json::from_str(line).map_err(|e| ViewError::MalformedRecord {
            line: self.line_no,
            reason: e.to_string(),
        })
    }

    fn insert(&mut self, entry: LogLine) -> Result<(), ViewError> {
        let timestamp = parse_log_time(&entry.time).ok_or_else(|| ViewError::MalformedRecord {
            line: self.line_no,
            reason: format!("bad time `{}`", entry.time),
        })?;
        let payload = serde_json::to_vec(&entry.param).map_err(|e| ViewError::MalformedRecord {
            line: self.line_no,
            reason: e.to_string(),
        })?;

        let record = Record::new(
            entry.nid,
            MessageKind::from_wire(&entry.message),
            timestamp,
            payload,
        );
        let bucket = self.seconds.entry(truncate_to_second(timestamp)).or_default();
        let pos = bucket.partition_point(|(raw, _)| raw.as_str() <= entry.time.as_str());
        bucket.insert(pos, (entry.time, record));
        Ok(())
    }

    fn last_loaded(&self) -> Option<SvTime> {
        self.seconds.keys().next_back().copied()
    }
}

impl LogSource for JsonLinesSource {
    fn earliest_timestamp(&mut self) -> Result<Option<SvTime>, ViewError> {
        Ok(self
            .seconds
            .values()
            .next()
            .and_then(|bucket| bucket.first())
            .map(|(_, r)| r.timestamp))
    }

    fn last_timestamp(&mut self) -> Result<Option<SvTime>, ViewError> {
        self.poll()?;
        Ok(self.last_loaded())
    }

    fn records_at(&mut self, second: SvTime) -> Result<Vec<Record>, ViewError> {
        let second = truncate_to_second(second);
        if self.last_loaded().map_or(true, |last| second >= last) {
            self.poll()?;
        }
        Ok(self
            .seconds
            .get(&second)
            .map(|bucket| bucket.iter().map(|(_, r)| r.clone()).collect())
            .unwrap_or_default())
    }
}
