use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSONL layout trace. Every record is one JSON object per line with a
/// `type` field. The logger is shared across calls, so counters are owned by
/// the caller and handed to `emit_summary`.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: Box<dyn Write + Send>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: Box::new(writer),
            })),
        }
    }

    pub fn event(&self, kind: &str, fields: Value) {
        let mut record = Map::new();
        record.insert("type".to_string(), Value::String(kind.to_string()));
        if let Value::Object(fields) = fields {
            record.extend(fields);
        }
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{}", Value::Object(record));
        }
    }

    pub fn emit_summary(&self, context: &str, counters: &BTreeMap<String, u64>) {
        if let Ok(mut state) = self.inner.lock() {
            let json = json!({
                "type": "debug.summary",
                "context": context,
                "counts": counters,
            });
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory sink shared between a logger and the test that inspects it.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().map_err(|_| io::ErrorKind::Other)?.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        pub(crate) fn records(&self) -> Vec<Value> {
            let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(|line| serde_json::from_str(line).expect("valid json line"))
                .collect()
        }
    }

    #[test]
    fn events_and_summary_are_json_lines() {
        let buf = SharedBuf::default();
        let logger = DebugLogger::from_writer(buf.clone());
        logger.event("layout.page_break", json!({"page": 2, "required": 14.0}));
        let counters = BTreeMap::from([("page_breaks".to_string(), 3)]);
        logger.emit_summary("compose", &counters);
        logger.emit_summary("compose", &BTreeMap::new());

        let records = buf.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["type"], "layout.page_break");
        assert_eq!(records[0]["page"], 2);
        assert_eq!(records[1]["counts"]["page_breaks"], 3);
        assert_eq!(records[2]["counts"], json!({}));
    }
}
