use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn log_span_ms(&self, name: &str, ms: f64) {
        let json = json!({
            "type": "perf.span",
            "name": name,
            "unit": "ms",
            "ms": (ms * 1000.0).round() / 1000.0,
        });
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writeln!(writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writer.flush();
        }
    }
}

/// Times `f` and logs it as a span when a logger is present.
pub(crate) fn timed<T>(perf: Option<&PerfLogger>, name: &str, f: impl FnOnce() -> T) -> T {
    let Some(perf) = perf else {
        return f();
    };
    let start = Instant::now();
    let out = f();
    perf.log_span_ms(name, start.elapsed().as_secs_f64() * 1000.0);
    out
}
