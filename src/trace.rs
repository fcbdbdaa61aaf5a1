use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// JSONL trace log for render runs. A disabled logger is a free-to-clone
/// no-op handle, so call sites never branch on configuration.
#[derive(Debug, Clone)]
pub(crate) struct TraceLogger {
    inner: Option<Arc<Mutex<TraceState>>>,
}

#[derive(Debug)]
struct TraceState {
    writer: BufWriter<File>,
    started: Instant,
    seq: u64,
    counters: HashMap<String, u64>,
    span_totals: HashMap<String, f64>,
    span_counts: HashMap<String, u64>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Some(Arc::new(Mutex::new(TraceState {
                writer: BufWriter::new(file),
                started: Instant::now(),
                seq: 0,
                counters: HashMap::new(),
                span_totals: HashMap::new(),
                span_counts: HashMap::new(),
            }))),
        })
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Writes one event line. `fields` is a comma-led JSON fragment
    /// (`"key":value,...`) or empty.
    pub fn event(&self, kind: &str, fields: &str) {
        let Some(inner) = &self.inner else {
            return;
        };
        if let Ok(mut state) = inner.lock() {
            state.seq += 1;
            let ms = state.started.elapsed().as_secs_f64() * 1000.0;
            let seq = state.seq;
            let line = if fields.is_empty() {
                format!(
                    "{{\"type\":\"{}\",\"seq\":{},\"ms\":{:.3}}}",
                    json_escape(kind),
                    seq,
                    ms
                )
            } else {
                format!(
                    "{{\"type\":\"{}\",\"seq\":{},\"ms\":{:.3},{}}}",
                    json_escape(kind),
                    seq,
                    ms,
                    fields
                )
            };
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        let Some(inner) = &self.inner else {
            return;
        };
        if let Ok(mut state) = inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub fn log_span_ms(&self, name: &str, ms: f64) {
        let Some(inner) = &self.inner else {
            return;
        };
        if let Ok(mut state) = inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            state.seq += 1;
            let elapsed = state.started.elapsed().as_secs_f64() * 1000.0;
            let seq = state.seq;
            let line = format!(
                "{{\"type\":\"span\",\"seq\":{},\"ms\":{:.3},\"name\":\"{}\",\"span_ms\":{:.3}}}",
                seq,
                elapsed,
                json_escape(name),
                ms
            );
            let _ = writeln!(state.writer, "{line}");
        }
    }

    /// Drains counters and span totals into one summary line.
    pub fn emit_summary(&self, context: &str) {
        let Some(inner) = &self.inner else {
            return;
        };
        if let Ok(mut state) = inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');

            let mut spans: Vec<(String, f64)> = state.span_totals.drain().collect();
            spans.sort_by(|a, b| a.0.cmp(&b.0));
            let span_counts = std::mem::take(&mut state.span_counts);
            let mut spans_json = String::from("{");
            for (idx, (name, total)) in spans.iter().enumerate() {
                if idx > 0 {
                    spans_json.push(',');
                }
                let count = span_counts.get(name).copied().unwrap_or(1);
                spans_json.push_str(&format!(
                    "\"{}\":{{\"ms\":{:.3},\"count\":{}}}",
                    json_escape(name),
                    total,
                    count
                ));
            }
            spans_json.push('}');

            state.seq += 1;
            let seq = state.seq;
            let line = format!(
                "{{\"type\":\"summary\",\"seq\":{},\"context\":\"{}\",\"counts\":{},\"spans\":{}}}",
                seq,
                json_escape(context),
                counts_json,
                spans_json
            );
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn flush(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        if let Ok(mut state) = inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_logger_is_a_no_op() {
        let logger = TraceLogger::disabled();
        logger.event("noop", "");
        logger.increment("x", 1);
        logger.log_span_ms("y", 1.0);
        logger.emit_summary("test");
        logger.flush();
    }

    #[test]
    fn events_and_summary_reach_the_file() {
        let dir = std::env::temp_dir().join(format!("taqrir_trace_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("trace.log");
        let logger = TraceLogger::new(&path).expect("create logger");
        logger.event("font.attempt", "\"source\":\"file\",\"ok\":false");
        logger.increment("text.lossy", 3);
        logger.log_span_ms("compose", 1.25);
        logger.emit_summary("render");
        logger.flush();
        let body = std::fs::read_to_string(&path).expect("read trace file");
        assert!(body.contains("\"type\":\"font.attempt\""));
        assert!(body.contains("\"text.lossy\":3"));
        assert!(body.contains("\"type\":\"summary\""));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn escape_handles_quotes_and_newlines() {
        assert_eq!(json_escape("a\"b\nc"), "a\\\"b\\nc");
    }
}
