//! Metrics sinks for training and evaluation output.
//!
//! The core loop emits flat name → value maps at configured intervals; the
//! sink decides presentation. Console and CSV backends are provided, and a
//! [`MultiSink`] fans out to several at once.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Flat metric map emitted after updates and evaluations.
///
/// Keyed by metric name; a `BTreeMap` keeps emission order stable.
pub type TrainMetrics = BTreeMap<String, f32>;

/// Sink for training metrics.
pub trait MetricsSink {
    /// Record one batch of metrics at the given cumulative environment step.
    fn log_info(&mut self, metrics: &TrainMetrics, step: u64);

    /// Flush any buffered output.
    fn flush(&mut self) {}
}

/// Console sink printing one line per emission.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for ConsoleSink {
    fn log_info(&mut self, metrics: &TrainMetrics, step: u64) {
        let mut line = format!("[step {:>10}]", step);
        for (name, value) in metrics {
            line.push_str(&format!(" {}={:.4}", name, value));
        }
        println!("{}", line);
    }
}

/// CSV file sink.
///
/// The header is fixed by the first emission; later emissions write the
/// same columns, leaving cells empty for metrics that are absent.
pub struct CsvSink {
    writer: BufWriter<File>,
    columns: Option<Vec<String>>,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            columns: None,
        })
    }
}

impl MetricsSink for CsvSink {
    fn log_info(&mut self, metrics: &TrainMetrics, step: u64) {
        if self.columns.is_none() {
            let columns: Vec<String> = metrics.keys().cloned().collect();
            let _ = write!(self.writer, "step");
            for name in &columns {
                let _ = write!(self.writer, ",{}", name);
            }
            let _ = writeln!(self.writer);
            self.columns = Some(columns);
        }

        let _ = write!(self.writer, "{}", step);
        if let Some(columns) = &self.columns {
            for name in columns {
                match metrics.get(name) {
                    Some(value) => {
                        let _ = write!(self.writer, ",{:.6}", value);
                    }
                    None => {
                        let _ = write!(self.writer, ",");
                    }
                }
            }
        }
        let _ = writeln!(self.writer);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        MetricsSink::flush(self);
    }
}

/// Fan-out sink writing to multiple backends.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add<S: MetricsSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl MetricsSink for MultiSink {
    fn log_info(&mut self, metrics: &TrainMetrics, step: u64) {
        for sink in &mut self.sinks {
            sink.log_info(metrics, step);
        }
    }

    fn flush(&mut self) {
        for sink in &mut self.sinks {
            sink.flush();
        }
    }
}
