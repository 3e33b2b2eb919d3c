//! Per-worker diagnostic logs
//!
//! A sink receives `(global index, running partial sum)` after each term. It
//! is best-effort: failures are logged once and the sink goes quiet, the
//! computation carries on.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::series::Real;

pub trait DiagnosticSink {
    /// Observe the running sum after the term at `index`
    fn record(&mut self, index: u64, partial: Real);

    /// Called once after the last term
    fn finish(&mut self) {}
}

/// Append-only text log, one line per sampled iteration
#[derive(Debug)]
pub struct FileSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    stride: u64,
}

impl FileSink {
    /// Create (truncating) the log at `path`, keeping every `stride`-th index
    pub fn create(path: impl AsRef<Path>, stride: u64) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path,
            stride: stride.max(1),
        })
    }

    fn disable(&mut self, err: std::io::Error) {
        warn!(
            path = %self.path.display(),
            "disabling worker log after write error: {}",
            err
        );
        self.writer = None;
    }
}

impl DiagnosticSink for FileSink {
    #[inline]
    fn record(&mut self, index: u64, partial: Real) {
        if index % self.stride != 0 {
            return;
        }
        if let Some(writer) = self.writer.as_mut()
            && let Err(e) = writeln!(writer, "loop {} : seriesResult = {}", index, partial)
        {
            self.disable(e);
        }
    }

    fn finish(&mut self) {
        if let Some(writer) = self.writer.as_mut()
            && let Err(e) = writer.flush()
        {
            self.disable(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_one_line_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("worker-output-p0.txt");

        let mut sink = FileSink::create(&path, 1).unwrap();
        sink.record(0, -0.25);
        sink.record(1, 0.5);
        sink.finish();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "loop 0 : seriesResult = -0.25\nloop 1 : seriesResult = 0.5\n"
        );
    }

    #[test]
    fn test_stride_samples_indices() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sampled.txt");

        let mut sink = FileSink::create(&path, 10).unwrap();
        for i in 5..40 {
            sink.record(i, 1.0);
        }
        sink.finish();

        let text = std::fs::read_to_string(&path).unwrap();
        let indices: Vec<&str> = text
            .lines()
            .map(|l| l.split_whitespace().nth(1).unwrap())
            .collect();
        assert_eq!(indices, vec!["10", "20", "30"]);
    }

    #[test]
    fn test_zero_stride_is_treated_as_one() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.txt");
        let mut sink = FileSink::create(&path, 0).unwrap();
        for i in 0..4 {
            sink.record(i, 0.5);
        }
        sink.finish();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("log.txt");
        assert!(FileSink::create(path, 1).is_err());
    }
}
