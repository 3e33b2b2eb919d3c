//! Result reporting: terminal text, JSON, and `results.txt`

use std::fs;
use std::io;
use std::path::Path;

use approx_pi::{Approximation, REFERENCE_PI, Real, RunConfig};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub approx_pi: Real,
    pub actual_pi: &'static str,
    pub series_sum: Real,
    pub elapsed_ms: u64,
    pub iterations: u64,
    pub processes: u32,
    pub threads: u32,
    /// Single-threaded reference, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_pi: Option<Real>,
}

impl Report {
    pub fn new(result: &Approximation, config: &RunConfig, serial_pi: Option<Real>) -> Self {
        Self {
            approx_pi: result.pi,
            actual_pi: REFERENCE_PI,
            series_sum: result.series_sum,
            elapsed_ms: result.elapsed.as_millis() as u64,
            iterations: config.iterations,
            processes: config.processes,
            threads: config.threads,
            serial_pi,
        }
    }

    pub fn render_text(&self) -> String {
        let mut text = format!(
            "approx. pi = {:.16}\nactual  pi = {}\n",
            self.approx_pi, self.actual_pi
        );
        if let Some(serial) = self.serial_pi {
            text.push_str(&format!("serial  pi = {:.16}\n", serial));
        }
        text.push_str(&format!("elapsed time: {} milliseconds\n", self.elapsed_ms));
        text
    }

    pub fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }

    /// Persist the approximation and timing next to the worker logs
    pub fn write_results(&self, path: &Path) -> io::Result<()> {
        fs::write(
            path,
            format!(
                "approx. pi = {:.16}\nelapsed time: {} milliseconds\n",
                self.approx_pi, self.elapsed_ms
            ),
        )
    }
}
