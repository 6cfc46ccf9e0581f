//! Progress reporting interface for build consumers.

use std::sync::Arc;

/// Receives one callback per observed output line.
///
/// `percent` is the attempt's monotonic completion estimate after the
/// line was classified; `is_error` marks lines matching an error pattern.
/// Implementations must not assume any particular interleaving between
/// stdout- and stderr-originated lines.
pub trait ProgressReport: Send + Sync {
  fn on_line(&self, line: &str, percent: u8, is_error: bool);
}

/// Default handler that ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReport;

impl ProgressReport for NoopReport {
  fn on_line(&self, _line: &str, _percent: u8, _is_error: bool) {}
}

impl<T: ProgressReport + ?Sized> ProgressReport for Arc<T> {
  fn on_line(&self, line: &str, percent: u8, is_error: bool) {
    (**self).on_line(line, percent, is_error);
  }
}
