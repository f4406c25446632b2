use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::error::Result;
use crate::indexer::{IndexSummary, ScanProgress};

const BAR_TEMPLATE: &str = "[{elapsed_precise}] {prefix:.bold}▕{bar:40.blue}▏{pos}/{len} {msg}";

/// Terminal progress bar for directory scans.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░  "),
        );
        bar.set_prefix("Indexing");
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgress for BarProgress {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_archive(&self, path: &Path, _outcome: &Result<usize>) {
        if let Some(name) = path.file_name() {
            self.bar.set_message(name.to_string_lossy().to_string());
        }
        self.bar.inc(1);
    }

    fn on_finish(&self, _summary: &IndexSummary) {
        self.bar.finish_and_clear();
    }
}
