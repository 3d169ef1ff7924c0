//! Per-page progress reporting
//!
//! Each finished page prints one line, success or failure, in completion
//! order. On a terminal the lines scroll above an indicatif bar counting
//! pages; otherwise they go straight to stdout.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::fetcher::FetcherError;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Progress output of one run
#[derive(Debug, Clone)]
pub struct PageProgress {
    bar: Option<ProgressBar>,
}

impl PageProgress {
    /// Progress for `total_pages` pages with a bar when stderr is a terminal
    pub fn new(total_pages: u64) -> Self {
        let bar = ProgressBar::new(total_pages);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages ({percent}%) eta {eta}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar: Some(bar) }
    }

    /// Progress that prints nothing
    pub fn silent() -> Self {
        Self { bar: None }
    }

    /// Whether anything is printed
    pub fn is_silent(&self) -> bool {
        self.bar.is_none()
    }

    /// Report a page whose rows were written
    pub fn page_written(&self, page_number: u64, offset: u64, rows: usize) {
        self.line(format!(
            "\u{2713} page {page_number} (offset={offset}): {rows} rows"
        ));
        self.advance();
    }

    /// Report a page whose fetch failed
    pub fn page_failed(&self, page_number: u64, error: &FetcherError) {
        self.line(format!("\u{274c} page {page_number} failed: {error}"));
        self.advance();
    }

    /// Clear the bar, leaving printed lines in place
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    fn advance(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn line(&self, message: String) {
        match &self.bar {
            // A hidden bar swallows println
            Some(bar) if bar.is_hidden() => println!("{message}"),
            Some(bar) => bar.println(message),
            None => {}
        }
    }
}

/// Human-readable duration: seconds, minutes or hours
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
