//! Terminal output.
//!
//! All output goes through one screen state behind a lock, so a live progress
//! row, the watch status block and plain log lines never interleave.
//!
//! ```ignore
//! log!("build"; "{} posts", count);
//! debug!("cache"; "read {}", location);
//! ```

use std::fmt;
use std::io::{Write, stdout};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::SystemTime;

use crossterm::{
    cursor, queue,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;

static VERBOSE: AtomicBool = AtomicBool::new(false);

static SCREEN: Mutex<Screen> = Mutex::new(Screen::new());

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print a line behind a colored `[module]` tag.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {
        $crate::logger::line($module, format_args!($($arg)*))
    };
}

/// Like [`log!`], only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {
        if $crate::logger::is_verbose() {
            $crate::logger::line($module, format_args!($($arg)*))
        }
    };
}

#[doc(hidden)]
pub fn line(module: &str, args: fmt::Arguments<'_>) {
    let mut screen = SCREEN.lock();
    let mut out = stdout().lock();
    screen.line(&mut out, module, args);
    out.flush().ok();
}

fn tag(module: &str) -> String {
    let tag = format!("[{module}]");
    match module {
        "watch" => tag.bright_green().bold().to_string(),
        "cache" => tag.bright_cyan().bold().to_string(),
        "error" => tag.bright_red().bold().to_string(),
        "build" | "sitemap" => tag.bright_blue().bold().to_string(),
        _ => tag.bright_yellow().bold().to_string(),
    }
}

/// Outcome shown by a watch-mode [`status`] line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped,
    Failed,
}

/// Replace the previous watch status with `message`.
///
/// Lines after the first are shown as detail under it. A log line printed in
/// between is kept; only consecutive statuses overwrite each other.
pub fn status(outcome: Outcome, message: &str) {
    let mut screen = SCREEN.lock();
    let mut out = stdout().lock();
    screen.status(&mut out, outcome, message);
    out.flush().ok();
}

/// Wall-clock `HH:MM:SS` (UTC).
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let (h, m, s) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

struct Screen {
    /// Text of the live progress row; the cursor sits at its end.
    progress: Option<String>,
    /// Rows printed by the last status, erased by the next one.
    status_rows: u16,
}

impl Screen {
    const fn new() -> Self {
        Self {
            progress: None,
            status_rows: 0,
        }
    }

    fn line(&mut self, out: &mut impl Write, module: &str, args: fmt::Arguments<'_>) {
        self.clear_progress(out);
        writeln!(out, "{} {args}", tag(module)).ok();
        self.status_rows = 0;
        self.draw_progress(out);
    }

    fn status(&mut self, out: &mut impl Write, outcome: Outcome, message: &str) {
        if self.status_rows > 0 {
            queue!(out, cursor::MoveUp(self.status_rows), Clear(ClearType::FromCursorDown)).ok();
        }

        let (summary, detail) = message.split_once('\n').unwrap_or((message, ""));
        let stamp = format!("[{}]", clock());
        let head = match outcome {
            Outcome::Done => format!("{} {} {summary}", stamp.dimmed(), "✓".green()),
            Outcome::Skipped => format!("{} {}", stamp.dimmed(), summary.dimmed()),
            Outcome::Failed => format!("{} {} {}", stamp.dimmed(), "✗".red(), summary.red()),
        };
        writeln!(out, "{head}").ok();
        let mut rows = 1u16;
        for detail_line in detail.lines() {
            writeln!(out, "  {detail_line}").ok();
            rows = rows.saturating_add(1);
        }
        self.status_rows = rows;
    }

    fn set_progress(&mut self, out: &mut impl Write, text: String) {
        self.clear_progress(out);
        self.progress = Some(text);
        self.draw_progress(out);
    }

    /// Leave the progress text on screen as a normal line.
    fn end_progress(&mut self, out: &mut impl Write) {
        if self.progress.is_some() {
            writeln!(out).ok();
        }
        self.progress = None;
    }

    fn drop_progress(&mut self, out: &mut impl Write) {
        self.clear_progress(out);
        self.progress = None;
    }

    fn clear_progress(&self, out: &mut impl Write) {
        if self.progress.is_some() {
            queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        }
    }

    fn draw_progress(&self, out: &mut impl Write) {
        if let Some(text) = &self.progress {
            write!(out, "{} {text}", tag("build")).ok();
        }
    }
}

/// Live `[build] posts(3/12)` row.
///
/// Updates skip drawing while another thread holds the screen, so build tasks
/// never wait on the terminal. The row is erased if dropped without
/// [`finish`](Self::finish).
pub struct ProgressLine {
    label: &'static str,
    total: usize,
    done: AtomicUsize,
}

impl ProgressLine {
    pub fn new(label: &'static str, total: usize) -> Self {
        let progress = Self {
            label,
            total,
            done: AtomicUsize::new(0),
        };
        let mut screen = SCREEN.lock();
        let mut out = stdout().lock();
        screen.set_progress(&mut out, progress.text());
        out.flush().ok();
        progress
    }

    pub fn inc(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
        if let Some(mut screen) = SCREEN.try_lock() {
            let mut out = stdout().lock();
            screen.set_progress(&mut out, self.text());
            out.flush().ok();
        }
    }

    /// Draw the final count and keep it on screen.
    pub fn finish(self) {
        let mut screen = SCREEN.lock();
        let mut out = stdout().lock();
        screen.set_progress(&mut out, self.text());
        screen.end_progress(&mut out);
        out.flush().ok();
    }

    fn text(&self) -> String {
        format!("{}({}/{})", self.label, self.done.load(Ordering::Relaxed), self.total)
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        let mut screen = SCREEN.lock();
        let mut out = stdout().lock();
        screen.drop_progress(&mut out);
        out.flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn test_clock_format() {
        let clock = clock();
        assert_eq!(clock.len(), 8);
        assert_eq!(clock.matches(':').count(), 2);
    }

    #[test]
    fn test_status_counts_detail_rows() {
        let mut screen = Screen::new();
        let mut out = Vec::new();

        screen.status(&mut out, Outcome::Done, "rebuilt: 2021-06-x/index");
        assert_eq!(screen.status_rows, 1);

        screen.status(&mut out, Outcome::Failed, "failed: 2021-06-x/index\nno title\nat line 3");
        assert_eq!(screen.status_rows, 3);
        assert!(plain(&out).contains("  no title\n"));
    }

    #[test]
    fn test_log_line_keeps_previous_status() {
        let mut screen = Screen::new();
        let mut out = Vec::new();

        screen.status(&mut out, Outcome::Skipped, "draft: 2021-06-x/index");
        screen.line(&mut out, "sitemap", format_args!("sitemap.xml (3 urls)"));

        assert_eq!(screen.status_rows, 0);
        assert!(plain(&out).contains("sitemap.xml (3 urls)\n"));
    }

    #[test]
    fn test_log_line_redraws_progress() {
        let mut screen = Screen::new();
        let mut out = Vec::new();

        screen.set_progress(&mut out, "posts(1/3)".into());
        out.clear();
        screen.line(&mut out, "build", format_args!("hello"));

        let written = plain(&out);
        let hello = written.find("hello\n").unwrap();
        let progress = written.rfind("posts(1/3)").unwrap();
        assert!(progress > hello);
        assert!(!written.ends_with('\n'));
    }

    #[test]
    fn test_end_progress_keeps_final_line() {
        let mut screen = Screen::new();
        let mut out = Vec::new();

        screen.set_progress(&mut out, "posts(3/3)".into());
        screen.end_progress(&mut out);

        assert!(screen.progress.is_none());
        assert!(plain(&out).ends_with("posts(3/3)\n"));
    }

    #[test]
    fn test_progress_text() {
        let progress = ProgressLine {
            label: "posts",
            total: 3,
            done: AtomicUsize::new(0),
        };
        progress.done.fetch_add(1, Ordering::Relaxed);
        assert_eq!(progress.text(), "posts(1/3)");
    }
}
