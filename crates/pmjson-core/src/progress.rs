//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: one indicatif bar counting finished files.
//! Non-TTY mode: log-based output (no progress bars).

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Files bar: completed/total with the last finished file as message
fn files_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:<8.cyan.bold} {bar:30.green/dim} {pos:>5}/{len:5} {elapsed:>4} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Central progress context managing the multi-progress display.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    /// Create a context with TTY mode forced on or off.
    pub fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Create the files-completed bar.
    ///
    /// TTY: visible bar of length `total`.
    /// Non-TTY: hidden (no-op); callers log progress lines instead.
    pub fn files_bar(&self, total: usize) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }

        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(files_style());
        pb.set_prefix("convert");
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    /// Print a line above managed progress bars (avoids interference).
    ///
    /// Use this instead of `eprintln!` when progress bars are active.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_small() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(12), "12");
        assert_eq!(fmt_num(123), "123");
    }

    #[test]
    fn fmt_num_thousands() {
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(30_512), "30,512");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }

    #[test]
    fn non_tty_bar_is_hidden() {
        let ctx = ProgressContext::with_tty(false);
        let pb = ctx.files_bar(3);
        assert!(pb.is_hidden());
        assert!(!ctx.is_tty());
    }
}
