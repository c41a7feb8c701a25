//! Styled command output.

use console::{Style, Term};
use std::io::Write;

/// Where commands report to.
///
/// Status goes to stdout and is silenced by `--quiet`; errors always go to
/// stderr. Payload lines (shell exports, JSON) bypass `--quiet`.
pub struct Output {
    out: Term,
    err: Term,
    quiet: bool,
    success: Style,
    warning: Style,
    error: Style,
    dim: Style,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            quiet,
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    pub fn message(&mut self, msg: &str) {
        if !self.quiet {
            writeln!(self.out, "{}", msg).ok();
        }
    }

    pub fn success(&mut self, msg: &str) {
        if !self.quiet {
            writeln!(self.out, "{} {}", self.success.apply_to("✓"), msg).ok();
        }
    }

    pub fn warning(&mut self, msg: &str) {
        if !self.quiet {
            writeln!(self.out, "{} {}", self.warning.apply_to("!"), msg).ok();
        }
    }

    pub fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.error.apply_to(msg)).ok();
    }

    /// A requirement line: `✓ KEY  description` or `✗ KEY  description`.
    pub fn status(&mut self, ok: bool, key: &str, description: &str) {
        if self.quiet {
            return;
        }
        let mark = if ok {
            self.success.apply_to("✓")
        } else {
            self.error.apply_to("✗")
        };
        writeln!(
            self.out,
            "{} {}  {}",
            mark,
            key,
            self.dim.apply_to(description)
        )
        .ok();
    }

    /// A line of machine-readable output.
    pub fn payload(&mut self, line: &str) {
        writeln!(self.out, "{}", line).ok();
    }
}
