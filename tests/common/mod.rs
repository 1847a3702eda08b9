// ==============================================================================
// Shared Test Helpers
// ==============================================================================
//
// Common utility functions used across multiple integration test files.
//
// Each test file that imports this module compiles its own copy, so not every
// function is used in every binary. Suppress the resulting dead_code warnings.
#![allow(dead_code)]
// Import this module in each test file with:
//
//     mod common;
//     use common::{fixture, fixture_path, render_diagnostic};

use std::fmt::Write;
use std::fs;
use std::path::PathBuf;

use miette::{GraphicalReportHandler, GraphicalTheme};

pub const FIXTURE_DIR: &str = "tests/fixtures";

/// Path of a protocol document under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(FIXTURE_DIR).join(name)
}

/// Read a fixture with `\r\n` normalized away, so Windows checkouts produce
/// the same generated text and spans.
pub fn fixture(name: &str) -> String {
    let path = fixture_path(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
        .replace("\r\n", "\n")
}

/// Render a single diagnostic to a deterministic string for snapshot tests.
/// Uses non-unicode theme at 80 columns.
pub fn render_diagnostic(report: &miette::Report) -> String {
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::none()).with_width(80);
    let mut buf = String::new();
    handler
        .render_report(&mut buf, report.as_ref())
        .expect("render to String is infallible");
    buf
}

/// Render multiple diagnostics, separated by blank lines.
pub fn render_diagnostics(reports: &[miette::Report]) -> String {
    let mut buf = String::new();
    for (i, r) in reports.iter().enumerate() {
        if i > 0 {
            writeln!(buf).expect("write to String is infallible");
        }
        buf.push_str(&render_diagnostic(r));
    }
    buf
}

/// The generated code of one interface: its proxy type and everything up to
/// the next proxy type.
pub fn section<'a>(code: &'a str, ident: &str) -> &'a str {
    let start = code
        .find(&format!("\ntype {ident} struct {{\n"))
        .unwrap_or_else(|| panic!("no type {ident} in:\n{code}"))
        + 1;
    let rest = &code[start..];
    let is_proxy = |at: usize| {
        let tail = &rest[at + 1..];
        tail.starts_with("type ")
            && tail
                .lines()
                .nth(1)
                .is_some_and(|line| line.ends_with("BaseProxy"))
    };
    let end = rest
        .match_indices('\n')
        .map(|(at, _)| at)
        .find(|&at| at > 0 && is_proxy(at))
        .unwrap_or(rest.len());
    &rest[..end]
}
