//! Rendering of the diagnostic bag.
//!
//! Two modes. With a source attached, every diagnostic becomes an
//! annotated snippet: worst severity first, the stable `CRxxxx` code in
//! the title, related spans as context annotations, and taxonomy help
//! ([`super::DiagnosticKind::help`]) as a footer. Without a source, a
//! terse byte-offset listing is produced for logs and tests. Both modes
//! tag their output with the `crisp` source tag and end with a severity
//! summary.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use rowan::TextRange;

use super::{Diagnostic, Diagnostics, SOURCE_TAG, Severity};

/// Builder for rendering a bag of diagnostics.
pub struct DiagnosticsPrinter<'d, 's> {
    bag: &'d Diagnostics,
    source: Option<&'s str>,
    path: Option<&'s str>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(bag: &'d Diagnostics) -> Self {
        Self {
            bag,
            source: None,
            path: None,
            colored: false,
        }
    }

    /// Attaches the source text, enabling snippet rendering.
    pub fn source(mut self, source: &'s str) -> Self {
        self.source = Some(source);
        self
    }

    /// Display path for diagnostics that carry none of their own.
    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        match self.source {
            Some(source) => self.render_snippets(&mut out, source),
            None => self.render_listing(&mut out),
        }
        if !self.bag.is_empty() {
            self.render_summary(&mut out);
        }
        out
    }

    /// The bag's diagnostics, worst severity first. The sort is stable, so
    /// emission order is kept within each severity.
    fn ordered(&self) -> Vec<&Diagnostic> {
        let mut ordered: Vec<&Diagnostic> = self.bag.iter().collect();
        ordered.sort_by_key(|d| severity_rank(d.severity()));
        ordered
    }

    fn render_snippets(&self, out: &mut String, source: &str) {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (index, diag) in self.ordered().into_iter().enumerate() {
            // A diagnostic's own file path wins; the builder's path is the
            // fallback, and the source tag stands in for pathless sessions.
            let origin = diag
                .file_path
                .as_deref()
                .or(self.path)
                .unwrap_or(SOURCE_TAG);
            let title = format!("{}: {}", diag.code(), diag.message);

            let mut snippet = Snippet::source(source).line_start(1).path(origin).annotation(
                AnnotationKind::Primary
                    .span(byte_span(diag.range, source.len()))
                    .label(diag.kind.default_message()),
            );
            for related in &diag.related {
                snippet = snippet.annotation(
                    AnnotationKind::Context
                        .span(byte_span(related.range, source.len()))
                        .label(&related.message),
                );
            }

            let mut report: Vec<Group> = vec![
                severity_level(diag.severity())
                    .primary_title(&title)
                    .element(snippet),
            ];
            if let Some(help) = diag.kind.help() {
                report.push(Group::with_title(Level::HELP.secondary_title(help)));
            }

            if index > 0 {
                out.push('\n');
            }
            let _ = write!(out, "{}", renderer.render(&report));
            out.push('\n');
        }
    }

    /// One line per diagnostic, byte offsets only.
    fn render_listing(&self, out: &mut String) {
        for diag in self.ordered() {
            let _ = writeln!(
                out,
                "{}[{}] {}..{} {} ({SOURCE_TAG})",
                diag.severity(),
                diag.code(),
                u32::from(diag.range.start()),
                u32::from(diag.range.end()),
                diag.message
            );
        }
    }

    fn render_summary(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "{SOURCE_TAG}: {} error(s), {} warning(s)",
            self.bag.error_count(),
            self.bag.warning_count()
        );
    }
}

fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Error => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    }
}

fn severity_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
        Severity::Info => Level::INFO,
    }
}

/// Converts a span to byte offsets, clamped to the source and widened to
/// one byte when empty so fabricated-token positions still point somewhere.
fn byte_span(range: TextRange, len: usize) -> std::ops::Range<usize> {
    let start = usize::from(range.start()).min(len);
    let end = usize::from(range.end()).min(len);
    if start == end {
        start..(start + 1).min(len)
    } else {
        start..end
    }
}

impl Diagnostics {
    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}
