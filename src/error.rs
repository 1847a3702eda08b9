use std::fmt;

use miette::{LabeledSpan, NamedSource, Severity, SourceSpan};

/// The four ways a generation run can fail. Every one of them is fatal to the
/// whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The schema document is malformed or misses a required attribute.
    SchemaDecode,
    /// An argument references an interface that was never registered.
    UnresolvedSymbol,
    /// An argument's wire type tag is outside the closed set.
    UnknownWireType,
    /// A source fragment could not be constructed.
    TemplateRender,
}

impl ErrorKind {
    /// Stable diagnostic code shown by miette.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::SchemaDecode => "wl_scanner::schema_decode",
            ErrorKind::UnresolvedSymbol => "wl_scanner::unresolved_symbol",
            ErrorKind::UnknownWireType => "wl_scanner::unknown_wire_type",
            ErrorKind::TemplateRender => "wl_scanner::template_render",
        }
    }
}

/// A generation error with optional source location information for rich
/// diagnostics.
///
/// Errors raised before the source text is known (for example inside the
/// binding builder) carry only a span; the compiler attaches the named source
/// afterwards with [`ScanError::with_source`].
#[derive(Debug)]
pub struct ScanError {
    pub kind: ErrorKind,
    pub message: String,
    pub src: Option<NamedSource<String>>,
    pub span: Option<SourceSpan>,
    pub label: Option<String>,
    pub help: Option<String>,
}

impl ScanError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ScanError {
            kind,
            message: message.into(),
            src: None,
            span: None,
            label: None,
            help: None,
        }
    }

    pub fn schema_decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaDecode, message)
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TemplateRender, message)
    }

    #[must_use]
    pub fn with_span(mut self, span: Option<SourceSpan>) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_help(mut self, help: Option<String>) -> Self {
        self.help = help;
        self
    }

    /// Attach the document the span points into. No-op when there is no span
    /// or a source is already attached.
    #[must_use]
    pub fn with_source(mut self, name: &str, source: &str) -> Self {
        if self.span.is_some() && self.src.is_none() {
            self.src = Some(NamedSource::new(name, source.to_string()));
        }
        self
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ScanError {}

impl miette::Diagnostic for ScanError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h.clone()) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match (&self.src, self.span) {
            (Some(src), Some(_)) => Some(src),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        self.src.as_ref()?;
        let label = self.label.clone().unwrap_or_else(|| self.message.clone());
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label),
            span,
        ))))
    }
}

/// A non-fatal finding, reported with `Severity::Warning`.
#[derive(Debug)]
pub struct Warning {
    pub message: String,
    pub help: Option<String>,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Warning {}

impl miette::Diagnostic for Warning {
    fn severity(&self) -> Option<Severity> {
        Some(Severity::Warning)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h.clone()) as Box<dyn fmt::Display + 'a>)
    }
}

/// Render a diagnostic to a deterministic string (no color, no unicode) for
/// test assertions.
#[cfg(test)]
pub(crate) fn render_diagnostic(report: &miette::Report) -> String {
    let handler =
        miette::GraphicalReportHandler::new_themed(miette::GraphicalTheme::none()).with_width(80);
    let mut buf = String::new();
    handler
        .render_report(&mut buf, report.as_ref())
        .expect("render to String is infallible");
    buf
}
