//diagnostics shared by every phase of the translator
//each phase reports (kind, span, message) into one ErrorHandler,
//main.rs prints them and refuses to generate code when errors were reported

use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use console::style;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParseError,
    SymbolNotFound,
    SymbolRedefinition,
    ForwardReferenceToVariable,
    IncompatibleTypes,
    IncompatibleArgType,
    IncorrectArgNumbers,
    InvalidOperation,
    UnknownTarget,
    ModelMismatch,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::ParseError => "ERR-SYN-001",
            ErrorKind::SymbolNotFound => "ERR-SEM-101",
            ErrorKind::SymbolRedefinition => "ERR-SEM-102",
            ErrorKind::ForwardReferenceToVariable => "ERR-SEM-103",
            ErrorKind::IncompatibleTypes => "ERR-TYP-201",
            ErrorKind::IncompatibleArgType => "ERR-TYP-202",
            ErrorKind::IncorrectArgNumbers => "ERR-TYP-203",
            ErrorKind::InvalidOperation => "ERR-TYP-204",
            ErrorKind::UnknownTarget => "ERR-DRV-301",
            ErrorKind::ModelMismatch => "WARN-GEN-401",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct WichError {
    pub kind: ErrorKind,
    pub message: String,
    pub start: usize,
    pub end: usize,
    pub src: Option<Rc<str>>,
    pub suggestion: Option<String>,
    pub severity: Severity,
}

impl WichError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span, src: Option<Rc<str>>) -> Self {
        WichError {
            kind,
            message: message.into(),
            start: span.start,
            end: span.end,
            src,
            suggestion: None,
            severity: Severity::Error,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    pub fn line(&self) -> Option<usize> {
        self.src
            .as_ref()
            .map(|src| src[..self.start.min(src.len())].matches('\n').count() + 1)
    }
}

impl Display for WichError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tag = format!("[{}]", self.kind.code());
        match self.severity {
            Severity::Error => writeln!(f, "{} {}", style(tag).red().bold(), self.message)?,
            Severity::Warning => writeln!(f, "{} {}", style(tag).yellow().bold(), self.message)?,
        }
        if let Some(src) = &self.src {
            let start = self.start.min(src.len());
            let end = self.end.clamp(start, src.len());
            let line_num = src[..start].matches('\n').count() + 1;
            let line_start = src[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let line_end = src[start..].find('\n').map(|i| start + i).unwrap_or(src.len());
            let pad = src[line_start..start].chars().count();
            let width = src[start..end.min(line_end)].chars().count().max(1);
            writeln!(f, "{:>4} | {}", line_num, &src[line_start..line_end])?;
            writeln!(f, "     | {}{}", " ".repeat(pad), style("^".repeat(width)).red())?;
        }
        if let Some(suggestion) = &self.suggestion {
            writeln!(f, "{}", style(format!("Suggestion: {}", suggestion)).cyan())?;
        }
        Ok(())
    }
}

impl std::error::Error for WichError {}

#[derive(Debug, Clone, Default)]
pub struct ErrorHandler {
    src: Option<Rc<str>>,
    diagnostics: Vec<WichError>,
}

impl ErrorHandler {
    pub fn new(src: &str) -> Self {
        ErrorHandler {
            src: Some(Rc::from(src)),
            diagnostics: Vec::new(),
        }
    }

    pub fn src(&self) -> Option<Rc<str>> {
        self.src.clone()
    }

    pub fn error(&mut self, kind: ErrorKind, span: Span, message: impl Into<String>) {
        let err = WichError::new(kind, message, span, self.src.clone());
        self.diagnostics.push(err);
    }

    pub fn warning(&mut self, kind: ErrorKind, span: Span, message: impl Into<String>) {
        let err = WichError::new(kind, message, span, self.src.clone()).warning();
        self.diagnostics.push(err);
    }

    //model warnings have no source position
    pub fn internal_warning(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.diagnostics.push(WichError::new(kind, message, 0..0, None).warning());
    }

    pub fn internal_error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.diagnostics.push(WichError::new(kind, message, 0..0, None));
    }

    pub fn push(&mut self, err: WichError) {
        self.diagnostics.push(err);
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn errors(&self) -> impl Iterator<Item = &WichError> {
        self.diagnostics.iter().filter(|e| e.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &WichError> {
        self.diagnostics.iter().filter(|e| e.severity == Severity::Warning)
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.errors().map(|e| e.kind).collect()
    }

    pub fn diagnostics(&self) -> &[WichError] {
        &self.diagnostics
    }
}
