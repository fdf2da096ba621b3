//! Purpose: Crate-wide error value shared by validation, transport, and the CLI.
//! Exports: `Error`, `ErrorKind`, `ValidationIssue`, `to_exit_code`.
//! Role: Single error type; kinds separate "bad input" from "platform/network failure".
//! Invariants: Validation errors always carry at least one `ValidationIssue`.
//! Invariants: Transport errors keep the url, status, and parsed body when known.
use serde::Serialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Validation,
    Transport,
    Io,
}

/// One field-level validation failure.
///
/// `loc` is the path from the validated root to the offending field, e.g.
/// `["items", "2", "geolocation", "longitude"]`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub loc: Vec<String>,
    pub message: String,
    pub code: String,
}

impl ValidationIssue {
    pub fn new(field: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            loc: vec![field.to_string()],
            message: message.into(),
            code: code.to_string(),
        }
    }

    /// Nest this issue under `parent`, e.g. `longitude` -> `geolocation.longitude`.
    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.loc.insert(0, parent.into());
        self
    }

    pub fn field(&self) -> String {
        self.loc.join(".")
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field(), self.message)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    url: Option<String>,
    status: Option<u16>,
    batch: Option<usize>,
    response: Option<Value>,
    issues: Vec<ValidationIssue>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            url: None,
            status: None,
            batch: None,
            response: None,
            issues: Vec::new(),
            source: None,
        }
    }

    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        let message = match issues.len() {
            1 => "1 validation error".to_string(),
            count => format!("{count} validation errors"),
        };
        Self::new(ErrorKind::Validation)
            .with_message(message)
            .with_issues(issues)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn batch(&self) -> Option<usize> {
        self.batch
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_issues(mut self, issues: Vec<ValidationIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(url) = &self.url {
            write!(f, " (url: {url})")?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {status})")?;
        }
        if let Some(batch) = self.batch {
            write!(f, " (batch: {batch})")?;
        }
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Validation => 3,
        ErrorKind::Transport => 4,
        ErrorKind::Io => 5,
    }
}
