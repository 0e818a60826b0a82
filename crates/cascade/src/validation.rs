//! Manifest validation utilities

use crate::schema::{Manifest, SourceKind, SourceSpec};
use regex::Regex;
use std::fmt;
use types::{CascadeError, Result};

/// Manifest validator
pub struct ManifestValidator;

impl ManifestValidator {
    /// Validate a complete manifest
    pub fn validate(manifest: &Manifest) -> ValidationReport {
        let mut report = ValidationReport::default();

        if manifest.sources.is_empty() {
            report.warning(None, "sources", "Manifest declares no sources");
        }

        if let Some(env_name) = &manifest.env_name {
            if env_name.trim().is_empty() {
                report.error(None, "env_name", "Environment name cannot be empty");
            }
        }

        if let Some(roots) = &manifest.file_roots {
            if roots.is_empty() {
                report.warning(
                    None,
                    "file_roots",
                    "Empty file_roots list disables all file coercion tags",
                );
            }
        }

        for (index, source) in manifest.sources.iter().enumerate() {
            Self::validate_source(index, source, &mut report);
        }

        report
    }

    fn validate_source(index: usize, source: &SourceSpec, report: &mut ValidationReport) {
        let at = Some(index);

        match source.kind {
            SourceKind::Obj => {
                if source.value.is_none() {
                    report.error(at, "value", "obj source requires a value");
                }
            }
            SourceKind::File | SourceKind::Envfile | SourceKind::Yaml => {
                if source.path.as_deref().map_or(true, str::is_empty) {
                    report.error(at, "path", format!("{} source requires a path", source.kind));
                }
            }
            SourceKind::Remote => {
                for (name, value) in [
                    ("url", &source.url),
                    ("db", &source.db),
                    ("coll", &source.coll),
                    ("id", &source.id),
                ] {
                    if value.as_deref().map_or(true, str::is_empty) {
                        report.error(at, name, "remote source requires url, db, coll and id");
                    }
                }
                if let Some(url) = &source.url {
                    if !url.starts_with("http://")
                        && !url.starts_with("https://")
                        && !url.starts_with('{')
                    {
                        report.warning(
                            at,
                            "url",
                            "Document store URL should start with http:// or https://",
                        );
                    }
                }
            }
            SourceKind::Args | SourceKind::Env | SourceKind::Directory => {}
        }

        if let Some(pattern) = &source.regexp {
            if let Err(e) = Regex::new(pattern) {
                report.error(at, "regexp", format!("Invalid pattern: {}", e));
            }
        }

        let filters_keys = matches!(
            source.kind,
            SourceKind::Args | SourceKind::Env | SourceKind::Envfile
        );
        if !filters_keys && (source.prefix.is_some() || source.regexp.is_some()) {
            report.warning(
                at,
                "prefix",
                format!("prefix/regexp have no effect on {} sources", source.kind),
            );
        }
        if source.ignore_missing
            && !matches!(
                source.kind,
                SourceKind::File | SourceKind::Envfile | SourceKind::Yaml
            )
        {
            report.warning(
                at,
                "ignore_missing",
                format!("ignore_missing has no effect on {} sources", source.kind),
            );
        }
        if let Some(mount) = &source.mount {
            if mount.trim().is_empty() {
                report.error(at, "mount", "Mount path cannot be empty");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A problem with one manifest field, or with one field of one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIssue {
    pub severity: Severity,
    /// Index into `sources`, or `None` for top-level fields
    pub source: Option<usize>,
    pub field: &'static str,
    pub message: String,
}

impl ManifestIssue {
    /// Manifest path of the offending field, e.g. `sources[2].url`
    pub fn location(&self) -> String {
        match self.source {
            Some(index) => format!("sources[{}].{}", index, self.field),
            None => self.field.to_string(),
        }
    }
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self.message)
    }
}

/// Everything `ManifestValidator` found, in manifest order
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    issues: Vec<ManifestIssue>,
}

impl ValidationReport {
    fn push(
        &mut self,
        severity: Severity,
        source: Option<usize>,
        field: &'static str,
        message: impl Into<String>,
    ) {
        self.issues.push(ManifestIssue {
            severity,
            source,
            field,
            message: message.into(),
        });
    }

    fn error(&mut self, source: Option<usize>, field: &'static str, message: impl Into<String>) {
        self.push(Severity::Error, source, field, message);
    }

    fn warning(&mut self, source: Option<usize>, field: &'static str, message: impl Into<String>) {
        self.push(Severity::Warning, source, field, message);
    }

    pub fn errors(&self) -> impl Iterator<Item = &ManifestIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ManifestIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// `Ok` when no errors were found, otherwise a `Manifest` error listing them
    pub fn into_result(self) -> Result<()> {
        let errors: Vec<String> = self.errors().map(ToString::to_string).collect();
        if errors.is_empty() {
            return Ok(());
        }
        Err(CascadeError::Manifest(format!(
            "{} invalid manifest field(s): {}",
            errors.len(),
            errors.join("; ")
        )))
    }
}
