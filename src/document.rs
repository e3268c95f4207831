//! Collaborators at the edge of the pipeline: the document source, the body
//! persistence step and the renderer binary locator.

use crate::artifacts::write_temp_file;
use crate::error::{ExportError, Result};
use crate::template;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable consulted by [`EnvBinaryLocator`].
pub const BINARY_ENV_VAR: &str = "PHANTOMJS_BIN";
const DEFAULT_BINARY_NAME: &str = "phantomjs";
const BODY_PREFIX: &str = "report-body-";
const BODY_SUFFIX: &str = ".html";

/// Source of already-rendered report HTML.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentSource {
    fn content(&self) -> String;
    fn header(&self) -> String;
    fn footer(&self) -> String;
}

/// Plain in-memory document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    pub content: String,
    pub header: String,
    pub footer: String,
}

impl HtmlDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }
}

impl DocumentSource for HtmlDocument {
    fn content(&self) -> String {
        self.content.clone()
    }

    fn header(&self) -> String {
        self.header.clone()
    }

    fn footer(&self) -> String {
        self.footer.clone()
    }
}

/// Writes the body HTML somewhere the renderer can open it.
#[cfg_attr(test, mockall::automock)]
pub trait BodyPersister: Send + Sync {
    /// Persists `html` and returns the file path. The pipeline takes
    /// ownership of the file and deletes it when the job ends.
    fn persist(&self, html: &str, temp_dir: &Path) -> Result<PathBuf>;
}

/// Persists the body as a uniquely named `.html` file in the temp directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempFileBodyPersister;

impl BodyPersister for TempFileBodyPersister {
    fn persist(&self, html: &str, temp_dir: &Path) -> Result<PathBuf> {
        write_temp_file(temp_dir, BODY_PREFIX, BODY_SUFFIX, html)
    }
}

/// Resolves the absolute path of the renderer executable.
#[cfg_attr(test, mockall::automock)]
pub trait BinaryLocator: Send + Sync {
    fn locate(&self) -> Result<PathBuf>;
}

/// Always returns the path it was built with.
#[derive(Debug, Clone)]
pub struct StaticBinaryLocator(pub PathBuf);

impl BinaryLocator for StaticBinaryLocator {
    fn locate(&self) -> Result<PathBuf> {
        if self.0.is_file() {
            Ok(self.0.clone())
        } else {
            Err(ExportError::BinaryNotFound(self.0.display().to_string()))
        }
    }
}

/// Reads [`BINARY_ENV_VAR`], falling back to a `phantomjs` lookup on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct EnvBinaryLocator;

impl BinaryLocator for EnvBinaryLocator {
    fn locate(&self) -> Result<PathBuf> {
        if let Some(path) = env::var_os(BINARY_ENV_VAR).filter(|v| !v.is_empty()) {
            return StaticBinaryLocator(PathBuf::from(path)).locate();
        }

        let file_name = if cfg!(windows) {
            format!("{}.exe", DEFAULT_BINARY_NAME)
        } else {
            DEFAULT_BINARY_NAME.to_string()
        };
        let search_path = env::var_os("PATH").unwrap_or_default();
        let found = env::split_paths(&search_path)
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file());
        found.ok_or_else(|| {
            ExportError::BinaryNotFound(format!(
                "{} is unset and `{}` is not on PATH",
                BINARY_ENV_VAR, file_name
            ))
        })
    }
}

/// The body file plus templated header and footer, ready for layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    body_path: PathBuf,
    header: Option<String>,
    footer: Option<String>,
}

impl RenderedDocument {
    /// Templates the raw fragments; blank fragments count as absent.
    pub fn new(body_path: PathBuf, header_fragment: &str, footer_fragment: &str) -> Self {
        let prepare = |fragment: &str| {
            let processed = template::process(fragment);
            (!processed.is_empty()).then_some(processed)
        };
        Self {
            body_path,
            header: prepare(header_fragment),
            footer: prepare(footer_fragment),
        }
    }

    pub fn body_path(&self) -> &Path {
        &self.body_path
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_rendered_document_templates_fragments() {
        let doc = RenderedDocument::new(
            PathBuf::from("/tmp/body.html"),
            "<h1 class=\"t\">Report</h1>",
            "\n  \n",
        );
        assert_eq!(doc.header(), Some("<h1 class='t'>Report</h1>"));
        assert_eq!(doc.footer(), None);
        assert_eq!(doc.body_path(), Path::new("/tmp/body.html"));
    }

    #[test]
    fn test_temp_file_persister() {
        let dir = TempDir::new().unwrap();
        let path = TempFileBodyPersister
            .persist("<p>body</p>", dir.path())
            .unwrap();

        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "html");
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>body</p>");
    }

    #[test]
    fn test_static_locator_requires_file() {
        let dir = TempDir::new().unwrap();
        let binary = dir.path().join("phantomjs");
        assert!(matches!(
            StaticBinaryLocator(binary.clone()).locate(),
            Err(ExportError::BinaryNotFound(_))
        ));

        fs::write(&binary, "").unwrap();
        assert_eq!(StaticBinaryLocator(binary.clone()).locate().unwrap(), binary);
    }

    #[test]
    fn test_html_document_builder() {
        let doc = HtmlDocument::new("<p/>").with_footer("f");
        assert_eq!(doc.content(), "<p/>");
        assert_eq!(doc.header(), "");
        assert_eq!(doc.footer(), "f");
    }
}
