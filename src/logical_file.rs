//! sanitized naming for one output file and its temporary section bodies

use std::path::{Path, PathBuf};

/// name used when sanitization strips a base name down to nothing
const PLACEHOLDER: &str = "unnamed";

/// extension shared by every temporary section body
const TEMPORARY_EXTENSION: &str = "tmp";

const DEFAULT_EXTENSION: &str = "vtk";

/// identifies one output file on disk.
///
/// The base name is sanitized on construction: leading whitespace and
/// characters that are illegal in file names are stripped, and an empty
/// result falls back to a placeholder. Temporary section bodies derive their
/// names deterministically from the base name plus a per-section suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalFile {
    directory: PathBuf,
    base_name: String,
    extension: String,
}

impl LogicalFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let base_name = sanitize(
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
                .as_str(),
        );

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        Self {
            directory,
            base_name,
            extension,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// full path of the assembled output file
    pub fn output_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.base_name, self.extension))
    }

    /// full path of the temporary body for the section named by `suffix`
    pub fn section_path(&self, suffix: &str) -> PathBuf {
        self.directory.join(format!(
            "{}_{}.{}",
            self.base_name,
            sanitize(suffix),
            TEMPORARY_EXTENSION
        ))
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim_start()
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();

    if cleaned.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        cleaned
    }
}
