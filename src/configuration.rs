use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ResultExt as _};

/// The settings of the ticket exporter, read from a camelCase JSON file such as:
///
/// ```json
/// {
///     "outputDirectory": "/srv/produkcja",
///     "fonts": { "regular": "fonts/DejaVuSans.ttf", "bold": "fonts/DejaVuSans-Bold.ttf" },
///     "openAfterExport": false
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketConfiguration {
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    pub fonts: FontFiles,
    #[serde(default = "default_open_after_export")]
    pub open_after_export: bool,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FontFiles {
    pub regular: PathBuf,
    pub bold: PathBuf,
    #[serde(default)]
    pub italic: Option<PathBuf>,
}

/// Information written into the document dictionary of every exported PDF.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMetadata {
    pub author: String,
    pub creator: String,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        DocumentMetadata {
            author: String::new(),
            creator: "ticketr".into(),
        }
    }
}

impl TicketConfiguration {
    /// Reads the configuration file. Relative font paths are resolved against the directory
    /// holding the configuration file.
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .with_context(|| {
                format!(
                    "Failed to read the configuration file {:?}",
                    configuration_file_path
                )
            })?;
        let mut configuration = TicketConfiguration::from_json_str(&configuration_file_contents)?;
        if let Some(base_directory) = configuration_file_path.parent() {
            configuration.fonts = configuration.fonts.resolved_against(base_directory);
        }

        Ok(configuration)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContextError> {
        serde_json::from_str(json).context("Failed to parse the configuration file")
    }
}

impl FontFiles {
    fn resolved_against(self, base_directory: &Path) -> FontFiles {
        let resolve = |path: PathBuf| {
            if path.is_relative() {
                base_directory.join(path)
            } else {
                path
            }
        };

        FontFiles {
            regular: resolve(self.regular),
            bold: resolve(self.bold),
            italic: self.italic.map(resolve),
        }
    }
}

/// `C:\produkcja` on Windows, `$HOME/produkcja` elsewhere (or `produkcja` in the working
/// directory when no home directory is known).
pub fn default_output_directory() -> PathBuf {
    if cfg!(windows) {
        return PathBuf::from(r"C:\produkcja");
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join("produkcja"),
        None => PathBuf::from("produkcja"),
    }
}

fn default_open_after_export() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_configuration_uses_defaults() {
        let configuration = TicketConfiguration::from_json_str(
            r#"{ "fonts": { "regular": "/fonts/a.ttf", "bold": "/fonts/b.ttf" } }"#,
        )
        .unwrap();

        assert_eq!(configuration.output_directory, default_output_directory());
        assert!(configuration.open_after_export);
        assert_eq!(configuration.fonts.italic, None);
        assert_eq!(configuration.metadata.creator, "ticketr");
    }

    #[test]
    fn relative_font_paths_follow_the_configuration_file() {
        let directory = tempfile::tempdir().unwrap();
        let configuration_path = directory.path().join("ticketr.json");
        std::fs::write(
            &configuration_path,
            r#"{
                "outputDirectory": "/tmp/produkcja",
                "fonts": { "regular": "DejaVuSans.ttf", "bold": "/abs/DejaVuSans-Bold.ttf", "italic": "it.ttf" },
                "openAfterExport": false,
                "metadata": { "author": "Biuro" }
            }"#,
        )
        .unwrap();

        let configuration = TicketConfiguration::from_path(&configuration_path).unwrap();
        assert_eq!(
            configuration.fonts.regular,
            directory.path().join("DejaVuSans.ttf")
        );
        assert_eq!(
            configuration.fonts.bold,
            PathBuf::from("/abs/DejaVuSans-Bold.ttf")
        );
        assert_eq!(
            configuration.fonts.italic,
            Some(directory.path().join("it.ttf"))
        );
        assert!(!configuration.open_after_export);
        assert_eq!(configuration.metadata.author, "Biuro");
        assert_eq!(configuration.metadata.creator, "ticketr");
    }

    #[test]
    fn missing_font_section_is_reported() {
        let error = TicketConfiguration::from_json_str("{}").unwrap_err();
        assert_eq!(error.context, "Failed to parse the configuration file");
        assert!(error.source_error.unwrap().contains("fonts"));
    }

    #[test]
    fn unreadable_file_is_reported_with_its_path() {
        let error = TicketConfiguration::from_path(Path::new("/nonexistent/ticketr.json"))
            .unwrap_err();
        assert!(error.context.contains("/nonexistent/ticketr.json"));
    }
}
