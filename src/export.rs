use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash as _, Hasher as _},
    path::{Path, PathBuf},
    process::Command,
};

use time::OffsetDateTime;

use crate::configuration::{DocumentMetadata, TicketConfiguration};
use crate::document::Document;
use crate::error::{ContextError, ResultExt as _};
use crate::fonts::{FontFamily, TextMeasure};
use crate::records::{Client, Order, OrderItem};
use crate::ticket::compose_production_page;

/// Replaces every character other than ASCII letters, digits, `.`, `_` and `-` with `_`.
pub fn slug(text: &str) -> String {
    text.chars()
        .map(|character| match character {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => character,
            _ => '_',
        })
        .collect()
}

/// The name of the exported file: the sanitized explicit name when there is one, otherwise
/// `{order number}_{client name}_PRODUKCJA.pdf`.
pub fn ticket_file_name(order: &Order, client: &Client, explicit_name: Option<&str>) -> String {
    if let Some(explicit_name) = explicit_name.filter(|name| !name.trim().is_empty()) {
        return pdf_file_name(explicit_name);
    }

    let or_default = |value: &str, default: &'static str| {
        if value.is_empty() {
            default.to_string()
        } else {
            slug(value)
        }
    };
    format!(
        "{}_{}_PRODUKCJA.pdf",
        or_default(&order.order_number, "zamowienie"),
        or_default(&client.name, "klient")
    )
}

/// The slug of a name chosen by the user, with the `.pdf` extension appended when missing.
fn pdf_file_name(name: &str) -> String {
    let file_name = slug(name.trim());
    if file_name.to_ascii_lowercase().ends_with(".pdf") {
        file_name
    } else {
        format!("{file_name}.pdf")
    }
}

/// Typesets a display list saved as JSON into the output directory and returns the absolute
/// path of the PDF file. The file is named after the display list unless a name is given.
pub fn typeset_display_list(
    display_list_path: &Path,
    font_family: &FontFamily,
    output_directory: &Path,
    file_name: Option<&str>,
) -> Result<PathBuf, ContextError> {
    let document = Document::from_path(display_list_path)?;
    let file_name = match file_name.filter(|name| !name.trim().is_empty()) {
        Some(file_name) => pdf_file_name(file_name),
        None => {
            let stem = display_list_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            pdf_file_name(if stem.trim().is_empty() { "dokument" } else { &stem })
        }
    };

    std::fs::create_dir_all(output_directory).with_context(|| {
        format!("Unable to create the output directory {:?}", output_directory)
    })?;
    let output_path = output_directory.join(file_name);
    document.save_to_pdf_file(&output_path, font_family)?;
    let output_path = std::path::absolute(&output_path).with_context(|| {
        format!("Unable to resolve the absolute path of {:?}", output_path)
    })?;
    log::info!(
        "Typeset the display list {:?} into {:?}",
        display_list_path,
        output_path
    );

    Ok(output_path)
}

/// Turns a display list into the bytes of a PDF file. The layout is measured with the same
/// faces the document is later typeset with.
pub trait Typesetter: TextMeasure {
    fn typeset(&self, document: &Document) -> Result<Vec<u8>, ContextError>;
}

impl Typesetter for FontFamily {
    fn typeset(&self, document: &Document) -> Result<Vec<u8>, ContextError> {
        document.save_to_bytes(self)
    }
}

/// Shows an exported file to the user.
pub trait FileOpener {
    fn open(&self, path: &Path) -> Result<(), ContextError>;
}

impl<O: FileOpener + ?Sized> FileOpener for &O {
    fn open(&self, path: &Path) -> Result<(), ContextError> {
        (**self).open(path)
    }
}

/// Opens files with the default application of the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl FileOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<(), ContextError> {
        if cfg!(target_os = "windows") {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(path);
            return run_opener(command);
        }
        if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg(path);
            return run_opener(command);
        }

        let mut command = Command::new("xdg-open");
        command.arg(format!("file://{}", path.display()));
        run_opener(command).or_else(|error| {
            log::debug!("{}, trying gio instead", error);
            let mut command = Command::new("gio");
            command.arg("open").arg(path);
            run_opener(command)
        })
    }
}

fn run_opener(mut command: Command) -> Result<(), ContextError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let status = command
        .status()
        .with_context(|| format!("Unable to launch {}", program))?;
    if !status.success() {
        return Err(ContextError::with_context(format!(
            "{} exited with {}",
            program, status
        )));
    }

    Ok(())
}

/// Renders production tickets and writes them into the output directory.
pub struct TicketExporter<T: Typesetter, O: FileOpener> {
    typesetter: T,
    opener: O,
    output_directory: PathBuf,
    open_after_export: bool,
    metadata: DocumentMetadata,
}

impl TicketExporter<FontFamily, SystemOpener> {
    /// Loads the fonts named by the configuration and opens the exported files with the
    /// default application of the system.
    pub fn from_configuration(configuration: &TicketConfiguration) -> Result<Self, ContextError> {
        let font_family = FontFamily::from_font_files(&configuration.fonts)?;

        Ok(TicketExporter::new(
            font_family,
            SystemOpener,
            configuration.output_directory.clone(),
        )
        .with_open_after_export(configuration.open_after_export)
        .with_metadata(configuration.metadata.clone()))
    }
}

impl<T: Typesetter, O: FileOpener> TicketExporter<T, O> {
    pub fn new(typesetter: T, opener: O, output_directory: PathBuf) -> Self {
        TicketExporter {
            typesetter,
            opener,
            output_directory,
            open_after_export: true,
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn with_open_after_export(mut self, open_after_export: bool) -> Self {
        self.open_after_export = open_after_export;
        self
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// The display list of the production page of the order.
    pub fn ticket_document(&self, order: &Order, client: &Client, items: &[OrderItem]) -> Document {
        let creation_time = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let identifier = |salt: &str| {
            let mut hasher = DefaultHasher::new();
            (salt, &order.order_number, &client.name, creation_time).hash(&mut hasher);
            format!("{:016x}", hasher.finish())
        };

        Document {
            document_id: identifier("document"),
            instance_id: identifier("instance"),
            title: format!("Karta produkcji {}", order.order_number).trim_end().to_string(),
            author: self.metadata.author.clone(),
            creator: self.metadata.creator.clone(),
            operations: compose_production_page(&self.typesetter, order, client, items),
        }
    }

    /// Writes the production ticket of the order and returns the absolute path of the file.
    ///
    /// The output directory is created when missing. Failing to open the file afterwards is
    /// only logged: the ticket has been written at that point.
    pub fn export(
        &self,
        order: &Order,
        client: &Client,
        items: &[OrderItem],
        file_name: Option<&str>,
    ) -> Result<PathBuf, ContextError> {
        let file_name = ticket_file_name(order, client, file_name);
        std::fs::create_dir_all(&self.output_directory).with_context(|| {
            format!(
                "Unable to create the output directory {:?}",
                self.output_directory
            )
        })?;

        let document = self.ticket_document(order, client, items);
        let pdf_document_bytes = self
            .typesetter
            .typeset(&document)
            .context("Unable to typeset the production ticket")?;
        let output_path = self.output_directory.join(&file_name);
        std::fs::write(&output_path, &pdf_document_bytes)
            .with_context(|| format!("Unable to write the production ticket {:?}", output_path))?;
        let output_path = std::path::absolute(&output_path).with_context(|| {
            format!("Unable to resolve the absolute path of {:?}", output_path)
        })?;
        log::info!(
            "Saved the production ticket ({} bytes) to {:?}",
            pdf_document_bytes.len(),
            output_path
        );

        if self.open_after_export {
            if let Err(error) = self.opener.open(&output_path) {
                log::warn!("Unable to open {:?}: {}", output_path, error);
            }
        }

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn order(order_number: &str) -> Order {
        Order {
            order_number: order_number.into(),
            ..Default::default()
        }
    }

    fn client(name: &str) -> Client {
        Client {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn slug_keeps_only_safe_characters() {
        assert_eq!(slug("Z-2024/001"), "Z-2024_001");
        assert_eq!(slug("Łódź Sp. z o.o."), "__d__Sp._z_o.o.");
        assert_eq!(slug("a_b.c-d"), "a_b.c-d");
        assert_eq!(slug(""), "");
    }

    #[test]
    fn file_name_is_made_of_order_and_client() {
        assert_eq!(
            ticket_file_name(&order("Z-2024-001"), &client("Acme"), None),
            "Z-2024-001_Acme_PRODUKCJA.pdf"
        );
        assert_eq!(
            ticket_file_name(&order("Z/7"), &client("Kowalski i Syn"), None),
            "Z_7_Kowalski_i_Syn_PRODUKCJA.pdf"
        );
    }

    #[test]
    fn missing_order_or_client_get_placeholders() {
        assert_eq!(
            ticket_file_name(&Order::default(), &Client::default(), None),
            "zamowienie_klient_PRODUKCJA.pdf"
        );
    }

    #[test]
    fn explicit_name_is_sanitized_and_gets_an_extension() {
        let (order, client) = (order("Z-1"), client("Acme"));
        assert_eq!(
            ticket_file_name(&order, &client, Some("karta zlecenia")),
            "karta_zlecenia.pdf"
        );
        assert_eq!(
            ticket_file_name(&order, &client, Some("karta.PDF")),
            "karta.PDF"
        );
        assert_eq!(
            ticket_file_name(&order, &client, Some("../tmp/x.pdf")),
            ".._tmp_x.pdf"
        );
        assert_eq!(
            ticket_file_name(&order, &client, Some("  ")),
            "Z-1_Acme_PRODUKCJA.pdf"
        );
    }
}
