use clap::Parser;
use std::path::PathBuf;
use ticketr::{
    configuration::TicketConfiguration,
    error::ContextError,
    export::{typeset_display_list, FileOpener as _, SystemOpener, TicketExporter},
    fonts::FontFamily,
    records::OrderBundle,
};

/// Exports the production ticket of an order to a PDF file.
#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    /// The path of the JSON configuration file.
    #[arg(short = 'c', long = "configuration", value_name = "json_file")]
    configuration_path: PathBuf,
    /// The path of the JSON file holding the order, its client and its items.
    #[arg(
        short = 'o',
        long = "order",
        value_name = "json_file",
        required_unless_present = "display_list_path",
        conflicts_with = "display_list_path"
    )]
    order_path: Option<PathBuf>,
    /// The path of a JSON display list to typeset instead of an order.
    #[arg(short = 'd', long = "display-list", value_name = "json_file")]
    display_list_path: Option<PathBuf>,
    /// The name of the PDF file, instead of the one derived from the order and the client.
    #[arg(short = 'f', long = "filename", value_name = "file_name")]
    file_name: Option<String>,
    /// Do not open the exported file.
    #[arg(long = "no-open")]
    no_open: bool,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let configuration = TicketConfiguration::from_path(&arguments.configuration_path)?;
    log::debug!("{:?}", configuration);
    let open_after_export = configuration.open_after_export && !arguments.no_open;

    let output_path = match (&arguments.order_path, &arguments.display_list_path) {
        (_, Some(display_list_path)) => {
            let font_family = FontFamily::from_font_files(&configuration.fonts)?;
            let output_path = typeset_display_list(
                display_list_path,
                &font_family,
                &configuration.output_directory,
                arguments.file_name.as_deref(),
            )?;
            if open_after_export {
                if let Err(error) = SystemOpener.open(&output_path) {
                    log::warn!("Unable to open {:?}: {}", output_path, error);
                }
            }
            output_path
        }
        (Some(order_path), None) => {
            let order_bundle = OrderBundle::from_path(order_path)?;
            let exporter = TicketExporter::from_configuration(&configuration)?
                .with_open_after_export(open_after_export);
            exporter.export(
                &order_bundle.order(),
                &order_bundle.client(),
                &order_bundle.items(),
                arguments.file_name.as_deref(),
            )?
        }
        (None, None) => {
            return Err(ContextError::with_context(
                "Either an order or a display list is needed",
            ))
        }
    };
    println!("{}", output_path.display());

    Ok(())
}
