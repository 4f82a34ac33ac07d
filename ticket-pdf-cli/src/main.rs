use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use ticket_pdf::ticket::{QrCodeCrateProvider, SeatIcons};
use ticket_pdf::{
    analyze_template, delete_generated_ticket, detect_configuration, list_usable_fonts,
    render_ticket_set, BookingData, RenderOptions, TicketConfig, TicketStore, WriterConfig,
};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ticketpdf",
    about = "Personalized theater tickets from a PDF template",
    version,
    author
)]
struct Cli {
    /// Log debug output of the engine
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect placeholders and labels of a template and print the configuration
    Detect {
        /// One-page PDF template
        template: PathBuf,

        /// Write the configuration here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the fonts a label of this template can use
    Fonts {
        /// One-page PDF template
        template: PathBuf,
    },

    /// Print every content operator of a template with its geometry
    Inspect {
        /// One-page PDF template
        template: PathBuf,
    },

    /// Render one page per ticket of a booking
    Render {
        /// One-page PDF template
        template: PathBuf,

        /// Ticket configuration (JSON); detected from the template when absent
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Booking data (JSON)
        #[arg(short, long)]
        booking: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Write classic cross-reference tables and no object streams
        #[arg(long)]
        compatible: bool,

        /// PNG icons for free, related and booked seats
        #[arg(long, num_args = 3, value_names = ["FREE", "RELATED", "SUBJECT"])]
        icons: Option<Vec<PathBuf>>,

        /// Also publish the tickets into this directory and record their URL
        /// in the booking file
        #[arg(long, requires = "base_url")]
        store_dir: Option<PathBuf>,

        /// URL prefix the store directory is served under
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Delete a published ticket file
    Delete {
        /// URL of the ticket file
        url: String,

        /// Directory the tickets are stored in
        #[arg(long)]
        store_dir: PathBuf,

        /// URL prefix the store directory is served under
        #[arg(long)]
        base_url: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Detect { template, output } => {
            let config = detect_configuration(&read(&template)?)
                .with_context(|| format!("Failed to analyze {}", template.display()))?;
            let json = serde_json::to_string_pretty(&config)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("✓ Configuration written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Commands::Fonts { template } => {
            for name in list_usable_fonts(&read(&template)?)? {
                println!("{name}");
            }
        }

        Commands::Inspect { template } => {
            let analysis = analyze_template(&read(&template)?)?;
            let crop = analysis.crop_box;
            println!(
                "Crop box: {} {} {} {}",
                crop.lower_left.x, crop.lower_left.y, crop.upper_right.x, crop.upper_right.y
            );
            println!("Open saves: {}", analysis.stream.open_saves());
            for op in analysis.stream.operators() {
                let meta = &op.metadata;
                println!(
                    "{:>5} {:>8}..{:<8} {}",
                    meta.index,
                    meta.offset,
                    meta.end_offset,
                    op.operator.name()
                );
            }
            for &index in analysis.stream.image_indices() {
                if let Some(corners) = analysis.stream.image_corners(index) {
                    let [ll, lr, ul, ur] = corners.all();
                    println!(
                        "image #{index}: ({:.2}, {:.2}) ({:.2}, {:.2}) ({:.2}, {:.2}) ({:.2}, {:.2})",
                        ll.x, ll.y, lr.x, lr.y, ul.x, ul.y, ur.x, ur.y
                    );
                }
            }
            for span in analysis.stream.text_spans() {
                println!(
                    "text #{}: {:?} at ({:.2}, {:.2}) to ({:.2}, {:.2}), {} {:.2}",
                    span.index,
                    span.text,
                    span.start.x,
                    span.start.y,
                    span.end.x,
                    span.end.y,
                    span.font_name.as_deref().unwrap_or("-"),
                    span.font_size
                );
            }
        }

        Commands::Render {
            template,
            config,
            booking,
            output,
            compatible,
            icons,
            store_dir,
            base_url,
        } => {
            let template_bytes = read(&template)?;
            let config: TicketConfig = match config {
                Some(path) => serde_json::from_slice(&read(&path)?)
                    .with_context(|| format!("Invalid configuration in {}", path.display()))?,
                None => detect_configuration(&template_bytes)?,
            };
            let booking_text = String::from_utf8(read(&booking)?)
                .with_context(|| format!("{} is not UTF-8", booking.display()))?;
            let mut booking_data = BookingData::from_json(&booking_text)
                .with_context(|| format!("Invalid booking data in {}", booking.display()))?;

            let seat_icons = match icons.as_deref() {
                Some([free, related, subject]) => {
                    SeatIcons::from_png_files(free, related, subject)?
                }
                Some(_) => bail!("--icons takes exactly three files"),
                None => SeatIcons::builtin(&booking_data.veranstaltung.extra)?,
            };

            let options = RenderOptions {
                writer: if compatible {
                    WriterConfig::compatible()
                } else {
                    WriterConfig::default()
                },
                ..RenderOptions::default()
            };
            let pdf = render_ticket_set(
                &template_bytes,
                &config,
                &booking_data,
                &QrCodeCrateProvider,
                &seat_icons,
                &options,
            )
            .context("Failed to render tickets")?;

            fs::write(&output, &pdf)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "✓ {} ticket(s) written to {}",
                booking_data.tickets().len(),
                output.display()
            );

            if let (Some(dir), Some(base_url)) = (store_dir, base_url) {
                let store = TicketStore::new(dir, base_url);
                let url = store.store(&mut booking_data.vorgang, &pdf)?;
                info!(url = %url, "tickets published");
                fs::write(&booking, serde_json::to_string_pretty(&booking_data)?)
                    .with_context(|| format!("Failed to update {}", booking.display()))?;
                println!("✓ Published at {url}");
            }
        }

        Commands::Delete {
            url,
            store_dir,
            base_url,
        } => {
            let store = TicketStore::new(store_dir, base_url);
            if delete_generated_ticket(&store, &url)? {
                println!("✓ Deleted {url}");
            } else {
                println!("Nothing stored at {url}");
            }
        }
    }

    Ok(())
}
