//! CLI binary for storefront-ingest.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `IngestionConfig` / connection configs and prints results.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use storefront_ingest::{
    order_link, read_source, BatchReport, CatalogReader, DocumentCatalogWriter, DocumentStore,
    FirestoreConfig, FirestoreStore, ImgbbUploader, IngestionConfig, IngestionOrchestrator,
    IngestionProgressCallback, ManualProduct, PdfiumRasterizer, ProgressCallback, SortMode,
    UploadConfig, ViewQuery,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per item.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the item currently in flight.
    item_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us the item count.
    fn new_dynamic(message: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            item_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Uploading");
        self.bar.reset_eta();
    }

    fn take_elapsed_secs(&self) -> f64 {
        self.item_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map_or(0.0, |t| t.elapsed().as_secs_f64())
    }
}

impl IngestionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Adding {total} products…"))
        ));
    }

    fn on_item_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut t) = self.item_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_item_complete(&self, index: usize, total: usize, product_id: &str) {
        let secs = self.take_elapsed_secs();
        self.bar.println(format!(
            "  {} Item {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            dim(product_id),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.take_elapsed_secs();

        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Item {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} products added",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} products added  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Add one product
  storefront --store abc123 add --name "Blue Shirt" --price 250 --image shirt.jpg --category Tops

  # Add a folder of photos at one price, +50 markup
  storefront --store abc123 --auto-boost bulk --price 300 photos/*.jpg

  # Turn every page of a PDF catalog into a product
  storefront --store abc123 catalog lookbook.pdf --price 499

  # Browse a storefront by handle
  storefront browse football-house --search jersey --sort price-asc

  # Build a WhatsApp order link
  storefront order-link football-house PRODUCT_ID --page-url https://shop.example/s/football-house

  # Upload a store logo and print its URL
  storefront logo logo.png

ENVIRONMENT VARIABLES:
  STOREFRONT_STORE_ID           Store the ingestion commands write to
  STOREFRONT_UPLOAD_URL         Image upload endpoint (default: ImgBB)
  IMGBB_API_KEY                 Upload API key; omit when the endpoint is a proxy
  STOREFRONT_FIRESTORE_PROJECT  Firestore project id
  STOREFRONT_FIRESTORE_API_KEY  Firestore web API key
  STOREFRONT_FIRESTORE_TOKEN    OAuth bearer token for Firestore
  STOREFRONT_AUTO_BOOST         Add the boost amount to every price
  PDFIUM_LIB_PATH               Path to libpdfium (catalog command)
"#;

/// Manage a storefront catalog from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "storefront",
    version,
    about = "Ingest products into a storefront catalog and browse it",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    remote: RemoteArgs,

    /// Store id the ingestion commands write to.
    #[arg(long, global = true, env = "STOREFRONT_STORE_ID")]
    store: Option<String>,

    /// Add the boost amount to every ingested price.
    #[arg(long, global = true, env = "STOREFRONT_AUTO_BOOST")]
    auto_boost: bool,

    /// Boost amount added when --auto-boost is on.
    #[arg(long, global = true, env = "STOREFRONT_BOOST_AMOUNT", default_value_t = 50.0)]
    boost_amount: f64,

    /// Extra upload attempts per item.
    #[arg(long, global = true, env = "STOREFRONT_UPLOAD_RETRIES", default_value_t = 0)]
    upload_retries: u32,

    /// Output structured JSON instead of text.
    #[arg(long, global = true, env = "STOREFRONT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "STOREFRONT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "STOREFRONT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "STOREFRONT_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct RemoteArgs {
    /// Image upload endpoint.
    #[arg(long, global = true, env = "STOREFRONT_UPLOAD_URL",
          default_value = storefront_ingest::config::DEFAULT_UPLOAD_ENDPOINT)]
    upload_url: String,

    /// Upload API key. Leave unset when the endpoint holds the credential.
    #[arg(long, global = true, env = "IMGBB_API_KEY", hide_env_values = true)]
    upload_key: Option<String>,

    /// Upload timeout in seconds.
    #[arg(long, global = true, env = "STOREFRONT_UPLOAD_TIMEOUT", default_value_t = 60)]
    upload_timeout: u64,

    /// Firestore project id.
    #[arg(long, global = true, env = "STOREFRONT_FIRESTORE_PROJECT")]
    firestore_project: Option<String>,

    /// Firestore web API key.
    #[arg(long, global = true, env = "STOREFRONT_FIRESTORE_API_KEY", hide_env_values = true)]
    firestore_key: Option<String>,

    /// Firestore OAuth bearer token.
    #[arg(long, global = true, env = "STOREFRONT_FIRESTORE_TOKEN", hide_env_values = true)]
    firestore_token: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Download timeout for URL sources, in seconds.
    #[arg(long, global = true, env = "STOREFRONT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a single product.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: String,
        /// Local image path or URL.
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add one product per image, all at the same price.
    Bulk {
        #[arg(long)]
        price: String,
        /// Local image paths or URLs.
        #[arg(required = true)]
        images: Vec<String>,
    },
    /// Add one product per page of a PDF catalog.
    Catalog {
        /// Local PDF path or URL.
        document: String,
        /// Price for every page; blank means 0.
        #[arg(long, default_value = "")]
        price: String,
        /// Render the preview only, do not create products.
        #[arg(long)]
        preview_only: bool,
    },
    /// Show a storefront's products.
    Browse {
        /// Store id or handle.
        store: String,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        category: String,
        /// newest, price-asc or price-desc.
        #[arg(long, default_value = "newest")]
        sort: String,
    },
    /// Print the WhatsApp order link for a product.
    OrderLink {
        /// Store id or handle.
        store: String,
        product_id: String,
        /// Storefront page the shopper is on.
        #[arg(long)]
        page_url: String,
    },
    /// Delete a product record.
    Remove { product_id: String },
    /// Upload a store logo and print its URL.
    Logo {
        /// Local image path or URL.
        image: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Add {
            name,
            price,
            image,
            category,
            description,
        } => {
            let image = match image {
                Some(src) => Some(
                    read_source(src, cli.remote.download_timeout)
                        .await
                        .with_context(|| format!("Failed to read image {src}"))?,
                ),
                None => None,
            };
            let orchestrator = build_orchestrator(&cli, None)?;
            let product = orchestrator
                .ingest_manual(ManualProduct {
                    name: name.clone(),
                    price: price.clone(),
                    category: category.clone(),
                    description: description.clone(),
                    image,
                })
                .await
                .context("Failed to add product")?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "id": product.id, "product": product }))?
                );
            } else {
                println!("{}", product.id);
                if !cli.quiet {
                    eprintln!("{} Added {}  {}", green("✔"), bold(&product.name), dim(&product.image));
                }
            }
        }

        Command::Bulk { price, images } => {
            let mut files = Vec::with_capacity(images.len());
            for src in images {
                files.push(
                    read_source(src, cli.remote.download_timeout)
                        .await
                        .with_context(|| format!("Failed to read image {src}"))?,
                );
            }
            let progress = progress_callback(show_progress, "Reading images…");
            let orchestrator = build_orchestrator(&cli, progress)?;
            let report = orchestrator
                .ingest_bulk(files, price)
                .await
                .context("Bulk upload failed")?;
            print_report(&cli, show_progress, &report)?;
            exit_on_failures(&report);
        }

        Command::Catalog {
            document,
            price,
            preview_only,
        } => {
            let source = read_source(document, cli.remote.download_timeout)
                .await
                .with_context(|| format!("Failed to read {document}"))?;
            let progress = progress_callback(show_progress, "Rendering pages…");
            let orchestrator = build_orchestrator(&cli, progress)?;
            let preview = orchestrator
                .preview_document(&source.bytes, source.filename.clone())
                .await
                .context("Failed to render catalog")?;

            if *preview_only {
                if cli.json {
                    let pages: Vec<_> = preview
                        .pages
                        .iter()
                        .map(|p| json!({ "page": p.page_num, "width": p.width, "height": p.height, "bytes": p.jpeg.len() }))
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "filename": preview.filename, "pages": pages }))?
                    );
                } else {
                    println!("{}: {} pages", preview.filename, preview.page_count());
                    for p in &preview.pages {
                        println!("  page {:>3}  {}x{}  {} bytes", p.page_num, p.width, p.height, p.jpeg.len());
                    }
                }
                return Ok(());
            }

            let report = orchestrator
                .ingest_document(&preview, price)
                .await
                .context("Catalog upload failed")?;
            print_report(&cli, show_progress, &report)?;
            exit_on_failures(&report);
        }

        Command::Browse {
            store,
            search,
            category,
            sort,
        } => {
            let sort: SortMode = sort.parse()?;
            let query = ViewQuery::new(search.clone(), category.as_str(), sort);
            let reader = CatalogReader::new(document_store(&cli)?);
            let front = reader
                .load_storefront(store, &query, Utc::now())
                .await
                .context("Failed to load storefront")?;

            if cli.json {
                let cards: Vec<_> = front
                    .cards
                    .iter()
                    .map(|c| json!({ "id": c.product.id, "isNew": c.is_new, "product": c.product }))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "store": { "id": front.store.id, "name": front.store.name },
                        "theme": front.theme,
                        "categories": front.categories,
                        "products": cards,
                        "skipped": front.skipped,
                    }))?
                );
            } else {
                println!("{}  {}", bold(&front.store.name), dim(&front.theme.color));
                if !front.store.description.is_empty() {
                    println!("{}", front.store.description);
                }
                println!("{}", dim(&format!("categories: {}", front.categories.join(", "))));
                for card in &front.cards {
                    let p = &card.product;
                    println!(
                        "  {:<32} ₹{:<10} {:<12} {}{}",
                        p.name,
                        storefront_ingest::model::format_price(p.price),
                        p.category.as_deref().unwrap_or("-"),
                        dim(&p.id),
                        if card.is_new { format!("  {}", green("NEW")) } else { String::new() },
                    );
                }
                if front.cards.is_empty() {
                    println!("  {}", dim("no products match"));
                }
                if !front.skipped.is_empty() && !cli.quiet {
                    eprintln!(
                        "{} {} stored products could not be read and are hidden:",
                        cyan("⚠"),
                        front.skipped.len()
                    );
                    for s in &front.skipped {
                        eprintln!("   {}  {}", s.id, dim(&s.reason));
                    }
                }
            }
        }

        Command::OrderLink {
            store,
            product_id,
            page_url,
        } => {
            let reader = CatalogReader::new(document_store(&cli)?);
            let store = reader.resolve_store(store).await?;
            let product = reader.product(product_id).await?;
            if product.store_id != store.id {
                bail!("Product {} does not belong to store {}", product_id, store.id);
            }
            let link = order_link(&store, &product, page_url)?;
            println!("{link}");
        }

        Command::Remove { product_id } => {
            let orchestrator = build_orchestrator(&cli, None)?;
            orchestrator
                .delete_product(product_id)
                .await
                .context("Failed to delete product")?;
            if !cli.quiet {
                eprintln!("{} Deleted {}", green("✔"), product_id);
            }
        }

        Command::Logo { image } => {
            let source = read_source(image, cli.remote.download_timeout)
                .await
                .with_context(|| format!("Failed to read logo {image}"))?;
            let orchestrator = build_orchestrator(&cli, None)?;
            let url = orchestrator
                .upload_logo(source)
                .await
                .context("Logo upload failed")?;
            if cli.json {
                println!("{}", json!({ "logo": url }));
            } else {
                println!("{url}");
            }
        }
    }

    Ok(())
}

fn progress_callback(show: bool, message: &str) -> Option<ProgressCallback> {
    show.then(|| CliProgressCallback::new_dynamic(message) as Arc<dyn IngestionProgressCallback>)
}

fn document_store(cli: &Cli) -> Result<Arc<dyn DocumentStore>> {
    let project = cli
        .remote
        .firestore_project
        .clone()
        .context("Firestore project not set (use --firestore-project or STOREFRONT_FIRESTORE_PROJECT)")?;
    let mut config = FirestoreConfig::new(project);
    config.api_key = cli.remote.firestore_key.clone();
    config.bearer_token = cli.remote.firestore_token.clone();
    Ok(Arc::new(FirestoreStore::new(config)?))
}

/// Wire the remote collaborators and map CLI flags to `IngestionConfig`.
fn build_orchestrator(cli: &Cli, progress: Option<ProgressCallback>) -> Result<IngestionOrchestrator> {
    let store_id = cli.store.clone().unwrap_or_default();
    let needs_store = !matches!(cli.command, Command::Logo { .. } | Command::Remove { .. });
    if needs_store && store_id.trim().is_empty() {
        bail!("No store selected (use --store or STOREFRONT_STORE_ID)");
    }

    let mut builder = IngestionConfig::builder()
        .auto_boost(cli.auto_boost)
        .boost_amount(cli.boost_amount)
        .upload_retries(cli.upload_retries);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let uploader = ImgbbUploader::new(UploadConfig {
        endpoint: cli.remote.upload_url.clone(),
        api_key: cli.remote.upload_key.clone(),
        timeout_secs: cli.remote.upload_timeout,
    })?;
    let rasterizer = match cli.remote.pdfium_lib {
        Some(ref path) => PdfiumRasterizer::with_library(path),
        None => PdfiumRasterizer::new(),
    };
    let writer = DocumentCatalogWriter::new(document_store(cli)?);

    let orchestrator = IngestionOrchestrator::new(
        store_id,
        Arc::new(rasterizer),
        Arc::new(uploader),
        Arc::new(writer),
        config,
    );
    Ok(if cancels_on_interrupt(&cli.command) {
        orchestrator.with_cancellation(cancel_on_ctrl_c())
    } else {
        orchestrator
    })
}

/// Batch commands finish the item in flight on Ctrl-C; the rest keep the
/// default interrupt.
fn cancels_on_interrupt(command: &Command) -> bool {
    matches!(command, Command::Bulk { .. } | Command::Catalog { .. })
}

/// Token cancelled by Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    cancel
}

fn print_report(cli: &Cli, show_progress: bool, report: &BatchReport) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialise report")?
        );
        return Ok(());
    }

    for item in &report.items {
        match (&item.product_id, &item.error) {
            (Some(id), None) => println!("{}\t{}", id, item.name),
            (_, Some(e)) if !show_progress && !cli.quiet => eprintln!("{} {}", red("✗"), e),
            _ => {}
        }
    }
    if !cli.quiet && !show_progress {
        eprintln!(
            "Added {}/{} products in {}ms",
            report.success_count(),
            report.total(),
            report.duration_ms
        );
    }
    let orphans = report.orphaned_assets();
    if !orphans.is_empty() && !cli.quiet {
        eprintln!("{} {} uploaded images have no product record:", cyan("⚠"), orphans.len());
        for url in orphans {
            eprintln!("   {}", dim(url));
        }
    }
    Ok(())
}

fn exit_on_failures(report: &BatchReport) {
    if !report.is_complete_success() {
        std::process::exit(2);
    }
}
