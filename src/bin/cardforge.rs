use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use cardforge::{
    CardRasterizer, CardView, CardforgeConfig, DefaultImageLoader, FieldValues, PageSize,
    PrintCard, RasterOptions, Size, TemplateDefinition, ViewOptions,
};

#[derive(Parser, Debug)]
#[command(name = "cardforge", version)]
struct Cli {
    /// JSON config file (fonts, print spacing, concurrency).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rasterize one card to a PNG.
    Render(RenderArgs),
    /// Print the interactive render tree as JSON.
    View(ViewArgs),
    /// Print page placements for a batch as JSON.
    Layout(LayoutArgs),
    /// Export a batch of cards as a print-ready PDF.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct CardInput {
    /// Template definition JSON.
    #[arg(long)]
    template: PathBuf,

    /// Field values JSON object (`{"fieldId": "value"}`).
    #[arg(long)]
    values: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: CardInput,

    /// Output width in pixels; height follows the template's aspect ratio.
    #[arg(long, default_value_t = 750.0)]
    width: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Paint type placeholders into unbound fields.
    #[arg(long)]
    placeholders: bool,
}

#[derive(Parser, Debug)]
struct ViewArgs {
    #[command(flatten)]
    input: CardInput,

    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Field id to show as selected.
    #[arg(long)]
    selected: Option<String>,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Batch JSON: `{"templates": {id: template}, "cards": [{id, templateId, fieldValues}]}`.
    #[arg(long)]
    batch: PathBuf,

    #[arg(long, value_enum, default_value_t = PageSize::A4)]
    page_size: PageSize,

    /// Cards per row (2-4).
    #[arg(long, default_value_t = 3)]
    cards_per_row: u32,
}

#[derive(Parser, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    batch: BatchArgs,

    /// Output PDF path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BatchFile {
    templates: BTreeMap<String, TemplateDefinition>,
    cards: Vec<PrintCard>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => CardforgeConfig::from_path(path)?,
        None => CardforgeConfig::from_env()?,
    };

    match cli.cmd {
        Command::Render(args) => cmd_render(&cfg, args).await,
        Command::View(args) => cmd_view(&cfg, args).await,
        Command::Layout(args) => cmd_layout(&cfg, args),
        Command::Export(args) => cmd_export(&cfg, args).await,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open {what} '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {what} JSON '{}'", path.display()))
}

fn read_card(input: &CardInput) -> anyhow::Result<(TemplateDefinition, FieldValues)> {
    let path = &input.template;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open template '{}'", path.display()))?;
    let def = TemplateDefinition::from_json(&text)
        .with_context(|| format!("load template '{}'", path.display()))?;
    let values = match &input.values {
        Some(p) => read_json(p, "field values")?,
        None => FieldValues::new(),
    };
    Ok((def, values))
}

fn input_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn make_rasterizer(cfg: &CardforgeConfig, input: &Path) -> anyhow::Result<CardRasterizer> {
    let root = cfg.assets_root.clone().unwrap_or_else(|| input_dir(input));
    let loader = DefaultImageLoader::new(root, cfg.http_timeout())?;
    let fonts = cfg.font_book()?;
    Ok(CardRasterizer::new(Arc::new(loader), Arc::new(fonts)))
}

fn write_output(path: &Path, bytes: &[u8], what: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write {what} '{}'", path.display()))
}

async fn cmd_render(cfg: &CardforgeConfig, args: RenderArgs) -> anyhow::Result<()> {
    let (def, values) = read_card(&args.input)?;
    let rasterizer = make_rasterizer(cfg, &args.input.template)?.with_options(RasterOptions {
        placeholders: args.placeholders,
    });

    let raster = rasterizer.rasterize(&def, &values, args.width).await?;
    write_output(&args.out, &raster.encode_png()?, "png")?;

    eprintln!(
        "wrote {} ({}x{})",
        args.out.display(),
        raster.width,
        raster.height
    );
    Ok(())
}

async fn cmd_view(cfg: &CardforgeConfig, args: ViewArgs) -> anyhow::Result<()> {
    let (def, values) = read_card(&args.input)?;
    let opts = ViewOptions {
        scale: args.scale,
        selected_field_id: args.selected,
        ..ViewOptions::default()
    };

    // Natural sizes let the view resolve image placements.
    let rasterizer = make_rasterizer(cfg, &args.input.template)?;
    let plan = cardforge::RasterPlan::build(&def, &values, def.width, true)?;
    let mut sizes: HashMap<String, Size> = HashMap::new();
    for reference in plan.image_references() {
        if let Some(size) = rasterizer.image_size(reference).await {
            sizes.insert(reference.to_owned(), size);
        }
    }

    let view = CardView::build_with_image_sizes(&def, &values, &opts, |r| sizes.get(r).copied())?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn cmd_layout(cfg: &CardforgeConfig, args: LayoutArgs) -> anyhow::Result<()> {
    let batch: BatchFile = read_json(&args.batch.batch, "batch")?;
    let settings = cfg.print_settings(args.batch.page_size, args.batch.cards_per_row)?;
    let layout = cardforge::plan_print_layout(&batch.cards, &batch.templates, &settings)?;
    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(())
}

async fn cmd_export(cfg: &CardforgeConfig, args: ExportArgs) -> anyhow::Result<()> {
    let batch: BatchFile = read_json(&args.batch.batch, "batch")?;
    let opts = cfg.export_options(args.batch.page_size, args.batch.cards_per_row)?;
    let rasterizer = Arc::new(make_rasterizer(cfg, &args.batch.batch)?);

    let exported = cardforge::export_pdf(&batch.cards, &batch.templates, rasterizer, &opts).await?;
    write_output(&args.out, &exported.bytes, "pdf")?;

    eprintln!(
        "wrote {} ({} pages, {} cards, {} skipped)",
        args.out.display(),
        exported.layout.page_count,
        exported.layout.cards.len(),
        exported.layout.skipped.len()
    );
    Ok(())
}
