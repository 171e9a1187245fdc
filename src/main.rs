use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use geoscan::api::{AoiApi, HttpAoiApi, decode_geometry};
use geoscan::config::{ApiConfig, ConfigError};
use geoscan::doc::{AoiId, AoiRecord};
use geoscan::draw::DrawEvent;
use geoscan::engine::AoiEngine;
use geoscan::error::{AoiError, GeometryError, NetworkError};
use geoscan::map::{DrawTool, DrawnShape, HeadlessMap, MapHandle};
use geoscan::metrics;
use geoscan::notify::TracingNotifier;

const MAP_WIDTH_PX: f64 = 1024.0;
const MAP_HEIGHT_PX: f64 = 768.0;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Aoi(#[from] AoiError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("shape was not accepted by the drawing session")]
    GestureRejected,
}

#[derive(Parser, Debug)]
#[command(name = "geoscan", about = "Manage Areas of Interest on a geoscan backend")]
struct Cli {
    /// Backend base URL (overrides the environment default).
    #[arg(long, env = "GEOSCAN_API_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check backend health.
    Ping,
    /// List every AOI.
    List,
    /// Print one AOI as JSON.
    Show { id: String },
    /// Draw a shape from a GeoJSON file, name it, and save it.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        geojson: PathBuf,
        #[arg(long, value_enum, default_value_t = ToolArg::Polygon)]
        tool: ToolArg,
    },
    /// Delete an AOI.
    Delete { id: String },
    /// Print area and center of a GeoJSON shape without saving it.
    Metrics {
        #[arg(long)]
        geojson: PathBuf,
    },
    /// Write every AOI as a GeoJSON feature collection.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ToolArg {
    Polygon,
    Rectangle,
}

impl From<ToolArg> for DrawTool {
    fn from(tool: ToolArg) -> Self {
        match tool {
            ToolArg::Polygon => Self::Polygon,
            ToolArg::Rectangle => Self::Rectangle,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ApiConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    let api: Arc<dyn AoiApi> = Arc::new(HttpAoiApi::new(&config)?);
    tracing::debug!(base_url = %config.base_url, "geoscan starting");

    if matches!(cli.command, Command::Ping) {
        return run_ping(api.as_ref()).await;
    }

    let map = MapHandle::new(HeadlessMap::new(MAP_WIDTH_PX, MAP_HEIGHT_PX));
    let mut engine = AoiEngine::new(map.clone(), api, Arc::new(TracingNotifier));

    match cli.command {
        Command::Ping => Ok(()),
        Command::List => run_list(&mut engine).await,
        Command::Show { id } => run_show(&mut engine, &id).await,
        Command::Create { name, description, geojson, tool } => {
            run_create(&mut engine, &map, &name, &description, &geojson, tool.into()).await
        }
        Command::Delete { id } => run_delete(&mut engine, &id).await,
        Command::Metrics { geojson } => run_metrics(&geojson),
        Command::Export { output } => run_export(&mut engine, output.as_deref()).await,
    }
}

async fn run_ping(api: &dyn AoiApi) -> Result<(), CliError> {
    let status = api.health().await?;
    println!("{status}");
    Ok(())
}

async fn run_list(engine: &mut AoiEngine<HeadlessMap>) -> Result<(), CliError> {
    let records = engine.refresh().await?;
    for record in &records {
        println!("{}", summary_line(record));
    }
    eprintln!("{} AOIs, {} layers", records.len(), engine.layers().layer_count());
    Ok(())
}

async fn run_show(engine: &mut AoiEngine<HeadlessMap>, typed: &str) -> Result<(), CliError> {
    let id = resolve_id(engine, typed).await?;
    let record = engine.gateway().fetch(&id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn run_create(
    engine: &mut AoiEngine<HeadlessMap>,
    map: &MapHandle<HeadlessMap>,
    name: &str,
    description: &str,
    path: &Path,
    tool: DrawTool,
) -> Result<(), CliError> {
    let feature = read_feature(path)?;
    engine.begin_drawing(tool)?;
    map.borrow_mut().emit_draw_created(&DrawnShape { tool, feature });
    match engine.poll_drawing().into_iter().next() {
        Some(DrawEvent::NamingRequested { metrics }) => {
            eprintln!("drawn: {} km² centered at [{}, {}]", metrics.area, metrics.center[0], metrics.center[1]);
        }
        Some(DrawEvent::GestureAborted { error }) => return Err(error.into()),
        None => return Err(CliError::GestureRejected),
    }
    let record = engine.save(name, description).await?;
    println!("{}", summary_line(&record));
    Ok(())
}

async fn run_delete(engine: &mut AoiEngine<HeadlessMap>, typed: &str) -> Result<(), CliError> {
    let id = resolve_id(engine, typed).await?;
    engine.delete(&id).await?;
    println!("deleted {id}");
    Ok(())
}

/// Map a typed identity onto the one the backend uses, so `42` reaches a
/// record the server keys as the string `"42"`.
async fn resolve_id(engine: &mut AoiEngine<HeadlessMap>, typed: &str) -> Result<AoiId, CliError> {
    engine.refresh().await?;
    Ok(engine.records().resolve(typed))
}

fn run_metrics(path: &Path) -> Result<(), CliError> {
    let feature = read_feature(path)?;
    let metrics = metrics::compute(&feature)?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

async fn run_export(engine: &mut AoiEngine<HeadlessMap>, output: Option<&Path>) -> Result<(), CliError> {
    engine.refresh().await?;
    let collection = engine.records().to_feature_collection();
    let rendered = serde_json::to_string_pretty(&collection)?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|source| CliError::Write { path: path.to_path_buf(), source })?;
            eprintln!("wrote {} AOIs to {}", collection.features.len(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn read_feature(path: &Path) -> Result<geojson::Feature, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    Ok(decode_geometry(&value)?)
}

fn summary_line(record: &AoiRecord) -> String {
    format!(
        "{}\t{}\t{} km²\t[{}, {}]",
        record.id, record.name, record.area, record.center[0], record.center[1]
    )
}
