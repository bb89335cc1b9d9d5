use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::{Arg, Command};
use std::path::PathBuf;

use scene_engine::export::PNG_DATA_URL_PREFIX;
use scene_engine::prelude::*;

const DEFAULT_WIDTH: &str = "800";
const DEFAULT_HEIGHT: &str = "600";

#[derive(Debug)]
struct ExportConfig {
    input: PathBuf,
    output: PathBuf,
    settings: Option<PathBuf>,
    format: ExportFormat,
    width: u32,
    height: u32,
    hidden: Vec<String>,
}

fn main() -> Result<()> {
    scene_engine::foundation::logging::init_with_default("info");

    let matches = Command::new("scene_export")
        .about("Builds a scene document headlessly and exports it as PNG or COLLADA")
        .arg(
            Arg::new("input")
                .value_name("SCENE")
                .help("Scene document (JSON)")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (defaults to the input name with .png or .dae)"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("raster-image or collada-document")
                .default_value("raster-image"),
        )
        .arg(
            Arg::new("settings")
                .short('s')
                .long("settings")
                .value_name("FILE")
                .help("Engine settings (.toml, .ron or .json)"),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_name("PIXELS")
                .help("Viewport width in CSS pixels")
                .default_value(DEFAULT_WIDTH),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_name("PIXELS")
                .help("Viewport height in CSS pixels")
                .default_value(DEFAULT_HEIGHT),
        )
        .arg(
            Arg::new("hide")
                .long("hide")
                .value_name("NAME")
                .help("Hide objects with this name (repeatable)")
                .action(clap::ArgAction::Append),
        )
        .get_matches();

    let input = PathBuf::from(matches.get_one::<String>("input").context("Missing scene document")?);
    let format: ExportFormat = matches
        .get_one::<String>("format")
        .map_or("raster-image", String::as_str)
        .parse()
        .context("Invalid export format")?;
    let extension = if format == ExportFormat::RasterImage { "png" } else { "dae" };

    let config = ExportConfig {
        output: matches
            .get_one::<String>("output")
            .map_or_else(|| input.with_extension(extension), PathBuf::from),
        settings: matches.get_one::<String>("settings").map(PathBuf::from),
        width: parse_pixels(matches.get_one::<String>("width"), DEFAULT_WIDTH).context("Invalid width")?,
        height: parse_pixels(matches.get_one::<String>("height"), DEFAULT_HEIGHT).context("Invalid height")?,
        hidden: matches.get_many::<String>("hide").map(|v| v.cloned().collect()).unwrap_or_default(),
        input,
        format,
    };

    export_scene(&config)
}

fn parse_pixels(value: Option<&String>, default: &str) -> Result<u32> {
    let pixels: u32 = value.map_or(default, String::as_str).parse()?;
    if pixels == 0 {
        bail!("size must be positive");
    }
    Ok(pixels)
}

fn export_scene(config: &ExportConfig) -> Result<()> {
    let settings = match &config.settings {
        Some(path) => {
            let path = path.to_string_lossy();
            SceneSettings::load_from_file(&path).with_context(|| format!("Failed to load settings from {path}"))?
        }
        None => SceneSettings::default(),
    };

    let text = std::fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read {}", config.input.display()))?;
    let document: serde_json::Value = serde_json::from_str(&text).context("Scene document is not valid JSON")?;

    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(config.width, config.height);
    let options = EngineOptions { settings, ..EngineOptions::default() };
    let mut engine = SceneEngine::create(options, Box::new(surface), &bus)?;

    match engine.rebuild_graph(Some(&document))? {
        RebuildOutcome::Built(stats) => log::info!(
            "Built {} renderables from {} leaves ({} skipped)",
            stats.renderables, stats.leaves, stats.skipped
        ),
        RebuildOutcome::Skipped(reason) => bail!("Scene document rejected: {reason}"),
    }
    if !config.hidden.is_empty() {
        let toggles = config.hidden.iter().map(|name| (name.clone(), 0)).collect();
        engine.toggle_visibility(&toggles)?;
    }

    let response = engine.request_export(config.format.as_str())?;
    let payload = response.data.strip_prefix(PNG_DATA_URL_PREFIX).unwrap_or(&response.data);
    let bytes = STANDARD.decode(payload).context("Export payload is not base64")?;
    std::fs::write(&config.output, &bytes)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    log::info!(
        "Wrote {} ({} bytes) at {}",
        config.output.display(),
        bytes.len(),
        response.timestamp.to_rfc3339()
    );
    engine.destroy();
    Ok(())
}
