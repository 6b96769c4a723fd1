use crate::config::{Config, load_config};
use crate::ir::{NodeMap, TextContent};
use crate::layout_dump::write_layout_dump;
use crate::layout_text_flow;
use crate::preset::Preset;
use crate::render::{render_flow_svg, write_output_png, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flowl", version, about = "Lay out a flowchart node map and render it")]
pub struct Args {
    /// Node map file (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Interaction preset (scroll-pan, embedded)
    #[arg(short = 'p', long = "preset")]
    pub preset: Option<String>,

    /// Width of the hosting container
    #[arg(short = 'w', long = "containerWidth")]
    pub container_width: Option<f32>,

    /// Height of the scroll container; enables the pan extent
    #[arg(short = 'H', long = "containerHeight")]
    pub container_height: Option<f32>,

    /// Estimate text widths instead of looking up installed fonts
    #[arg(long = "fastText")]
    pub fast_text: bool,

    /// More log output (repeat for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = resolve_config(&args)?;
    let input = read_input(args.input.as_deref())?;
    let nodes: NodeMap<TextContent> = serde_json::from_str(&input)
        .map_err(|err| anyhow::anyhow!("invalid node map: {err}"))?;
    if nodes.is_empty() {
        return Err(anyhow::anyhow!("Node map is empty"));
    }

    let flow = layout_text_flow(&nodes, config)?;
    if !flow.is_laid_out() {
        return Err(anyhow::anyhow!("Node sizes could not be measured"));
    }

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_flow_svg(&flow);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_flow_svg(&flow);
            write_output_png(&svg, &output, &flow.config().render, &flow.config().theme)?;
        }
        OutputFormat::Json => {
            write_layout_dump(args.output.as_deref(), &flow)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("layout_flow={default_level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = args.preset.as_deref() {
        config.preset = Preset::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown preset `{name}` (expected scroll-pan or embedded)"))?;
    }
    if args.container_width.is_some() {
        config.render.container_width = args.container_width;
    }
    if args.container_height.is_some() {
        config.render.container_height = args.container_height;
    }
    if args.fast_text {
        config.measure.fast_text_metrics = true;
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
