//! Synapse Viz - Neural Network Visualization Server
//!
//! Serves an architecture over HTTP/WebSocket, or exports a single snapshot.

use clap::Parser;
use std::path::PathBuf;
use synapse_viz::{
    Architecture, DirectorySink, EngineConfig, Error, ExportFormat, LayerBuilder, LayerType,
    Result, Visualization, VizConfig, VizServer,
};

/// Neural network architecture visualization server
#[derive(Parser, Debug)]
#[command(name = "synapse-viz")]
#[command(version)]
#[command(about = "Interactive layered visualization of neural network architectures", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8888)]
    port: u16,

    /// Enable CORS for cross-origin requests
    #[arg(long, default_value_t = true)]
    cors: bool,

    /// Architecture JSON file to visualize
    #[arg(short, long, conflicts_with = "demo")]
    architecture: Option<PathBuf>,

    /// Visualize a built-in demo architecture
    #[arg(long)]
    demo: bool,

    /// Engine configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a single snapshot (svg or png) instead of serving
    #[arg(long)]
    export: Option<ExportFormat>,

    /// Directory snapshots are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Seed for particle sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let engine = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let architecture = match &args.architecture {
        Some(path) => {
            let arch = Architecture::from_json(&std::fs::read_to_string(path)?)?;
            log::info!("Loaded {} ({} layers) from {}", arch.display_name(), arch.layers.len(), path.display());
            arch
        }
        None if args.demo => {
            log::info!("Using demo architecture");
            demo_architecture()
        }
        None => {
            return Err(Error::Config(
                "nothing to show: pass --architecture <FILE> or --demo".to_string(),
            ))
        }
    };

    if let Some(format) = args.export {
        return export_once(architecture, &engine, format, args.out_dir);
    }

    let config = VizConfig {
        host: args.host,
        port: args.port,
        enable_cors: args.cors,
        enable_tracing: args.verbose > 0,
        animation_seed: args.seed,
    };
    let server = VizServer::new(config, engine, architecture);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Shutdown signal received");
    };

    server.start_with_shutdown(shutdown).await
}

/// Lays the architecture out and writes one snapshot without particles.
fn export_once(
    architecture: Architecture,
    engine: &EngineConfig,
    format: ExportFormat,
    out_dir: PathBuf,
) -> Result<()> {
    let mut viz = Visualization::new(architecture, engine.layout.clone());
    viz.mount(engine.viewport);

    let mut sink = DirectorySink::new(out_dir);
    let file = match format {
        ExportFormat::Svg => viz.export_vector(&mut sink, &[])?,
        ExportFormat::Png => viz.export_raster(&mut sink, &[])?,
    };
    if let Some(path) = sink.written().last() {
        println!("{}", path.display());
    }
    log::debug!("Export produced {:?}", file.map(|f| f.file_name));
    Ok(())
}

/// A small image classifier used by `--demo`.
fn demo_architecture() -> Architecture {
    let mut arch = Architecture::new("ImageClassifier-CNN");
    arch.arch_type = "cnn".to_string();
    arch.description = "Convolutional classifier for 32x32 RGB images".to_string();
    arch.use_case = "Image classification".to_string();
    arch.total_parameters = 1_250_858;

    let layers = [
        ("input", "Input 32x32x3", LayerType::Input, 3072, None, 0.35, "Raw pixel intensities"),
        ("conv1", "Conv 3x3 32", LayerType::Convolution, 32, Some("relu"), 0.8, "Edges and color blobs"),
        ("bn1", "BatchNorm", LayerType::Normalization, 32, None, 0.4, "Stabilizes activations"),
        ("pool1", "MaxPool 2x2", LayerType::Pooling, 32, None, 0.45, "Spatial down-sampling"),
        ("conv2", "Conv 3x3 64", LayerType::Convolution, 64, Some("relu"), 0.9, "Textures and parts"),
        ("pool2", "MaxPool 2x2", LayerType::Pooling, 64, None, 0.5, "Spatial down-sampling"),
        ("dropout", "Dropout 0.5", LayerType::Dropout, 64, None, 0.3, "Regularization"),
        ("dense1", "Dense 128", LayerType::Dense, 128, Some("relu"), 0.75, "Combines features"),
        ("output", "Softmax 10", LayerType::Output, 10, Some("softmax"), 0.7, "Class probabilities"),
    ];
    for (id, name, layer_type, neurons, activation, importance, contribution) in layers {
        let mut builder = LayerBuilder::new(id, layer_type)
            .name(name)
            .neurons(neurons)
            .importance(importance)
            .contribution(contribution);
        if let Some(activation) = activation {
            builder = builder.activation(activation);
        }
        arch = arch.with_layer(builder.build());
    }
    arch
}
