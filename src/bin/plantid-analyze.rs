//! CLI tool for identifying the plant in a photo using an ONNX classifier.

#![allow(clippy::print_stdout)] // CLI tool needs stdout
#![allow(clippy::print_stderr)] // CLI tool needs stderr

use clap::Parser;
use plantid_onnx::{
    init_runtime, Backend, EngineConfig, Error, ImageInput, KnowledgeBase, PlantIdentifier,
    Result,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

/// Identify the plant in a photo using an ONNX classification model.
#[derive(Parser, Debug)]
#[command(name = "plantid-analyze")]
#[command(about = "Identify the plant in a photo")]
struct Args {
    /// Input image file (JPEG, PNG, or WebP)
    image_file: PathBuf,

    /// Path to ONNX classification model
    #[arg(short, long)]
    model: PathBuf,

    /// Path to class labels file (.txt, .csv, or .json)
    #[arg(short, long)]
    labels: PathBuf,

    /// Knowledge base JSON file (defaults to the built-in database)
    #[arg(short, long)]
    knowledge: Option<PathBuf>,

    /// Compute backend to try first (cpu, cuda, coreml, directml)
    #[arg(long, default_value = "cpu")]
    backend: Backend,

    /// Print stage progress to stderr
    #[arg(short, long)]
    progress: bool,
}

/// Guess a content type from the file extension.
fn guess_content_type(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("png") => Some("image/png"),
        Some("webp") => Some("image/webp"),
        _ => None,
    }
}

async fn run(args: Args) -> Result<()> {
    init_runtime()?;

    let knowledge = match &args.knowledge {
        Some(path) => KnowledgeBase::from_file(path)?,
        None => KnowledgeBase::builtin()?,
    };

    let mut engine = EngineConfig::new(&args.model, &args.labels);
    if args.backend.is_accelerated() {
        engine = engine.with_accelerated(args.backend);
    }
    let identifier = PlantIdentifier::onnx(engine, knowledge);

    let data = std::fs::read(&args.image_file).map_err(|e| {
        Error::ImageDecode(format!(
            "could not read {}: {e}",
            args.image_file.display()
        ))
    })?;
    let input = match guess_content_type(&args.image_file) {
        Some(content_type) => ImageInput::new(data, content_type),
        None => ImageInput::from_bytes(data),
    };

    let start = Instant::now();
    let result = if args.progress {
        identifier
            .predict_with_progress(input, |msg| eprintln!("{msg}"))
            .await?
    } else {
        identifier.predict(input).await?
    };
    let elapsed = start.elapsed();

    println!(
        "{} ({:.1}% confidence)",
        result.plant.common_name,
        result.confidence * 100.0
    );
    println!("Scientific name: {}", result.plant.scientific_name);
    println!("{}", result.plant.short);
    println!();
    println!("Uses: {}", result.plant.uses);
    if let Some(caution) = &result.plant.caution {
        println!();
        println!("Caution: {caution}");
    }
    println!();
    println!(
        "Raw label: {} | analyzed in {elapsed:.2?}",
        result.predicted_label
    );

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {}", error.user_message());
            ExitCode::FAILURE
        }
    }
}
