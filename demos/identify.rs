//! Minimal identification run against the built-in knowledge base.
//!
//! Usage: cargo run --example identify -- <model.onnx> <labels.txt> <photo.jpg>

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use plantid_onnx::{EngineConfig, ImageInput, KnowledgeBase, PlantIdentifier};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(model), Some(labels), Some(photo)) = (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: identify <model.onnx> <labels.txt> <photo.jpg>");
        std::process::exit(2);
    };

    plantid_onnx::init_runtime()?;

    let identifier = PlantIdentifier::onnx(
        EngineConfig::new(model, labels).with_preferred_accelerated(),
        KnowledgeBase::builtin()?,
    );

    let bytes = std::fs::read(&photo)?;
    let result = identifier
        .predict_with_progress(ImageInput::from_bytes(bytes), |msg| eprintln!("{msg}"))
        .await?;

    println!(
        "{} / {} ({:.1}%)",
        result.plant.common_name,
        result.plant.scientific_name,
        result.confidence * 100.0
    );

    Ok(())
}
