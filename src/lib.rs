//! # plantid-onnx
//!
//! Identify plants from photos: a local ONNX image classifier produces
//! ranked label guesses, and a curated plant knowledge base resolves them
//! into a common name, scientific name, uses, and safety caution.
//!
//! The classifier runs entirely locally. When nothing in the knowledge base
//! matches, the result still carries the raw label in a placeholder record
//! marked as uncertain rather than failing.
//!
//! ## Example
//!
//! ```ignore
//! use plantid_onnx::{EngineConfig, ImageInput, KnowledgeBase, PlantIdentifier};
//!
//! let identifier = PlantIdentifier::onnx(
//!     EngineConfig::new("mobilenet.onnx", "labels.txt").with_preferred_accelerated(),
//!     KnowledgeBase::builtin()?,
//! );
//!
//! // Optional warm-up; failures are swallowed and retried on first predict.
//! identifier.preload().await;
//!
//! let photo = std::fs::read("photo.jpg")?;
//! let result = identifier
//!     .predict(ImageInput::new(photo, "image/jpeg"))
//!     .await?;
//!
//! println!(
//!     "{} ({:.1}%)",
//!     result.plant.common_name,
//!     result.confidence * 100.0
//! );
//! ```

// Crate-level lint configuration
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]

mod backend;
mod config;
mod engine;
mod error;
mod image_prep;
mod knowledge;
mod labels;
mod matcher;
mod pipeline;
mod postprocess;
mod runtime;
#[cfg(test)]
mod testutil;
mod types;

pub use backend::Backend;
pub use config::PipelineConfig;
pub use engine::{
    EngineConfig, EngineLoader, ImageClassifier, InputLayout, InputSpec, OnnxEngine,
    OnnxEngineLoader,
};
pub use error::{Error, ErrorCategory, InferenceFailureKind, Result};
pub use image_prep::normalize;
pub use knowledge::{normalize_label, KnowledgeBase};
pub use labels::{load_labels_from_file, parse_labels, LabelFormat};
pub use matcher::resolve;
pub use pipeline::PlantIdentifier;
pub use runtime::{find_ort_library, init_runtime};
pub use types::{Candidate, Identification, ImageInput, PlantRecord, ProgressCallback};

// Re-export ort execution providers for convenience
pub use ort::execution_providers;
