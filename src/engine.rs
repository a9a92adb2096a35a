//! Inference engine adapter: owns the ONNX session, model weights, and
//! backend selection.

use crate::backend::Backend;
use crate::error::{Error, InferenceFailureKind, Result};
use crate::labels::load_labels_from_file;
use crate::postprocess::top_k_candidates;
use crate::types::Candidate;
use async_trait::async_trait;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Input edge assumed when the model declares dynamic spatial dimensions.
const DEFAULT_INPUT_EDGE: u32 = 224;

/// Tensor layout of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    /// `[batch, channels, height, width]`
    Nchw,
    /// `[batch, height, width, channels]`
    Nhwc,
}

/// Model input geometry detected from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    /// Tensor layout.
    pub layout: InputLayout,
    /// Input height in pixels.
    pub height: u32,
    /// Input width in pixels.
    pub width: u32,
}

/// A classifier that turns a bitmap into ranked label candidates.
///
/// The pipeline is generic over this seam so tests can substitute a
/// scripted classifier.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classify a bitmap into at most `top_k` candidates, ordered by
    /// descending probability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] if the underlying engine fails for any
    /// reason; the adapter attaches a structured failure kind but does not
    /// interpret why.
    async fn classify(&self, bitmap: &RgbImage, top_k: usize) -> Result<Vec<Candidate>>;
}

/// Constructs an engine; called at most once per successful pipeline
/// lifetime.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Engine type produced by this loader.
    type Engine: ImageClassifier + 'static;

    /// Initialize the backend and load model weights.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] when no backend could be
    /// initialized, or another [`Error`] for model/label problems.
    async fn load(&self) -> Result<Self::Engine>;
}

/// Configuration for [`OnnxEngineLoader`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the ONNX model file.
    pub model_path: PathBuf,
    /// Path to the class-label file.
    pub labels_path: PathBuf,
    /// Accelerated backend to try before the CPU fallback, if any.
    pub accelerated: Option<Backend>,
}

impl EngineConfig {
    /// Configure an engine with CPU-only execution.
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>, labels_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: labels_path.into(),
            accelerated: None,
        }
    }

    /// Try the given accelerated backend before falling back to CPU.
    #[must_use]
    pub fn with_accelerated(mut self, backend: Backend) -> Self {
        self.accelerated = Some(backend);
        self
    }

    /// Try the platform's preferred accelerated backend before CPU.
    #[must_use]
    pub fn with_preferred_accelerated(self) -> Self {
        self.with_accelerated(Backend::preferred_accelerated())
    }
}

/// Loads [`OnnxEngine`]s with accelerated-then-CPU backend selection.
#[derive(Debug, Clone)]
pub struct OnnxEngineLoader {
    config: EngineConfig,
}

impl OnnxEngineLoader {
    /// Create a loader from an engine configuration.
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLoader for OnnxEngineLoader {
    type Engine = OnnxEngine;

    async fn load(&self) -> Result<OnnxEngine> {
        let labels = load_labels_from_file(&self.config.labels_path)?;

        let (session, backend) = match self.config.accelerated {
            Some(accelerated) => match build_session(&self.config.model_path, accelerated) {
                Ok(session) => (session, accelerated),
                Err(accel_err) => {
                    warn!(
                        backend = accelerated.name(),
                        error = %accel_err,
                        "accelerated backend failed, falling back to CPU"
                    );
                    let session =
                        build_session(&self.config.model_path, Backend::Cpu).map_err(|cpu_err| {
                            Error::BackendUnavailable {
                                accelerated: accel_err.to_string(),
                                cpu: cpu_err.to_string(),
                            }
                        })?;
                    (session, Backend::Cpu)
                }
            },
            None => {
                let session = build_session(&self.config.model_path, Backend::Cpu)
                    .map_err(|e| Error::ModelLoad(e.to_string()))?;
                (session, Backend::Cpu)
            }
        };

        let input = detect_input_spec(&session)?;
        let num_classes = detect_num_classes(&session)?;
        if labels.len() != num_classes {
            return Err(Error::LabelCount {
                expected: num_classes,
                got: labels.len(),
            });
        }

        info!(backend = backend.name(), classes = num_classes, "engine ready");

        Ok(OnnxEngine {
            session: Mutex::new(session),
            labels,
            input,
            backend,
        })
    }
}

/// Build a session pinned to one backend.
fn build_session(model_path: &Path, backend: Backend) -> ort::Result<Session> {
    Session::builder()?
        .with_execution_providers([backend.dispatch()])?
        .commit_from_file(model_path)
}

/// ONNX-backed image classifier.
///
/// Holds the session, class labels, detected input geometry, and the
/// backend that was actually selected.
pub struct OnnxEngine {
    session: Mutex<Session>,
    labels: Vec<String>,
    input: InputSpec,
    backend: Backend,
}

impl std::fmt::Debug for OnnxEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEngine")
            .field("labels_count", &self.labels.len())
            .field("input", &self.input)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl OnnxEngine {
    /// The backend the session actually runs on.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// The class labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The detected input geometry.
    #[must_use]
    pub const fn input_spec(&self) -> InputSpec {
        self.input
    }
}

#[async_trait]
impl ImageClassifier for OnnxEngine {
    #[allow(clippy::significant_drop_tightening)]
    async fn classify(&self, bitmap: &RgbImage, top_k: usize) -> Result<Vec<Candidate>> {
        let tensor = image_to_tensor(bitmap, self.input);
        let input_value = Value::from_array(tensor).map_err(inference_error)?;

        let logits = {
            // The lock must be held while outputs exist because ort::Value
            // borrows from the session.
            let mut session = self.session.lock().map_err(|e| Error::Inference {
                kind: InferenceFailureKind::Other,
                message: format!("session lock poisoned: {e}"),
            })?;

            let outputs = session
                .run(ort::inputs![input_value.view()])
                .map_err(inference_error)?;

            extract_tensor_data(&outputs, 0)?
        };

        Ok(top_k_candidates(&logits, &self.labels, top_k))
    }
}

/// Wrap a backend error, classifying it into a structured failure kind.
fn inference_error(e: ort::Error) -> Error {
    let message = e.to_string();
    Error::Inference {
        kind: InferenceFailureKind::classify(&message),
        message,
    }
}

/// Detect input layout and spatial size from the session's input tensor.
fn detect_input_spec(session: &Session) -> Result<InputSpec> {
    let input = session
        .inputs
        .first()
        .ok_or_else(|| Error::ModelLoad("model has no inputs".to_string()))?;

    let shape = input
        .input_type
        .tensor_shape()
        .ok_or_else(|| Error::ModelLoad("model input is not a tensor".to_string()))?;

    let dims: Vec<i64> = shape.iter().copied().collect();
    parse_input_dims(&dims)
}

/// Parse `[N, 3, H, W]` or `[N, H, W, 3]`; dynamic spatial dims fall back
/// to the conventional 224.
fn parse_input_dims(dims: &[i64]) -> Result<InputSpec> {
    if dims.len() != 4 {
        return Err(Error::ModelLoad(format!(
            "unsupported input shape {dims:?}: expected 4 dimensions"
        )));
    }

    if dims[1] == 3 {
        Ok(InputSpec {
            layout: InputLayout::Nchw,
            height: dim_or_default(dims[2]),
            width: dim_or_default(dims[3]),
        })
    } else if dims[3] == 3 {
        Ok(InputSpec {
            layout: InputLayout::Nhwc,
            height: dim_or_default(dims[1]),
            width: dim_or_default(dims[2]),
        })
    } else {
        Err(Error::ModelLoad(format!(
            "unsupported input shape {dims:?}: no 3-channel axis"
        )))
    }
}

fn dim_or_default(dim: i64) -> u32 {
    u32::try_from(dim).ok().filter(|&d| d > 0).unwrap_or(DEFAULT_INPUT_EDGE)
}

/// Detect the class count from the first output's last dimension.
fn detect_num_classes(session: &Session) -> Result<usize> {
    let output = session
        .outputs
        .first()
        .ok_or_else(|| Error::ModelLoad("model has no outputs".to_string()))?;

    let shape = output
        .output_type
        .tensor_shape()
        .ok_or_else(|| Error::ModelLoad("model output is not a tensor".to_string()))?;

    let dims: Vec<i64> = shape.iter().copied().collect();
    let last = dims
        .last()
        .copied()
        .ok_or_else(|| Error::ModelLoad("model output shape is empty".to_string()))?;

    usize::try_from(last).map_err(|_| Error::ModelLoad(format!("invalid class count: {last}")))
}

/// Resize the bitmap to the model's input size and scale pixels to
/// `[-1, 1]` (MobileNet convention).
fn image_to_tensor(bitmap: &RgbImage, spec: InputSpec) -> Array4<f32> {
    let resized = image::imageops::resize(bitmap, spec.width, spec.height, FilterType::Triangle);
    let (height, width) = (spec.height as usize, spec.width as usize);

    let mut tensor = match spec.layout {
        InputLayout::Nchw => Array4::zeros((1, 3, height, width)),
        InputLayout::Nhwc => Array4::zeros((1, height, width, 3)),
    };

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for channel in 0..3 {
            let value = f32::from(pixel[channel]) / 127.5 - 1.0;
            match spec.layout {
                InputLayout::Nchw => tensor[[0, channel, y, x]] = value,
                InputLayout::Nhwc => tensor[[0, y, x, channel]] = value,
            }
        }
    }

    tensor
}

/// Extract tensor data from session outputs by index.
fn extract_tensor_data(outputs: &ort::session::SessionOutputs, index: usize) -> Result<Vec<f32>> {
    let output_names: Vec<_> = outputs.keys().collect();
    let name = output_names.get(index).ok_or_else(|| Error::Inference {
        kind: InferenceFailureKind::Other,
        message: format!("missing output tensor at index {index}"),
    })?;

    let tensor = outputs.get(*name).ok_or_else(|| Error::Inference {
        kind: InferenceFailureKind::Other,
        message: format!("missing output tensor '{name}'"),
    })?;

    let (_, data) = tensor
        .try_extract_tensor::<f32>()
        .map_err(inference_error)?;

    Ok(data.to_vec())
}
