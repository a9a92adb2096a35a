use thiserror::Error;

/// User-facing failure categories.
///
/// Every [`Error`] collapses into one of these at the pipeline boundary;
/// callers present [`Error::user_message`] and can branch on the category
/// without inspecting internal variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Input file was too large, mistyped, or undecodable.
    InvalidInput,
    /// No compute backend could be initialized.
    EngineUnavailable,
    /// Classification invocation itself failed.
    InferenceError,
    /// Classification succeeded but is not trustworthy enough to present.
    LowConfidence,
    /// The classifier produced zero candidates.
    NoPrediction,
}

/// Structured cause attached to inference failures by the engine adapter.
///
/// The adapter owns the mapping from backend error text to a kind; the
/// orchestrator only ever branches on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceFailureKind {
    /// Device or host memory exhaustion.
    ResourceExhausted,
    /// Model weights missing, corrupt, or in a bad state.
    ModelState,
    /// Backend could not fetch something it needed.
    Connectivity,
    /// Anything else; the raw message is passed through.
    Other,
}

impl InferenceFailureKind {
    /// Classify a backend error message into a failure kind.
    ///
    /// The substring heuristics live here, next to the adapter that produces
    /// the messages, so nothing downstream has to parse error text.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("memory") || lower.contains("gpu") || lower.contains("alloc") {
            Self::ResourceExhausted
        } else if lower.contains("model") || lower.contains("weight") {
            Self::ModelState
        } else if lower.contains("network") || lower.contains("fetch") || lower.contains("download")
        {
            Self::Connectivity
        } else {
            Self::Other
        }
    }
}

/// Errors that can occur during the identification pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Input file exceeds the configured size limit. Checked before decode.
    #[error("image too large: {size} bytes exceeds limit of {limit} bytes")]
    ImageTooLarge {
        /// Actual file size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// Declared content type is not an image type.
    #[error("unsupported content type: {content_type}")]
    UnsupportedContentType {
        /// The declared content type.
        content_type: String,
    },

    /// Bytes did not decode as a raster image.
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Re-encoding the resized bitmap failed.
    #[error("failed to re-encode image: {0}")]
    ImageEncode(String),

    /// Neither the accelerated nor the CPU backend could be initialized.
    #[error("no compute backend available: {accelerated}; cpu fallback: {cpu}")]
    BackendUnavailable {
        /// Failure from the accelerated backend attempt.
        accelerated: String,
        /// Failure from the CPU fallback attempt.
        cpu: String,
    },

    /// Failed to load the ONNX model.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Failed to read a class-label file.
    #[error("failed to load labels from {path}: {reason}")]
    LabelLoad {
        /// Path that failed to load.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to parse class-label file content.
    #[error("failed to parse labels: {0}")]
    LabelParse(String),

    /// Number of class labels doesn't match model output size.
    #[error("label count mismatch: model expects {expected}, got {got}")]
    LabelCount {
        /// Expected label count.
        expected: usize,
        /// Actual label count.
        got: usize,
    },

    /// Knowledge base document failed validation.
    #[error("invalid knowledge base: {0}")]
    KnowledgeBase(String),

    /// Failed to initialize ONNX Runtime.
    #[error("failed to initialize ONNX Runtime: {0}")]
    RuntimeInit(String),

    /// Inference execution failed.
    #[error("inference failed: {message}")]
    Inference {
        /// Structured cause assigned by the engine adapter.
        kind: InferenceFailureKind,
        /// Raw backend message.
        message: String,
    },

    /// Top-1 probability fell below the confidence floor.
    #[error("low confidence prediction: {confidence:.3} below floor {floor}")]
    LowConfidence {
        /// Top-1 probability.
        confidence: f32,
        /// Configured confidence floor.
        floor: f32,
    },

    /// The classifier produced zero candidates.
    #[error("classifier produced no predictions")]
    NoPrediction,
}

impl Error {
    /// The user-facing category this error collapses into.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ImageTooLarge { .. }
            | Self::UnsupportedContentType { .. }
            | Self::ImageDecode(_)
            | Self::ImageEncode(_) => ErrorCategory::InvalidInput,
            Self::BackendUnavailable { .. }
            | Self::ModelLoad(_)
            | Self::LabelLoad { .. }
            | Self::LabelParse(_)
            | Self::LabelCount { .. }
            | Self::KnowledgeBase(_)
            | Self::RuntimeInit(_) => ErrorCategory::EngineUnavailable,
            Self::Inference { .. } => ErrorCategory::InferenceError,
            Self::LowConfidence { .. } => ErrorCategory::LowConfidence,
            Self::NoPrediction => ErrorCategory::NoPrediction,
        }
    }

    /// Fixed, user-readable message for this error.
    ///
    /// Raw internal failure text never surfaces here, except for inference
    /// failures the adapter could not classify, whose message is passed
    /// through unchanged.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ImageTooLarge { .. } => {
                "Image too large. Please use an image smaller than 10MB.".to_string()
            }
            Self::UnsupportedContentType { .. } | Self::ImageDecode(_) | Self::ImageEncode(_) => {
                "Invalid image format. Please use JPG, PNG, or WebP images.".to_string()
            }
            Self::BackendUnavailable { .. }
            | Self::ModelLoad(_)
            | Self::LabelLoad { .. }
            | Self::LabelParse(_)
            | Self::LabelCount { .. }
            | Self::KnowledgeBase(_)
            | Self::RuntimeInit(_) => {
                "Could not initialize the identification model. Please try again.".to_string()
            }
            Self::Inference { kind, message } => match kind {
                InferenceFailureKind::ResourceExhausted => {
                    "Device memory issue. Please try with a smaller image.".to_string()
                }
                InferenceFailureKind::ModelState => {
                    "Model loading failed. Please try again.".to_string()
                }
                InferenceFailureKind::Connectivity => {
                    "Network error. Please check your connection and try again.".to_string()
                }
                InferenceFailureKind::Other => message.clone(),
            },
            Self::LowConfidence { .. } => {
                "Low confidence prediction. Please try a clearer photo with the plant filling \
                 more of the frame."
                    .to_string()
            }
            Self::NoPrediction => {
                "Could not analyze this image. Please try a clearer photo with better lighting."
                    .to_string()
            }
        }
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
