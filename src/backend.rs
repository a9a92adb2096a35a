//! Compute backend selection for the inference session.
//!
//! The engine tries one accelerated backend first and falls back to CPU;
//! which accelerated backend is preferred depends on the platform.

use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    DirectMLExecutionProvider, ExecutionProviderDispatch,
};

/// A compute backend the inference session can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// NVIDIA GPU via CUDA.
    Cuda,
    /// Apple Neural Engine / GPU via CoreML.
    CoreMl,
    /// Windows GPU via DirectML.
    DirectMl,
    /// Baseline CPU backend, always compiled in.
    Cpu,
}

impl Backend {
    /// Short lowercase name, as accepted on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::CoreMl => "coreml",
            Self::DirectMl => "directml",
            Self::Cpu => "cpu",
        }
    }

    /// Whether this backend is an accelerated (non-CPU) backend.
    #[must_use]
    pub const fn is_accelerated(self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// The accelerated backend worth trying first on this platform.
    #[must_use]
    pub const fn preferred_accelerated() -> Self {
        #[cfg(target_os = "macos")]
        {
            Self::CoreMl
        }
        #[cfg(target_os = "windows")]
        {
            Self::DirectMl
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            Self::Cuda
        }
    }

    /// Execution provider dispatch for the session builder.
    #[must_use]
    pub fn dispatch(self) -> ExecutionProviderDispatch {
        match self {
            Self::Cuda => CUDAExecutionProvider::default().build(),
            Self::CoreMl => CoreMLExecutionProvider::default().build(),
            Self::DirectMl => DirectMLExecutionProvider::default().build(),
            Self::Cpu => CPUExecutionProvider::default().build(),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            "directml" => Ok(Self::DirectMl),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!(
                "unknown backend {other:?} (expected cuda, coreml, directml, or cpu)"
            )),
        }
    }
}
