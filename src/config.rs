//! Pipeline tunables.

/// Maximum accepted input file size: 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Longer-edge bound for the decoded bitmap, in pixels.
pub const MAX_EDGE: u32 = 640;

/// JPEG quality for the re-encode pass (0-100 scale).
pub const REENCODE_QUALITY: u8 = 92;

/// Number of candidates requested from the classifier.
pub const TOP_K: usize = 5;

/// Minimum top-1 probability required to proceed past classification.
pub const CONFIDENCE_FLOOR: f32 = 0.3;

/// Fuzzy-match score a knowledge-base entry must strictly exceed.
pub const FUZZY_SCORE_FLOOR: f32 = 0.8;

/// Tokens of this length or shorter are ignored by fuzzy matching.
pub const MIN_TOKEN_LEN: usize = 2;

/// Tunables for one pipeline instance.
///
/// `Default` returns the reference values; the `with_*` methods override
/// individual knobs. The fuzzy weights themselves are heuristic, so the two
/// matcher knobs here are a tuning surface rather than settled constants.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Maximum accepted input file size in bytes.
    pub max_file_size: u64,
    /// Longer-edge bound for the decoded bitmap, in pixels.
    pub max_edge: u32,
    /// JPEG quality for the re-encode pass (0-100).
    pub reencode_quality: u8,
    /// Number of candidates requested from the classifier.
    pub top_k: usize,
    /// Minimum top-1 probability required to proceed.
    pub confidence_floor: f32,
    /// Fuzzy-match score an entry must strictly exceed.
    pub fuzzy_score_floor: f32,
    /// Tokens of this length or shorter are ignored by fuzzy matching.
    pub min_token_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_edge: MAX_EDGE,
            reencode_quality: REENCODE_QUALITY,
            top_k: TOP_K,
            confidence_floor: CONFIDENCE_FLOOR,
            fuzzy_score_floor: FUZZY_SCORE_FLOOR,
            min_token_len: MIN_TOKEN_LEN,
        }
    }
}

impl PipelineConfig {
    /// Create a config with the reference values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum accepted input file size in bytes.
    #[must_use]
    pub const fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the longer-edge bound for the decoded bitmap.
    #[must_use]
    pub const fn with_max_edge(mut self, pixels: u32) -> Self {
        self.max_edge = pixels;
        self
    }

    /// Set the JPEG quality for the re-encode pass (0-100).
    #[must_use]
    pub const fn with_reencode_quality(mut self, quality: u8) -> Self {
        self.reencode_quality = quality;
        self
    }

    /// Set the number of candidates requested from the classifier.
    #[must_use]
    pub const fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Set the minimum top-1 probability required to proceed.
    #[must_use]
    pub const fn with_confidence_floor(mut self, floor: f32) -> Self {
        self.confidence_floor = floor;
        self
    }

    /// Set the fuzzy-match score floor.
    #[must_use]
    pub const fn with_fuzzy_score_floor(mut self, floor: f32) -> Self {
        self.fuzzy_score_floor = floor;
        self
    }

    /// Set the minimum token length considered by fuzzy matching.
    #[must_use]
    pub const fn with_min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len;
        self
    }
}
