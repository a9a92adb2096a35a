//! Pipeline orchestration: the single entry point callers use.
//!
//! Sequences engine readiness, image normalization, classification, the
//! confidence gate, and knowledge-base matching; failures from any stage
//! propagate unchanged and carry their user-facing category.

use crate::config::PipelineConfig;
use crate::engine::{EngineConfig, EngineLoader, ImageClassifier, OnnxEngineLoader};
use crate::error::{Error, Result};
use crate::image_prep;
use crate::knowledge::KnowledgeBase;
use crate::matcher;
use crate::types::{Identification, ImageInput, PlantRecord, ProgressCallback};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Plant identification pipeline handle.
///
/// Cheap to clone; clones share one memoized engine. The engine is
/// constructed lazily on first use (preload or first prediction): concurrent
/// callers attach to the same in-flight initialization, success is memoized
/// for the life of the handle, and failure is not, so a later call retries
/// from scratch.
pub struct PlantIdentifier<L: EngineLoader> {
    inner: Arc<Inner<L>>,
}

impl<L: EngineLoader> Clone for PlantIdentifier<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<L: EngineLoader> {
    loader: L,
    engine: OnceCell<Arc<L::Engine>>,
    knowledge: KnowledgeBase,
    config: PipelineConfig,
}

impl PlantIdentifier<OnnxEngineLoader> {
    /// Create a pipeline backed by an ONNX engine.
    #[must_use]
    pub fn onnx(engine: EngineConfig, knowledge: KnowledgeBase) -> Self {
        Self::new(OnnxEngineLoader::new(engine), knowledge)
    }
}

impl<L: EngineLoader> PlantIdentifier<L> {
    /// Create a pipeline with the reference configuration.
    #[must_use]
    pub fn new(loader: L, knowledge: KnowledgeBase) -> Self {
        Self::with_config(loader, knowledge, PipelineConfig::default())
    }

    /// Create a pipeline with custom tunables.
    #[must_use]
    pub fn with_config(loader: L, knowledge: KnowledgeBase, config: PipelineConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                loader,
                engine: OnceCell::new(),
                knowledge,
                config,
            }),
        }
    }

    /// The active tunables.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// The knowledge base entries are matched against.
    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.inner.knowledge
    }

    /// Get the shared engine, initializing it on first use.
    async fn engine(&self, on_progress: Option<&ProgressCallback<'_>>) -> Result<&Arc<L::Engine>> {
        self.inner
            .engine
            .get_or_try_init(|| async {
                if let Some(report) = on_progress {
                    report("Loading model...");
                }
                self.inner.loader.load().await.map(Arc::new)
            })
            .await
    }

    /// Warm up the engine without classifying anything.
    ///
    /// Idempotent and safe to call concurrently: regardless of call count,
    /// at most one underlying initialization is in flight, and exactly one
    /// happens over the lifetime of a handle once it succeeds.
    ///
    /// # Errors
    ///
    /// Returns the initialization error; the failed attempt is not
    /// memoized, so a later call retries.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.engine(None).await.map(|_| ())
    }

    /// Fire-and-forget engine warm-up.
    ///
    /// Never fails: an initialization error is logged and swallowed, and a
    /// later prediction simply retries.
    pub async fn preload(&self) {
        if let Err(error) = self.ensure_ready().await {
            warn!(%error, "preload failed; next prediction will retry");
        }
    }

    /// Identify the plant in a user-supplied image file.
    ///
    /// # Errors
    ///
    /// See [`predict_with_progress`](Self::predict_with_progress).
    pub async fn predict(&self, input: ImageInput) -> Result<Identification> {
        self.predict_inner(input, None).await
    }

    /// Identify the plant in a user-supplied image file, reporting stage
    /// progress through the callback.
    ///
    /// An unmatched plant is not an error: the result then carries a
    /// placeholder record with the raw label and an explicit caution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooLarge`], [`Error::UnsupportedContentType`],
    /// or [`Error::ImageDecode`] for invalid input;
    /// [`Error::BackendUnavailable`] (and friends) when the engine cannot
    /// initialize; [`Error::Inference`] when classification itself fails;
    /// [`Error::LowConfidence`] below the confidence floor; and
    /// [`Error::NoPrediction`] when the classifier returns nothing.
    pub async fn predict_with_progress(
        &self,
        input: ImageInput,
        on_progress: impl Fn(&str) + Send + Sync,
    ) -> Result<Identification> {
        self.predict_inner(input, Some(&on_progress)).await
    }

    async fn predict_inner(
        &self,
        input: ImageInput,
        on_progress: Option<&ProgressCallback<'_>>,
    ) -> Result<Identification> {
        if let Some(report) = on_progress {
            report("Initializing model...");
        }
        let engine = self.engine(on_progress).await?;

        if let Some(report) = on_progress {
            report("Preparing image...");
        }
        let bitmap = image_prep::normalize(&input, &self.inner.config, on_progress).await?;

        if let Some(report) = on_progress {
            report("Analyzing plant features...");
        }
        let candidates = engine.classify(&bitmap, self.inner.config.top_k).await?;

        let Some(top) = candidates.first() else {
            return Err(Error::NoPrediction);
        };
        debug!(?candidates, "classifier candidates");

        if top.probability < self.inner.config.confidence_floor {
            return Err(Error::LowConfidence {
                confidence: top.probability,
                floor: self.inner.config.confidence_floor,
            });
        }

        if let Some(report) = on_progress {
            report("Matching against plant database...");
        }
        let plant = matcher::resolve(
            &candidates,
            &self.inner.knowledge,
            self.inner.config.fuzzy_score_floor,
            self.inner.config.min_token_len,
        )
        .cloned()
        .unwrap_or_else(|| placeholder_record(&top.label));

        Ok(Identification {
            predicted_label: top.label.clone(),
            confidence: round3(top.probability),
            plant,
        })
    }
}

/// Round a probability to three decimal places for presentation.
fn round3(probability: f32) -> f32 {
    (probability * 1000.0).round() / 1000.0
}

/// Record surfaced when nothing in the knowledge base matched.
///
/// Partial information beats a bare failure: the raw label is always
/// surfaced, with a caution against acting on an unverified identification.
fn placeholder_record(label: &str) -> PlantRecord {
    PlantRecord {
        common_name: format!("Unidentified Plant ({label})"),
        scientific_name: "Classification uncertain".to_string(),
        short: "Plant identification uncertain - please try a different photo.".to_string(),
        uses: format!(
            "This image was classified as \"{label}\" but doesn't match our plant database. \
             This might be because: 1) The image shows a plant not in our database, 2) The \
             image quality needs improvement, or 3) Multiple objects are visible. Try taking \
             a clearer photo focusing only on the plant's leaves and distinctive features."
        ),
        caution: Some(
            "Cannot provide safety information for unidentified plants. Do not consume or \
             use medicinally without proper identification by a qualified botanist."
                .to_string(),
        ),
        image: None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::error::ErrorCategory;
    use crate::testutil::{
        candidates, png_bytes, small_knowledge_base, ClassifyScript, CountingLoader,
    };
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use std::time::Duration;

    fn identifier(script: ClassifyScript) -> PlantIdentifier<CountingLoader> {
        PlantIdentifier::new(CountingLoader::new(script), small_knowledge_base())
    }

    fn image_input() -> ImageInput {
        ImageInput::new(png_bytes(64, 64), "image/png")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ensure_ready_initializes_once() {
        let loader = CountingLoader::new(ClassifyScript::Respond(Vec::new()))
            .with_delay(Duration::from_millis(10));
        let counter = loader.load_counter();
        let identifier = PlantIdentifier::new(loader, small_knowledge_base());

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let handle = identifier.clone();
            tasks.spawn(async move { handle.ensure_ready().await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_shared_across_predictions() {
        let loader = CountingLoader::new(ClassifyScript::Respond(candidates(&[("daisy", 0.9)])));
        let counter = loader.load_counter();
        let identifier = PlantIdentifier::new(loader, small_knowledge_base());

        identifier.predict(image_input()).await.unwrap();
        identifier.clone().predict(image_input()).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_memoized() {
        let loader = CountingLoader::failing_first(
            1,
            ClassifyScript::Respond(candidates(&[("daisy", 0.9)])),
        );
        let counter = loader.load_counter();
        let identifier = PlantIdentifier::new(loader, small_knowledge_base());

        let first = identifier.predict(image_input()).await;
        assert!(matches!(
            first.as_ref().map_err(Error::category),
            Err(ErrorCategory::EngineUnavailable)
        ));

        let second = identifier.predict(image_input()).await;
        assert!(second.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_preload_swallows_failure_and_retries() {
        let loader = CountingLoader::failing_first(
            usize::MAX,
            ClassifyScript::Respond(Vec::new()),
        );
        let counter = loader.load_counter();
        let identifier = PlantIdentifier::new(loader, small_knowledge_base());

        identifier.preload().await;
        identifier.preload().await;
        identifier.preload().await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_low_confidence_below_floor() {
        let identifier = identifier(ClassifyScript::Respond(candidates(&[("daisy", 0.29)])));

        let result = identifier.predict(image_input()).await;
        assert!(matches!(result, Err(Error::LowConfidence { .. })));
    }

    #[tokio::test]
    async fn test_confidence_at_floor_proceeds() {
        let identifier = identifier(ClassifyScript::Respond(candidates(&[("daisy", 0.30)])));

        let result = identifier.predict(image_input()).await.unwrap();
        assert!((result.confidence - 0.3).abs() < 1e-6);
        assert_eq!(result.plant.common_name, "Common Daisy");
    }

    #[tokio::test]
    async fn test_no_candidates_is_no_prediction() {
        let identifier = identifier(ClassifyScript::Respond(Vec::new()));

        let result = identifier.predict(image_input()).await;
        assert!(matches!(result, Err(Error::NoPrediction)));
    }

    #[tokio::test]
    async fn test_direct_match_end_to_end() {
        let identifier = identifier(ClassifyScript::Respond(candidates(&[
            ("daisy", 0.82),
            ("sunflower", 0.1),
        ])));

        let result = identifier.predict(image_input()).await.unwrap();
        assert_eq!(result.predicted_label, "daisy");
        assert!((result.confidence - 0.82).abs() < 1e-6);
        assert_eq!(result.plant.common_name, "Common Daisy");
    }

    #[tokio::test]
    async fn test_unmatched_label_synthesizes_placeholder() {
        let identifier =
            identifier(ClassifyScript::Respond(candidates(&[("unknownthing", 0.95)])));

        let result = identifier.predict(image_input()).await.unwrap();
        assert_eq!(result.predicted_label, "unknownthing");
        assert!(result.plant.common_name.contains("unknownthing"));
        assert!(result.plant.caution.is_some());
    }

    #[tokio::test]
    async fn test_confidence_rounded_to_three_decimals() {
        let identifier = identifier(ClassifyScript::Respond(candidates(&[("daisy", 0.123_456)])));

        let result = identifier.predict(image_input()).await.unwrap_err();
        // 0.123 is below the floor; check the rounding path separately.
        assert!(matches!(result, Error::LowConfidence { .. }));

        let identifier = identifier2(0.876_543);
        let result = identifier.predict(image_input()).await.unwrap();
        assert!((result.confidence - 0.877).abs() < 1e-6);
    }

    fn identifier2(probability: f32) -> PlantIdentifier<CountingLoader> {
        identifier(ClassifyScript::Respond(candidates(&[(
            "daisy",
            probability,
        )])))
    }

    #[tokio::test]
    async fn test_inference_error_carries_structured_kind() {
        let identifier = identifier(ClassifyScript::Fail("device out of memory".to_string()));

        let err = identifier.predict(image_input()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InferenceError);
        assert!(err.user_message().contains("Device memory issue"));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let identifier = identifier(ClassifyScript::Respond(candidates(&[("daisy", 0.9)])));

        let input = ImageInput::new(vec![0u8; 11 * 1024 * 1024], "image/png");
        let err = identifier.predict(input).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
    }

    #[tokio::test]
    async fn test_progress_stages_in_order() {
        let identifier = identifier(ClassifyScript::Respond(candidates(&[("daisy", 0.9)])));
        let messages: Mutex<Vec<String>> = Mutex::new(Vec::new());

        identifier
            .predict_with_progress(image_input(), |msg| {
                messages.lock().unwrap().push(msg.to_string());
            })
            .await
            .unwrap();

        let seen = messages.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "Initializing model...",
                "Loading model...",
                "Preparing image...",
                "Reading image...",
                "Processing image...",
                "Analyzing plant features...",
                "Matching against plant database...",
            ]
        );
    }

    #[tokio::test]
    async fn test_model_loading_progress_only_fires_once() {
        let identifier = identifier(ClassifyScript::Respond(candidates(&[("daisy", 0.9)])));
        let messages: Mutex<Vec<String>> = Mutex::new(Vec::new());

        identifier
            .predict_with_progress(image_input(), |_| {})
            .await
            .unwrap();
        identifier
            .predict_with_progress(image_input(), |msg| {
                messages.lock().unwrap().push(msg.to_string());
            })
            .await
            .unwrap();

        assert!(!messages
            .lock()
            .unwrap()
            .iter()
            .any(|msg| msg == "Loading model..."));
    }

    #[test]
    fn test_round3() {
        assert!((round3(0.123_456) - 0.123).abs() < 1e-6);
        assert!((round3(0.999_9) - 1.0).abs() < 1e-6);
        assert!((round3(0.82) - 0.82).abs() < 1e-6);
    }

    #[test]
    fn test_placeholder_record_fields() {
        let record = placeholder_record("mystery weed");
        assert_eq!(record.common_name, "Unidentified Plant (mystery weed)");
        assert_eq!(record.scientific_name, "Classification uncertain");
        assert!(record.uses.contains("mystery weed"));
        assert!(record.caution.is_some());
        assert!(record.image.is_none());
    }
}
