//! Test utilities for creating mock data
//!
//! This module is only compiled in test builds.

#![allow(clippy::unwrap_used)] // Tests can use unwrap
#![allow(clippy::cast_possible_truncation)] // Pixel coordinate casts are fine for test images

use crate::engine::{EngineLoader, ImageClassifier};
use crate::error::{Error, InferenceFailureKind, Result};
use crate::knowledge::KnowledgeBase;
use crate::types::{Candidate, PlantRecord};
use async_trait::async_trait;
use image::RgbImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Create a candidate with the given label and probability.
pub fn candidate(label: &str, probability: f32) -> Candidate {
    Candidate {
        label: label.to_string(),
        probability,
        index: 0,
    }
}

/// Create a ranked candidate list from (label, probability) pairs.
pub fn candidates(pairs: &[(&str, f32)]) -> Vec<Candidate> {
    pairs
        .iter()
        .enumerate()
        .map(|(index, (label, probability))| Candidate {
            label: (*label).to_string(),
            probability: *probability,
            index,
        })
        .collect()
}

/// Create a minimal plant record.
pub fn plant(common_name: &str, scientific_name: &str) -> PlantRecord {
    PlantRecord {
        common_name: common_name.to_string(),
        scientific_name: scientific_name.to_string(),
        short: format!("{common_name} summary."),
        uses: format!("{common_name} uses."),
        caution: None,
        image: None,
    }
}

/// A four-entry knowledge base with stable insertion order.
pub fn small_knowledge_base() -> KnowledgeBase {
    KnowledgeBase::from_entries(vec![
        ("rose".to_string(), plant("Rose", "Rosa spp.")),
        ("daisy".to_string(), plant("Common Daisy", "Bellis perennis")),
        ("sunflower".to_string(), plant("Sunflower", "Helianthus annuus")),
        (
            "aloe vera".to_string(),
            plant("Aloe Vera", "Aloe barbadensis miller"),
        ),
    ])
    .unwrap()
}

/// PNG-encode a gradient test image of the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    });

    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

/// Canned behavior for a [`ScriptedClassifier`].
#[derive(Debug, Clone)]
pub enum ClassifyScript {
    /// Return these candidates (truncated to the requested top-K).
    Respond(Vec<Candidate>),
    /// Fail with an inference error carrying this message.
    Fail(String),
}

/// Classifier that replays a canned script instead of running a model.
#[derive(Debug)]
pub struct ScriptedClassifier {
    script: ClassifyScript,
}

#[async_trait]
impl ImageClassifier for ScriptedClassifier {
    async fn classify(&self, _bitmap: &RgbImage, top_k: usize) -> Result<Vec<Candidate>> {
        match &self.script {
            ClassifyScript::Respond(candidates) => {
                Ok(candidates.iter().take(top_k).cloned().collect())
            }
            ClassifyScript::Fail(message) => Err(Error::Inference {
                kind: InferenceFailureKind::classify(message),
                message: message.clone(),
            }),
        }
    }
}

/// Engine loader that counts load attempts and can fail the first N.
pub struct CountingLoader {
    loads: Arc<AtomicUsize>,
    fail_remaining: AtomicUsize,
    script: ClassifyScript,
    delay: Option<Duration>,
}

impl CountingLoader {
    /// Loader that always succeeds with the given script.
    pub fn new(script: ClassifyScript) -> Self {
        Self {
            loads: Arc::new(AtomicUsize::new(0)),
            fail_remaining: AtomicUsize::new(0),
            script,
            delay: None,
        }
    }

    /// Loader that fails the first `failures` load attempts.
    pub fn failing_first(failures: usize, script: ClassifyScript) -> Self {
        let loader = Self::new(script);
        loader.fail_remaining.store(failures, Ordering::SeqCst);
        loader
    }

    /// Add an artificial delay to each load, to widen concurrency windows.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle to the load-attempt counter.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

#[async_trait]
impl EngineLoader for CountingLoader {
    type Engine = ScriptedClassifier;

    async fn load(&self) -> Result<ScriptedClassifier> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();

        if should_fail {
            return Err(Error::BackendUnavailable {
                accelerated: "scripted failure".to_string(),
                cpu: "scripted failure".to_string(),
            });
        }

        Ok(ScriptedClassifier {
            script: self.script.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_are_indexed_in_order() {
        let list = candidates(&[("daisy", 0.8), ("rose", 0.1)]);
        assert_eq!(list[0].index, 0);
        assert_eq!(list[1].index, 1);
        assert_eq!(list[0].label, "daisy");
    }

    #[test]
    fn test_small_knowledge_base_order() {
        let kb = small_knowledge_base();
        let keys: Vec<&str> = kb.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["rose", "daisy", "sunflower", "aloe vera"]);
    }

    #[test]
    fn test_png_bytes_decodes() {
        let bytes = png_bytes(16, 12);
        let image = image::load_from_memory(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (16, 12));
    }

    #[tokio::test]
    async fn test_counting_loader_fails_then_succeeds() {
        let loader =
            CountingLoader::failing_first(2, ClassifyScript::Respond(Vec::new()));
        let counter = loader.load_counter();

        assert!(loader.load().await.is_err());
        assert!(loader.load().await.is_err());
        assert!(loader.load().await.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scripted_classifier_truncates_to_top_k() {
        let classifier = ScriptedClassifier {
            script: ClassifyScript::Respond(candidates(&[
                ("a", 0.5),
                ("b", 0.3),
                ("c", 0.2),
            ])),
        };
        let bitmap = RgbImage::new(4, 4);
        let result = classifier.classify(&bitmap, 2).await.unwrap();
        assert_eq!(result.len(), 2);
    }
}
