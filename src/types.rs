use serde::{Deserialize, Serialize};

/// Callback invoked with user-facing stage messages as the pipeline runs.
///
/// Callbacks fire synchronously at the start of each stage, never
/// concurrently with each other.
pub type ProgressCallback<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Raw image file as supplied by the caller (upload or camera capture).
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// Declared content type, if the source provided one (e.g. `image/jpeg`).
    pub content_type: Option<String>,
}

impl ImageInput {
    /// Create an input from raw bytes and a declared content type.
    #[must_use]
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            data,
            content_type: Some(content_type.into()),
        }
    }

    /// Create an input from raw bytes with no declared content type.
    ///
    /// The decode step still validates that the bytes are a raster image.
    #[must_use]
    pub const fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            content_type: None,
        }
    }

    /// Size of the encoded bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Single classifier candidate: a raw class label with its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Raw class name from the classifier labels.
    pub label: String,
    /// Probability in `[0, 1]` (after softmax).
    pub probability: f32,
    /// Index in the model output.
    pub index: usize,
}

/// One entry of the plant knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    /// Everyday name shown to the user. Never empty.
    pub common_name: String,
    /// Botanical name.
    pub scientific_name: String,
    /// One-line summary.
    pub short: String,
    /// Culinary, medicinal, or ornamental uses.
    pub uses: String,
    /// Safety caution, if the plant warrants one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caution: Option<String>,
    /// Reference to an illustrative image, if available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Final output of one pipeline run.
///
/// Owned by the caller after return; nothing in it is shared with later
/// calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    /// Raw top-1 classifier label.
    pub predicted_label: String,
    /// Top-1 probability, rounded to 3 decimal places.
    pub confidence: f32,
    /// Matched knowledge-base record, or a synthesized placeholder when
    /// nothing matched.
    pub plant: PlantRecord,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_image_input_size() {
        let input = ImageInput::new(vec![0u8; 1024], "image/png");
        assert_eq!(input.size(), 1024);
        assert_eq!(input.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_image_input_without_content_type() {
        let input = ImageInput::from_bytes(vec![1, 2, 3]);
        assert_eq!(input.size(), 3);
        assert!(input.content_type.is_none());
    }

    #[test]
    fn test_plant_record_json_roundtrip_without_optionals() {
        let record = PlantRecord {
            common_name: "Daisy".to_string(),
            scientific_name: "Bellis perennis".to_string(),
            short: "Small white-petaled flower.".to_string(),
            uses: "Ornamental.".to_string(),
            caution: None,
            image: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("caution"));
        assert!(!json.contains("image"));

        let back: PlantRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_plant_record_deserializes_with_caution() {
        let json = r#"{
            "common_name": "Oleander",
            "scientific_name": "Nerium oleander",
            "short": "Showy but toxic shrub.",
            "uses": "Ornamental only.",
            "caution": "All parts are poisonous."
        }"#;
        let record: PlantRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.caution.as_deref(), Some("All parts are poisonous."));
        assert!(record.image.is_none());
    }
}
