//! Language detection.
//!
//! The detector normalizes its input through the classifier's own tokenizer
//! before classification: the text is encoded to a fixed budget (truncated or
//! padded), decoded back with special tokens stripped, and the decoded text is
//! what the classifier sees. This bounds the classifier input regardless of
//! article length.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::{Result, SummarizeError};
use crate::language::LanguageCode;
use crate::resource::{DetectorResource, DetectorSpec, ResourceLoader};
use crate::tokenize::{BoundedTokenizer, TokenBudget};

/// One classifier prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    /// Predicted label; models may emit predictions without one.
    pub label: Option<String>,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: Some(label.into()),
            score,
        }
    }
}

/// A text classifier returning scored labels.
pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>>;
}

struct LoadedDetector {
    tokenizer: BoundedTokenizer,
    classifier: Arc<dyn TextClassifier>,
}

impl LoadedDetector {
    fn build(resource: DetectorResource, max_tokens: usize) -> Result<Self> {
        Ok(Self {
            tokenizer: BoundedTokenizer::new(resource.tokenizer, TokenBudget::fixed(max_tokens))?,
            classifier: resource.classifier,
        })
    }
}

/// Detects the language of article text.
///
/// The tokenizer and classifier are loaded on the first call to
/// [`detect`](Self::detect) and reused afterwards. Concurrent first callers
/// wait for a single load.
pub struct LanguageDetector {
    spec: DetectorSpec,
    loader: Option<Arc<dyn ResourceLoader>>,
    loaded: OnceLock<Arc<LoadedDetector>>,
    init_lock: Mutex<()>,
}

impl std::fmt::Debug for LanguageDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageDetector")
            .field("spec", &self.spec)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl LanguageDetector {
    /// Create a detector that loads its resource lazily through `loader`.
    pub fn new(spec: DetectorSpec, loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            spec,
            loader: Some(loader),
            loaded: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Create a detector around an already loaded resource.
    pub fn from_resource(resource: DetectorResource, max_tokens: usize) -> Result<Self> {
        let loaded = OnceLock::new();
        let _ = loaded.set(Arc::new(LoadedDetector::build(resource, max_tokens)?));
        Ok(Self {
            spec: DetectorSpec::default().with_max_tokens(max_tokens),
            loader: None,
            loaded,
            init_lock: Mutex::new(()),
        })
    }

    /// True once the tokenizer and classifier are in memory.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Detect the language of `text`.
    ///
    /// Returns the label of the highest-scoring prediction.
    pub fn detect(&self, text: &str) -> Result<LanguageCode> {
        if text.trim().is_empty() {
            return Err(SummarizeError::InvalidInput(
                "cannot detect the language of empty text".to_string(),
            ));
        }

        let detector = self.resource()?;
        let encoded = detector.tokenizer.encode(text)?;
        let normalized = detector.tokenizer.decode(&encoded.ids)?;

        let predictions = detector.classifier.classify(&normalized)?;
        let top = predictions
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| {
                SummarizeError::Inference("language classifier returned no predictions".to_string())
            })?;
        let label = top.label.ok_or_else(|| {
            SummarizeError::Inference("top prediction has no language label".to_string())
        })?;

        let lang = LanguageCode::new(label);
        tracing::debug!(language = %lang, score = top.score, "Detected language");
        Ok(lang)
    }

    fn resource(&self) -> Result<Arc<LoadedDetector>> {
        if let Some(loaded) = self.loaded.get() {
            return Ok(loaded.clone());
        }

        let _guard = self.init_lock.lock();
        if let Some(loaded) = self.loaded.get() {
            return Ok(loaded.clone());
        }

        let loader = self.loader.as_ref().ok_or_else(|| {
            SummarizeError::ResourceNotReady("language detector has no loader".to_string())
        })?;
        tracing::info!(model = %self.spec.model, "Loading language detection model");
        let resource = loader.load_detector(&self.spec)?;
        let loaded = Arc::new(LoadedDetector::build(resource, self.spec.max_tokens)?);
        let _ = self.loaded.set(loaded.clone());
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        fixture_raw_tokenizer, FixedClassifier, FixtureLoader, ENGLISH_ARTICLE, RUSSIAN_ARTICLE,
    };

    fn detector_with(predictions: Vec<LabelScore>) -> LanguageDetector {
        let resource = DetectorResource {
            tokenizer: fixture_raw_tokenizer(),
            classifier: Arc::new(FixedClassifier::new(predictions)),
        };
        LanguageDetector::from_resource(resource, 256).unwrap()
    }

    #[test]
    fn test_detects_by_script() {
        let loader = Arc::new(FixtureLoader::new());
        let detector = LanguageDetector::new(DetectorSpec::default(), loader);
        assert_eq!(detector.detect(ENGLISH_ARTICLE).unwrap().as_str(), "en");
        assert_eq!(detector.detect(RUSSIAN_ARTICLE).unwrap().as_str(), "ru");
    }

    #[test]
    fn test_top_score_wins() {
        let detector = detector_with(vec![
            LabelScore::new("en", 0.2),
            LabelScore::new("RU", 0.7),
            LabelScore::new("de", 0.1),
        ]);
        assert_eq!(detector.detect("some text").unwrap().as_str(), "ru");
    }

    #[test]
    fn test_empty_text_rejected() {
        let detector = detector_with(vec![LabelScore::new("en", 1.0)]);
        assert!(matches!(
            detector.detect("   \n"),
            Err(SummarizeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_no_predictions_is_inference_error() {
        let detector = detector_with(Vec::new());
        assert!(matches!(
            detector.detect("hello world"),
            Err(SummarizeError::Inference(_))
        ));
    }

    #[test]
    fn test_missing_label_is_inference_error() {
        let detector = detector_with(vec![
            LabelScore {
                label: None,
                score: 0.9,
            },
            LabelScore::new("en", 0.1),
        ]);
        assert!(matches!(
            detector.detect("hello world"),
            Err(SummarizeError::Inference(_))
        ));
    }

    #[test]
    fn test_classifier_input_is_bounded() {
        let classifier = Arc::new(FixedClassifier::new(vec![LabelScore::new("en", 1.0)]));
        let resource = DetectorResource {
            tokenizer: fixture_raw_tokenizer(),
            classifier: classifier.clone(),
        };
        let detector = LanguageDetector::from_resource(resource, 256).unwrap();

        let long = ENGLISH_ARTICLE.repeat(20);
        detector.detect(&long).unwrap();

        let seen = classifier.last_input().unwrap();
        // 256 tokens minus <s> and </s>
        assert_eq!(seen.split_whitespace().count(), 254);
    }

    #[test]
    fn test_loads_once() {
        let loader = Arc::new(FixtureLoader::new());
        let detector = LanguageDetector::new(DetectorSpec::default(), loader.clone());
        assert!(!detector.is_loaded());

        detector.detect(ENGLISH_ARTICLE).unwrap();
        detector.detect(RUSSIAN_ARTICLE).unwrap();
        assert!(detector.is_loaded());
        assert_eq!(loader.detector_loads(), 1);
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let loader = Arc::new(FixtureLoader::new().with_delay(std::time::Duration::from_millis(50)));
        let detector = Arc::new(LanguageDetector::new(DetectorSpec::default(), loader.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let detector = detector.clone();
                std::thread::spawn(move || detector.detect(ENGLISH_ARTICLE).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().as_str(), "en");
        }
        assert_eq!(loader.detector_loads(), 1);
    }
}
