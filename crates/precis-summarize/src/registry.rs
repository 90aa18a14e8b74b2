//! Per-language summarizer registry.
//!
//! The registry owns the language → model table and hands out one shared
//! summarizer per language. The first request for a language constructs the
//! summarizer and loads its model; every later request returns the same
//! instance. Construction is single-flight per language: concurrent first
//! callers for the same language wait on that language's slot, while
//! different languages load in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, SummarizeError};
use crate::language::LanguageCode;
use crate::resource::{
    ResourceLoader, SummarizerSpec, DEFAULT_SUMMARIZER_MODEL_EN, DEFAULT_SUMMARIZER_MODEL_RU,
};
use crate::summarizer::{
    strategy_for, ExtractiveSummarizer, GenerativeOptions, GenerativeSummarizer,
    PipelineOptions, PipelineSummarizer, SharedSummarizer, Strategy,
};

type Slot = Arc<Mutex<Option<SharedSummarizer>>>;

/// The built-in language table: English and Russian.
pub fn default_table() -> HashMap<LanguageCode, SummarizerSpec> {
    HashMap::from([
        (
            LanguageCode::new("en"),
            SummarizerSpec::new(DEFAULT_SUMMARIZER_MODEL_EN),
        ),
        (
            LanguageCode::new("ru"),
            SummarizerSpec::new(DEFAULT_SUMMARIZER_MODEL_RU),
        ),
    ])
}

/// Hands out one cached summarizer per supported language.
pub struct SummarizerRegistry {
    table: HashMap<LanguageCode, SummarizerSpec>,
    loader: Arc<dyn ResourceLoader>,
    instances: Mutex<HashMap<LanguageCode, Slot>>,
    constructed: AtomicUsize,
}

impl std::fmt::Debug for SummarizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerRegistry")
            .field("languages", &self.languages())
            .field("constructed", &self.constructed())
            .finish()
    }
}

impl SummarizerRegistry {
    /// Create a registry over `table`, loading models through `loader`.
    pub fn new(table: HashMap<LanguageCode, SummarizerSpec>, loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            table,
            loader,
            instances: Mutex::new(HashMap::new()),
            constructed: AtomicUsize::new(0),
        }
    }

    /// Create a registry over the built-in English/Russian table.
    pub fn with_defaults(loader: Arc<dyn ResourceLoader>) -> Self {
        Self::new(default_table(), loader)
    }

    /// Return the summarizer for `lang`, constructing it on first use.
    ///
    /// Unknown languages fail with [`SummarizeError::UnsupportedLanguage`]
    /// before anything is loaded. A failed construction leaves nothing
    /// cached, so a later call retries it.
    pub fn get_summarizer(&self, lang: &LanguageCode) -> Result<SharedSummarizer> {
        let spec = self
            .table
            .get(lang)
            .ok_or_else(|| SummarizeError::UnsupportedLanguage(lang.to_string()))?;

        let slot = self.instances.lock().entry(lang.clone()).or_default().clone();

        let mut guard = slot.lock();
        if let Some(summarizer) = guard.as_ref() {
            return Ok(summarizer.clone());
        }

        let summarizer = self.construct(lang, spec)?;
        *guard = Some(summarizer.clone());
        self.constructed.fetch_add(1, Ordering::SeqCst);
        Ok(summarizer)
    }

    fn construct(&self, lang: &LanguageCode, spec: &SummarizerSpec) -> Result<SharedSummarizer> {
        let strategy = spec.strategy.unwrap_or_else(|| strategy_for(lang));
        tracing::info!(
            language = %lang,
            model = %spec.model,
            strategy = %strategy,
            "Loading summarization model"
        );

        let summarizer: SharedSummarizer = match strategy {
            Strategy::Pipeline => {
                let summarizer = PipelineSummarizer::new(PipelineOptions::from_spec(spec));
                summarizer.install(self.loader.load_summarizer(lang, spec)?)?;
                Arc::new(summarizer)
            }
            Strategy::Generative => {
                let summarizer = GenerativeSummarizer::new(GenerativeOptions::from_spec(spec));
                summarizer.install(self.loader.load_summarizer(lang, spec)?)?;
                Arc::new(summarizer)
            }
            Strategy::Extractive => Arc::new(ExtractiveSummarizer::default()),
        };
        Ok(summarizer)
    }

    /// Number of summarizers constructed so far.
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Configured language codes, sorted.
    pub fn languages(&self) -> Vec<LanguageCode> {
        let mut languages: Vec<_> = self.table.keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Languages with a live summarizer, sorted.
    ///
    /// A language whose summarizer is still loading is not reported.
    pub fn cached(&self) -> Vec<LanguageCode> {
        let slots: Vec<(LanguageCode, Slot)> = self
            .instances
            .lock()
            .iter()
            .map(|(lang, slot)| (lang.clone(), slot.clone()))
            .collect();
        let mut cached: Vec<_> = slots
            .into_iter()
            .filter(|(_, slot)| slot.try_lock().is_some_and(|guard| guard.is_some()))
            .map(|(lang, _)| lang)
            .collect();
        cached.sort();
        cached
    }

    /// The [`SummarizerSpec`] configured for `lang`.
    pub fn spec(&self, lang: &LanguageCode) -> Option<&SummarizerSpec> {
        self.table.get(lang)
    }
}
