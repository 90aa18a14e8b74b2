//! Builds the runtime components from the resolved configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use precis_config::{ModelsConfig, PrecisConfig, SummarizerModelConfig};
use precis_store::SummaryStore;
use precis_summarize::{
    DetectorSpec, LanguageCode, LanguageDetector, ResourceLoader, Strategy, SummarizerRegistry,
    SummarizerSpec,
};
use precis_worker::{
    FetchOptions, HttpArticleFetcher, QueueConfig, SummaryOrchestrator, SummaryWriter,
};

/// Open the record store at the configured path.
pub fn open_store(config: &PrecisConfig) -> Result<Arc<SummaryStore>> {
    let path = config.database().effective_path();
    let store = SummaryStore::open(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Wire fetcher, detector, registry and writer into an orchestrator.
///
/// Commands that never persist pass a [`precis_worker::DetachedWriter`] so no database is
/// opened.
pub fn build_orchestrator(
    config: &PrecisConfig,
    writer: Arc<dyn SummaryWriter>,
) -> Result<SummaryOrchestrator> {
    let models = config.models();
    let loader = resource_loader(&models)?;

    let detector = LanguageDetector::new(detector_spec(&models), Arc::clone(&loader));
    let registry = SummarizerRegistry::new(summarizer_table(&models)?, loader);
    let fetcher = HttpArticleFetcher::with_options(fetch_options(config))?;

    Ok(SummaryOrchestrator::new(
        Arc::new(fetcher),
        Arc::new(detector),
        Arc::new(registry),
        writer,
    ))
}

/// Language detector only, for the `detect` command.
pub fn build_detector(config: &PrecisConfig) -> Result<LanguageDetector> {
    let models = config.models();
    let loader = resource_loader(&models)?;
    Ok(LanguageDetector::new(detector_spec(&models), loader))
}

pub fn detector_spec(models: &ModelsConfig) -> DetectorSpec {
    let detection = models.detection();
    let mut spec = DetectorSpec::new(detection.model).with_max_tokens(detection.max_tokens);
    if let Some(path) = detection.path {
        spec = spec.with_path(path);
    }
    spec
}

/// The per-language summarizer table, built-ins included.
pub fn summarizer_table(models: &ModelsConfig) -> Result<HashMap<LanguageCode, SummarizerSpec>> {
    models
        .resolved_summarizers()?
        .into_iter()
        .map(|(lang, entry)| {
            let spec = summarizer_spec(&entry)
                .with_context(|| format!("Invalid [models.summarizers.{}]", lang))?;
            Ok((LanguageCode::new(lang), spec))
        })
        .collect()
}

fn summarizer_spec(entry: &SummarizerModelConfig) -> Result<SummarizerSpec> {
    let model = entry
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("missing model"))?;

    let mut spec = SummarizerSpec::new(model);
    spec.path = entry.path.clone();
    spec.strategy = entry
        .strategy
        .as_deref()
        .map(str::parse::<Strategy>)
        .transpose()?;
    spec.max_input_tokens = entry.max_input_tokens;
    spec.max_length = entry.max_length;
    spec.min_length = entry.min_length;
    spec.no_repeat_ngram_size = entry.no_repeat_ngram_size;
    Ok(spec)
}

pub fn fetch_options(config: &PrecisConfig) -> FetchOptions {
    let fetch = config.fetch();
    FetchOptions {
        timeout: Duration::from_secs(fetch.timeout_secs),
        max_body_bytes: fetch.max_body_bytes,
        max_text_length: fetch.max_text_length,
        user_agent: fetch.user_agent,
    }
}

pub fn queue_config(config: &PrecisConfig) -> QueueConfig {
    let worker = config.worker();
    QueueConfig::default()
        .with_concurrency(worker.concurrency)
        .with_max_attempts(worker.max_attempts)
        .with_initial_backoff(Duration::from_millis(worker.initial_backoff_ms))
}

#[cfg(feature = "onnx")]
fn resource_loader(models: &ModelsConfig) -> Result<Arc<dyn ResourceLoader>> {
    Ok(Arc::new(precis_summarize::OnnxLoader::new(
        models.effective_dir(),
    )))
}

#[cfg(not(feature = "onnx"))]
fn resource_loader(_models: &ModelsConfig) -> Result<Arc<dyn ResourceLoader>> {
    anyhow::bail!("precis was built without the `onnx` feature; no model backend is available")
}
