use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app::log_store::{GenerationLog, LogStore, SiteRecord};
use crate::assemble::BundleAssembler;
use crate::backend::{Backend, RetryPolicy, RetryingBackend};
use crate::batch::{BatchCoordinator, BatchOptions};
use crate::config::OpenAiConfig;
use crate::diversity::{DiversitySelector, SectionCatalog};
use crate::error::{BackendErrorKind, ValidationError};
use crate::model::{ColorScheme, ContentBundle, GenerationRequest, SlotFailure, TemplateId};
use crate::openai::OpenAiBackend;
use crate::render::SiteRenderer;

/// Slot name reported for a generated site that could not be written or recorded.
pub const PERSIST_SLOT: &str = "persist";

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSite {
    pub site_id: String,
    pub title: String,
    pub template_id: TemplateId,
    pub color_scheme: ColorScheme,
    pub tokens_used: u64,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generation_id: String,
    pub topic: String,
    pub generated_count: usize,
    pub sites: Vec<GeneratedSite>,
    pub failed: Vec<SlotFailure>,
}

/// Builds the OpenAI-backed coordinator both binaries use.
pub fn openai_coordinator(
    config: &OpenAiConfig,
    retry: RetryPolicy,
    options: BatchOptions,
) -> anyhow::Result<BatchCoordinator> {
    let backend = OpenAiBackend::new(config).context("create OpenAI backend")?;
    tracing::info!(
        endpoint = backend.endpoint(),
        model = %config.model,
        max_attempts = retry.max_attempts,
        "using OpenAI backend"
    );
    let backend: Arc<dyn Backend> = Arc::new(RetryingBackend::new(backend, retry));
    let selector = DiversitySelector::new(Arc::new(SectionCatalog::builtin()));
    Ok(BatchCoordinator::new(
        BundleAssembler::new(backend, selector),
        options,
    ))
}

/// Runs a batch, then renders and records everything it produced.
pub struct SiteRunner {
    coordinator: BatchCoordinator,
    renderer: SiteRenderer,
    log_store: Arc<dyn LogStore>,
    out_dir: PathBuf,
}

impl SiteRunner {
    pub fn new(
        coordinator: BatchCoordinator,
        renderer: SiteRenderer,
        log_store: Arc<dyn LogStore>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            coordinator,
            renderer,
            log_store,
            out_dir: out_dir.into(),
        }
    }

    pub fn log_store(&self) -> &Arc<dyn LogStore> {
        &self.log_store
    }

    pub fn renderer(&self) -> &SiteRenderer {
        &self.renderer
    }

    pub async fn run(&self, request: GenerationRequest) -> Result<BatchReport, RunError> {
        let generation_id = uuid::Uuid::new_v4().to_string();
        let result = self.coordinator.generate(request.clone()).await?;

        let mut sites = Vec::with_capacity(result.succeeded.len());
        let mut failed = result.failed;
        for bundle in &result.succeeded {
            match self.persist(&generation_id, &request.topic, bundle).await {
                Ok(site) => sites.push(site),
                Err(err) => {
                    tracing::warn!(
                        site_index = bundle.site_index,
                        site_id = %bundle.site_id,
                        error = %format!("{err:#}"),
                        "site not persisted"
                    );
                    failed.push(SlotFailure {
                        site_index: bundle.site_index,
                        topic: request.topic.clone(),
                        slot_description: PERSIST_SLOT.to_owned(),
                        error_kind: BackendErrorKind::Unknown,
                        message: format!("persist site {}: {err:#}", bundle.site_id),
                    });
                }
            }
        }
        failed.sort_by_key(|failure| failure.site_index);

        let log = GenerationLog {
            generation_id: generation_id.clone(),
            topic: request.topic.clone(),
            pages_count: request.pages_count,
            style: request.style,
            max_tokens: request.max_tokens,
            site_ids: sites.iter().map(|site| site.site_id.clone()).collect(),
            failed_count: failed.len(),
            created_at: Utc::now(),
        };
        self.log_store
            .record_generation(&log)
            .await
            .context("save generation log")?;

        tracing::info!(
            %generation_id,
            generated = sites.len(),
            failed = failed.len(),
            "generation recorded"
        );

        Ok(BatchReport {
            generation_id,
            topic: request.topic,
            generated_count: sites.len(),
            sites,
            failed,
        })
    }

    async fn persist(
        &self,
        generation_id: &str,
        topic: &str,
        bundle: &ContentBundle,
    ) -> anyhow::Result<GeneratedSite> {
        let file_path = self
            .renderer
            .write(bundle, &self.out_dir)
            .await
            .context("render site")?;
        let profile = &bundle.diversity_profile;

        let record = SiteRecord {
            site_id: bundle.site_id.clone(),
            generation_id: generation_id.to_owned(),
            topic: topic.to_owned(),
            title: bundle.title.clone(),
            meta_description: bundle.meta_description.clone(),
            section_count: bundle.sections.len(),
            tokens_used: bundle.tokens_used,
            template_id: profile.template_id,
            color_scheme: profile.color_scheme,
            file_path: file_path.clone(),
            created_at: bundle.created_at,
        };
        if let Err(err) = self.log_store.record_site(&record).await {
            if let Err(remove_err) = tokio::fs::remove_file(&file_path).await {
                tracing::warn!(
                    path = %file_path.display(),
                    error = %remove_err,
                    "failed to remove unrecorded site page"
                );
            }
            return Err(err.context("save site record"));
        }

        Ok(GeneratedSite {
            site_id: record.site_id,
            title: record.title,
            template_id: record.template_id,
            color_scheme: record.color_scheme,
            tokens_used: record.tokens_used,
            file_path,
        })
    }
}
