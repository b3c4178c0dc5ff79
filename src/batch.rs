use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::assemble::BundleAssembler;
use crate::error::{AssemblyError, BackendError, BackendErrorKind, ValidationError};
use crate::model::{GenerationRequest, GenerationResult, SlotFailure};

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Caps the number of sites that talk to the backend at the same time.
#[derive(Debug, Clone)]
pub struct WorkerLimiter {
    semaphore: Arc<Semaphore>,
}

impl WorkerLimiter {
    pub fn new(max_concurrency: usize) -> Self {
        let permits = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, BackendError> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| BackendError::unknown("worker limiter is closed"))
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub concurrency: usize,
    /// Unfinished sites are reported as timeouts once this elapses.
    pub deadline: Option<Duration>,
    /// Makes every per-site random choice reproducible.
    pub seed: Option<u64>,
}

impl BatchOptions {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }
}

pub struct BatchCoordinator {
    assembler: Arc<BundleAssembler>,
    limiter: WorkerLimiter,
    options: BatchOptions,
}

impl BatchCoordinator {
    pub fn new(assembler: BundleAssembler, options: BatchOptions) -> Self {
        let concurrency = if options.concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            options.concurrency
        };
        Self {
            assembler: Arc::new(assembler),
            limiter: WorkerLimiter::new(concurrency),
            options,
        }
    }

    /// Runs one batch. Returns only after every site has either produced a
    /// bundle or been recorded as failed.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, ValidationError> {
        request.validate()?;

        let pages = request.pages_count as usize;
        let request = Arc::new(request);
        tracing::info!(
            topic = %request.topic,
            pages,
            style = %request.style,
            max_tokens = request.max_tokens,
            "generate batch"
        );

        let mut seeds = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut join_set = JoinSet::new();
        for site_index in 0..pages {
            let task_seed: u64 = seeds.r#gen();
            let assembler = Arc::clone(&self.assembler);
            let limiter = self.limiter.clone();
            let request = Arc::clone(&request);
            join_set.spawn(async move {
                let outcome = match limiter.acquire().await {
                    Ok(_permit) => {
                        let mut rng = StdRng::seed_from_u64(task_seed);
                        assembler
                            .assemble(
                                site_index,
                                &request.topic,
                                request.style,
                                request.max_tokens,
                                &mut rng,
                            )
                            .await
                    }
                    Err(err) => Err(AssemblyError::new("worker slot", err)),
                };
                (site_index, outcome)
            });
        }

        let deadline = self
            .options
            .deadline
            .map(|after| tokio::time::Instant::now() + after);
        let mut pending = (0..pages).collect::<BTreeSet<_>>();
        let mut result = GenerationResult::default();
        let mut deadline_hit = false;

        loop {
            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, join_set.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        deadline_hit = true;
                        join_set.abort_all();
                        break;
                    }
                },
                None => join_set.join_next().await,
            };
            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((site_index, Ok(bundle))) => {
                    pending.remove(&site_index);
                    tracing::info!(
                        site_index,
                        site_id = %bundle.site_id,
                        tokens_used = bundle.tokens_used,
                        "site generated"
                    );
                    result.succeeded.push(bundle);
                }
                Ok((site_index, Err(err))) => {
                    pending.remove(&site_index);
                    tracing::warn!(
                        site_index,
                        slot = %err.slot,
                        kind = %err.kind(),
                        "site failed"
                    );
                    result
                        .failed
                        .push(SlotFailure::from_assembly(site_index, &request.topic, &err));
                }
                Err(err) => {
                    tracing::error!(?err, "site task did not complete");
                }
            }
        }

        for site_index in pending {
            let (kind, slot, message) = if deadline_hit {
                (
                    BackendErrorKind::Timeout,
                    "batch deadline",
                    "batch deadline elapsed before the site finished",
                )
            } else {
                (
                    BackendErrorKind::Unknown,
                    "site task",
                    "site task panicked or was cancelled",
                )
            };
            result.failed.push(SlotFailure {
                site_index,
                topic: request.topic.clone(),
                slot_description: slot.to_owned(),
                error_kind: kind,
                message: message.to_owned(),
            });
        }

        result.succeeded.sort_by_key(|bundle| bundle.site_index);
        result.failed.sort_by_key(|failure| failure.site_index);
        result.generated_count = result.succeeded.len();
        tracing::info!(
            generated = result.generated_count,
            failed = result.failed.len(),
            deadline_hit,
            "batch finished"
        );
        Ok(result)
    }
}
