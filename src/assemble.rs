use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::backend::{Backend, CompletionRequest};
use crate::diversity::DiversitySelector;
use crate::error::AssemblyError;
use crate::model::{ContentBundle, DiversityProfile, Section, Slot, Style};
use crate::prompts::{PromptComposer, target_word_count};

/// Generates every slot of one site and packs the results into a bundle.
#[derive(Clone)]
pub struct BundleAssembler {
    backend: Arc<dyn Backend>,
    selector: DiversitySelector,
    composer: PromptComposer,
}

impl BundleAssembler {
    pub fn new(backend: Arc<dyn Backend>, selector: DiversitySelector) -> Self {
        Self {
            backend,
            selector,
            composer: PromptComposer,
        }
    }

    /// Slots run in order (title, meta description, sections); the first
    /// failing slot aborts the whole bundle.
    pub async fn assemble<R: Rng + Send>(
        &self,
        site_index: usize,
        topic: &str,
        style: Style,
        max_tokens: u32,
        rng: &mut R,
    ) -> Result<ContentBundle, AssemblyError> {
        let profile = self.selector.select(style, rng);
        tracing::debug!(
            topic,
            %style,
            temperature = profile.temperature,
            nucleus_p = profile.nucleus_p,
            sections = profile.section_count,
            template = %profile.template_id,
            color_scheme = %profile.color_scheme,
            "diversity profile"
        );

        let mut tokens_used = 0u64;

        let prompt = self.composer.compose_title_prompt(topic, style, rng);
        let title = self
            .complete(Slot::Title, prompt, &profile, max_tokens, &mut tokens_used)
            .await?;

        let prompt = self.composer.compose_meta_prompt(topic, style, rng);
        let meta_description = self
            .complete(
                Slot::MetaDescription,
                prompt,
                &profile,
                max_tokens,
                &mut tokens_used,
            )
            .await?;

        let words = target_word_count(max_tokens);
        let mut sections = Vec::with_capacity(profile.section_count);
        for (idx, section_type) in profile.selected_sections.iter().enumerate() {
            let prompt =
                self.composer
                    .compose_section_prompt(topic, style, section_type, words, rng);
            let slot = Slot::Section {
                position: idx + 1,
                heading: section_type.heading.clone(),
            };
            let body_text = self
                .complete(slot, prompt, &profile, max_tokens, &mut tokens_used)
                .await?;
            sections.push(Section {
                section_type: section_type.id.clone(),
                heading: section_type.heading.clone(),
                body_text: body_text.trim().to_owned(),
            });
        }

        Ok(ContentBundle {
            site_id: uuid::Uuid::new_v4().to_string(),
            site_index,
            title: clean_single_line(&title),
            meta_description: clean_single_line(&meta_description),
            sections,
            diversity_profile: profile,
            tokens_used,
            created_at: Utc::now(),
        })
    }

    async fn complete(
        &self,
        slot: Slot,
        prompt: String,
        profile: &DiversityProfile,
        max_tokens: u32,
        tokens_used: &mut u64,
    ) -> Result<String, AssemblyError> {
        let request = CompletionRequest {
            slot,
            prompt,
            temperature: profile.temperature,
            nucleus_p: profile.nucleus_p,
            max_tokens,
        };
        match self.backend.invoke(&request).await {
            Ok(completion) => {
                *tokens_used += completion.tokens_used;
                Ok(completion.text)
            }
            Err(err) => {
                tracing::warn!(slot = %request.slot, kind = %err.kind, error = %err.message, "slot failed");
                Err(AssemblyError::new(request.slot.to_string(), err))
            }
        }
    }
}

/// Trims whitespace and one pair of wrapping quotes, as models tend to quote
/// short answers.
fn clean_single_line(raw: &str) -> String {
    let trimmed = raw.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if let Some(inner) = trimmed
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim().to_owned();
        }
    }
    trimmed.to_owned()
}
