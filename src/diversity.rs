use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::Arc;

use rand::Rng;

use crate::error::CatalogError;
use crate::model::{ColorScheme, DiversityProfile, SectionType, Style, TemplateId};

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.8..=1.0;
pub const NUCLEUS_P_RANGE: RangeInclusive<f64> = 0.85..=0.98;
pub const SECTION_COUNT_RANGE: RangeInclusive<usize> = 3..=5;

/// Ordered section types per style.
#[derive(Debug, Clone)]
pub struct SectionCatalog {
    sections: HashMap<Style, Vec<SectionType>>,
}

impl SectionCatalog {
    pub fn new(sections: HashMap<Style, Vec<SectionType>>) -> Result<Self, CatalogError> {
        let min = *SECTION_COUNT_RANGE.end();
        for style in Style::ALL {
            let Some(entries) = sections.get(&style) else {
                return Err(CatalogError::MissingStyle(style.to_string()));
            };
            if entries.len() < min {
                return Err(CatalogError::TooFewSections {
                    style: style.to_string(),
                    len: entries.len(),
                    min,
                });
            }
            let mut seen = HashSet::new();
            for entry in entries {
                if !seen.insert(entry.id.as_str()) {
                    return Err(CatalogError::DuplicateSection {
                        style: style.to_string(),
                        id: entry.id.clone(),
                    });
                }
            }
        }
        Ok(Self { sections })
    }

    pub fn builtin() -> Self {
        let sections = Style::ALL
            .into_iter()
            .map(|style| {
                let entries = builtin_entries(style)
                    .iter()
                    .map(|(id, heading)| SectionType::new(*id, *heading))
                    .collect();
                (style, entries)
            })
            .collect();
        Self { sections }
    }

    pub fn sections(&self, style: Style) -> &[SectionType] {
        self.sections.get(&style).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for SectionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_entries(style: Style) -> &'static [(&'static str, &'static str)] {
    match style {
        Style::Educational => &[
            ("intro", "Introduction"),
            ("fundamentals", "Understanding the Fundamentals"),
            ("concepts", "Key Concepts Explained"),
            ("applications", "Real-World Applications"),
            ("challenges", "Common Challenges and Solutions"),
            ("best_practices", "Best Practices"),
            ("future", "Future Outlook"),
            ("getting_started", "Getting Started"),
            ("resources", "Resources and Tools"),
            ("conclusion", "Conclusion"),
        ],
        Style::Marketing => &[
            ("value_prop", "Why This Matters"),
            ("transformation", "Transform Your Business"),
            ("benefits", "Proven Benefits"),
            ("testimonials", "Success Stories"),
            ("process", "How It Works"),
            ("cta", "Get Started Today"),
            ("authority", "Industry Leadership"),
            ("differentiation", "What Sets Us Apart"),
            ("roi", "ROI and Value"),
            ("social_proof", "Join Thousands of Satisfied Users"),
        ],
        Style::Technical => &[
            ("overview", "Technical Overview"),
            ("architecture", "Architecture and Design"),
            ("implementation", "Implementation Details"),
            ("api", "API and Integration"),
            ("performance", "Performance Considerations"),
            ("security", "Security Features"),
            ("scalability", "Scalability"),
            ("examples", "Code Examples"),
            ("troubleshooting", "Troubleshooting"),
            ("advanced", "Advanced Topics"),
        ],
    }
}

#[derive(Debug, Clone)]
pub struct DiversitySelector {
    catalog: Arc<SectionCatalog>,
}

impl DiversitySelector {
    pub fn new(catalog: Arc<SectionCatalog>) -> Self {
        Self { catalog }
    }

    pub fn select<R: Rng + ?Sized>(&self, style: Style, rng: &mut R) -> DiversityProfile {
        let temperature = rng.gen_range(TEMPERATURE_RANGE);
        let nucleus_p = rng.gen_range(NUCLEUS_P_RANGE);

        let catalog = self.catalog.sections(style);
        let section_count = rng.gen_range(SECTION_COUNT_RANGE).min(catalog.len());

        // Sorting the sampled indices keeps the catalog's narrative order.
        let mut picked = rand::seq::index::sample(rng, catalog.len(), section_count).into_vec();
        picked.sort_unstable();
        let selected_sections = picked
            .into_iter()
            .map(|idx| catalog[idx].clone())
            .collect::<Vec<_>>();

        let template_id = TemplateId::ALL[rng.gen_range(0..TemplateId::ALL.len())];
        let color_scheme = ColorScheme::ALL[rng.gen_range(0..ColorScheme::ALL.len())];

        DiversityProfile {
            temperature,
            nucleus_p,
            section_count: selected_sections.len(),
            selected_sections,
            template_id,
            color_scheme,
        }
    }
}
