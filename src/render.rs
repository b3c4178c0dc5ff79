use std::path::{Path, PathBuf};

use anyhow::Context as _;
use minijinja::Environment;
use serde::Serialize;
use tokio::fs;

use crate::model::{
    ContentBundle, GenerationRequest, MAX_PAGES_COUNT, MAX_TOKENS_RANGE, MIN_PAGES_COUNT, Palette,
    Style, TemplateId,
};

const INDEX_TEMPLATE: &str = "index.html";

const TEMPLATES: [(TemplateId, &str); 4] = [
    (TemplateId::Modern, include_str!("../templates/modern.html")),
    (TemplateId::Minimal, include_str!("../templates/minimal.html")),
    (TemplateId::Classic, include_str!("../templates/classic.html")),
    (TemplateId::Magazine, include_str!("../templates/magazine.html")),
];

pub fn template_name(id: TemplateId) -> &'static str {
    match id {
        TemplateId::Modern => "modern.html",
        TemplateId::Minimal => "minimal.html",
        TemplateId::Classic => "classic.html",
        TemplateId::Magazine => "magazine.html",
    }
}

pub fn site_file_name(site_id: &str) -> String {
    format!("site_{site_id}.html")
}

#[derive(Debug, Serialize)]
struct PageContext<'a> {
    site_id: &'a str,
    title: &'a str,
    meta_description: &'a str,
    palette: Palette,
    sections: Vec<SectionContext<'a>>,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct IndexContext {
    styles: Vec<&'static str>,
    default_style: &'static str,
    default_pages: u32,
    min_pages: u32,
    max_pages: u32,
    default_tokens: u32,
    min_tokens: u32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SectionContext<'a> {
    section_type: &'a str,
    heading: &'a str,
    paragraphs: Vec<&'a str>,
}

/// Turns content bundles into standalone HTML pages. Output depends only on
/// the bundle.
pub struct SiteRenderer {
    env: Environment<'static>,
}

impl SiteRenderer {
    pub fn new() -> anyhow::Result<Self> {
        let mut env = Environment::new();
        for (id, source) in TEMPLATES {
            let name = template_name(id);
            env.add_template(name, source)
                .with_context(|| format!("register template {name}"))?;
        }
        env.add_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))
            .context("register template index.html")?;
        Ok(Self { env })
    }

    pub fn render(&self, bundle: &ContentBundle) -> anyhow::Result<String> {
        let profile = &bundle.diversity_profile;
        let name = template_name(profile.template_id);
        let template = self
            .env
            .get_template(name)
            .with_context(|| format!("load template {name}"))?;

        let ctx = PageContext {
            site_id: &bundle.site_id,
            title: &bundle.title,
            meta_description: &bundle.meta_description,
            palette: profile.color_scheme.palette(),
            sections: bundle
                .sections
                .iter()
                .map(|section| SectionContext {
                    section_type: &section.section_type,
                    heading: &section.heading,
                    paragraphs: paragraphs(&section.body_text),
                })
                .collect(),
            created_at: bundle.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        };

        template
            .render(&ctx)
            .with_context(|| format!("render template {name} for site {}", bundle.site_id))
    }

    /// The landing page with the generation form.
    pub fn render_index(&self) -> anyhow::Result<String> {
        let ctx = IndexContext {
            styles: Style::ALL.iter().map(|style| style.as_str()).collect(),
            default_style: GenerationRequest::default_style().as_str(),
            default_pages: GenerationRequest::default_pages_count(),
            min_pages: MIN_PAGES_COUNT,
            max_pages: MAX_PAGES_COUNT,
            default_tokens: GenerationRequest::default_max_tokens(),
            min_tokens: *MAX_TOKENS_RANGE.start(),
            max_tokens: *MAX_TOKENS_RANGE.end(),
        };
        self.env
            .get_template(INDEX_TEMPLATE)
            .context("load template index.html")?
            .render(&ctx)
            .context("render index page")
    }

    /// Renders `bundle` into `dir/site_<site_id>.html` and returns that path.
    pub async fn write(&self, bundle: &ContentBundle, dir: &Path) -> anyhow::Result<PathBuf> {
        let html = self.render(bundle)?;
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create output dir: {}", dir.display()))?;

        let path = dir.join(site_file_name(&bundle.site_id));
        let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp_path, html.as_bytes())
            .await
            .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("rename tmp to final: {}", path.display()))?;
        Ok(path)
    }
}

/// Splits on blank lines; single newlines stay inside a paragraph.
fn paragraphs(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut end = 0;
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let line_end = offset + line.len();
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                out.push(body[s..end].trim());
            }
        } else {
            start.get_or_insert(offset);
            end = line_end;
        }
        offset = line_end;
    }
    if let Some(s) = start {
        out.push(body[s..end].trim());
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};

    use super::*;
    use crate::model::{ColorScheme, DiversityProfile, Section, SectionType};

    fn bundle(template_id: TemplateId, color_scheme: ColorScheme) -> ContentBundle {
        ContentBundle {
            site_id: "0b6f4d1e-8a40-4d7e-9c67-3f1f4b0e2a11".to_owned(),
            site_index: 0,
            title: "Rust <Ownership> & You".to_owned(),
            meta_description: "A short tour".to_owned(),
            sections: vec![Section {
                section_type: "overview".to_owned(),
                heading: "Overview".to_owned(),
                body_text: "First paragraph\ncontinues here.\n\n\nSecond paragraph.".to_owned(),
            }],
            diversity_profile: DiversityProfile {
                temperature: 0.9,
                nucleus_p: 0.9,
                section_count: 1,
                selected_sections: vec![SectionType::new("overview", "Overview")],
                template_id,
                color_scheme,
            },
            tokens_used: 10,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(paragraphs("a\nb\n\n  \nc\n"), vec!["a\nb", "c"]);
        assert_eq!(paragraphs("\n\n"), Vec::<&str>::new());
        assert_eq!(paragraphs("only"), vec!["only"]);
    }

    #[test]
    fn every_template_renders_and_escapes() {
        let renderer = SiteRenderer::new().unwrap();
        for template_id in TemplateId::ALL {
            let html = renderer
                .render(&bundle(template_id, ColorScheme::DeepSea))
                .unwrap();
            assert!(html.contains("Rust &lt;Ownership&gt; &amp; You"), "{template_id}");
            assert!(html.contains("<h2"), "{template_id}");
            assert!(html.contains("<p>Second paragraph.</p>"), "{template_id}");
            assert!(html.contains(ColorScheme::DeepSea.palette().primary), "{template_id}");
            assert!(html.contains("2024-05-01 12:30 UTC"), "{template_id}");
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = SiteRenderer::new().unwrap();
        let bundle = bundle(TemplateId::Magazine, ColorScheme::Marigold);
        assert_eq!(
            renderer.render(&bundle).unwrap(),
            renderer.render(&bundle).unwrap()
        );
    }

    #[tokio::test]
    async fn write_places_file_by_site_id() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SiteRenderer::new().unwrap();
        let bundle = bundle(TemplateId::Classic, ColorScheme::Mint);

        let path = renderer.write(&bundle, dir.path()).await.unwrap();

        assert_eq!(
            path,
            dir.path().join("site_0b6f4d1e-8a40-4d7e-9c67-3f1f4b0e2a11.html")
        );
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn index_offers_every_style_with_request_bounds() {
        let html = SiteRenderer::new().unwrap().render_index().unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<option value="educational" selected>Educational</option>"#));
        assert!(html.contains(r#"<option value="marketing">Marketing</option>"#));
        assert!(html.contains(r#"<option value="technical">Technical</option>"#));
        assert!(html.contains(r#"value="5" min="1" max="50""#));
        assert!(html.contains(r#"value="800" min="100" max="2000""#));
        assert!(html.contains(r#"fetch("/generate""#));
    }
}
