use rand::Rng;

use crate::model::{SectionType, Style};

const TITLE_VARIANTS: &[&str] = &[
    "Create a compelling title about {topic}. Style: {style}. Be unique and engaging.",
    "Generate an innovative title for {topic}. Use {style} tone. Be creative.",
    "Craft a distinctive title covering {topic}. {style} approach. Make it memorable.",
    "Design a captivating title for {topic}. Apply {style} style. Stand out.",
    "Produce an original title focused on {topic}. {style} perspective. Avoid clichés.",
];

const META_VARIANTS: &[&str] = &[
    "Write a meta description (150-160 characters) for a {style} website about {topic}.",
    "Create an SEO-optimized meta description about {topic}. Style: {style}. Between 150 and 160 characters.",
    "Generate a unique meta description for {topic}. Use {style} tone. 150-160 characters.",
    "Craft an engaging meta description covering {topic}. {style} style. 150-160 characters, optimized for search.",
    "Summarize a {style} website about {topic} as a meta description of 150-160 characters.",
];

const SECTION_VARIANTS: &[&str] = &[
    "Write the \"{heading}\" section of a {style} website about {topic}. Length: about {words} words.",
    "Compose comprehensive content about {topic} for the section \"{heading}\". Style: {style}. Length: {words} words.",
    "Draft the section \"{heading}\" for a {style} page on {topic}. Aim for roughly {words} words.",
    "Produce {words} words of {style} content about {topic} under the heading \"{heading}\".",
    "Develop the \"{heading}\" part of a {style} micro-site covering {topic}. Target length: {words} words.",
];

const EMPHASIS_SUFFIXES: &[&str] = &[
    " Focus on innovation.",
    " Emphasize practical aspects.",
    " Highlight cutting-edge developments.",
    " Stress accessibility and clarity.",
    " Showcase real-world impact.",
    " Emphasize technical depth.",
    " Focus on business value.",
    " Highlight emerging trends.",
];

const OUTPUT_ONLY: &str = " Output only the requested text without commentary.";

/// Words requested per section for a given token budget.
pub fn target_word_count(max_tokens: u32) -> u32 {
    max_tokens * 3 / 4
}

/// Builds prompt strings from fixed phrasing pools.
///
/// Every prompt ends with exactly one emphasis suffix; only the choice of
/// suffix is random.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn compose_title_prompt<R: Rng + ?Sized>(
        &self,
        topic: &str,
        style: Style,
        rng: &mut R,
    ) -> String {
        let base = fill(
            pick(TITLE_VARIANTS, rng),
            &[("topic", topic.trim()), ("style", style.as_str())],
        );
        finish(base, rng)
    }

    pub fn compose_meta_prompt<R: Rng + ?Sized>(
        &self,
        topic: &str,
        style: Style,
        rng: &mut R,
    ) -> String {
        let base = fill(
            pick(META_VARIANTS, rng),
            &[("topic", topic.trim()), ("style", style.as_str())],
        );
        finish(base, rng)
    }

    pub fn compose_section_prompt<R: Rng + ?Sized>(
        &self,
        topic: &str,
        style: Style,
        section_type: &SectionType,
        target_word_count: u32,
        rng: &mut R,
    ) -> String {
        let words = target_word_count.to_string();
        let mut base = fill(
            pick(SECTION_VARIANTS, rng),
            &[
                ("topic", topic.trim()),
                ("style", style.as_str()),
                ("heading", &section_type.heading),
                ("words", &words),
            ],
        );
        if let Some(guidance) = section_guidance(&section_type.id) {
            base.push(' ');
            base.push_str(guidance);
        }
        finish(base, rng)
    }
}

fn pick<'a, R: Rng + ?Sized>(pool: &[&'a str], rng: &mut R) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

/// Substitutes `{name}` placeholders in one pass; substituted values are
/// never scanned again.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn finish<R: Rng + ?Sized>(mut prompt: String, rng: &mut R) -> String {
    prompt.push_str(pick(EMPHASIS_SUFFIXES, rng));
    prompt.push_str(OUTPUT_ONLY);
    prompt
}

fn section_guidance(section_id: &str) -> Option<&'static str> {
    let guidance = match section_id {
        "intro" | "overview" => "Set the context for the reader.",
        "fundamentals" => "Keep it clear and accessible.",
        "concepts" => "Explain each concept with a short example.",
        "applications" | "examples" => "Use specific, concrete examples.",
        "challenges" | "troubleshooting" => "Be practical about problems and their solutions.",
        "future" => "Be forward-thinking.",
        "value_prop" | "transformation" => "Be persuasive.",
        "benefits" | "roi" => "Focus on outcomes.",
        "process" => "Be methodical.",
        "architecture" | "implementation" => "Be detailed and specific.",
        "performance" | "scalability" => "Mention measurable trade-offs.",
        "security" => "Cover threats and mitigations.",
        "cta" => "End with a clear call to action.",
        "conclusion" => "Summarize the key takeaways.",
        _ => return None,
    };
    Some(guidance)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn pools_are_large_enough() {
        assert!(TITLE_VARIANTS.len() >= 5);
        assert!(META_VARIANTS.len() >= 5);
        assert!(SECTION_VARIANTS.len() >= 5);
        assert!(EMPHASIS_SUFFIXES.len() >= 8);
    }

    #[test]
    fn word_count_is_three_quarters_of_budget() {
        assert_eq!(target_word_count(800), 600);
        assert_eq!(target_word_count(100), 75);
        assert_eq!(target_word_count(101), 75);
        assert_eq!(target_word_count(2000), 1500);
    }

    #[test]
    fn title_prompt_substitutes_and_always_has_suffix() {
        let composer = PromptComposer;
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let prompt = composer.compose_title_prompt("Edge Computing", Style::Technical, &mut rng);
            assert!(prompt.contains("Edge Computing"));
            assert!(prompt.contains("technical"));
            assert!(!prompt.contains('{'));
            assert!(EMPHASIS_SUFFIXES.iter().any(|s| prompt.contains(s)));
        }
    }

    #[test]
    fn section_prompt_includes_heading_words_and_guidance() {
        let composer = PromptComposer;
        let mut rng = StdRng::seed_from_u64(2);
        let section = SectionType::new("intro", "Introduction");
        let prompt = composer.compose_section_prompt(
            "Rust",
            Style::Educational,
            &section,
            target_word_count(800),
            &mut rng,
        );
        assert!(prompt.contains("Introduction"));
        assert!(prompt.contains("600"));
        assert!(prompt.contains("Set the context for the reader."));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn prompts_vary_across_calls() {
        let composer = PromptComposer;
        let mut rng = StdRng::seed_from_u64(3);
        let titles = (0..20)
            .map(|_| composer.compose_title_prompt("AI", Style::Educational, &mut rng))
            .collect::<HashSet<_>>();
        let metas = (0..20)
            .map(|_| composer.compose_meta_prompt("AI", Style::Educational, &mut rng))
            .collect::<HashSet<_>>();
        assert!(titles.len() > 5);
        assert!(metas.len() > 5);
    }

    #[test]
    fn placeholder_text_inside_a_topic_is_left_alone() {
        let composer = PromptComposer;
        let topic = "Rust {heading} and {style} in {words}";
        let section = SectionType::new("api_integration", "API and Integration");
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..30 {
            let prompt = composer.compose_section_prompt(topic, Style::Technical, &section, 600, &mut rng);
            assert!(prompt.contains(topic), "{prompt}");
            assert!(prompt.contains("600"), "{prompt}");

            let prompt = composer.compose_title_prompt(topic, Style::Marketing, &mut rng);
            assert!(prompt.contains(topic), "{prompt}");
        }
    }

    #[test]
    fn fill_keeps_unknown_and_unclosed_braces() {
        let values = [("topic", "{style}"), ("style", "marketing")];
        assert_eq!(fill("{topic} / {style}", &values), "{style} / marketing");
        assert_eq!(fill("{other} {topic", &values), "{other} {topic");
        assert_eq!(fill("no placeholders", &values), "no placeholders");
    }
}
