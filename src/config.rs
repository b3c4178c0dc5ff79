use anyhow::Context as _;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
        let base_url = std::env::var("SITEGEN_OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let model =
            std::env::var("SITEGEN_OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        let timeout_secs = match std::env::var("SITEGEN_OPENAI_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().with_context(|| {
                format!("invalid SITEGEN_OPENAI_TIMEOUT_SECS={raw:?}. expected seconds")
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Self::new(base_url, api_key, model, timeout_secs)
    }

    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let base_url = base_url.trim().to_owned();
        let url = url::Url::parse(&base_url)
            .with_context(|| format!("invalid OpenAI base url: {base_url}"))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("OpenAI base url scheme must be http/https: {base_url}");
        }

        let api_key = api_key.trim().to_owned();
        if api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY is empty");
        }
        let model = model.trim().to_owned();
        if model.is_empty() {
            anyhow::bail!("OpenAI model is empty");
        }
        if timeout_secs == 0 {
            anyhow::bail!("OpenAI timeout must be > 0 seconds");
        }

        Ok(Self {
            base_url,
            api_key,
            model,
            timeout_secs,
        })
    }
}
