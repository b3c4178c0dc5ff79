use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt as _;
use tokio::sync::Mutex;

use crate::model::{ColorScheme, Style, TemplateId};

pub const GENERATION_LOG_FILE: &str = "generation_logs.jsonl";
pub const SITE_LOG_FILE: &str = "sites.jsonl";
pub const TOP_TOPICS: usize = 5;

/// One batch request and what came out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationLog {
    pub generation_id: String,
    pub topic: String,
    pub pages_count: u32,
    pub style: Style,
    pub max_tokens: u32,
    pub site_ids: Vec<String>,
    pub failed_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub site_id: String,
    pub generation_id: String,
    pub topic: String,
    pub title: String,
    pub meta_description: String,
    pub section_count: usize,
    pub tokens_used: u64,
    pub template_id: TemplateId,
    pub color_scheme: ColorScheme,
    pub file_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_generations: usize,
    pub total_sites_generated: usize,
    pub top_topics: Vec<TopicCount>,
    pub by_style: BTreeMap<String, usize>,
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn record_generation(&self, log: &GenerationLog) -> anyhow::Result<()>;
    async fn record_site(&self, site: &SiteRecord) -> anyhow::Result<()>;
    /// Most recent first.
    async fn history(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<GenerationLog>>;
    async fn site(&self, site_id: &str) -> anyhow::Result<Option<SiteRecord>>;
    async fn stats(&self) -> anyhow::Result<Stats>;
}

/// Append-only JSON Lines files under a data directory.
#[derive(Debug)]
pub struct LocalFsLogStore {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalFsLogStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn generations_path(&self) -> PathBuf {
        self.base_dir.join(GENERATION_LOG_FILE)
    }

    fn sites_path(&self) -> PathBuf {
        self.base_dir.join(SITE_LOG_FILE)
    }

    async fn append<T: Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(value).context("serialize json")?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.base_dir)
            .await
            .with_context(|| format!("create data dir: {}", self.base_dir.display()))?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("open: {}", path.display()))?;
        file.write_all(&line)
            .await
            .with_context(|| format!("append: {}", path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flush: {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl LogStore for LocalFsLogStore {
    async fn record_generation(&self, log: &GenerationLog) -> anyhow::Result<()> {
        self.append(&self.generations_path(), log)
            .await
            .context("record generation")
    }

    async fn record_site(&self, site: &SiteRecord) -> anyhow::Result<()> {
        self.append(&self.sites_path(), site)
            .await
            .context("record site")
    }

    async fn history(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<GenerationLog>> {
        let logs: Vec<GenerationLog> = read_jsonl(&self.generations_path()).await?;
        Ok(logs.into_iter().rev().skip(offset).take(limit).collect())
    }

    async fn site(&self, site_id: &str) -> anyhow::Result<Option<SiteRecord>> {
        let sites: Vec<SiteRecord> = read_jsonl(&self.sites_path()).await?;
        Ok(sites.into_iter().rev().find(|site| site.site_id == site_id))
    }

    async fn stats(&self) -> anyhow::Result<Stats> {
        let logs: Vec<GenerationLog> = read_jsonl(&self.generations_path()).await?;
        let sites: Vec<SiteRecord> = read_jsonl(&self.sites_path()).await?;

        let mut topics = HashMap::<&str, usize>::new();
        let mut by_style = BTreeMap::<String, usize>::new();
        for log in &logs {
            *topics.entry(log.topic.as_str()).or_default() += 1;
            *by_style.entry(log.style.as_str().to_owned()).or_default() += 1;
        }

        let mut top_topics = topics
            .into_iter()
            .map(|(topic, count)| TopicCount {
                topic: topic.to_owned(),
                count,
            })
            .collect::<Vec<_>>();
        top_topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));
        top_topics.truncate(TOP_TOPICS);

        Ok(Stats {
            total_generations: logs.len(),
            total_sites_generated: sites.len(),
            top_topics,
            by_style,
        })
    }
}

/// Missing file reads as empty; unparseable lines are skipped.
async fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("read: {}", path.display())),
    };

    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => out.push(value),
            Err(err) => {
                tracing::warn!(path = %path.display(), line = idx + 1, %err, "skip bad log line");
            }
        }
    }
    Ok(out)
}
