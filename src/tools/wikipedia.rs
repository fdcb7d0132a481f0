//! Wikipedia 工具：百科检索摘要
//!
//! 先用 MediaWiki `list=search` 取前 top_k 个页面标题，再用 `prop=extracts` 取纯文本导语；
//! 每页输出 `Page: <title>\nSummary: <text>`，页之间空一行，总长度超过 max_result_chars 时截断。
//! 网络或 HTTP 错误直接返回 Err，不在本地重试。

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use serde::Deserialize;

use crate::config::WikipediaSection;
use crate::tools::{Tool, ToolKind};

/// 查询串最大长度（超出部分截掉）
const MAX_QUERY_CHARS: usize = 300;

pub const NO_RESULT: &str = "No good Wikipedia Search Result was found";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
}

/// 搜索结果 snippet 带 `<span class="searchmatch">` 等标记，转为纯文本；转换失败时保留原文
fn snippet_to_text(snippet: &str) -> String {
    let text = match from_read(snippet.as_bytes(), 10_000) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => snippet.to_string(),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

/// 格式化单页结果
fn format_page(title: &str, summary: &str) -> String {
    format!("Page: {}\nSummary: {}", title, summary.trim())
}

pub struct WikipediaTool {
    client: Client,
    endpoint: String,
    top_k_results: usize,
    max_result_chars: usize,
}

impl WikipediaTool {
    pub fn new(cfg: &WikipediaSection) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .user_agent(concat!("mathmate/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint(),
            top_k_results: cfg.top_k_results.max(1),
            max_result_chars: cfg.max_result_chars,
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, String> {
        let limit = self.top_k_results.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        Ok(body.query.map(|q| q.search).unwrap_or_default())
    }

    /// 页面导语纯文本；页面不存在返回 None
    async fn extract(&self, title: &str) -> Result<Option<String>, String> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body: ExtractResponse = resp
            .json()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        Ok(body
            .query
            .and_then(|q| q.pages.into_iter().next())
            .filter(|p| !p.missing)
            .and_then(|p| p.extract)
            .filter(|e| !e.trim().is_empty()))
    }

    pub async fn run(&self, query: &str) -> Result<String, String> {
        let query = truncate_chars(query.trim(), MAX_QUERY_CHARS);
        if query.is_empty() {
            return Ok(NO_RESULT.to_string());
        }
        let hits = self.search(&query).await?;
        let mut summaries = Vec::with_capacity(hits.len());
        for hit in hits.iter().take(self.top_k_results) {
            let summary = match self.extract(&hit.title).await? {
                Some(extract) => extract,
                None => snippet_to_text(&hit.snippet),
            };
            if summary.trim().is_empty() {
                continue;
            }
            summaries.push(format_page(&hit.title, &summary));
        }
        if summaries.is_empty() {
            return Ok(NO_RESULT.to_string());
        }
        Ok(truncate_chars(&summaries.join("\n\n"), self.max_result_chars))
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Wikipedia
    }

    async fn execute(&self, input: &str) -> Result<String, String> {
        tracing::info!(query = %input, "wikipedia lookup");
        self.run(input).await
    }
}
