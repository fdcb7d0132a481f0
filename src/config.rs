//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MATHMATE__*` 覆盖（双下划线表示嵌套，如 `MATHMATE__WEB__PORT=9000`）。
//! API Key 不在配置中：它只来自用户在页面上的输入。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
    pub web: WebSection,
}

/// [app] 段：页面标题、问候语、示例题目
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub title: String,
    pub greeting: String,
    pub sample_question: String,
    /// 凭证输入框标签
    pub credential_label: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            title: "Text to Math Problem Solver".to_string(),
            greeting: "Hi, I am a Math chatbot who can answer all your maths questions".to_string(),
            sample_question: "Riya has 35 apples. She gives 12 apples to her friend. Later, her uncle gives her 18 more apples. How many apples does Riya have now?".to_string(),
            credential_label: "Groq API Key".to_string(),
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：groq / openai
    pub provider: String,
    pub model: String,
    /// provider 为 openai 时可指定代理地址
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: crate::llm::GROQ_LLAMA_70B.to_string(),
            base_url: None,
            temperature: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "groq".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [agent] 段：ReAct 循环的迭代上限与解析错误策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_iterations: usize,
    /// 解析错误最多回灌次数（handle_parsing_errors 开启时生效）
    pub max_parse_retries: usize,
    /// 单次运行最长耗时（秒）；未设置则不限制
    pub max_execution_secs: Option<u64>,
    pub handle_parsing_errors: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            max_parse_retries: 3,
            max_execution_secs: None,
            handle_parsing_errors: true,
        }
    }
}

/// [tools] 段：工具超时与 Wikipedia 检索参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub wikipedia: WikipediaSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 60,
            wikipedia: WikipediaSection::default(),
        }
    }
}

/// [tools.wikipedia] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikipediaSection {
    /// MediaWiki API 地址；为空时按 lang 拼出 https://{lang}.wikipedia.org/w/api.php
    pub api_url: Option<String>,
    pub lang: String,
    pub top_k_results: usize,
    pub max_result_chars: usize,
    pub timeout_secs: u64,
}

impl Default for WikipediaSection {
    fn default() -> Self {
        Self {
            api_url: None,
            lang: "en".to_string(),
            top_k_results: 3,
            max_result_chars: 4000,
            timeout_secs: 15,
        }
    }
}

impl WikipediaSection {
    pub fn endpoint(&self) -> String {
        match &self.api_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("https://{}.wikipedia.org/w/api.php", self.lang),
        }
    }
}

/// [web] 段：监听地址与会话回收
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub host: String,
    pub port: u16,
    /// 会话空闲多久后回收（秒）；0 表示不按时间回收
    pub session_ttl_secs: u64,
    /// 内存中最多保留的会话数；0 表示不限
    pub max_sessions: usize,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            session_ttl_secs: 3600,
            max_sessions: 1000,
        }
    }
}

/// 从 config 目录加载配置，环境变量 MATHMATE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MATHMATE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MATHMATE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "groq");
        assert_eq!(cfg.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.agent.max_iterations, 15);
        assert!(cfg.agent.handle_parsing_errors);
        assert_eq!(cfg.tools.wikipedia.top_k_results, 3);
        assert_eq!(
            cfg.tools.wikipedia.endpoint(),
            "https://en.wikipedia.org/w/api.php"
        );
        assert!(cfg.app.sample_question.contains("Riya has 35 apples"));
        assert_eq!(cfg.web.session_ttl_secs, 3600);
        assert_eq!(cfg.web.max_sessions, 1000);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[agent]\nmax_iterations = 4\n\n[tools.wikipedia]\nlang = \"de\"\n\n[web]\nport = 9100"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.agent.max_iterations, 4);
        assert_eq!(cfg.agent.max_parse_retries, 3);
        assert_eq!(cfg.tools.wikipedia.endpoint(), "https://de.wikipedia.org/w/api.php");
        assert_eq!(cfg.web.port, 9100);
        assert_eq!(cfg.web.host, "127.0.0.1");
    }
}
