//! 工具注册表
//!
//! 工具集合是封闭的三种（Wikipedia / Calculator / Reasoning），由 ToolKind 枚举表示；
//! 每个实现都满足同一个能力：输入一段文本、返回一段文本。
//! ToolRegistry 按注册顺序保存，生成 prompt 时工具顺序稳定。

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// 封闭的工具种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Wikipedia,
    Calculator,
    Reasoning,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Wikipedia, ToolKind::Calculator, ToolKind::Reasoning];

    /// 工具名称（LLM 在 `Action:` 中引用的名字）
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Wikipedia => "Wikipedia",
            ToolKind::Calculator => "Calculator",
            ToolKind::Reasoning => "Reasoning",
        }
    }

    /// 工具描述（供 LLM 判断适用场景）
    pub fn description(self) -> &'static str {
        match self {
            ToolKind::Wikipedia => {
                "A tool for searching the internet to find the various info on the topics mentioned."
            }
            ToolKind::Calculator => {
                "A tool for answering math related questions. ONly input mathematical expressions."
            }
            ToolKind::Reasoning => "A tool for answering logic based and reasoning questions.",
        }
    }

    /// 按名称解析；忽略大小写与首尾空白、反引号
    pub fn from_name(name: &str) -> Option<ToolKind> {
        let name = name.trim().trim_matches('`').trim();
        ToolKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 工具 trait：种类（决定名称与描述）+ 异步执行（文本进、文本出）
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn name(&self) -> &str {
        self.kind().name()
    }

    fn description(&self) -> &str {
        self.kind().description()
    }

    /// 执行工具
    async fn execute(&self, input: &str) -> Result<String, String>;
}

/// 工具注册表：按注册顺序存储 Arc<dyn Tool>，同一种类重复注册时替换旧实现
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.kind() == tool.kind()) {
            Some(i) => self.tools[i] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.kind() == kind).cloned()
    }

    /// 按名称查找（LLM 输出中的工具名）
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        ToolKind::from_name(name).and_then(|k| self.get(k))
    }

    pub async fn execute(&self, kind: ToolKind, input: &str) -> Result<String, String> {
        let tool = self
            .get(kind)
            .ok_or_else(|| format!("Unknown tool: {}", kind))?;
        tool.execute(input).await
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// 返回 (name, description) 列表，用于生成 prompt 中的工具段落
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.tools
            .iter()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(ToolKind, &'static str);

    #[async_trait]
    impl Tool for Fixed {
        fn kind(&self) -> ToolKind {
            self.0
        }

        async fn execute(&self, _input: &str) -> Result<String, String> {
            Ok(self.1.to_string())
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ToolKind::from_name("calculator"), Some(ToolKind::Calculator));
        assert_eq!(ToolKind::from_name(" `Wikipedia` "), Some(ToolKind::Wikipedia));
        assert_eq!(ToolKind::from_name("Search"), None);
    }

    #[tokio::test]
    async fn test_registration_order_and_replace() {
        let mut reg = ToolRegistry::new();
        reg.register(Fixed(ToolKind::Wikipedia, "w1"));
        reg.register(Fixed(ToolKind::Calculator, "c"));
        reg.register(Fixed(ToolKind::Wikipedia, "w2"));
        assert_eq!(reg.tool_names(), vec!["Wikipedia", "Calculator"]);
        assert_eq!(reg.execute(ToolKind::Wikipedia, "x").await.unwrap(), "w2");
        assert!(reg.execute(ToolKind::Reasoning, "x").await.is_err());
        assert!(reg.lookup("CALCULATOR").is_some());
    }
}
