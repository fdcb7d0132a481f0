//! 工具箱：Wikipedia / Calculator / Reasoning 三种工具、注册表与带超时的执行器

pub mod calculator;
pub mod executor;
pub mod reasoning;
pub mod registry;
pub mod wikipedia;

use std::sync::Arc;

use crate::config::ToolsSection;
use crate::llm::LlmClient;

pub use calculator::CalculatorTool;
pub use executor::ToolExecutor;
pub use reasoning::ReasoningTool;
pub use registry::{Tool, ToolKind, ToolRegistry};
pub use wikipedia::WikipediaTool;

/// 构建默认注册表：Wikipedia、Calculator、Reasoning（顺序即 prompt 中的顺序）
pub fn default_registry(llm: Arc<dyn LlmClient>, cfg: &ToolsSection) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(WikipediaTool::new(&cfg.wikipedia));
    tools.register(CalculatorTool::new(llm.clone()));
    tools.register(ReasoningTool::new(llm));
    tools
}
