//! Reasoning 工具：逐步推理链（静态 prompt，唯一槽位 question）

use std::sync::Arc;

use async_trait::async_trait;

use crate::chains::LlmChain;
use crate::llm::LlmClient;
use crate::tools::{Tool, ToolKind};

pub struct ReasoningTool {
    chain: LlmChain,
}

impl ReasoningTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            chain: LlmChain::reasoning(llm),
        }
    }
}

#[async_trait]
impl Tool for ReasoningTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Reasoning
    }

    async fn execute(&self, input: &str) -> Result<String, String> {
        self.chain.run(input).await
    }
}
