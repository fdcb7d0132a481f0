//! Calculator 工具：把数学问题交给 MathChain（LLM 出表达式、本地求值）

use std::sync::Arc;

use async_trait::async_trait;

use crate::chains::MathChain;
use crate::llm::LlmClient;
use crate::tools::{Tool, ToolKind};

pub struct CalculatorTool {
    chain: MathChain,
}

impl CalculatorTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            chain: MathChain::new(llm),
        }
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Calculator
    }

    async fn execute(&self, input: &str) -> Result<String, String> {
        self.chain.run(input).await
    }
}
