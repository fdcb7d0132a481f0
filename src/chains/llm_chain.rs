//! LlmChain：Prompt 模板 + 一次 LLM 调用，作为一个可调用单元

use std::sync::Arc;

use crate::chains::PromptTemplate;
use crate::llm::LlmClient;
use crate::memory::Message;

/// 推理工具使用的静态 prompt（唯一槽位 `question`）
pub const REASONING_PROMPT: &str = "\
You are an agent tasked for solving user's mathematical questions. Logically arrive at the solutions and provide detailed solution and display it pointwise for the question below
Question:{question}
Answer:
";

pub struct LlmChain {
    llm: Arc<dyn LlmClient>,
    prompt: PromptTemplate,
}

impl LlmChain {
    pub fn new(llm: Arc<dyn LlmClient>, prompt: PromptTemplate) -> Self {
        Self { llm, prompt }
    }

    /// 逐步推理链
    pub fn reasoning(llm: Arc<dyn LlmClient>) -> Self {
        Self::new(llm, PromptTemplate::new(REASONING_PROMPT))
    }

    /// 以单个输入填充模板并调用 LLM，返回原始文本
    pub async fn run(&self, input: &str) -> Result<String, String> {
        let prompt = self.prompt.format_single(input)?;
        let reply = self.llm.complete(&[Message::user(prompt)]).await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_reasoning_fills_question_slot() {
        let llm = Arc::new(MockLlmClient::new(["1. Start with 35\n2. ...\n"]));
        let chain = LlmChain::reasoning(llm.clone());
        let out = chain.run("How many apples?").await.unwrap();
        assert_eq!(out, "1. Start with 35\n2. ...");
        let sent = &llm.calls()[0][0].content;
        assert!(sent.contains("Question:How many apples?\nAnswer:"));
        assert!(sent.starts_with("You are an agent tasked"));
    }

    #[test]
    fn test_reasoning_prompt_has_single_slot() {
        let t = PromptTemplate::new(REASONING_PROMPT);
        assert_eq!(t.input_variables(), &["question".to_string()]);
    }
}
