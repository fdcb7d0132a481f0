//! Chain 层：Prompt 模板 + LLM 调用组成的可调用单元（推理链、数学链）

pub mod llm_chain;
pub mod math;
pub mod prompt;

pub use llm_chain::{LlmChain, REASONING_PROMPT};
pub use math::{evaluate_expression, MathChain, MATH_PROMPT};
pub use prompt::PromptTemplate;
