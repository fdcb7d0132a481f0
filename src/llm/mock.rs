//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序回放预置输出，并记录每次收到的消息，便于断言 prompt 内容与调用次数。
//! 预置输出耗尽后返回 fallback（默认是一个 Final Answer）。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;

enum Scripted {
    Reply(String),
    Fail(String),
}

/// Mock 客户端：脚本化回复 + 调用记录
pub struct MockLlmClient {
    script: Mutex<VecDeque<Scripted>>,
    fallback: String,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl MockLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(replies.into_iter().map(|r| Scripted::Reply(r.into())).collect()),
            fallback: "Final Answer: (mock)".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// 追加一次失败（模拟网络 / 鉴权错误）
    pub fn then_fail(self, err: impl Into<String>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Scripted::Fail(err.into()));
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 所有调用收到的消息
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Scripted::Reply(r)) => Ok(r),
            Some(Scripted::Fail(e)) => Err(e),
            None => Ok(self.fallback.clone()),
        }
    }
}
