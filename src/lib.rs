//! Mathmate - 文字数学题求解助手
//!
//! 模块划分：
//! - **agent**: 编排器接口、工厂与按配置组装
//! - **chains**: Prompt 模板、推理链、数学链（LLM 翻译 + 本地求值）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、解析错误恢复、单次交互状态机
//! - **credential**: API Key 闸门
//! - **llm**: LLM 客户端抽象与实现（Groq / OpenAI 兼容 / Mock）
//! - **memory**: 会话记录与 ReAct 中间步骤
//! - **react**: Planner、事件、ReAct 主循环
//! - **session**: 会话对象（问候、提交、追加记录）
//! - **tools**: Wikipedia / Calculator / Reasoning 工具与执行器
//! - **web**: 浏览器界面与 HTTP API

pub mod agent;
pub mod chains;
pub mod config;
pub mod core;
pub mod credential;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod session;
pub mod tools;
pub mod web;
