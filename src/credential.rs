//! 凭证闸门：没有 API Key 就不构建任何组件、不发出任何网络请求
//!
//! 只校验非空；Key 是否有效由下游 LLM 调用失败时体现。

use std::fmt;

/// 缺少凭证时展示给用户的提示
pub const MISSING_CREDENTIAL_NOTICE: &str = "Please add your Groq API key to continue";

/// 用户提供的 API Key；Debug / Display 不泄露内容
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// 闸门未通过时的提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateNotice(pub &'static str);

impl fmt::Display for GateNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// 检查输入：缺失或空串即拦截；其余原样作为 Key
pub fn check(input: Option<&str>) -> Result<ApiKey, GateNotice> {
    match input {
        Some(key) if !key.is_empty() => Ok(ApiKey(key.to_string())),
        _ => Err(GateNotice(MISSING_CREDENTIAL_NOTICE)),
    }
}
