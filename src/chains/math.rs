//! MathChain：LLM 把文字题翻译成单行表达式，本地用 evalexpr 求值
//!
//! LLM 输出约定：
//! - ```` ```text\n<expr>\n``` ```` → 本地求值，返回 `Answer: <value>`
//! - 以 `Answer:` 开头 → 原样返回（题目无需计算时）
//! - 其它 → 错误 "unknown format from LLM"
//!
//! 求值前整数字面量统一转为浮点，避免 `7 / 2` 按整数除法得到 3。

use std::sync::{Arc, OnceLock};

use evalexpr::Value;
use regex::Regex;

use crate::chains::PromptTemplate;
use crate::llm::LlmClient;
use crate::memory::Message;

pub const MATH_PROMPT: &str = "\
Translate a math problem into a single-line expression that a calculator can evaluate. \
Supported: numbers, + - * / % ^ (power), parentheses, math::sqrt(x), floor(x), round(x). \
Use the result of evaluating the expression to answer the question.

Question: the math problem
```text
single line expression that solves the problem
```
...evaluating...
```output
result of the evaluation
```
Answer: the answer

Begin.

Question: What is 37593 * 67?
```text
37593 * 67
```
...evaluating...
```output
2518731
```
Answer: 2518731

Question: 37593 to the power of one fifth
```text
37593 ^ (1 / 5)
```
...evaluating...
```output
8.222831614237718
```
Answer: 8.222831614237718

Question: {question}
";

fn text_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```text\s*(.*?)```").expect("valid text block regex"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b\d+(?:\.\d+)?(?:[eE][+-]?\d+)?\b").expect("valid number regex")
    })
}

fn thousands_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d),(\d{3})\b").expect("valid thousands regex"))
}

fn bare_sqrt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|[^:\w])sqrt\(").expect("valid sqrt regex"))
}

/// `.5` 这类省略整数部分的小数
fn leading_dot_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|[^\w.])\.(\d)").expect("valid leading dot regex"))
}

fn pi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bpi\b").expect("valid pi regex"))
}

/// 把常见的 Python / numexpr 写法归一到 evalexpr 语法，并把整数字面量转为浮点
fn normalize_expression(expr: &str) -> String {
    let expr = expr.trim().trim_matches('`').trim();
    let expr = expr.replace("**", "^");
    let mut expr = expr;
    // "1,000,000" 需要多次替换才能去掉所有分隔符
    while thousands_regex().is_match(&expr) {
        expr = thousands_regex().replace_all(&expr, "$1$2").into_owned();
    }
    let expr = leading_dot_regex().replace_all(&expr, "${1}0.$2");
    let expr = pi_regex().replace_all(&expr, "3.141592653589793");
    let expr = bare_sqrt_regex().replace_all(&expr, "${1}math::sqrt(");
    number_regex()
        .replace_all(&expr, |cap: &regex::Captures| {
            let n = &cap[0];
            if n.contains(|c: char| c == '.' || c == 'e' || c == 'E') {
                n.to_string()
            } else {
                format!("{}.0", n)
            }
        })
        .into_owned()
}

fn format_number(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        x.to_string()
    }
}

/// 对单行表达式求值，返回文本结果
pub fn evaluate_expression(expr: &str) -> Result<String, String> {
    let normalized = normalize_expression(expr);
    if normalized.is_empty() {
        return Err("Empty expression".to_string());
    }
    let value = evalexpr::eval(&normalized)
        .map_err(|e| format!("Failed to evaluate \"{}\": {}", expr.trim(), e))?;
    match value {
        Value::Float(f) if f.is_finite() => Ok(format_number(f)),
        Value::Float(f) => Err(format!("Expression \"{}\" is not finite ({})", expr.trim(), f)),
        Value::Int(i) => Ok(i.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        other => Err(format!(
            "Expression \"{}\" did not produce a number: {}",
            expr.trim(),
            other
        )),
    }
}

pub struct MathChain {
    llm: Arc<dyn LlmClient>,
    prompt: PromptTemplate,
}

impl MathChain {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            prompt: PromptTemplate::new(MATH_PROMPT),
        }
    }

    pub async fn run(&self, question: &str) -> Result<String, String> {
        let prompt = self.prompt.format_single(question)?;
        let reply = self.llm.complete(&[Message::user(prompt)]).await?;
        process_llm_output(&reply)
    }
}

/// 解析 LLM 输出：text 块求值 / 直接 Answer / 未知格式
pub fn process_llm_output(output: &str) -> Result<String, String> {
    // LLM 有时会自己续写 ```output 段，只看其之前的部分
    let output = output.split("```output").next().unwrap_or(output).trim();

    if let Some(cap) = text_block_regex().captures(output) {
        let expr = cap[1].trim();
        tracing::debug!(expression = %expr, "math chain evaluating");
        let result = evaluate_expression(expr)?;
        return Ok(format!("Answer: {}", result));
    }
    if output.starts_with("Answer:") {
        return Ok(output.to_string());
    }
    if let Some((_, answer)) = output.split_once("Answer:") {
        return Ok(format!("Answer: {}", answer.trim()));
    }
    Err(format!("unknown format from LLM: {}", output))
}
