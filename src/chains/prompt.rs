//! Prompt 模板：`{name}` 形式的命名槽位
//!
//! 构造时解析出全部槽位名；format 时要求每个槽位都有取值，缺失即报错，多余的键被忽略。

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn slot_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid slot regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    /// 从模板文本解析槽位（按首次出现顺序，去重）
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut input_variables: Vec<String> = Vec::new();
        for cap in slot_regex().captures_iter(&template) {
            let name = cap[1].to_string();
            if !input_variables.contains(&name) {
                input_variables.push(name);
            }
        }
        Self {
            template,
            input_variables,
        }
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    pub fn format(&self, values: &HashMap<&str, &str>) -> Result<String, String> {
        if let Some(missing) = self
            .input_variables
            .iter()
            .find(|v| !values.contains_key(v.as_str()))
        {
            return Err(format!("Missing value for prompt variable '{}'", missing));
        }
        let out = slot_regex().replace_all(&self.template, |cap: &regex::Captures| {
            values
                .get(&cap[1])
                .map(|v| v.to_string())
                .unwrap_or_else(|| cap[0].to_string())
        });
        Ok(out.into_owned())
    }

    /// 单槽位模板的便捷写法
    pub fn format_single(&self, value: &str) -> Result<String, String> {
        match self.input_variables.as_slice() {
            [only] => {
                let mut values = HashMap::new();
                values.insert(only.as_str(), value);
                self.format(&values)
            }
            vars => Err(format!(
                "Template expects exactly one variable, found {}",
                vars.len()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_variables_once() {
        let t = PromptTemplate::new("Q:{question}\nAgain {question} and {tools}");
        assert_eq!(t.input_variables(), &["question".to_string(), "tools".to_string()]);
    }

    #[test]
    fn test_format_missing_variable() {
        let t = PromptTemplate::new("{a} {b}");
        let mut v = HashMap::new();
        v.insert("a", "1");
        assert!(t.format(&v).unwrap_err().contains("'b'"));
    }

    #[test]
    fn test_value_with_braces_is_not_reexpanded() {
        let t = PromptTemplate::new("Question:{question}\nAnswer:");
        assert_eq!(
            t.format_single("what is {x}?").unwrap(),
            "Question:what is {x}?\nAnswer:"
        );
    }
}
