//! Wikipedia 工具对本地 MediaWiki 替身的集成测试

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{extract::Query, routing::get, Json, Router};
    use mathmate::agent::{build_agent, Orchestrator};
    use mathmate::config::{AppConfig, WikipediaSection};
    use mathmate::llm::MockLlmClient;
    use mathmate::memory::Message;
    use mathmate::tools::{
        wikipedia::NO_RESULT, CalculatorTool, ReasoningTool, Tool, ToolRegistry, WikipediaTool,
    };
    use serde_json::{json, Value};

    async fn fake_api(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        if q.get("list").map(String::as_str) == Some("search") {
            let term = q.get("srsearch").cloned().unwrap_or_default().to_lowercase();
            if !term.contains("penicillin") {
                return Json(json!({ "query": { "search": [] } }));
            }
            return Json(json!({
                "query": { "search": [
                    { "title": "Penicillin", "snippet": "<span class=\"searchmatch\">Penicillin</span> antibiotics" },
                    { "title": "Alexander Fleming", "snippet": "Scottish physician" }
                ]}
            }));
        }
        let title = q.get("titles").cloned().unwrap_or_default();
        let page = match title.as_str() {
            "Penicillin" => json!({ "title": title, "extract": "Penicillins are a group of antibiotics discovered by Alexander Fleming in 1928." }),
            _ => json!({ "title": title, "missing": true }),
        };
        Json(json!({ "query": { "pages": [page] } }))
    }

    async fn spawn_fake_wiki() -> String {
        let app = Router::new().route("/w/api.php", get(fake_api));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/w/api.php", addr)
    }

    fn section(url: String) -> WikipediaSection {
        WikipediaSection {
            api_url: Some(url),
            ..WikipediaSection::default()
        }
    }

    #[tokio::test]
    async fn test_summaries_from_search_and_extracts() {
        let tool = WikipediaTool::new(&section(spawn_fake_wiki().await));
        let out = tool.execute("who discovered penicillin").await.unwrap();
        assert_eq!(
            out,
            "Page: Penicillin\nSummary: Penicillins are a group of antibiotics discovered by Alexander Fleming in 1928.\n\n\
             Page: Alexander Fleming\nSummary: Scottish physician"
        );
    }

    #[tokio::test]
    async fn test_no_hits_and_truncation() {
        let url = spawn_fake_wiki().await;
        let tool = WikipediaTool::new(&section(url.clone()));
        assert_eq!(tool.execute("zzzz nothing").await.unwrap(), NO_RESULT);

        let short = WikipediaTool::new(&WikipediaSection {
            max_result_chars: 20,
            ..section(url)
        });
        let out = short.execute("penicillin").await.unwrap();
        assert_eq!(out.chars().count(), 20);
        assert!(out.starts_with("Page: Penicillin"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let tool = WikipediaTool::new(&WikipediaSection {
            timeout_secs: 2,
            ..section("http://127.0.0.1:9/w/api.php".to_string())
        });
        assert!(tool.execute("penicillin").await.is_err());
    }

    #[tokio::test]
    async fn test_penicillin_question_uses_wikipedia() {
        let url = spawn_fake_wiki().await;
        let llm = Arc::new(MockLlmClient::new([
            "I should look this up.\nAction: Wikipedia\nAction Input: penicillin",
            "I now know the final answer\nFinal Answer: Alexander Fleming discovered penicillin in 1928.",
        ]));
        let mut cfg = AppConfig::default();
        cfg.tools.wikipedia = section(url);

        let mut registry = ToolRegistry::new();
        registry.register(WikipediaTool::new(&cfg.tools.wikipedia));
        registry.register(CalculatorTool::new(llm.clone()));
        registry.register(ReasoningTool::new(llm.clone()));
        let agent = build_agent(&cfg, llm.clone(), registry);

        let reply = agent
            .respond(&[Message::user("Who discovered penicillin?")], None)
            .await
            .unwrap();
        assert!(reply.contains("Alexander Fleming"));
        let second = &llm.calls()[1][0].content;
        assert!(second.contains("Observation: Page: Penicillin\nSummary: Penicillins are"));
    }
}
