use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{LanguageModel, ModelError, ModelReply, ModelRequest};
use crate::config::Config;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Anthropic Messages API client.
pub struct ClaudeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.llm_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.claude_api_url.trim_end_matches('/').to_string(),
            api_key: config.claude_api_key.clone(),
            model: config.claude_model.clone(),
        })
    }

    fn build_body(&self, request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": request.messages,
        });

        if let Some(tool) = &request.tool {
            body["tools"] = json!([tool]);
            body["tool_choice"] = json!({ "type": "auto" });
        }

        body
    }
}

fn parse_response(body: Value, tool_name: Option<&str>) -> Result<ModelReply, ModelError> {
    let response: MessagesResponse =
        serde_json::from_value(body).map_err(|e| ModelError::Malformed(e.to_string()))?;

    let mut reply = ModelReply::default();
    for block in response.content {
        match block {
            ContentBlock::Text { text } => reply.text.push_str(&text),
            ContentBlock::ToolUse { name, input } => {
                if reply.tool_input.is_none() && Some(name.as_str()) == tool_name {
                    reply.tool_input = Some(input);
                }
            }
            ContentBlock::Other => {}
        }
    }

    if response.stop_reason.as_deref() == Some("max_tokens") {
        tracing::warn!("Model reply was cut off at max_tokens");
    }

    reply.text = reply.text.trim().to_string();
    Ok(reply)
}

#[async_trait]
impl LanguageModel for ClaudeClient {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.build_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }

        let body: Value = response.json().await?;
        parse_response(body, request.tool.as_ref().map(|t| t.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::llm::{ChatMessage, ToolSpec};

    fn client() -> ClaudeClient {
        ClaudeClient {
            client: reqwest::Client::new(),
            base_url: "https://api.anthropic.com".into(),
            api_key: "key".into(),
            model: "claude-test".into(),
        }
    }

    fn request(tool: Option<ToolSpec>) -> ModelRequest {
        ModelRequest {
            system: "persona".into(),
            messages: vec![ChatMessage::user("first"), ChatMessage::assistant("reply"), ChatMessage::user("second")],
            tool,
            max_tokens: 256,
        }
    }

    fn tool() -> ToolSpec {
        ToolSpec {
            name: "record_daily_log".into(),
            description: "d".into(),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn test_body_keeps_message_order_and_system() {
        let body = client().build_body(&request(None));
        assert_eq!(body["system"], "persona");
        assert_eq!(body["model"], "claude-test");
        let contents: Vec<_> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(contents, vec!["first", "reply", "second"]);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_body_includes_tool_schema() {
        let body = client().build_body(&request(Some(tool())));
        assert_eq!(body["tools"][0]["name"], "record_daily_log");
        assert_eq!(body["tool_choice"]["type"], "auto");
    }

    #[test]
    fn test_parse_text_and_tool_use() {
        let body = json!({
            "content": [
                {"type": "text", "text": "Sounds like a good day! "},
                {"type": "tool_use", "id": "t1", "name": "record_daily_log", "input": {"mood_score": 8}}
            ],
            "stop_reason": "tool_use"
        });
        let reply = parse_response(body, Some("record_daily_log")).unwrap();
        assert_eq!(reply.text, "Sounds like a good day!");
        assert_eq!(reply.tool_input.unwrap()["mood_score"], 8);
    }

    #[test]
    fn test_parse_ignores_other_tools_and_blocks() {
        let body = json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "tool_use", "id": "t1", "name": "something_else", "input": {}},
                {"type": "text", "text": "hello"}
            ]
        });
        let reply = parse_response(body, Some("record_daily_log")).unwrap();
        assert_eq!(reply.text, "hello");
        assert!(reply.tool_input.is_none());
    }

    #[test]
    fn test_parse_rejects_missing_content() {
        let result = parse_response(json!({"error": "nope"}), None);
        assert!(matches!(result, Err(ModelError::Malformed(_))));
    }

    #[test]
    fn test_new_uses_config_timeout() {
        let config = Config {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            cors_extra_origins: Vec::new(),
            jwt_secret: "s".into(),
            jwt_access_ttl_secs: 900,
            claude_api_key: "k".into(),
            claude_api_url: "http://localhost:9999/".into(),
            claude_model: "m".into(),
            llm_timeout: Duration::from_secs(1),
            llm_max_tokens: 64,
            llm_structured_output: true,
            chat_rate_limit_per_min: 30,
        };
        let client = ClaudeClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
