use futures::StreamExt;
use serde::{Deserialize, Serialize};

const GROQ_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

type ApiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) tools: Vec<ToolSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tool_choice: Option<String>,
    pub(crate) stream: bool,
    pub(crate) max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    pub(crate) fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub(crate) fn assistant_text(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }

    pub(crate) fn assistant_turn(turn: &AssistantTurn) -> Self {
        let tool_calls: Vec<ToolCallPayload> = turn
            .tool_calls
            .iter()
            .map(|call| ToolCallPayload {
                id: call.id.clone(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            })
            .collect();

        Self {
            role: "assistant".to_string(),
            content: if turn.content.is_empty() {
                None
            } else {
                Some(turn.content.clone())
            },
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
        }
    }

    pub(crate) fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ToolCallPayload {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FunctionCall {
    pub(crate) name: String,
    pub(crate) arguments: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolSpec {
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    pub(crate) function: FunctionSpec,
}

#[derive(Debug, Serialize)]
pub(crate) struct FunctionSpec {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) parameters: serde_json::Value,
}

/// One finished assistant reply, assembled from a streamed response or
/// taken directly from a non-streamed one.
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl AssistantTurn {
    fn apply(&mut self, delta: ChunkDelta) {
        if let Some(text) = delta.content {
            self.content.push_str(&text);
        }

        for call in delta.tool_calls.unwrap_or_default() {
            if call.index >= self.tool_calls.len() {
                self.tool_calls
                    .resize_with(call.index + 1, ToolCallRequest::default);
            }
            let slot = &mut self.tool_calls[call.index];
            if let Some(id) = call.id {
                slot.id = id;
            }
            if let Some(function) = call.function {
                if let Some(name) = function.name {
                    slot.name = name;
                }
                if let Some(arguments) = function.arguments {
                    slot.arguments.push_str(&arguments);
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallPayload>>,
}

/// A chat-completions backend. The agent loop talks to the hosted model
/// through this seam so tests can script replies without a network.
pub(crate) trait ModelClient {
    async fn chat(
        &self,
        request: &ChatRequest,
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> ApiResult<AssistantTurn>;
}

pub(crate) struct GroqClient {
    http: reqwest::Client,
    api_key: String,
}

impl GroqClient {
    pub(crate) fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

impl ModelClient for GroqClient {
    async fn chat(
        &self,
        request: &ChatRequest,
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> ApiResult<AssistantTurn> {
        let response = self
            .http
            .post(GROQ_CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(format!("API error: {} - {}", status, error_text).into());
        }

        if !request.stream {
            let body: ChatResponse = response.json().await?;
            let message = body
                .choices
                .into_iter()
                .next()
                .ok_or("API response contained no choices")?
                .message;
            let turn = AssistantTurn {
                content: message.content.unwrap_or_default(),
                tool_calls: message
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|call| ToolCallRequest {
                        id: call.id,
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect(),
            };
            if !turn.content.is_empty() {
                on_token(&turn.content);
            }
            return Ok(turn);
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut turn = AssistantTurn::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let chunk = String::from_utf8_lossy(&chunk);
            if chunk.contains('\r') {
                buffer.push_str(&chunk.replace("\r\n", "\n"));
            } else {
                buffer.push_str(&chunk);
            }

            while let Some(idx) = buffer.find("\n\n") {
                let raw_event = buffer[..idx].to_string();
                buffer = buffer[idx + 2..].to_string();

                let Some(data) = extract_sse_data(&raw_event) else {
                    continue;
                };
                if data == "[DONE]" {
                    continue;
                }

                if let Ok(parsed) = serde_json::from_str::<ChatChunk>(&data) {
                    for choice in parsed.choices {
                        if let Some(text) = &choice.delta.content {
                            if !text.is_empty() {
                                on_token(text);
                            }
                        }
                        turn.apply(choice.delta);
                    }
                }
            }
        }

        Ok(turn)
    }
}

fn extract_sse_data(raw: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(data) = line.strip_prefix("data:") {
            data_lines.push(data.trim_start().to_string());
        }
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delta(value: serde_json::Value) -> ChunkDelta {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn extract_sse_data_joins_data_lines() {
        let raw = ": comment\ndata: {\"a\":\ndata: 1}";
        assert_eq!(extract_sse_data(raw).as_deref(), Some("{\"a\":\n1}"));
        assert_eq!(extract_sse_data(": comment only"), None);
    }

    #[test]
    fn assistant_turn_accumulates_content_deltas() {
        let mut turn = AssistantTurn::default();
        turn.apply(delta(json!({"content": "The answer "})));
        turn.apply(delta(json!({"content": "is 4."})));

        assert_eq!(turn.content, "The answer is 4.");
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn assistant_turn_merges_fragmented_tool_call_deltas() {
        let mut turn = AssistantTurn::default();
        turn.apply(delta(json!({
            "tool_calls": [{
                "index": 0,
                "id": "call_1",
                "function": {"name": "search", "arguments": "{\"que"}
            }]
        })));
        turn.apply(delta(json!({
            "tool_calls": [{
                "index": 0,
                "function": {"arguments": "ry\":\"rust\"}"}
            }]
        })));

        assert_eq!(turn.tool_calls.len(), 1);
        let call = &turn.tool_calls[0];
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "search");
        assert_eq!(call.arguments, "{\"query\":\"rust\"}");
    }

    #[test]
    fn tool_result_message_serializes_with_role_and_call_id() {
        let message = ChatMessage::tool_result("call_1", "found it");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({"role": "tool", "content": "found it", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn assistant_turn_message_carries_tool_calls() {
        let turn = AssistantTurn {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "call_9".to_string(),
                name: "wikipedia".to_string(),
                arguments: "{\"query\":\"Rust\"}".to_string(),
            }],
        };

        let value = serde_json::to_value(ChatMessage::assistant_turn(&turn)).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value.get("content").is_none());
        assert_eq!(value["tool_calls"][0]["id"], "call_9");
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "wikipedia");
    }
}
