use crate::ai_sdk::{
    AssistantTurn, ChatMessage, ChatRequest, FunctionSpec, GroqClient, ModelClient, ToolSpec,
};
use crate::protocol::StreamEvent;
use crate::tools::{ToolDefinition, get_all_tools};
use crate::transcript::{ChatTurn, Role};

const MODEL: &str = "llama3-8b-8192";
const MAX_TOKENS: u32 = 1024;
const MAX_STEPS: usize = 15;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that can search the web. \
Use the search tool for general and current-events questions, the arxiv tool for academic \
papers, and the wikipedia tool for people, places, and general knowledge. Call a tool when \
you need outside information, then answer in plain language based on what you found.";

const STEP_LIMIT_ANSWER: &str =
    "I stopped before reaching a final answer because the step limit was hit. \
Try asking a more specific question.";

type AgentResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// The per-turn reasoning wrapper: one hosted-model client, the fixed tool
/// set, and the loop policy knobs. Built fresh for every user turn from the
/// key the page sent, never cached.
pub struct Agent<C = GroqClient> {
    client: C,
    model: String,
    stream: bool,
    max_steps: usize,
    recover_parse_errors: bool,
    tools: Vec<ToolDefinition>,
}

impl Agent<GroqClient> {
    pub fn new(api_key: String) -> Self {
        Self::with_client(GroqClient::new(api_key))
    }
}

impl<C: ModelClient> Agent<C> {
    fn with_client(client: C) -> Self {
        Self {
            client,
            model: MODEL.to_string(),
            stream: true,
            max_steps: MAX_STEPS,
            recover_parse_errors: true,
            tools: get_all_tools(),
        }
    }

    /// Drive the reasoning loop over the full transcript. Intermediate
    /// steps surface through `on_event` as they happen; the return value is
    /// the final answer text, never empty on success.
    pub(crate) async fn run_agent(
        &self,
        transcript: &[ChatTurn],
        on_event: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> AgentResult<String> {
        let mut conversation = vec![ChatMessage::system(SYSTEM_PROMPT)];
        for turn in transcript {
            conversation.push(match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant_text(turn.content.clone()),
            });
        }

        for step in 0..self.max_steps {
            tracing::debug!(step, "running model inference");

            let request = ChatRequest {
                model: self.model.clone(),
                messages: conversation.clone(),
                tools: self.tool_specs(),
                tool_choice: Some("auto".to_string()),
                stream: self.stream,
                max_tokens: MAX_TOKENS,
            };

            let mut forward = |text: &str| {
                on_event(StreamEvent::Token {
                    text: text.to_string(),
                })
            };
            let turn = self.client.chat(&request, &mut forward).await?;

            conversation.push(ChatMessage::assistant_turn(&turn));

            if turn.tool_calls.is_empty() {
                if !turn.content.is_empty() {
                    return Ok(turn.content);
                }
                // Neither text nor a tool call came back.
                if !self.recover_parse_errors {
                    return Err("model returned an empty reply".into());
                }
                conversation.push(ChatMessage::user(
                    "Your last reply was empty. Answer the question or call one of the tools.",
                ));
                continue;
            }

            for call in &turn.tool_calls {
                let input = match serde_json::from_str::<serde_json::Value>(&call.arguments) {
                    Ok(value) => value,
                    Err(err) => {
                        if !self.recover_parse_errors {
                            return Err(format!(
                                "malformed arguments for tool {}: {}",
                                call.name, err
                            )
                            .into());
                        }
                        let correction = format!(
                            "Invalid JSON in the arguments for tool {}: {}. \
Check your output and try again.",
                            call.name, err
                        );
                        on_event(StreamEvent::ToolResult {
                            content: correction.clone(),
                            is_error: true,
                        });
                        conversation.push(ChatMessage::tool_result(call.id.clone(), correction));
                        continue;
                    }
                };

                on_event(StreamEvent::ToolCall {
                    name: call.name.clone(),
                    input: input.clone(),
                });

                let (content, is_error) = self.execute_tool(&call.name, input).await;

                on_event(StreamEvent::ToolResult {
                    content: content.clone(),
                    is_error,
                });
                conversation.push(ChatMessage::tool_result(call.id.clone(), content));
            }
        }

        Ok(STEP_LIMIT_ANSWER.to_string())
    }

    async fn execute_tool(&self, name: &str, input: serde_json::Value) -> (String, bool) {
        match self.tools.iter().find(|tool| tool.name == name) {
            Some(tool) => match (tool.handler)(input, tool.limits).await {
                Ok(result) => (result, false),
                Err(err) => (err.to_string(), true),
            },
            None => (format!("tool not found: {}", name), true),
        }
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|tool| ToolSpec {
                kind: "function",
                function: FunctionSpec {
                    name: tool.name.to_string(),
                    description: tool.description.to_string(),
                    parameters: tool.input_schema.clone(),
                },
            })
            .collect()
    }
}
