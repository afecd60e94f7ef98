mod groq;

pub(crate) use groq::{
    AssistantTurn, ChatMessage, ChatRequest, FunctionSpec, GroqClient, ModelClient,
    ToolCallRequest, ToolSpec,
};
