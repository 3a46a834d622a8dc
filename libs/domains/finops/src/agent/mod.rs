//! FinOps AI agent: LLM client, billing tools and the orchestrator.

mod llm;
mod orchestrator;
mod tools;

pub use llm::{
    ChatCompletionClient, CompletionRequest, HttpChatClient, LlmError, LlmResult, ToolChoice,
};
pub use orchestrator::ChatOrchestrator;
pub use tools::{
    BillingFunction, BillingTools, COST_FORECAST, COST_SUMMARY, SERVICE_COSTS, declarations,
    parse_arguments,
};
