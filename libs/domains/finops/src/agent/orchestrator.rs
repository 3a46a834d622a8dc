//! FinOps chat orchestrator
//!
//! Drives a conversation through at most two round trips to the LLM: the
//! first may request billing functions, whose results are appended as tool
//! messages before a single follow-up round trip produces the answer.

use observability::ChatMetrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::llm::{ChatCompletionClient, CompletionRequest, LlmError, ToolChoice};
use super::tools::{BillingFunction, BillingTools, declarations, parse_arguments};
use crate::error::{FinopsError, FinopsResult};
use crate::models::ChatMessage;

const TIMEOUT_REPLY: &str =
    "I'm sorry, but the request to the AI service timed out. Please try again later.";
const CONNECTION_REPLY: &str =
    "I'm sorry, but there was an error connecting to the AI service. Please try again later.";
const INVALID_REPLY: &str =
    "I'm sorry, but I received an invalid response from the API. Please try again.";
const INVALID_FOLLOW_UP_REPLY: &str =
    "I'm sorry, but I received an invalid follow-up response. Please try again.";

/// Which of the two round trips is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    Initial,
    FollowUp,
}

impl Round {
    fn label(self) -> &'static str {
        match self {
            Round::Initial => "initial",
            Round::FollowUp => "follow_up",
        }
    }

    fn invalid_reply(self) -> &'static str {
        match self {
            Round::Initial => INVALID_REPLY,
            Round::FollowUp => INVALID_FOLLOW_UP_REPLY,
        }
    }
}

/// Coordinates the LLM and the billing functions for one chat turn
#[derive(Clone)]
pub struct ChatOrchestrator {
    llm: Arc<dyn ChatCompletionClient>,
    tools: BillingTools,
}

impl ChatOrchestrator {
    pub fn new(llm: Arc<dyn ChatCompletionClient>, tools: BillingTools) -> Self {
        Self { llm, tools }
    }

    /// Answer a conversation.
    ///
    /// Upstream failures never surface as errors; they become assistant
    /// messages. Only an empty conversation is rejected.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> FinopsResult<ChatMessage> {
        if messages.is_empty() {
            return Err(FinopsError::NoMessages);
        }

        info!(messages = messages.len(), "Handling chat request");

        let mut conversation = messages;
        let assistant = match self.round_trip(Round::Initial, &conversation).await {
            Ok(message) => message,
            Err(reply) => return Ok(reply),
        };

        let tool_calls = assistant.requested_tool_calls().to_vec();
        if tool_calls.is_empty() {
            return Ok(assistant);
        }

        info!(tool_calls = tool_calls.len(), "Model requested tool calls");
        conversation.push(assistant);

        for call in &tool_calls {
            let function = BillingFunction::from_name(&call.function.name);
            let arguments = parse_arguments(&call.function.arguments);

            let result = self.tools.execute(&function, arguments).await;
            let outcome = if result.get("error").is_some() { "error" } else { "success" };
            ChatMetrics::record_tool_call(function.metric_label(), outcome);

            info!(
                tool = %call.function.name,
                tool_call_id = %call.id,
                outcome,
                "Tool call finished"
            );

            conversation.push(ChatMessage::tool(
                call.id.clone(),
                call.function.name.clone(),
                result.to_string(),
            ));
        }

        // The follow-up answer is final even if it asks for more tools.
        match self.round_trip(Round::FollowUp, &conversation).await {
            Ok(message) => {
                if !message.requested_tool_calls().is_empty() {
                    warn!("Follow-up response requested more tools, returning it as final");
                }
                Ok(message)
            }
            Err(reply) => Ok(reply),
        }
    }

    /// One request to the LLM; failures come back as the assistant reply to
    /// return instead.
    async fn round_trip(
        &self,
        round: Round,
        conversation: &[ChatMessage],
    ) -> Result<ChatMessage, ChatMessage> {
        let started = Instant::now();
        let result = self
            .llm
            .complete(CompletionRequest {
                messages: conversation.to_vec(),
                tools: declarations(),
                tool_choice: ToolChoice::Auto,
            })
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(LlmError::Timeout) => "timeout",
            Err(LlmError::Transport(_)) => "transport_error",
            Err(LlmError::Status { .. }) => "upstream_error",
            Err(LlmError::InvalidResponse(_)) => "invalid_response",
        };
        ChatMetrics::record_round_trip(round.label(), outcome, started.elapsed());

        result.map_err(|e| {
            error!(round = round.label(), error = %e, "LLM round trip failed");
            ChatMessage::assistant(degraded_reply(round, &e))
        })
    }
}

fn degraded_reply(round: Round, error: &LlmError) -> String {
    match error {
        LlmError::Timeout => TIMEOUT_REPLY.to_string(),
        LlmError::Transport(_) => CONNECTION_REPLY.to_string(),
        LlmError::Status { status, body } => {
            let detail = if body.trim().is_empty() { status.to_string() } else { body.clone() };
            format!("I encountered an error while processing your request: {detail}")
        }
        LlmError::InvalidResponse(_) => round.invalid_reply().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::MockChatCompletionClient;
    use crate::billing::{BillingService, CREDENTIALS_HELP, ExplorerError, MockCostExplorer};
    use crate::models::{MessageRole, ToolCall};
    use chrono::NaiveDate;
    use mockall::Sequence;
    use serde_json::{Value, json};

    fn orchestrator(llm: MockChatCompletionClient, explorer: MockCostExplorer) -> ChatOrchestrator {
        let billing = BillingService::with_clock(Arc::new(explorer), || {
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
        });
        ChatOrchestrator::new(Arc::new(llm), BillingTools::new(Arc::new(billing)))
    }

    fn with_tool_calls(calls: Vec<ToolCall>) -> ChatMessage {
        ChatMessage {
            role: MessageRole::Assistant,
            content: Some(String::new()),
            tool_calls: Some(calls),
            tool_call_id: None,
            name: None,
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_empty_conversation_is_rejected() {
        let mut llm = MockChatCompletionClient::new();
        llm.expect_complete().never();

        let result = orchestrator(llm, MockCostExplorer::new()).chat(vec![]).await;
        assert!(matches!(result, Err(FinopsError::NoMessages)));
    }

    #[tokio::test]
    async fn test_plain_answer_is_returned_verbatim() {
        let mut llm = MockChatCompletionClient::new();
        llm.expect_complete()
            .withf(|r| r.tools.len() == 3 && r.tool_choice == ToolChoice::Auto && r.messages.len() == 1)
            .times(1)
            .returning(|_| Ok(ChatMessage::assistant("Your bill looks fine.")));

        let reply = orchestrator(llm, MockCostExplorer::new())
            .chat(vec![ChatMessage::user("hello")])
            .await
            .unwrap();

        assert_eq!(reply, ChatMessage::assistant("Your bill looks fine."));
    }

    #[tokio::test]
    async fn test_tool_messages_follow_request_order() {
        let mut seq = Sequence::new();
        let mut llm = MockChatCompletionClient::new();
        llm.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(with_tool_calls(vec![
                    ToolCall::new("call_a", "get_aws_cost_summary", "{}"),
                    ToolCall::new("call_b", "get_gcp_costs", "{}"),
                    ToolCall::new("call_c", "get_aws_cost_forecast", "{\"days\": 7}"),
                ]))
            });
        llm.expect_complete()
            .withf(|r| {
                let ids: Vec<_> = r
                    .messages
                    .iter()
                    .filter(|m| m.role == MessageRole::Tool)
                    .filter_map(|m| m.tool_call_id.as_deref())
                    .collect();
                r.messages.len() == 5
                    && r.messages[1].role == MessageRole::Assistant
                    && ids == ["call_a", "call_b", "call_c"]
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ChatMessage::assistant("Here is the breakdown.")));

        let mut explorer = MockCostExplorer::new();
        explorer.expect_cost_and_usage().times(1).returning(|_| Ok(vec![]));
        explorer.expect_cost_forecast().times(1).returning(|_| Ok(Default::default()));

        let reply = orchestrator(llm, explorer)
            .chat(vec![ChatMessage::user("costs?")])
            .await
            .unwrap();
        assert_eq!(reply.content.as_deref(), Some("Here is the breakdown."));
    }

    #[tokio::test]
    async fn test_unknown_function_and_bad_arguments_degrade() {
        let mut llm = MockChatCompletionClient::new();
        let mut seq = Sequence::new();
        llm.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(with_tool_calls(vec![
                    ToolCall::new("call_1", "get_gcp_costs", "{}"),
                    ToolCall::new("call_2", "get_aws_cost_summary", "{not json"),
                ]))
            });
        llm.expect_complete()
            .withf(|r| {
                let unknown: Value = serde_json::from_str(r.messages[2].content.as_deref().unwrap_or("")).unwrap_or_default();
                let summary: Value = serde_json::from_str(r.messages[3].content.as_deref().unwrap_or("")).unwrap_or_default();
                unknown == json!({ "error": "Unknown function: get_gcp_costs" })
                    && summary["granularity"] == "MONTHLY"
                    && r.messages[3].name.as_deref() == Some("get_aws_cost_summary")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ChatMessage::assistant("done")));

        let mut explorer = MockCostExplorer::new();
        explorer.expect_cost_and_usage().times(1).returning(|_| Ok(vec![]));

        let reply = orchestrator(llm, explorer)
            .chat(vec![ChatMessage::user("costs?")])
            .await
            .unwrap();
        assert_eq!(reply.content.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn test_billing_failure_still_triggers_follow_up() {
        let mut llm = MockChatCompletionClient::new();
        let mut seq = Sequence::new();
        llm.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(with_tool_calls(vec![ToolCall::new(
                    "call_ec2",
                    "get_aws_service_costs",
                    "{\"service_name\": \"Amazon EC2\"}",
                )]))
            });
        llm.expect_complete()
            .withf(|r| {
                let content: Value = r
                    .messages
                    .last()
                    .and_then(|m| m.content.as_deref())
                    .and_then(|c| serde_json::from_str(c).ok())
                    .unwrap_or_default();
                content
                    == json!({
                        "error": "Failed to retrieve costs for Amazon EC2: UnrecognizedClientException",
                        "help": CREDENTIALS_HELP
                    })
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ChatMessage::assistant("I could not reach AWS billing.")));

        let mut explorer = MockCostExplorer::new();
        explorer
            .expect_cost_and_usage()
            .returning(|_| Err(ExplorerError::Request("UnrecognizedClientException".into())));

        let reply = orchestrator(llm, explorer)
            .chat(vec![ChatMessage::user("EC2 costs?")])
            .await
            .unwrap();
        assert_eq!(reply.content.as_deref(), Some("I could not reach AWS billing."));
    }

    #[tokio::test]
    async fn test_no_third_round_trip() {
        let mut llm = MockChatCompletionClient::new();
        llm.expect_complete().times(2).returning(|_| {
            Ok(with_tool_calls(vec![ToolCall::new("call_x", "get_gcp_costs", "{}")]))
        });

        let reply = orchestrator(llm, MockCostExplorer::new())
            .chat(vec![ChatMessage::user("loop?")])
            .await
            .unwrap();
        assert_eq!(reply.requested_tool_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_initial_failures_become_assistant_replies() {
        let cases = [
            (LlmError::Timeout, TIMEOUT_REPLY.to_string()),
            (LlmError::Transport("refused".into()), CONNECTION_REPLY.to_string()),
            (
                LlmError::Status { status: 401, body: "Unauthorized".into() },
                "I encountered an error while processing your request: Unauthorized".to_string(),
            ),
            (LlmError::InvalidResponse("no choices".into()), INVALID_REPLY.to_string()),
        ];

        for (error, expected) in cases {
            let mut llm = MockChatCompletionClient::new();
            let mut error = Some(error);
            llm.expect_complete()
                .times(1)
                .returning(move |_| Err(error.take().unwrap_or(LlmError::Timeout)));

            let reply = orchestrator(llm, MockCostExplorer::new())
                .chat(vec![ChatMessage::user("hi")])
                .await
                .unwrap();
            assert_eq!(reply.role, MessageRole::Assistant);
            assert_eq!(reply.content, Some(expected));
        }
    }

    #[tokio::test]
    async fn test_invalid_follow_up_reply() {
        let mut llm = MockChatCompletionClient::new();
        let mut seq = Sequence::new();
        llm.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(with_tool_calls(vec![ToolCall::new("c", "get_gcp_costs", "{}")])));
        llm.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(LlmError::InvalidResponse("empty choices".into())));

        let reply = orchestrator(llm, MockCostExplorer::new())
            .chat(vec![ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(reply.content.as_deref(), Some(INVALID_FOLLOW_UP_REPLY));
    }
}
