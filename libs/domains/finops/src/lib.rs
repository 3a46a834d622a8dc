//! FinOps Domain
//!
//! Chat assistant that answers AWS billing questions by letting an LLM call
//! Cost Explorer queries.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Handlers     │  ← /chat, /test-aws
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  Orchestrator   │  ← LLM round trips, tool dispatch
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ BillingService  │  ← Cost summaries, forecasts, per-service costs
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  CostExplorer   │  ← AWS SDK (trait + implementation)
//! └─────────────────┘
//! ```

pub mod agent;
pub mod billing;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

// Re-export commonly used types
pub use error::{FinopsError, FinopsResult};
pub use models::{
    CallerIdentity, ChatMessage, ChatRequest, ChatResponse, FunctionCall, Granularity,
    MessageRole, ToolCall,
};

pub use agent::{BillingTools, ChatCompletionClient, ChatOrchestrator, HttpChatClient};
pub use billing::{AwsCostExplorer, BillingFailure, BillingService, CostExplorer};
pub use config::{AwsConfig, FinopsFileConfig, LlmConfig};

// Re-export handler types
pub use handlers::{ApiDoc, FinopsState};
