//! Assistant side of the print-shop chat.
//!
//! - `gateway`: Cloudprinter HTTP calls folded into uniform error payloads
//! - `tools` / `shop`: the tool trait, registry, and the three shop tools
//! - `llm`: chat-completions client behind the `LlmClient` trait
//! - `runtime`: per-session loop driven by the turn selector, with observers
//!
//! The model only chooses which tool to call and how to phrase answers. Product
//! data and prices always come from the catalog and the Cloudprinter API.

pub mod gateway;
pub mod llm;
pub mod prompts;
pub mod runtime;
pub mod shop;
pub mod tools;

pub use gateway::{CloudprinterGateway, GatewayError, PricingOutcome};
pub use llm::{AssistantReply, CompletionRequest, LlmClient, LlmError, OpenAiCompatibleClient};
pub use runtime::{AgentRuntime, ChatSession, ConversationObserver, RuntimeError, TurnOutcome};
pub use tools::{Tool, ToolDefinition, ToolError, ToolRegistry};
