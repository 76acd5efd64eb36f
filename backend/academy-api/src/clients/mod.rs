pub mod brokerage;
pub mod llm;

pub use brokerage::{BrokerageClient, BrokerageCredentials};
pub use llm::{ChatMessage, LlmProvider, OpenAiCompatibleProvider};
