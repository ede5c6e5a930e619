pub mod analysis;
pub mod cache;
pub mod cache_keys;
pub mod fanout;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod risk;

pub use cache::EvidenceCache;
pub use llm::{LlmClient, OpenAiLanguageModel};
pub use pipeline::{CancelSignal, PipelineError, PipelineOrchestrator, Submission};
pub use report::render_markdown;
