pub mod analysis;
pub mod config;
pub mod content;
pub mod evidence;
pub mod report;
pub mod risk;
pub mod state;

pub use analysis::{AnalysisResult, ExtractedAnalysis};
pub use config::{Config, PipelineConfig};
pub use content::{ContentError, ContentItem};
pub use evidence::{EvidenceItem, EvidenceMap, EvidenceRecord, ProviderId};
pub use report::{FailureCode, FailureDetail, Report, ReportStatus};
pub use risk::{RiskAssessment, RiskLevel, RiskThresholds};
pub use state::{PipelineStage, PipelineState};
