//! REST API endpoint for content analysis

use actix_web::{HttpResponse, post, web};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::ApiError;
use crate::app::AppState;
use crate::service::{CancelSignal, Submission, render_markdown};

/// Content submitted for analysis
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Text to analyze
    pub text: String,
    /// Where the text was found, carried into the report
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AnalyzeParams {
    /// Response format: json (default) or markdown
    pub format: Option<ReportFormat>,
}

/// Analyze content and return its report
///
/// Any report status (COMPLETE, PARTIAL, FAILED) is a 200; only content rejected before
/// analysis is a 400.
#[utoipa::path(
    post,
    path = "/v1/analyze",
    params(AnalyzeParams),
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis report", body = crate::model::Report),
        (
            status = 400,
            description = "Content is empty or too long",
            body = crate::api::error::ErrorResponse
        )
    ),
    tag = "analysis"
)]
#[post("/v1/analyze")]
pub async fn analyze(
    state: web::Data<AppState>,
    params: web::Query<AnalyzeParams>,
    body: web::Json<AnalyzeRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();

    let mut submission = Submission::new(request.text);
    if let Some(url) = request.source_url {
        submission = submission.with_source_url(url);
    }

    let signal = match state.config.request_deadline() {
        Some(deadline) => CancelSignal::never().with_deadline(deadline),
        None => CancelSignal::never(),
    };

    let report = state.orchestrator.run(submission, &signal).await?;

    match params.format.unwrap_or_default() {
        ReportFormat::Json => Ok(HttpResponse::Ok().json(report)),
        ReportFormat::Markdown => Ok(HttpResponse::Ok()
            .content_type("text/markdown; charset=utf-8")
            .body(render_markdown(&report))),
    }
}

/// Configure analysis routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze);
}
