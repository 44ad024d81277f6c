//! MCP server implementation for car fault diagnosis.
//!
//! Exposes three tools:
//! - `list_symptoms`: The full symptom catalog
//! - `search_symptoms`: Semantic search from free text to catalog symptoms
//! - `diagnose`: Rank diagnostic rules against a set of symptom ids

use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::explain::Explainer;
use crate::model::{DiagnosisReport, Symptom, SymptomMatch};
use crate::service::DiagnosticService;
use crate::validation::RequestLimits;

// --- Tool parameters and responses ---

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchSymptomsParams {
    /// Free-text description of what the driver observes, e.g. "the car smokes a lot"
    pub text: String,
    /// Maximum number of results (default 5, at most 20)
    pub top_k: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DiagnoseParams {
    /// Symptom ids from `list_symptoms` or `search_symptoms`, e.g. ["fumee_noire"]
    pub symptoms: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SymptomListResponse {
    pub total: usize,
    pub symptoms: Vec<Symptom>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SearchSymptomsResponse {
    pub query: String,
    pub results: Vec<SymptomMatch>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DiagnoseResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DiagnosisReport>,
    /// Plain-language rephrasing, present only when explanations are enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

// --- MCP Server ---

#[derive(Clone)]
pub struct CarDiagnosticsServer {
    service: Arc<DiagnosticService>,
    explainer: Arc<Explainer>,
    limits: RequestLimits,
    default_top_k: usize,
    tool_router: ToolRouter<CarDiagnosticsServer>,
}

impl CarDiagnosticsServer {
    pub fn new(
        service: Arc<DiagnosticService>,
        explainer: Arc<Explainer>,
        limits: RequestLimits,
        default_top_k: usize,
    ) -> Self {
        Self {
            service,
            explainer,
            limits,
            default_top_k,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl CarDiagnosticsServer {
    #[tool(description = "List every symptom known to the diagnostic catalog, with its id, name, category and weight.")]
    async fn list_symptoms(&self) -> Result<Json<SymptomListResponse>, String> {
        let symptoms = self.service.list_symptoms();
        Ok(Json(SymptomListResponse {
            total: symptoms.len(),
            symptoms,
        }))
    }

    #[tool(description = "Find catalog symptoms matching a free-text description by semantic similarity. Use the returned ids with `diagnose`.")]
    async fn search_symptoms(
        &self,
        Parameters(params): Parameters<SearchSymptomsParams>,
    ) -> Result<Json<SearchSymptomsResponse>, String> {
        let query = self.limits.validate_search(&params.text).map_err(|e| e.to_string())?;
        let top_k = self.limits.top_k(params.top_k, self.default_top_k);

        let service = Arc::clone(&self.service);
        let text = query.clone();
        let results = tokio::task::spawn_blocking(move || service.search_symptoms(&text, top_k))
            .await
            .map_err(|e| format!("search task failed: {e}"))?
            .map_err(|e| format!("search failed: {e}"))?;

        info!(query = %query, results = results.len(), "search_symptoms");
        Ok(Json(SearchSymptomsResponse { query, results }))
    }

    #[tool(description = "Diagnose a car fault from 1 to 5 symptom ids. Returns the most likely fault with severity, estimated cost, advice, confidence and runner-up candidates.")]
    async fn diagnose(
        &self,
        Parameters(params): Parameters<DiagnoseParams>,
    ) -> Result<Json<DiagnoseResponse>, String> {
        let symptoms = self
            .limits
            .validate_diagnose(&params.symptoms)
            .map_err(|e| e.to_string())?;

        let result = self.service.diagnose(&symptoms);
        let Some(report) = result.report() else {
            warn!(symptoms = ?symptoms, "diagnose called with no known symptom");
            return Ok(Json(DiagnoseResponse {
                success: false,
                error: Some("no valid symptoms".to_string()),
                diagnosis: None,
                explanation: None,
            }));
        };

        info!(
            diagnosis = %report.diagnosis,
            score = report.score,
            confidence = %report.confidence,
            uncertain = report.is_uncertain(),
            "diagnose"
        );

        let explanation = self.explainer.explain(report).await;
        Ok(Json(DiagnoseResponse {
            success: true,
            error: None,
            diagnosis: Some(report.clone()),
            explanation,
        }))
    }
}

#[tool_handler]
impl ServerHandler for CarDiagnosticsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "car-diagnostics".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Car fault diagnosis MCP server. Use search_symptoms to turn a driver's \
                 description into catalog symptom ids (or list_symptoms to browse them), \
                 then call diagnose with those ids to get the most likely fault."
                    .to_string(),
            ),
        }
    }
}
