//! Optional natural-language explanation of a diagnosis through an OpenAI-compatible
//! chat endpoint. Selected once at startup; failures never affect the diagnosis itself.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::DiagnosisReport;
use diag_common::openai::{ChatCompletionRequest, Message, OpenAiClient, OpenAiClientError};

const SYSTEM_PROMPT: &str = "You are an experienced car mechanic. You explain diagnoses to \
     drivers who are not mechanics, in plain and reassuring language.";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 200;

pub enum Explainer {
    Llm {
        client: Arc<OpenAiClient>,
        model: String,
    },
    Disabled,
}

impl Explainer {
    /// `Llm` when a model name is configured, `Disabled` otherwise.
    pub fn from_model(
        model: Option<String>,
        client: impl FnOnce() -> Result<OpenAiClient, OpenAiClientError>,
    ) -> Result<Self, OpenAiClientError> {
        match model {
            Some(model) => Ok(Self::Llm {
                client: Arc::new(client()?),
                model,
            }),
            None => Ok(Self::Disabled),
        }
    }

    /// Rephrase the report for a non-specialist.
    ///
    /// Returns `None` when disabled, on any request failure, or when the reply is empty.
    /// There is no fallback text: callers that want one should use the report's
    /// `description`.
    pub async fn explain(&self, report: &DiagnosisReport) -> Option<String> {
        let Self::Llm { client, model } = self else {
            return None;
        };

        let request = ChatCompletionRequest {
            model: model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(build_prompt(report))],
            temperature: Some(TEMPERATURE),
            max_tokens: Some(MAX_TOKENS),
        };

        match client.chat_completions(request, None).await {
            Ok(response) => match response.first_content().map(str::trim) {
                Some(text) if !text.is_empty() => {
                    debug!(diagnosis = %report.diagnosis, "explanation generated");
                    Some(text.to_string())
                }
                _ => {
                    warn!(model = %model, "explanation response had no content");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, model = %model, "explanation request failed");
                None
            }
        }
    }
}

fn build_prompt(report: &DiagnosisReport) -> String {
    format!(
        "Rephrase this diagnosis clearly for the car owner.\n\n\
         Diagnosis: {}\n\
         Technical description: {}\n\
         Severity: {}\n\
         Symptoms: {}\n\n\
         Answer in 2-3 simple sentences.",
        report.diagnosis,
        report.description,
        report.severity,
        report.symptoms_used.join(", ")
    )
}
