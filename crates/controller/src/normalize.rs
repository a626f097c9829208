//! Structured-output normalisation of the final answer.

use std::sync::Arc;

use paralegal_core::{
    traits::LlmClient,
    types::{parse_agent_value, IndividualAgentResponse, MessageContent, Query},
    Error, Result,
};

/// Result of normalising the synthesizer's output.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// The output matches the wire format.
    Structured(IndividualAgentResponse),
    /// The output could not be brought into shape; raw text kept.
    Raw(String),
}

impl Normalized {
    /// Text handed back to the user.
    pub fn message(&self) -> &str {
        match self {
            Self::Structured(response) => &response.proposed_solve,
            Self::Raw(text) => text,
        }
    }
}

/// Turns the synthesizer's last message into an [`IndividualAgentResponse`].
///
/// Output that already parses is returned as is. Anything else goes through
/// one [`LlmClient::generate`] call and the reply is validated strictly.
pub struct Normalizer {
    llm: Option<Arc<dyn LlmClient>>,
}

impl Normalizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm: Some(llm) }
    }

    /// A normaliser that never calls a model.
    pub fn passthrough() -> Self {
        Self { llm: None }
    }

    pub async fn normalize(&self, content: &MessageContent, query: &Query) -> Result<Normalized> {
        if let Ok(response) = content.agent_response() {
            return Ok(Normalized::Structured(response));
        }

        let raw = content.to_text();
        let Some(llm) = &self.llm else {
            return Ok(Normalized::Raw(raw));
        };

        let prompt = format!(
            "Convert the answer below into a JSON object matching the schema. \
             Keep the answer text unchanged in proposed_solve, copy the question into \
             userquery.query and set next_speaker to \"user_proxy\".\n\n\
             Question: {}\n\nAnswer:\n{}",
            query.query, raw
        );

        let value = match llm
            .generate(&prompt, &IndividualAgentResponse::json_schema())
            .await
        {
            Ok(value) => value,
            Err(Error::Parse(e)) => {
                tracing::warn!(error = %e, "Normalised output is not JSON, returning raw text");
                return Ok(Normalized::Raw(raw));
            }
            Err(e) => return Err(e),
        };

        match parse_agent_value(value) {
            Ok(structured) => Ok(Normalized::Structured(structured)),
            Err(e) => {
                tracing::warn!(error = %e, "Normalised output failed validation, returning raw text");
                Ok(Normalized::Raw(raw))
            }
        }
    }
}
