//! Document analysis backed by the LLM failover chain instead of the hosted
//! analysis route.

use async_trait::async_trait;

use mission_core::domain::analysis::AnalysisPayload;
use mission_core::upload::ValidatedDocument;

use crate::gateway::{AnalysisGateway, GatewayError};
use crate::json::parse_lenient;
use crate::llm::{Attachment, FailoverChain, LlmRequest};

const SYSTEM_PROMPT: &str = "You are a B2B go-to-market strategist. You read product requirement \
documents and propose the market sectors most likely to buy. Respond with a single JSON object \
and nothing else.";

const RESPONSE_SHAPE: &str = r#"{
  "summary": "two or three sentences describing the product",
  "sectors": [
    {
      "sector": "sector name",
      "rationale": "why this sector needs the product",
      "targetRoles": ["most relevant buyer title first"],
      "valueProposition": "one sentence pitch for this sector",
      "painPoints": ["pain point"],
      "strategyMix": "suggested outreach mix"
    }
  ],
  "suggestedConfig": {
    "emailSequence": true,
    "outboundVoice": false,
    "inboundReceptionist": false
  }
}"#;

pub struct LlmAnalysisGateway {
    chain: FailoverChain,
}

impl LlmAnalysisGateway {
    pub fn new(chain: FailoverChain) -> Self {
        Self { chain }
    }
}

pub fn analysis_request(document: &ValidatedDocument) -> LlmRequest {
    let mut prompt = format!(
        "Analyze the attached document `{}` and answer with JSON shaped like:\n{RESPONSE_SHAPE}\n\
         Propose between two and four sectors.",
        document.file_name
    );

    let attachment = if document.kind.is_text() {
        prompt.push_str("\n\nDocument contents:\n");
        prompt.push_str(&String::from_utf8_lossy(&document.bytes));
        None
    } else {
        Some(Attachment {
            kind: document.kind,
            file_name: document.file_name.clone(),
            bytes: document.bytes.clone(),
        })
    };

    LlmRequest { system: SYSTEM_PROMPT.to_string(), prompt, attachment }
}

#[async_trait]
impl AnalysisGateway for LlmAnalysisGateway {
    async fn analyze(&self, document: &ValidatedDocument) -> Result<AnalysisPayload, GatewayError> {
        let text = self
            .chain
            .complete(&analysis_request(document))
            .await
            .map_err(|error| GatewayError::Provider(error.to_string()))?;

        let endpoint = format!("llm:{}", self.chain.providers().join(","));
        let payload = parse_lenient::<AnalysisPayload>(&text)
            .map_err(|message| GatewayError::Parse { endpoint: endpoint.clone(), message })?;
        payload.validate().map_err(|message| GatewayError::Parse { endpoint, message })?;
        Ok(payload)
    }
}
