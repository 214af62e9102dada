use std::{io, pin::Pin};

use axum::body::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::PipelineMode,
    error::{GenerationError, ValidationError, ValidationIssue},
    llm::{ChatClient, ChatMessage, ChatRequest},
    prompts::{coding_prompt, description_prompt, CODE_ONLY_SUFFIX},
    relay::relay,
};

/// Incrementally produced code, ready to be used as a response body.
pub type CodeStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VisionModel {
    pub id: &'static str,
    pub label: &'static str,
}

pub const VISION_MODELS: &[VisionModel] = &[
    VisionModel {
        id: "meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo",
        label: "Llama 3.2 11B Vision",
    },
    VisionModel {
        id: "meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo",
        label: "Llama 3.2 90B Vision",
    },
];

pub const DEFAULT_VISION_MODEL: &str = "meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub model: String,
    pub image_url: String,
    #[serde(default)]
    pub shadcn: bool,
}

impl GenerationRequest {
    /// Decodes and validates a raw request body.
    ///
    /// The body must be a JSON object. One that does not deserialize yields
    /// a single `(root)` issue with the decoder's message; otherwise every
    /// empty required field is reported.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let root = |err: serde_json::Error| ValidationError::single("(root)", err.to_string());
        let value: Value = serde_json::from_slice(body).map_err(root)?;
        if !value.is_object() {
            return Err(ValidationError::single("(root)", "Expected object"));
        }
        let request = Self::deserialize(value).map_err(root)?;

        let issues: Vec<ValidationIssue> = [("model", &request.model), ("imageUrl", &request.image_url)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(path, _)| ValidationIssue {
                path: path.to_string(),
                message: "String must contain at least 1 character(s)".to_string(),
            })
            .collect();

        if issues.is_empty() {
            Ok(request)
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Runs the image-to-code pipeline against the model provider.
#[derive(Clone)]
pub struct Generator {
    chat: ChatClient,
    coding_model: String,
    mode: PipelineMode,
}

impl Generator {
    pub fn new(chat: ChatClient, coding_model: impl Into<String>, mode: PipelineMode) -> Self {
        Self {
            chat,
            coding_model: coding_model.into(),
            mode,
        }
    }

    /// Starts a generation and returns its live output. Errors before the
    /// stream starts are fatal for the request; nothing is retried.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<CodeStream, GenerationError> {
        let request_id = Uuid::new_v4().to_string();
        info!(
            request_id = request_id.as_str(),
            model = request.model.as_str(),
            image_url = request.image_url.as_str(),
            shadcn = request.shadcn,
            mode = ?self.mode,
            "starting code generation"
        );

        let system_prompt = coding_prompt(request.shadcn)?;
        let code_request = match self.mode {
            PipelineMode::SingleCall => ChatRequest::new(
                request.model.clone(),
                vec![ChatMessage::user_with_image(
                    system_prompt,
                    request.image_url.clone(),
                )],
            ),
            PipelineMode::TwoCall => {
                let description = self
                    .describe_image(&request.model, &request.image_url)
                    .await?;
                info!(
                    request_id = request_id.as_str(),
                    description_len = description.len(),
                    "image described"
                );
                ChatRequest::new(
                    self.coding_model.clone(),
                    vec![
                        ChatMessage::system(system_prompt),
                        ChatMessage::user(format!("{description}{CODE_ONLY_SUFFIX}")),
                    ],
                )
            }
        };

        let response = self.chat.stream(code_request).await?;
        Ok(Box::pin(relay(response.bytes_stream())))
    }

    /// First call of the two-call pipeline: a prose description of the image.
    pub async fn describe_image(&self, model: &str, image_url: &str) -> Result<String, GenerationError> {
        let response = self
            .chat
            .complete(ChatRequest::new(
                model,
                vec![ChatMessage::user_with_image(description_prompt(), image_url)],
            ))
            .await?;

        match response.first_text() {
            Some(text) => Ok(text.to_string()),
            None => {
                warn!(model, "model returned no description");
                Err(GenerationError::EmptyDescription)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(body: Value) -> Result<GenerationRequest, ValidationError> {
        GenerationRequest::from_slice(&serde_json::to_vec(&body).unwrap())
    }

    #[test]
    fn valid_body_defaults_shadcn_to_false() {
        let req = decode(json!({
            "model": "m",
            "imageUrl": "https://img/x.png"
        }))
        .unwrap();
        assert_eq!(
            req,
            GenerationRequest {
                model: "m".into(),
                image_url: "https://img/x.png".into(),
                shadcn: false,
            }
        );

        let req = decode(json!({
            "model": "m",
            "imageUrl": "https://img/x.png",
            "shadcn": true
        }))
        .unwrap();
        assert!(req.shadcn);
    }

    #[test]
    fn missing_or_mistyped_fields_are_rejected() {
        let err = decode(json!({ "imageUrl": "u" })).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "(root)");
        assert!(err.issues[0].message.contains("missing field `model`"));

        let err = decode(json!({ "model": "m", "imageUrl": 3 })).unwrap_err();
        assert!(err.issues[0].message.contains("invalid type: integer `3`"));

        let err = decode(json!({ "model": null, "imageUrl": "u" })).unwrap_err();
        assert!(err.issues[0].message.contains("invalid type: null"));
    }

    #[test]
    fn empty_strings_are_rejected() {
        let err = decode(json!({ "model": "", "imageUrl": " " })).unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["model", "imageUrl"]);
        assert_eq!(
            err.to_string(),
            "model: String must contain at least 1 character(s)\nimageUrl: String must contain at least 1 character(s)"
        );
    }

    #[test]
    fn wrong_shadcn_type_alone_fails() {
        for shadcn in [json!(1), json!("yes"), json!(null)] {
            let err = decode(json!({
                "model": "m",
                "imageUrl": "u",
                "shadcn": shadcn
            }))
            .unwrap_err();
            assert_eq!(err.issues.len(), 1);
            assert!(
                err.issues[0].message.contains("expected a boolean"),
                "{shadcn}: {err}"
            );
        }
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = decode(json!(["m", "u"])).unwrap_err();
        assert_eq!(err.to_string(), "(root): Expected object");

        let err = GenerationRequest::from_slice(b"{not json").unwrap_err();
        assert_eq!(err.issues[0].path, "(root)");
    }

    #[test]
    fn default_model_is_offered() {
        assert!(VISION_MODELS.iter().any(|m| m.id == DEFAULT_VISION_MODEL));
    }
}
