//! Backend for Ollama's native API.
//!
//! [`OllamaBackend`] translates normalized [`LlmRequest`]s into Ollama's
//! `/api/generate` and `/api/chat` endpoints. This is the default backend.

use super::{http_error, Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Backend for Ollama's native API.
///
/// Uses `/api/chat` when the request carries a non-empty system prompt and
/// `/api/generate` otherwise.
#[derive(Debug, Clone)]
pub struct OllamaBackend;

impl OllamaBackend {
    /// Build the Ollama `options` object from the LlmConfig.
    fn build_options(request: &LlmRequest) -> Value {
        let mut opts = json!({
            "temperature": request.config.temperature,
            "num_predict": request.config.max_tokens,
        });
        if let Some(ref custom) = request.config.options {
            if let (Some(base), Some(extra)) = (opts.as_object_mut(), custom.as_object()) {
                for (k, v) in extra {
                    base.insert(k.clone(), v.clone());
                }
            }
        }
        opts
    }

    fn use_chat(request: &LlmRequest) -> bool {
        request
            .system_prompt
            .as_ref()
            .is_some_and(|s| !s.is_empty())
    }

    /// Build the JSON body for `/api/generate`.
    fn build_generate_body(request: &LlmRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": Self::build_options(request),
        });
        if request.config.json_mode {
            body["format"] = json!("json");
        }
        body
    }

    /// Build the JSON body for `/api/chat`.
    fn build_chat_body(request: &LlmRequest) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref sys) = request.system_prompt {
            messages.push(json!({"role": "system", "content": sys}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
            "options": Self::build_options(request),
        });
        if request.config.json_mode {
            body["format"] = json!("json");
        }
        body
    }

    /// Extract metadata fields from an Ollama response.
    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        const FIELDS: [&str; 5] = [
            "total_duration",
            "eval_count",
            "eval_duration",
            "prompt_eval_count",
            "model",
        ];
        let meta: serde_json::Map<String, Value> = FIELDS
            .iter()
            .filter_map(|f| json_resp.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect();
        (!meta.is_empty()).then_some(Value::Object(meta))
    }

    /// Pull the generated text out of a response body. A body without the
    /// expected field is a malformed envelope, not an empty answer.
    fn extract_text(json_resp: &Value, chat: bool) -> Result<String> {
        let text = if chat {
            json_resp.get("message").and_then(|m| m.get("content"))
        } else {
            json_resp.get("response")
        };
        text.and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                crate::PipelineError::Other(format!(
                    "Ollama response missing {} field",
                    if chat { "message.content" } else { "response" }
                ))
            })
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let base = base_url.trim_end_matches('/');
        let chat = Self::use_chat(request);
        let (url, body) = if chat {
            (format!("{}/api/chat", base), Self::build_chat_body(request))
        } else {
            (format!("{}/api/generate", base), Self::build_generate_body(request))
        };

        tracing::debug!(task = %request.task, url = %url, "ollama request");
        let resp = client.post(&url).json(&body).send().await?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(http_error(resp).await);
        }

        let json_resp: Value = resp.json().await?;
        Ok(LlmResponse {
            text: Self::extract_text(&json_resp, chat)?,
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    fn test_request() -> LlmRequest {
        LlmRequest {
            task: "flowchart".into(),
            model: "llama3.2".into(),
            system_prompt: None,
            prompt: "Summarize binary search as a flowchart.".into(),
            config: LlmConfig::default(),
        }
    }

    #[test]
    fn test_ollama_backend_generate_payload() {
        let request = test_request();
        let body = OllamaBackend::build_generate_body(&request);

        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["prompt"], "Summarize binary search as a flowchart.");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.7);
        assert_eq!(body["options"]["num_predict"], 4096);
        assert_eq!(body["format"], "json");
    }

    #[test]
    fn test_ollama_backend_chat_payload() {
        let mut request = test_request();
        request.system_prompt = Some("You are an expert educator.".into());

        let body = OllamaBackend::build_chat_body(&request);
        let messages = body["messages"].as_array().expect("messages array");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "Summarize binary search as a flowchart.");
    }

    #[test]
    fn test_ollama_backend_free_text_mode() {
        let mut request = test_request();
        request.config.json_mode = false;
        assert!(OllamaBackend::build_generate_body(&request).get("format").is_none());
    }

    #[test]
    fn test_ollama_backend_use_chat_logic() {
        let mut request = test_request();
        assert!(!OllamaBackend::use_chat(&request));
        request.system_prompt = Some("You are helpful.".into());
        assert!(OllamaBackend::use_chat(&request));
        request.system_prompt = Some(String::new());
        assert!(!OllamaBackend::use_chat(&request));
    }

    #[test]
    fn test_ollama_backend_custom_options() {
        let mut request = test_request();
        request.config.options = Some(json!({"top_p": 0.9, "seed": 42}));

        let body = OllamaBackend::build_generate_body(&request);
        assert_eq!(body["options"]["top_p"], 0.9);
        assert_eq!(body["options"]["seed"], 42);
        assert_eq!(body["options"]["temperature"], 0.7);
    }

    #[test]
    fn test_extract_text_and_metadata() {
        let resp = json!({"response": "{\"flowchart\": \"\"}", "eval_count": 12, "model": "llama3.2"});
        assert_eq!(
            OllamaBackend::extract_text(&resp, false).unwrap(),
            "{\"flowchart\": \"\"}"
        );
        let meta = OllamaBackend::extract_metadata(&resp).unwrap();
        assert_eq!(meta["eval_count"], 12);
        assert!(meta.get("total_duration").is_none());
    }

    #[test]
    fn test_extract_text_malformed_envelope() {
        let resp = json!({"error": "model not found"});
        assert!(OllamaBackend::extract_text(&resp, true).is_err());
    }
}
