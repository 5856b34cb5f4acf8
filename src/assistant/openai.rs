use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ApiError, AssistantApi, ChatMessage, ChatRole, ContextId, RunId, RunStatus};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct MessageRequest<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
}

#[derive(Deserialize)]
struct TextValue {
    value: String,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<TextValue>,
}

#[derive(Deserialize)]
struct MessageObject {
    role: ChatRole,
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

impl MessageObject {
    fn into_chat_message(self) -> Result<ChatMessage, ApiError> {
        let content = self
            .content
            .into_iter()
            .find(|part| part.kind == "text")
            .and_then(|part| part.text)
            .map(|text| text.value)
            .ok_or_else(|| ApiError::Unexpected("message has no text content".to_string()))?;
        Ok(ChatMessage {
            role: self.role,
            content,
        })
    }
}

/// Client for the OpenAI Assistants (v2) threads and runs endpoints
#[derive(Clone)]
pub struct OpenAiAssistants {
    client: Client,
    api_key: String,
    assistant_id: String,
    base_url: String,
}

impl OpenAiAssistants {
    pub fn new(api_key: &str, assistant_id: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            assistant_id: assistant_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistants {
    async fn create_context(&self) -> Result<ContextId, ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::NotConfigured("API key"));
        }
        if self.assistant_id.is_empty() {
            return Err(ApiError::NotConfigured("assistant id"));
        }

        let request = self.request(Method::POST, "/threads").json(&serde_json::json!({}));
        let thread: ThreadObject = self.send(request).await?;
        Ok(ContextId(thread.id))
    }

    async fn post_user_message(&self, context: &ContextId, text: &str) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &format!("/threads/{}/messages", context))
            .json(&MessageRequest {
                role: "user",
                content: text,
            });
        let _: serde_json::Value = self.send(request).await?;
        Ok(())
    }

    async fn start_run(&self, context: &ContextId) -> Result<RunId, ApiError> {
        let request = self
            .request(Method::POST, &format!("/threads/{}/runs", context))
            .json(&RunRequest {
                assistant_id: &self.assistant_id,
            });
        let run: RunObject = self.send(request).await?;
        debug!(run = %run.id, status = %run.status, "run created");
        Ok(RunId(run.id))
    }

    async fn run_status(&self, context: &ContextId, run: &RunId) -> Result<RunStatus, ApiError> {
        let request = self.request(Method::GET, &format!("/threads/{}/runs/{}", context, run));
        let run: RunObject = self.send(request).await?;
        Ok(run.status)
    }

    async fn latest_message(&self, context: &ContextId) -> Result<Option<ChatMessage>, ApiError> {
        let request = self
            .request(Method::GET, &format!("/threads/{}/messages", context))
            .query(&[("order", "desc"), ("limit", "1")]);
        let list: MessageList = self.send(request).await?;
        list.data
            .into_iter()
            .next()
            .map(MessageObject::into_chat_message)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_list_takes_first_text_part() {
        let json = r#"{
            "object": "list",
            "data": [{
                "id": "msg_1",
                "role": "assistant",
                "content": [
                    {"type": "image_file", "image_file": {"file_id": "f"}},
                    {"type": "text", "text": {"value": "Hello (there)", "annotations": []}}
                ]
            }]
        }"#;
        let list: MessageList = serde_json::from_str(json).unwrap();
        let message = list.data.into_iter().next().unwrap().into_chat_message().unwrap();
        assert_eq!(message.role, ChatRole::Assistant);
        assert_eq!(message.content, "Hello (there)");
    }

    #[test]
    fn test_message_without_text_is_an_error() {
        let json = r#"{"role": "assistant", "content": []}"#;
        let message: MessageObject = serde_json::from_str(json).unwrap();
        assert!(matches!(message.into_chat_message(), Err(ApiError::Unexpected(_))));
    }

    #[test]
    fn test_run_object_status() {
        let json = r#"{"id": "run_1", "object": "thread.run", "status": "cancelling"}"#;
        let run: RunObject = serde_json::from_str(json).unwrap();
        assert_eq!(run.id, "run_1");
        assert_eq!(run.status, RunStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_request() {
        let client = OpenAiAssistants::new("", "asst_1", DEFAULT_BASE_URL);
        let err = client.create_context().await.unwrap_err();
        assert_eq!(err.to_string(), "No API key configured");

        let client = OpenAiAssistants::new("sk-test", "", DEFAULT_BASE_URL);
        let err = client.create_context().await.unwrap_err();
        assert_eq!(err.to_string(), "No assistant id configured");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OpenAiAssistants::new("key", "asst_1", "http://localhost:8080/v1/");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
