//! HTTP implementation of the chat API

use super::ChatApi;
use crate::{
    Error, Result,
    model::{
        MessageListResponse, OutgoingMessage, RoomListResponse, RoomStatus, ServerMessage,
        Settings, wire::Envelope,
    },
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, header};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageBody<'a> {
    message_content: &'a str,
    message_type: i64,
    file_url: Option<&'a str>,
}

#[derive(Serialize)]
struct StatusBody {
    status: i64,
}

/// JSON-over-HTTP client for the clinic chat endpoints
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    /// Shared HTTP client
    client: reqwest::Client,
    /// API root, without trailing slash
    base_url: String,
    /// Bearer token
    auth_token: Option<String>,
}

impl HttpChatApi {
    /// Create a client from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            auth_token: settings.auth_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");

        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
        warn!("API returned {}: {}", status, message);

        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        let body = response.text().await?;
        decode_body(&body)
    }

    async fn fetch_list<T>(&self, builder: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let response = self.execute(builder).await?;
        let body = response.text().await?;
        decode_body_or_default(&body)
    }
}

/// Decode a possibly-wrapped JSON body
fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.into_inner())
}

/// Like `decode_body`, but an empty or `null` body decodes as `T::default()`
fn decode_body_or_default<T: DeserializeOwned + Default>(body: &str) -> Result<T> {
    let body = body.trim();
    if body.is_empty() || body == "null" {
        return Ok(T::default());
    }
    decode_body(body)
}

/// Pull a human-readable message out of an error body
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "Message", "error", "title"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn with_freshness(builder: RequestBuilder, fresh: bool) -> RequestBuilder {
    if fresh {
        builder.header(header::CACHE_CONTROL, "no-cache")
    } else {
        builder
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_rooms(&self, page: u32, limit: u32, fresh: bool) -> Result<RoomListResponse> {
        let builder = self
            .request(Method::GET, "/chat/admin/rooms")
            .query(&[("page", page), ("limit", limit)]);

        self.fetch_list(with_freshness(builder, fresh)).await
    }

    async fn list_messages(
        &self,
        room_id: i64,
        page: u32,
        limit: u32,
        fresh: bool,
    ) -> Result<MessageListResponse> {
        let builder = self
            .request(Method::GET, &format!("/chat/rooms/{}/messages", room_id))
            .query(&[("page", page), ("limit", limit)]);

        self.fetch_list(with_freshness(builder, fresh)).await
    }

    async fn send_message(&self, room_id: i64, message: &OutgoingMessage) -> Result<ServerMessage> {
        let body = SendMessageBody {
            message_content: message.content(),
            message_type: message.message_type().into(),
            file_url: message.file_url(),
        };

        let builder = self
            .request(Method::POST, &format!("/chat/rooms/{}/messages", room_id))
            .json(&body);

        self.fetch_json(builder).await
    }

    async fn assign_room(&self, room_id: i64) -> Result<()> {
        let builder = self.request(Method::POST, &format!("/chat/rooms/{}/assign", room_id));
        self.execute(builder).await?;
        Ok(())
    }

    async fn update_status(&self, room_id: i64, status: RoomStatus) -> Result<()> {
        let builder = self
            .request(Method::PATCH, &format!("/chat/rooms/{}/status", room_id))
            .json(&StatusBody {
                status: status.into(),
            });
        self.execute(builder).await?;
        Ok(())
    }

    async fn mark_read(&self, room_id: i64) -> Result<()> {
        let builder = self.request(Method::POST, &format!("/chat/rooms/{}/read", room_id));
        self.execute(builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped_and_bare_room_lists() {
        let bare = r#"{"rooms":[{"roomId":1,"customerName":"Lan"}]}"#;
        let wrapped = r#"{"data":{"Rooms":[{"RoomId":1,"CustomerName":"Lan"}]}}"#;

        let a: RoomListResponse = decode_body(bare).expect("bare body");
        let b: RoomListResponse = decode_body(wrapped).expect("wrapped body");

        assert_eq!(a.rooms.len(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_empty_body_as_default() {
        let empty: MessageListResponse = decode_body_or_default("").expect("empty body");
        let null: MessageListResponse = decode_body_or_default(" null ").expect("null body");
        assert!(empty.messages.is_empty());
        assert!(null.messages.is_empty());
    }

    #[test]
    fn test_decode_bare_list_is_not_mistaken_for_empty_envelope() {
        let bare = r#"{"messages":[{"messageId":7,"messageContent":"Hi"}]}"#;
        let response: MessageListResponse = decode_body_or_default(bare).expect("bare body");
        assert_eq!(response.messages.len(), 1);
        assert_eq!(response.messages[0].message_id, 7);
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"message":"Room already assigned"}"#),
            Some("Room already assigned".to_string())
        );
        assert_eq!(extract_error_message("<html>oops</html>"), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let settings = Settings {
            api_base_url: "http://clinic.local/api/".to_string(),
            ..Settings::default()
        };
        let api = HttpChatApi::new(&settings).expect("client");
        assert_eq!(api.base_url, "http://clinic.local/api");
    }
}
