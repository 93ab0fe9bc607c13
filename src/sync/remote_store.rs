use async_trait::async_trait;

use crate::calendar::Document;
use crate::storage::{DocumentStore, StoreError};

pub const DATA_ENDPOINT: &str = "/api/data";

pub struct RemoteStore {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn data_url(&self) -> String {
        format!("{}{}", self.base_url, DATA_ENDPOINT)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Remote {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn read(&self) -> Result<Document, StoreError> {
        let url = self.data_url();
        tracing::info!("Fetching document from {}", url);

        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;

        Ok(Document::from_json(&body)?)
    }

    async fn write(&self, document: &Document) -> Result<(), StoreError> {
        let url = self.data_url();
        tracing::debug!("PUT {}", url);

        let response = self.client.put(&url).json(document).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("remote {}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let store = RemoteStore::new("http://localhost:3000/");

        assert_eq!(store.data_url(), "http://localhost:3000/api/data");
    }

    #[tokio::test]
    async fn read_normalizes_partial_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "calendars": [{ "id": "zurich", "name": "Zurich", "color": "#00ff00" }],
                "activeId": "zurich"
            })))
            .mount(&server)
            .await;
        let store = RemoteStore::new(server.uri());

        let document = store.read().await.unwrap();

        assert_eq!(document.calendars.len(), 1);
        assert!(document.assignments.is_empty());
        assert_eq!(document.version, 1);
    }

    #[tokio::test]
    async fn read_surfaces_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Failed to read data"))
            .mount(&server)
            .await;
        let store = RemoteStore::new(server.uri());

        let result = store.read().await;

        assert!(matches!(result, Err(StoreError::Remote { status: 500, .. })));
    }

    #[tokio::test]
    async fn write_puts_whole_document() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/data"))
            .and(body_partial_json(serde_json::json!({
                "calendars": [{ "id": "work", "name": "Work", "color": "#000000" }],
                "assignments": {},
                "comments": {},
                "activeId": "work",
                "version": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;
        let store = RemoteStore::new(server.uri());
        let document = Document {
            calendars: vec![Calendar::new("Work", "#000000")],
            active_id: Some("work".to_string()),
            ..Document::default()
        };

        store.write(&document).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_an_http_error() {
        let store = RemoteStore::new("http://127.0.0.1:9");

        let result = store.write(&Document::default()).await;

        assert!(matches!(result, Err(StoreError::Http(_))));
    }
}
