use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ClientError, ErrorBody, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Value,
}

/// Thin wrapper over the JSON API. Responses the screens only render are
/// returned as `serde_json::Value`; callers needing types use [`get`](Self::get).
#[derive(Debug, Clone)]
pub struct CanteiroClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CanteiroClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::NotSignedIn)?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());
        tracing::debug!(status = status.as_u16(), %message, "api error");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path)?.send().await?;
        Self::decode(response).await
    }

    pub async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.request(method, path)?.json(body).send().await?;
        Self::decode(response).await
    }

    /// Signs in and keeps the returned token for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = Self::decode(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn session(&self) -> Result<Value> {
        self.get("/session").await
    }

    pub async fn projects(&self) -> Result<Value> {
        self.get("/projects").await
    }

    pub async fn dashboard(&self, project_id: &str) -> Result<Value> {
        self.get(&format!("/projects/{project_id}/dashboard")).await
    }

    pub async fn customer_dashboard(&self, project_id: &str) -> Result<Value> {
        self.get(&format!("/projects/{project_id}/customer-dashboard"))
            .await
    }

    pub async fn monthly_insight(&self, project_id: &str, year: i32, month: u32) -> Result<Value> {
        self.get(&format!(
            "/projects/{project_id}/insights?year={year}&month={month}"
        ))
        .await
    }

    pub async fn claim_invite(&self, project_id: &str) -> Result<Value> {
        self.send(Method::POST, &format!("/projects/{project_id}/claim"), &json!({}))
            .await
    }

    pub async fn update_task_progress(
        &self,
        project_id: &str,
        task_id: &str,
        progress: u8,
    ) -> Result<Value> {
        self.send(
            Method::PUT,
            &format!("/projects/{project_id}/tasks/{task_id}"),
            &json!({ "progress": progress }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted_under_api() {
        let client = CanteiroClient::new("http://localhost:3000/");
        assert_eq!(client.url("/projects"), "http://localhost:3000/api/projects");
    }

    #[tokio::test]
    async fn calls_without_a_token_fail_before_sending() {
        let client = CanteiroClient::new("http://127.0.0.1:9");
        assert!(matches!(
            client.projects().await,
            Err(ClientError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_an_http_error() {
        let client = CanteiroClient::new("http://127.0.0.1:9").with_token("t");
        assert!(matches!(client.session().await, Err(ClientError::Http(_))));
    }
}
