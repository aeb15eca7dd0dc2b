use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use super::types::{
    AuthToken, LoginResponse, MediaFile, TaskAnswer, TaskSet, TaskSetFilter, TaskSubmission,
};

/// Client for the backend REST endpoints.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    token: Option<AuthToken>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: AuthToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth(&self) -> Result<String> {
        match &self.token {
            Some(token) => Ok(token.header_value()),
            None => bail!("not logged in"),
        }
    }

    /// Check that a tenant slug exists. Returns its id, or None for an
    /// unknown slug.
    pub async fn tenant_id(&self, slug: &str) -> Result<Option<String>> {
        let response = self
            .http
            .get(self.url("/get_tenant_id"))
            .query(&[("slug", slug)])
            .send()
            .await
            .context("tenant lookup failed")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        #[derive(serde::Deserialize)]
        struct TenantResponse {
            tenant_id: String,
        }

        let tenant: TenantResponse = response
            .error_for_status()
            .context("tenant lookup failed")?
            .json()
            .await
            .context("invalid tenant response")?;
        Ok(Some(tenant.tenant_id))
    }

    /// Form-encoded login; stores the returned token on success.
    pub async fn login(
        &mut self,
        tenant_slug: &str,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse> {
        let response: LoginResponse = self
            .http
            .post(self.url("/login"))
            .form(&[
                ("tenant_slug", tenant_slug),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await
            .context("login request failed")?
            .error_for_status()
            .context("login rejected")?
            .json()
            .await
            .context("invalid login response")?;

        info!("Logged in to tenant {:?}", response.tenant_name);
        self.token = Some(response.token());
        Ok(response)
    }

    pub async fn create_task_set(&self, body: &impl Serialize) -> Result<TaskSet> {
        self.post_json("/tasks/task-set", body).await
    }

    pub async fn create_task(&self, body: &impl Serialize) -> Result<serde_json::Value> {
        self.post_json("/tasks/task", body).await
    }

    /// Submit a whole task set for scoring.
    pub async fn submit_task_set(&self, task_set_id: &str) -> Result<TaskSet> {
        let response = self
            .http
            .put(self.url("/tasks/task-set/submit"))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .json(&serde_json::json!({ "task_set_id": task_set_id }))
            .send()
            .await
            .context("task set submission failed")?
            .error_for_status()
            .context("task set submission rejected")?;
        Ok(response.json().await.context("invalid task set response")?)
    }

    /// Submit one answer; the response carries the correctness flag.
    pub async fn submit_task(&self, submission: &TaskSubmission) -> Result<TaskAnswer> {
        self.post_json("/tasks/task/submit", submission).await
    }

    pub async fn user_task_sets(&self) -> Result<Vec<TaskSet>> {
        self.get_json("/tasks/user/task-sets").await
    }

    pub async fn filtered_task_sets(&self, filter: &TaskSetFilter) -> Result<Vec<TaskSet>> {
        let response = self
            .http
            .get(self.url("/tasks/task-sets/filtered"))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .query(filter)
            .send()
            .await
            .context("task set query failed")?
            .error_for_status()
            .context("task set query rejected")?;
        Ok(response.json().await.context("invalid task set list")?)
    }

    /// Resolve a stored media file key to a fetchable URL.
    pub async fn media_url(&self, key: &str) -> Result<MediaFile> {
        let response = self
            .http
            .get(self.url("/media/file"))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .query(&[("key", key)])
            .send()
            .await
            .context("media lookup failed")?
            .error_for_status()
            .context("media lookup rejected")?;
        Ok(response.json().await.context("invalid media response")?)
    }

    /// Multipart upload of a finished recording (or any media file).
    pub async fn upload_media(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<MediaFile> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .context("invalid media MIME type")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/media/file"))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .multipart(form)
            .send()
            .await
            .context("media upload failed")?
            .error_for_status()
            .context("media upload rejected")?;
        Ok(response.json().await.context("invalid upload response")?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?
            .error_for_status()
            .with_context(|| format!("GET {} rejected", path))?;
        Ok(response
            .json()
            .await
            .with_context(|| format!("invalid response from {}", path))?)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", path))?
            .error_for_status()
            .with_context(|| format!("POST {} rejected", path))?;
        Ok(response
            .json()
            .await
            .with_context(|| format!("invalid response from {}", path))?)
    }
}
