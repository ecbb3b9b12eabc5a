use reqwest::{Client, Method, Response, StatusCode, Url, redirect};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::gitlab::types::{BuildStatus, TriggerCredential};
use crate::utils::redact_url;

const NO_FORM: &[(&str, &str)] = &[];

/// Thin GitLab REST v4 client.
///
/// Redirects are never followed and every call is bounded by the configured
/// timeout. One attempt per call; failures are returned, not retried.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_url: Url,
}

impl GitLabClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(BridgeError::HttpClient)?;
        Ok(Self { http, base_url })
    }

    /// `GET /projects/:id/repository/commits/:sha/statuses`
    pub async fn commit_statuses(
        &self,
        private_token: &SecretString,
        project_id: u64,
        sha: &str,
    ) -> Result<Vec<BuildStatus>> {
        let project = project_id.to_string();
        let mut url = self.endpoint(&[
            "projects",
            &project,
            "repository",
            "commits",
            sha,
            "statuses",
        ]);
        with_private_token(&mut url, private_token);
        self.json(Method::GET, url, NO_FORM, StatusCode::OK).await
    }

    /// `GET /projects/:id/triggers`
    pub async fn list_triggers(
        &self,
        private_token: &SecretString,
        project_id: u64,
    ) -> Result<Vec<TriggerCredential>> {
        let mut url = self.endpoint(&["projects", &project_id.to_string(), "triggers"]);
        with_private_token(&mut url, private_token);
        self.json(Method::GET, url, NO_FORM, StatusCode::OK).await
    }

    /// `POST /projects/:id/triggers`
    pub async fn create_trigger(
        &self,
        private_token: &SecretString,
        project_id: u64,
        description: &str,
    ) -> Result<TriggerCredential> {
        let mut url = self.endpoint(&["projects", &project_id.to_string(), "triggers"]);
        with_private_token(&mut url, private_token);
        self.json(
            Method::POST,
            url,
            &[("description", description)],
            StatusCode::CREATED,
        )
        .await
    }

    /// `POST /projects/:id/triggers/:trigger_id/take_ownership`
    pub async fn take_ownership(
        &self,
        private_token: &SecretString,
        project_id: u64,
        trigger_id: u64,
    ) -> Result<TriggerCredential> {
        let mut url = self.endpoint(&[
            "projects",
            &project_id.to_string(),
            "triggers",
            &trigger_id.to_string(),
            "take_ownership",
        ]);
        with_private_token(&mut url, private_token);
        self.json(Method::POST, url, NO_FORM, StatusCode::OK).await
    }

    /// `POST /projects/:id/trigger/pipeline?ref=:branch&token=:token` with an empty form.
    pub async fn trigger_pipeline(
        &self,
        trigger_token: &SecretString,
        project_id: u64,
        branch: &str,
    ) -> Result<()> {
        let mut url = self.endpoint(&[
            "projects",
            &project_id.to_string(),
            "trigger",
            "pipeline",
        ]);
        url.query_pairs_mut()
            .append_pair("ref", branch)
            .append_pair("token", trigger_token.expose_secret());
        self.send(Method::POST, url, NO_FORM, StatusCode::CREATED)
            .await
            .map(|_| ())
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        // The base URL is validated as http(s) at config load, so it always has path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("api")
                .push("v4")
                .extend(segments);
        }
        url
    }

    async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        form: &[(&str, &str)],
        expected: StatusCode,
    ) -> Result<T> {
        let shown = redact_url(&url);
        let response = self.send(method.clone(), url, form, expected).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::transport(method.clone(), shown.clone(), e))?;
        serde_json::from_slice(&body).map_err(|source| BridgeError::RemoteDecode {
            method,
            url: shown,
            source,
        })
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        form: &[(&str, &str)],
        expected: StatusCode,
    ) -> Result<Response> {
        let shown = redact_url(&url);
        debug!("{} {}", method, shown);

        let mut request = self.http.request(method.clone(), url);
        if method == Method::POST {
            request = request.form(form);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BridgeError::transport(method.clone(), shown.clone(), e))?;

        let status = response.status();
        if status != expected {
            return Err(BridgeError::RemoteRejection {
                method,
                url: shown,
                status,
            });
        }
        Ok(response)
    }
}

fn with_private_token(url: &mut Url, token: &SecretString) {
    url.query_pairs_mut()
        .append_pair("private_token", token.expose_secret());
}
