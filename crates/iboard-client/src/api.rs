use std::future::Future;
use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use iboard_types::api::{ApiResponse, CreateIdeaRequest, ErrorBody, VoteRequest};
use iboard_types::{Idea, IdeaStats, VoteDirection};

use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The calls the live board needs from the server. Implemented by
/// [`ApiClient`]; tests substitute in-memory fakes.
pub trait IdeaApi: Send + Sync + 'static {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Idea>, ClientError>> + Send;

    fn create(&self, text: &str) -> impl Future<Output = Result<Idea, ClientError>> + Send;

    fn vote(
        &self,
        id: Uuid,
        direction: VoteDirection,
    ) -> impl Future<Output = Result<Idea, ClientError>> + Send;
}

/// HTTP client for the `/api` surface.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:3001/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_all(&self) -> Result<Vec<Idea>, ClientError> {
        let res: ApiResponse<Vec<Idea>> = send(self.http.get(self.url("/ideas"))).await?;
        Ok(res.data)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Idea, ClientError> {
        let res: ApiResponse<Idea> = send(self.http.get(self.url(&format!("/ideas/{}", id)))).await?;
        Ok(res.data)
    }

    pub async fn create_idea(&self, text: &str) -> Result<Idea, ClientError> {
        let body = CreateIdeaRequest { text: text.into() };
        let res: ApiResponse<Idea> = send(self.http.post(self.url("/ideas")).json(&body)).await?;
        Ok(res.data)
    }

    /// One vote, sent once. Never retried automatically: the server counts
    /// every request it receives.
    pub async fn cast_vote(&self, id: Uuid, direction: VoteDirection) -> Result<Idea, ClientError> {
        let path = match direction {
            VoteDirection::Up => "/ideas/upvote",
            VoteDirection::Down => "/ideas/downvote",
        };
        let body = VoteRequest { id: id.to_string() };
        let res: ApiResponse<Idea> = send(self.http.post(self.url(path)).json(&body)).await?;
        Ok(res.data)
    }

    pub async fn stats(&self) -> Result<IdeaStats, ClientError> {
        let res: ApiResponse<IdeaStats> = send(self.http.get(self.url("/ideas/stats"))).await?;
        Ok(res.data)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl IdeaApi for ApiClient {
    async fn fetch_all(&self) -> Result<Vec<Idea>, ClientError> {
        self.get_all().await
    }

    async fn create(&self, text: &str) -> Result<Idea, ClientError> {
        self.create_idea(text).await
    }

    async fn vote(&self, id: Uuid, direction: VoteDirection) -> Result<Idea, ClientError> {
        self.cast_vote(id, direction).await
    }
}

async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
    let res = req.send().await.map_err(|e| ClientError::Network(e.to_string()))?;
    let status = res.status();

    if !status.is_success() {
        // The error envelope is best effort; proxies may answer with HTML
        let body = res.json::<ErrorBody>().await.ok();
        debug!("Request failed with {}: {:?}", status, body);
        return Err(ClientError::from_status(status.as_u16(), body));
    }

    res.json::<T>().await.map_err(ClientError::from)
}
