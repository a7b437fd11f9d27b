use aleph_protocol::{endpoints, HealthResponse};
use aleph_types::{ContentId, PeerId, SimpleStatement, Statement, StatementId};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// HTTP client for one node's administrative surface.
#[derive(Clone, Debug)]
pub struct RestClient {
    client: Client,
    base: Url,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base = Url::parse(&config.peer_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.peer_url)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.peer_url.clone()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// The node's peer id.
    pub async fn id(&self) -> ClientResult<PeerId> {
        let url = self.url(endpoints::ID, None)?;
        let text = self.get_text(url).await?;
        Ok(PeerId::from(text.trim()))
    }

    /// Ask the node whether `peer_id` is reachable. `Ok(false)` means the
    /// node knows the peer but could not reach it.
    pub async fn ping(&self, peer_id: &PeerId) -> ClientResult<bool> {
        let url = self.url(endpoints::PING, Some(peer_id.as_str()))?;
        let response = self.client.get(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::BAD_GATEWAY => Ok(false),
            _ => Err(Self::error_for(response).await),
        }
    }

    /// Publish a statement body under `namespace`. The node assigns and
    /// returns the statement id.
    pub async fn publish(&self, namespace: &str, statement: &SimpleStatement) -> ClientResult<StatementId> {
        debug!(namespace, object = %statement.object, "publishing statement");
        let url = self.url(endpoints::PUBLISH, Some(namespace))?;
        let response = self.client.post(url).json(statement).send().await?;
        let text = Self::text(response).await?;
        Ok(StatementId::from(text.trim()))
    }

    /// Read a statement by id.
    pub async fn statement(&self, statement_id: &StatementId) -> ClientResult<Statement> {
        let url = self.url(endpoints::STATEMENT, Some(statement_id.as_str()))?;
        self.get_json(url).await
    }

    /// Store data objects on the node, each serialized as JSON. Returns
    /// their content ids in the order given.
    pub async fn put_data<T: Serialize>(&self, objects: &[T]) -> ClientResult<Vec<ContentId>> {
        let url = self.url(endpoints::DATA, None)?;
        let response = self.client.post(url).json(objects).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_for(response).await)
        }
    }

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        let url = self.url(endpoints::HEALTH, None)?;
        self.get_json(url).await
    }

    /// `base` + endpoint prefix + an optional single path parameter, with
    /// the parameter percent-encoded as one segment.
    fn url(&self, endpoint: &str, param: Option<&str>) -> ClientResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty().push(endpoint.trim_start_matches('/'));
            if let Some(param) = param {
                segments.push(param);
            }
        }
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> ClientResult<String> {
        let response = self.client.get(url).send().await?;
        Self::text(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        let response = self.client.get(url).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_for(response).await)
        }
    }

    async fn text(response: reqwest::Response) -> ClientResult<String> {
        if response.status().is_success() {
            Ok(response.text().await?)
        } else {
            Err(Self::error_for(response).await)
        }
    }

    async fn error_for(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            ClientError::NotFound(message)
        } else {
            ClientError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}
