use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{DocumentFields, DocumentStore, EpisodeApi, EpisodePayload, RemoteDocument, RemoteError};

fn authorize(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
    let response = request
        .send()
        .await
        .map_err(|e| RemoteError::Network(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::Status { status, body });
    }

    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    response
        .json()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Episode API over HTTP
pub struct HttpEpisodeApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEpisodeApi {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl EpisodeApi for HttpEpisodeApi {
    async fn get_episode(&self, episode_id: &str) -> Result<EpisodePayload, RemoteError> {
        let url = format!("{}/episode/{}", self.base_url, episode_id);
        let request = authorize(self.client.get(&url), self.api_key.as_deref());
        decode(send(request).await?).await
    }

    async fn enhance(&self, episode_id: &str) -> Result<(), RemoteError> {
        let url = format!("{}/episode/{}/enhance", self.base_url, episode_id);
        let request = authorize(self.client.post(&url), self.api_key.as_deref());
        send(request).await?;
        Ok(())
    }
}

/// Remote document store over its REST interface
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn documents_url(&self, collection: &str) -> String {
        format!("{}/collections/{}/documents", self.base_url, collection)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn list(
        &self,
        collection: &str,
        episode_id: &str,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        let request = self
            .client
            .get(self.documents_url(collection))
            .query(&[("episode_id", episode_id)]);
        let documents: Vec<RemoteDocument> =
            decode(send(authorize(request, self.api_key.as_deref())).await?).await?;

        // Stores that ignore the filter still only count exact matches
        Ok(documents
            .into_iter()
            .filter(|doc| doc.episode_id() == Some(episode_id))
            .collect())
    }

    async fn create(
        &self,
        collection: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument, RemoteError> {
        let request = self.client.post(self.documents_url(collection)).json(&fields);
        decode(send(authorize(request, self.api_key.as_deref())).await?).await
    }

    async fn update(
        &self,
        collection: &str,
        doc_id: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument, RemoteError> {
        let url = format!("{}/{}", self.documents_url(collection), doc_id);
        let request = self.client.patch(&url).json(&fields);
        match send(authorize(request, self.api_key.as_deref())).await {
            Err(RemoteError::Status { status: 404, .. }) => {
                Err(RemoteError::NotFound(doc_id.to_string()))
            }
            other => decode(other?).await,
        }
    }
}
