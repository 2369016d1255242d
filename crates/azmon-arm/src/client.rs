//! Authenticated GETs against the resource manager, with `nextLink`
//! paging.

use std::sync::Arc;

use azmon_core::api::{MetricDefinition, MetricDefinitionPage, GenericResource, ResourceListPage};
use azmon_core::{ClientError, ClientResult};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::credential::ClientSecretCredential;
use crate::error::{ArmError, ArmResult};

/// A list response split into items and the next page's URL.
pub trait Page: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

impl Page for ResourceListPage {
    type Item = GenericResource;

    fn into_parts(self) -> (Vec<GenericResource>, Option<String>) {
        (self.value, self.next_link)
    }
}

impl Page for MetricDefinitionPage {
    type Item = MetricDefinition;

    fn into_parts(self) -> (Vec<MetricDefinition>, Option<String>) {
        (self.value, self.next_link)
    }
}

/// HTTP client bound to one resource manager endpoint and credential.
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: Url,
    credential: Arc<ClientSecretCredential>,
}

impl ArmClient {
    pub fn new(http: reqwest::Client, endpoint: &str, credential: Arc<ClientSecretCredential>) -> ArmResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| ArmError::Endpoint {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            http,
            endpoint,
            credential,
        })
    }

    /// Absolute URL for an ARM `path` (a resource ID or a collection
    /// under one) with URL-encoded query parameters.
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<Url> {
        let mut url = self
            .endpoint
            .join(path)
            .map_err(|e| ClientError::Transport(format!("invalid request path {path}: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        let token = self.credential.token().await?;
        debug!(%url, "GET");

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))
    }

    /// GET `url` and every `nextLink` after it, concatenating the items.
    pub async fn get_all_pages<P: Page>(&self, url: Url) -> ClientResult<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let page: P = self.get_json(url).await?;
            let (page_items, next_link) = page.into_parts();
            items.extend(page_items);
            pages += 1;

            next = match next_link.filter(|link| !link.is_empty()) {
                Some(link) => Some(
                    Url::parse(&link).map_err(|e| ClientError::Malformed(format!("invalid nextLink {link}: {e}")))?,
                ),
                None => None,
            };
        }

        debug!(pages, items = items.len(), "drained paged listing");
        Ok(items)
    }
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}
