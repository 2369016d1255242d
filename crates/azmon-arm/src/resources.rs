//! Resource inventory (`Microsoft.Resources`).

use std::sync::Arc;

use azmon_core::api::{ClientFuture, GenericResource, ResourceListPage, ResourcesClient};

use crate::client::ArmClient;
use crate::options::RESOURCES_API_VERSION;

/// Lists resources of one subscription.
#[derive(Debug, Clone)]
pub struct ArmResourcesClient {
    client: Arc<ArmClient>,
    subscription_id: String,
}

impl ArmResourcesClient {
    pub fn new(client: Arc<ArmClient>, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    async fn list_path(&self, path: &str, filter: &str) -> azmon_core::ClientResult<Vec<GenericResource>> {
        let mut query = vec![("api-version", RESOURCES_API_VERSION)];
        if !filter.is_empty() {
            query.push(("$filter", filter));
        }
        let url = self.client.url(path, &query)?;
        self.client.get_all_pages::<ResourceListPage>(url).await
    }
}

impl ResourcesClient for ArmResourcesClient {
    fn list<'a>(&'a self, filter: &'a str) -> ClientFuture<'a, Vec<GenericResource>> {
        Box::pin(async move {
            let path = format!("/subscriptions/{}/resources", self.subscription_id);
            self.list_path(&path, filter).await
        })
    }

    fn list_by_resource_group<'a>(
        &'a self,
        resource_group: &'a str,
        filter: &'a str,
    ) -> ClientFuture<'a, Vec<GenericResource>> {
        Box::pin(async move {
            let path = format!(
                "/subscriptions/{}/resourceGroups/{resource_group}/resources",
                self.subscription_id
            );
            self.list_path(&path, filter).await
        })
    }
}
