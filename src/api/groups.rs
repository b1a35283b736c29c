use async_trait::async_trait;
use reqwest::Method;

use super::ConsoleClient;
use crate::errors::ConsoleError;
use crate::models::{Group, GroupFilter, GroupRequest, Page, PageRequest};
use crate::sync::ListSource;

#[derive(Clone)]
pub struct GroupsApi {
    client: ConsoleClient,
}

impl GroupsApi {
    pub(crate) fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: &GroupFilter, page: PageRequest) -> Result<Page<Group>, ConsoleError> {
        self.client.get_page("/groups", filter, page).await
    }

    pub async fn create(&self, req: &GroupRequest) -> Result<Group, ConsoleError> {
        req.validate()?;
        let group: Group = self.client.send_json(Method::POST, "/groups", req).await?;
        tracing::info!(group_id = group.id, name = %group.name, "group created");
        Ok(group)
    }

    pub async fn update(&self, id: i64, req: &GroupRequest) -> Result<Group, ConsoleError> {
        req.validate()?;
        let group: Group = self
            .client
            .send_json(Method::PUT, &format!("/groups/{}", id), req)
            .await?;
        tracing::info!(group_id = id, "group updated");
        Ok(group)
    }

    /// Delete a group. Its accounts are not deleted; the backend unassigns
    /// them. Only a list fetched after this call returns reflects that.
    pub async fn delete(&self, id: i64) -> Result<(), ConsoleError> {
        self.client.delete(&format!("/groups/{}", id)).await?;
        tracing::info!(group_id = id, "group deleted, member accounts unassigned");
        Ok(())
    }
}

#[async_trait]
impl ListSource for GroupsApi {
    type Filter = GroupFilter;
    type Item = Group;

    async fn fetch_page(&self, filter: &GroupFilter, page: PageRequest) -> Result<Page<Group>, ConsoleError> {
        self.list(filter, page).await
    }
}
