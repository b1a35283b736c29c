use async_trait::async_trait;

use super::{record_path, ConsoleClient, Content};
use crate::errors::ConsoleError;
use crate::models::{Character, CharacterFilter, Page, PageRequest, VisibilityChange};
use crate::sync::{ListSource, RecordSource};

#[derive(Clone)]
pub struct CharactersApi {
    client: ConsoleClient,
}

impl CharactersApi {
    pub(crate) fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        filter: &CharacterFilter,
        page: PageRequest,
    ) -> Result<Page<Character>, ConsoleError> {
        self.client.get_page("/characters", filter, page).await
    }

    pub async fn get(&self, id: &str) -> Result<Character, ConsoleError> {
        self.client.get_json(&record_path("characters", id, None)?).await
    }

    pub async fn image(&self, id: &str) -> Result<Content, ConsoleError> {
        let resp = self.client.get_content(&record_path("characters", id, Some("image"))?).await?;
        Ok(Content::new(resp))
    }

    pub async fn delete(&self, id: &str) -> Result<(), ConsoleError> {
        self.client.delete(&record_path("characters", id, None)?).await?;
        tracing::info!(character_id = id, "character deleted");
        Ok(())
    }

    /// Flip public/private on a ready character. The flag is only changed on
    /// `character` once the backend confirms.
    pub async fn toggle_visibility(&self, character: &mut Character) -> Result<VisibilityChange, ConsoleError> {
        if !character.can_toggle_visibility() {
            return Err(ConsoleError::InvalidState(format!(
                "character {} is {}, visibility can only change once ready",
                character.id,
                character.status.as_str()
            )));
        }
        let change: VisibilityChange = self
            .client
            .post_empty(&record_path("characters", &character.id, Some("visibility"))?)
            .await?;
        character.set_visibility(change.is_public);
        tracing::info!(character_id = %character.id, is_public = change.is_public, "character visibility changed");
        Ok(change)
    }
}

#[async_trait]
impl ListSource for CharactersApi {
    type Filter = CharacterFilter;
    type Item = Character;

    async fn fetch_page(
        &self,
        filter: &CharacterFilter,
        page: PageRequest,
    ) -> Result<Page<Character>, ConsoleError> {
        self.list(filter, page).await
    }
}

#[async_trait]
impl RecordSource for CharactersApi {
    type Item = Character;

    async fn fetch_record(&self, id: &String) -> Result<Character, ConsoleError> {
        self.get(id).await
    }
}
