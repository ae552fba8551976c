use anyhow::{anyhow, Result};
use log::{debug, info};

use crate::model::{Association, Id, RelatedToolsContext, Tag, Tool, ToolDetail, ToolType};
use crate::store::traits::{RecordStore, Store};

/// Read-only views over a tool's many-to-many associations
pub struct ToolRelations;

impl ToolRelations {
    async fn require_tool<S: Store + ?Sized>(store: &S, tool_id: Id) -> Result<Option<Tool>> {
        RecordStore::<Tool>::load_by_id(store, tool_id).await
    }

    /// The tool with the ids of its types, related tools and tags
    pub async fn detail<S: Store + ?Sized>(store: &S, tool_id: Id) -> Result<Option<ToolDetail>> {
        let Some(tool) = Self::require_tool(store, tool_id).await? else {
            return Ok(None);
        };

        Ok(Some(ToolDetail {
            type_ids: store.related_ids(Association::ToolType, tool_id).await?,
            related_tool_ids: store.related_ids(Association::RelatedTool, tool_id).await?,
            tag_ids: store.related_ids(Association::Tag, tool_id).await?,
            tool,
        }))
    }

    pub async fn types<S: Store + ?Sized>(store: &S, tool_id: Id) -> Result<Vec<ToolType>> {
        let mut types = Vec::new();
        for type_id in store.related_ids(Association::ToolType, tool_id).await? {
            if let Some(tool_type) = RecordStore::<ToolType>::load_by_id(store, type_id).await? {
                types.push(tool_type);
            }
        }
        Ok(types)
    }

    pub async fn related_tools<S: Store + ?Sized>(store: &S, tool_id: Id) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        for related_id in store.related_ids(Association::RelatedTool, tool_id).await? {
            if let Some(tool) = RecordStore::<Tool>::load_by_id(store, related_id).await? {
                tools.push(tool);
            }
        }
        Ok(tools)
    }

    pub async fn tags<S: Store + ?Sized>(store: &S, tool_id: Id) -> Result<Vec<Tag>> {
        let tag_ids = store.related_ids(Association::Tag, tool_id).await?;
        store.get_tags(&tag_ids).await
    }

    /// Candidates and current selection for the related-tools form
    pub async fn related_context<S: Store + ?Sized>(store: &S, tool_id: Id) -> Result<Option<RelatedToolsContext>> {
        let Some(tool) = Self::require_tool(store, tool_id).await? else {
            return Ok(None);
        };

        Ok(Some(RelatedToolsContext {
            other_tools: store.other_tools(&[tool_id]).await?,
            selected_tool_ids: store.related_ids(Association::RelatedTool, tool_id).await?,
            tool,
        }))
    }

    /// Keep the links whose target exists, dropping duplicates
    pub async fn existing_links<S: Store + ?Sized>(
        store: &S,
        links: Vec<(Association, Id)>,
    ) -> Result<Vec<(Association, Id)>> {
        let mut kept: Vec<(Association, Id)> = Vec::new();
        for (association, related_id) in links {
            if kept.contains(&(association, related_id)) {
                continue;
            }
            let exists = match association {
                Association::ToolType => RecordStore::<ToolType>::load_by_id(store, related_id)
                    .await?
                    .is_some(),
                Association::RelatedTool => RecordStore::<Tool>::load_by_id(store, related_id)
                    .await?
                    .is_some(),
                Association::Tag => !store.get_tags(&[related_id]).await?.is_empty(),
            };
            if exists {
                kept.push((association, related_id));
            } else {
                debug!("dropping link to missing {:?} {}", association, related_id);
            }
        }
        Ok(kept)
    }

    /// Replace the related tools of `tool_id`, ignoring self references and
    /// ids that do not name a tool
    pub async fn update_related<S: Store + ?Sized>(store: &S, tool_id: Id, related_ids: &[Id]) -> Result<Vec<Id>> {
        if Self::require_tool(store, tool_id).await?.is_none() {
            return Err(anyhow!("Tool not found: {}", tool_id));
        }

        let mut kept: Vec<Id> = Vec::new();
        for &related_id in related_ids {
            if related_id == tool_id || kept.contains(&related_id) {
                continue;
            }
            if RecordStore::<Tool>::load_by_id(store, related_id).await?.is_some() {
                kept.push(related_id);
            }
        }

        store
            .replace_links(Association::RelatedTool, tool_id, &kept)
            .await?;
        info!("tool {} now relates to {:?}", tool_id, kept);
        Ok(kept)
    }
}
