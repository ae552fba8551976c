use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    normalize_tag, Association, FieldUpdate, Id, ListFilter, Page, Record, Relationship, SortDirection, Tag,
    Tool, ToolType,
};
use crate::store::traits::{RecordStore, RelationshipStore, StoreError};

/// Rows of one record kind keyed by id
#[derive(Debug)]
pub struct Table<R> {
    rows: BTreeMap<Id, R>,
    next_id: Id,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<R: Record> Table<R> {
    fn allocate(&mut self, mut record: R) -> R {
        if record.id() <= 0 {
            record.set_id(self.next_id);
        }
        self.next_id = self.next_id.max(record.id() + 1);
        self.rows.insert(record.id(), record.clone());
        record
    }
}

/// In-process store used by tests and by `database.in_memory = true`
#[derive(Debug, Default)]
pub struct MemoryStore {
    tools: RwLock<Table<Tool>>,
    tool_types: RwLock<Table<ToolType>>,
    tags: RwLock<BTreeMap<Id, Tag>>,
    links: RwLock<HashMap<Association, Vec<Relationship>>>,
}

/// Gives generic code access to the table holding `R`
pub trait MemoryTable<R: Record> {
    fn table(&self) -> &RwLock<Table<R>>;

    /// Drop join rows that referenced removed records
    fn after_delete(&self, _ids: &[Id]) {}
}

impl MemoryTable<Tool> for MemoryStore {
    fn table(&self) -> &RwLock<Table<Tool>> {
        &self.tools
    }

    fn after_delete(&self, ids: &[Id]) {
        let mut links = self.links.write();
        for (association, rows) in links.iter_mut() {
            rows.retain(|row| {
                let origin_gone = ids.contains(&row.origin_id);
                let related_gone =
                    *association == Association::RelatedTool && ids.contains(&row.related_id);
                !(origin_gone || related_gone)
            });
        }
    }
}

impl MemoryTable<ToolType> for MemoryStore {
    fn table(&self) -> &RwLock<Table<ToolType>> {
        &self.tool_types
    }

    fn after_delete(&self, ids: &[Id]) {
        let mut links = self.links.write();
        if let Some(rows) = links.get_mut(&Association::ToolType) {
            rows.retain(|row| !ids.contains(&row.related_id));
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a row exactly as given, skipping validation, the way rows that
    /// predate the current rules come back from an existing database
    pub fn import<R: Record>(&self, record: R) -> R
    where
        Self: MemoryTable<R>,
    {
        MemoryTable::<R>::table(self).write().allocate(record)
    }

    pub fn count<R: Record>(&self) -> usize
    where
        Self: MemoryTable<R>,
    {
        MemoryTable::<R>::table(self).read().rows.len()
    }

    fn missing<R: Record>(id: Id) -> StoreError {
        StoreError::constraint(format!("{} {} no longer exists", R::KIND.noun(), id))
    }
}

#[async_trait::async_trait]
impl<R> RecordStore<R> for MemoryStore
where
    R: Record,
    MemoryStore: MemoryTable<R>,
{
    async fn load_by_id(&self, id: Id) -> Result<Option<R>> {
        Ok(MemoryTable::<R>::table(self).read().rows.get(&id).cloned())
    }

    async fn list(&self, filter: &ListFilter, archived: bool) -> Result<Page<R>> {
        let column = filter.sort_column::<R>();
        let needle = filter.search_term().map(str::to_lowercase);

        let mut items: Vec<R> = MemoryTable::<R>::table(self)
            .read()
            .rows
            .values()
            .filter(|r| r.archived() == archived)
            .filter(|r| match &needle {
                Some(needle) => r.display_name().to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            let ordering = match (a.sort_value(column), b.sort_value(column)) {
                (Some(x), Some(y)) => x.compare(&y),
                _ => std::cmp::Ordering::Equal,
            };
            let ordering = match filter.direction() {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.id().cmp(&b.id()))
        });

        let total = items.len();
        let items = items
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(Page {
            items,
            total,
            limit: filter.limit,
            limitstart: filter.offset(),
        })
    }

    async fn insert(&self, mut record: R) -> Result<R, StoreError> {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(StoreError::validation(errors));
        }
        record.set_id(0);
        record.set_created(Utc::now());
        Ok(MemoryTable::<R>::table(self).write().allocate(record))
    }

    async fn save(&self, record: &R) -> Result<R, StoreError> {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(StoreError::validation(errors));
        }
        let mut table = MemoryTable::<R>::table(self).write();
        let row = table
            .rows
            .get_mut(&record.id())
            .ok_or_else(|| Self::missing::<R>(record.id()))?;
        *row = record.clone();
        Ok(record.clone())
    }

    async fn delete(&self, record: &R) -> Result<(), StoreError> {
        let removed = MemoryTable::<R>::table(self).write().rows.remove(&record.id());
        if removed.is_none() {
            return Err(Self::missing::<R>(record.id()));
        }
        MemoryTable::<R>::after_delete(self, &[record.id()]);
        Ok(())
    }

    async fn set_update_where_id_in(&self, update: &FieldUpdate, ids: &[Id]) -> Result<u64> {
        let mut table = MemoryTable::<R>::table(self).write();
        let mut affected = 0;
        for id in ids {
            if let Some(row) = table.rows.get_mut(id) {
                row.apply_update(update);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete_where_id_in(&self, ids: &[Id]) -> Result<u64> {
        let removed: Vec<Id> = {
            let mut table = MemoryTable::<R>::table(self).write();
            ids.iter()
                .filter(|id| table.rows.remove(*id).is_some())
                .copied()
                .collect()
        };
        MemoryTable::<R>::after_delete(self, &removed);
        Ok(removed.len() as u64)
    }
}

#[async_trait::async_trait]
impl RelationshipStore for MemoryStore {
    async fn related_ids(&self, association: Association, origin_id: Id) -> Result<Vec<Id>> {
        Ok(self
            .links
            .read()
            .get(&association)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.origin_id == origin_id)
                    .map(|row| row.related_id)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn link(&self, association: Association, origin_id: Id, related_id: Id) -> Result<bool> {
        let mut links = self.links.write();
        let rows = links.entry(association).or_default();
        if rows
            .iter()
            .any(|row| row.origin_id == origin_id && row.related_id == related_id)
        {
            return Ok(false);
        }
        rows.push(Relationship::new(origin_id, related_id));
        Ok(true)
    }

    async fn replace_links(&self, association: Association, origin_id: Id, related_ids: &[Id]) -> Result<()> {
        let mut links = self.links.write();
        let rows = links.entry(association).or_default();
        rows.retain(|row| row.origin_id != origin_id);
        for related_id in related_ids {
            if !rows
                .iter()
                .any(|row| row.origin_id == origin_id && row.related_id == *related_id)
            {
                rows.push(Relationship::new(origin_id, *related_id));
            }
        }
        Ok(())
    }

    async fn get_tags(&self, ids: &[Id]) -> Result<Vec<Tag>> {
        let tags = self.tags.read();
        Ok(ids.iter().filter_map(|id| tags.get(id).cloned()).collect())
    }

    async fn upsert_tag(&self, raw_tag: &str) -> Result<Tag> {
        let normalized = normalize_tag(raw_tag);
        let mut tags = self.tags.write();
        if let Some(existing) = tags.values().find(|t| t.tag == normalized) {
            return Ok(existing.clone());
        }
        let id = tags.keys().next_back().copied().unwrap_or(0) + 1;
        let tag = Tag::new(id, raw_tag);
        tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn other_tools(&self, exclude: &[Id]) -> Result<Vec<Tool>> {
        let mut tools: Vec<Tool> = self
            .tools
            .read()
            .rows
            .values()
            .filter(|tool| !exclude.contains(&tool.id))
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> Tool {
        Tool::new(name, "Workshop handbook", "3-5")
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_created() {
        let store = MemoryStore::new();

        let first = RecordStore::<Tool>::insert(&store, tool("Gallery Walk")).await.unwrap();
        let second = RecordStore::<Tool>::insert(&store, tool("Muddiest Point")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(first.created.is_some());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_record() {
        let store = MemoryStore::new();

        let err = RecordStore::<ToolType>::insert(&store, ToolType::blank())
            .await
            .unwrap_err();

        match err {
            StoreError::Rejected { kind, messages } => {
                assert_eq!(kind, crate::store::FailureKind::Validation);
                assert_eq!(messages, vec!["description: required".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.count::<ToolType>(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for name in ["Round Robin", "one-minute paper", "Minute Survey", "Peer Review"] {
            store.import(tool(name));
        }
        let mut archived = tool("Minute Archive");
        archived.archived = true;
        store.import(archived);

        let filter = ListFilter {
            search: Some("MINUTE".to_string()),
            sort_dir: Some(SortDirection::Desc),
            ..Default::default()
        };
        let page = RecordStore::<Tool>::list(&store, &filter, false).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["one-minute paper", "Minute Survey"]);
        assert_eq!(page.total, 2);

        let filter = ListFilter {
            limit: Some(2),
            limitstart: Some(2),
            ..Default::default()
        };
        let page = RecordStore::<Tool>::list(&store, &filter, false).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Peer Review", "Round Robin"]);
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_destroying_tool_drops_its_links() {
        let store = MemoryStore::new();
        let a = store.import(tool("Think-Pair-Share"));
        let b = store.import(tool("Jigsaw"));
        let kind = store.import(ToolType::new("Discussion"));

        store.link(Association::ToolType, a.id, kind.id).await.unwrap();
        store.link(Association::RelatedTool, b.id, a.id).await.unwrap();

        RecordStore::<Tool>::delete(&store, &a).await.unwrap();

        assert!(store.related_ids(Association::ToolType, a.id).await.unwrap().is_empty());
        assert!(store.related_ids(Association::RelatedTool, b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_link_pairs_are_unique() {
        let store = MemoryStore::new();
        assert!(store.link(Association::Tag, 1, 7).await.unwrap());
        assert!(!store.link(Association::Tag, 1, 7).await.unwrap());
        assert_eq!(store.related_ids(Association::Tag, 1).await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_upsert_tag_matches_normalized_form() {
        let store = MemoryStore::new();
        let first = store.upsert_tag("Active Learning").await.unwrap();
        let second = store.upsert_tag("active-learning").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.raw_tag, "Active Learning");
    }
}
