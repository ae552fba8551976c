use serde::{Deserialize, Serialize};

use crate::model::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Search, sort and pagination state of an admin list view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<SortDirection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitstart: Option<usize>,
}

impl ListFilter {
    /// Trimmed search term, `None` when blank
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Fill unset limit and direction from configured defaults
    pub fn with_defaults(mut self, limit: usize, sort_dir: SortDirection) -> Self {
        if self.limit.is_none() {
            self.limit = Some(limit);
        }
        if self.sort_dir.is_none() {
            self.sort_dir = Some(sort_dir);
        }
        self
    }

    pub fn sort_column<R: Record>(&self) -> &'static str {
        R::sort_column(self.sort.as_deref())
    }

    pub fn direction(&self) -> SortDirection {
        self.sort_dir.unwrap_or_default()
    }

    pub fn offset(&self) -> usize {
        self.limitstart.unwrap_or(0)
    }
}

/// One page of a list view
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: Option<usize>,
    pub limitstart: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = ListFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), None);
    }

    #[test]
    fn test_defaults_do_not_override_request() {
        let filter = ListFilter {
            limit: Some(5),
            ..Default::default()
        }
        .with_defaults(20, SortDirection::Desc);

        assert_eq!(filter.limit, Some(5));
        assert_eq!(filter.direction(), SortDirection::Desc);
    }
}
