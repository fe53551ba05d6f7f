//! Query-string types shared by the list endpoints.

use serde::Deserialize;

use recollect_core::{ListFilter, Page, Result, Urgency};

/// Pagination plus optional filters for list endpoints.
///
/// `tags` is a repeated parameter (`?tags=infra&tags=oncall`) and filters to
/// records whose tag set contains every listed tag. Handlers extract this
/// with `axum_extra::extract::Query`, which collects repeated keys into the
/// `Vec`; axum's own extractor rejects them.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub importance: Option<Urgency>,
}

impl ListQuery {
    pub fn page(&self) -> Result<Page> {
        Page::new(self.limit, self.offset)
    }

    pub fn filter(&self) -> ListFilter {
        let tags = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        ListFilter {
            tags,
            importance: self.importance,
        }
    }
}
