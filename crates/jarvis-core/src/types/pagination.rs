//! Keyset pagination over ranked pattern lists.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Id of the last item of the previous page.
    pub after_id: Option<String>,
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(rename = "patterns")]
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Slice an already-ordered list. `None` when the cursor names no item,
    /// e.g. a pattern retired since the previous page was served.
    pub fn from_ordered(items: Vec<T>, request: &PageRequest, id_of: impl Fn(&T) -> &str) -> Option<Self> {
        let limit = request.effective_limit();
        let start = match &request.after_id {
            Some(after) => items.iter().position(|item| id_of(item) == after)? + 1,
            None => 0,
        };
        let has_more = items.len() > start + limit;
        let page: Vec<T> = items.into_iter().skip(start).take(limit).collect();
        let next_cursor = if has_more {
            page.last().map(|item| id_of(item).to_string())
        } else {
            None
        };
        Some(Self { items: page, has_more, next_cursor })
    }
}
