//! Query state: page, page size, sort order and filter.

use crate::{error::Result, DataItem, Error, ReadParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// One level of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field to sort by
    pub field: String,
    /// Direction for this field
    pub direction: Direction,
}

impl SortKey {
    /// Create a new sort key.
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Descending)
    }
}

/// Predicate deciding which items appear in the view.
#[derive(Clone)]
pub struct Filter(Arc<dyn Fn(&DataItem) -> bool + Send + Sync>);

impl Filter {
    /// Wrap a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&DataItem) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Keep items whose `field` equals `value`.
    pub fn field_equals(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let field = field.into();
        let value = value.into();
        Self::new(move |item| item[field.as_str()] == value)
    }

    /// Apply the predicate.
    pub fn matches(&self, item: &DataItem) -> bool {
        (self.0)(item)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter(..)")
    }
}

/// Current page, page size, sort and filter of a data source.
#[derive(Debug, Clone)]
pub struct QueryState {
    page: usize,
    page_size: Option<usize>,
    sort: Vec<SortKey>,
    filter: Option<Filter>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: None,
            sort: Vec::new(),
            filter: None,
        }
    }
}

impl QueryState {
    /// First page, unbounded page size, no sort, no filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page (1-based).
    pub fn page(&self) -> usize {
        self.page
    }

    /// Current page size; `None` means unbounded.
    pub fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    /// Current sort specification, applied left to right.
    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    /// Current filter.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn set_page(&mut self, page: usize) -> Result<()> {
        if page == 0 {
            return Err(Error::InvalidPage);
        }
        self.page = page;
        Ok(())
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(Error::InvalidPageSize);
        }
        self.page_size = Some(page_size);
        Ok(())
    }

    pub fn clear_page_size(&mut self) {
        self.page_size = None;
    }

    pub fn set_sort(&mut self, sort: Vec<SortKey>) {
        self.sort = sort;
    }

    pub fn clear_sort(&mut self) {
        self.sort.clear();
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = Some(filter);
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Index range of the current page within a set of `len` items.
    ///
    /// Pages past the end yield an empty range.
    pub fn window(&self, len: usize) -> std::ops::Range<usize> {
        match self.page_size {
            None => 0..len,
            Some(size) => {
                let start = (self.page - 1).saturating_mul(size).min(len);
                let end = start.saturating_add(size).min(len);
                start..end
            }
        }
    }

    /// Read payload carrying this state as paging and sort hints.
    pub fn read_params(&self, args: Vec<serde_json::Value>) -> ReadParams {
        ReadParams {
            args,
            page: self.page_size.map(|_| self.page),
            page_size: self.page_size,
            sort: self.sort.clone(),
        }
    }
}
