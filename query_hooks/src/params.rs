//! Typed list parameters
//!
//! Every list screen pages, searches and filters the same way. `ListParams`
//! is that shared shape; it turns into a `QueryDescriptor` for keying.

use query_key::{ParamValue, QueryDescriptor};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// A dropdown filter. `All` means the filter is not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Filter {
    #[default]
    All,
    Is(String),
}

impl Filter {
    /// Parse a raw dropdown value; empty and `all` (any case) mean no filter.
    /// Values are lowercased, matching is case-insensitive.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            Filter::All
        } else {
            Filter::Is(value.to_lowercase())
        }
    }

    pub fn is(value: impl AsRef<str>) -> Self {
        Self::parse(value.as_ref())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Filter::All => None,
            Filter::Is(value) => Some(value),
        }
    }

    /// Whether a record with this value passes the filter
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::Is(expected) => expected.eq_ignore_ascii_case(value),
        }
    }
}

impl From<Option<String>> for Filter {
    fn from(value: Option<String>) -> Self {
        value.map_or(Filter::All, |value| Filter::parse(&value))
    }
}

impl From<Filter> for Option<String> {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::All => None,
            Filter::Is(value) => Some(value),
        }
    }
}

impl From<&Filter> for ParamValue {
    fn from(filter: &Filter) -> Self {
        match filter {
            Filter::All => ParamValue::Null,
            Filter::Is(value) => ParamValue::Text(value.clone()),
        }
    }
}

/// Page, search and filters for a list query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub search: String,
    pub status: Filter,
    pub category: Filter,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: String::new(),
            status: Filter::All,
            category: Filter::All,
        }
    }
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn status(mut self, status: Filter) -> Self {
        self.status = status;
        self
    }

    pub fn category(mut self, category: Filter) -> Self {
        self.category = category;
        self
    }

    /// Descriptor for the list query of `resource`
    pub fn descriptor(&self, resource: &str) -> QueryDescriptor {
        QueryDescriptor::new(resource)
            .with_param("page", self.page)
            .with_param("limit", self.limit)
            .with_param("search", self.search.trim())
            .with_param("status", &self.status)
            .with_param("category", &self.category)
    }

    /// Zero-based index of the first record on this page
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.limit as usize
    }

    /// Case-insensitive search over the given fields; an empty search matches everything
    pub fn search_matches(&self, fields: &[&str]) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || fields
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// One page of a list response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of matching records across all pages
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        Self {
            items,
            total,
            page,
            limit,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(u64::from(self.limit))
        }
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parse() {
        assert_eq!(Filter::parse(""), Filter::All);
        assert_eq!(Filter::parse("ALL"), Filter::All);
        assert_eq!(Filter::parse(" active "), Filter::Is("active".into()));
        assert!(Filter::parse("Active").accepts("active"));
        assert!(!Filter::is("active").accepts("graduated"));
    }

    #[test]
    fn test_filter_serde() {
        let params: ListParams =
            serde_json::from_str(r#"{"page": 2, "status": "all", "category": "science"}"#).unwrap();
        assert_eq!(params.page, 2);
        assert_eq!(params.limit, DEFAULT_LIMIT);
        assert!(params.status.is_all());
        assert_eq!(params.category.as_str(), Some("science"));

        let json = serde_json::to_value(&params).unwrap();
        assert!(json["status"].is_null());
    }

    #[test]
    fn test_no_filter_and_default_share_a_key() {
        let explicit = ListParams::new()
            .search("  ")
            .status(Filter::parse("all"))
            .descriptor("students");
        let default = ListParams::new().descriptor("students");
        assert_eq!(explicit.key().unwrap(), default.key().unwrap());
    }

    #[test]
    fn test_filter_case_shares_a_key() {
        let lower = ListParams::new().status(Filter::is("active"));
        let title = ListParams::new().status(Filter::parse("Active"));
        assert_eq!(title.status, Filter::Is("active".into()));
        assert_eq!(
            lower.descriptor("students").key().unwrap(),
            title.descriptor("students").key().unwrap()
        );

        let params: ListParams = serde_json::from_str(r#"{"status": "ACTIVE"}"#).unwrap();
        assert_eq!(params.status, lower.status);
    }

    #[test]
    fn test_pages_get_distinct_keys() {
        let first = ListParams::new().page(1).descriptor("students").key().unwrap();
        let second = ListParams::new().page(2).descriptor("students").key().unwrap();
        let courses = ListParams::new().page(1).descriptor("courses").key().unwrap();
        assert_ne!(first, second);
        assert_ne!(first, courses);
    }

    #[test]
    fn test_page_math() {
        let page = Page::new(vec![1, 2], 42, 5, 10);
        assert_eq!(page.total_pages(), 5);
        assert!(!page.has_next());
        assert!(page.has_previous());
        assert_eq!(ListParams::new().page(3).offset(), 20);
        assert_eq!(ListParams::new().page(0).offset(), 0);
    }

    #[test]
    fn test_search_matches() {
        let params = ListParams::new().search("ADA");
        assert!(params.search_matches(&["Ada", "Lovelace"]));
        assert!(!params.search_matches(&["Grace", "Hopper"]));
        assert!(ListParams::new().search_matches(&[]));
    }
}
