//! Paginated results.

use super::collection::Collection;

/// One page of a [`Collection`] plus paging metadata.
#[derive(Debug, Clone)]
pub struct Pagination {
    items: Collection,
    total: u64,
    per_page: u64,
    current_page: u64,
    last_page: u64,
    page_name: String,
}

impl Pagination {
    /// Wraps a page of results.
    ///
    /// `last_page` is `ceil(total / per_page)`, and never less than `1`.
    pub fn new(
        items: Collection,
        per_page: u64,
        current_page: u64,
        page_name: impl Into<String>,
    ) -> Self {
        let total = items.total();
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };

        Self {
            items,
            total,
            per_page,
            current_page,
            last_page,
            page_name: page_name.into(),
        }
    }

    /// The models on this page.
    pub fn items(&self) -> &Collection {
        &self.items
    }

    /// Consumes the paginator, returning the page of models.
    pub fn into_items(self) -> Collection {
        self.items
    }

    /// Number of models on this page.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Total matching documents.
    pub fn total(&self) -> u64 {
        self.total
    }

    #[allow(missing_docs)]
    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    #[allow(missing_docs)]
    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    #[allow(missing_docs)]
    pub fn last_page(&self) -> u64 {
        self.last_page
    }

    /// The request parameter that carries the page number.
    pub fn page_name(&self) -> &str {
        &self.page_name
    }

    /// Returns true if pages follow the current one.
    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }

    /// Returns true on the first page.
    pub fn on_first_page(&self) -> bool {
        self.current_page <= 1
    }

    /// 1-based position of the first model on this page.
    pub fn first_item(&self) -> Option<u64> {
        if self.items.is_empty() {
            return None;
        }
        self.current_page
            .saturating_sub(1)
            .checked_mul(self.per_page)?
            .checked_add(1)
    }

    /// 1-based position of the last model on this page.
    pub fn last_item(&self) -> Option<u64> {
        self.first_item()
            .and_then(|first| first.checked_add(self.items.len() as u64 - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_page_has_single_last_page() {
        let page = Pagination::new(Collection::empty(), 15, 1, "page");
        assert_eq!(page.total(), 0);
        assert_eq!(page.last_page(), 1);
        assert!(!page.has_more_pages());
        assert_eq!(page.first_item(), None);
        assert_eq!(page.page_name(), "page");
    }
}
