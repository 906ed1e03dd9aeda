//! Request context collaborator used by pagination.

/// Resolves the current page number of an inbound request.
///
/// Outside of a request context (e.g. a command-line invocation) no resolver
/// is configured and pagination starts at page `1`.
pub trait PageResolver: Send + Sync {
    /// Returns the page requested through `page_param`, if any.
    fn current_page(&self, page_param: &str) -> Option<u64>;
}

/// A resolver that always reports the same page.
#[derive(Debug, Clone, Copy)]
pub struct FixedPage(pub u64);

impl PageResolver for FixedPage {
    fn current_page(&self, _page_param: &str) -> Option<u64> {
        Some(self.0)
    }
}
