//! Page windows and page results.
//!
//! [`slice`] cuts a page out of an already materialized result list. Server-side
//! paging instead feeds [`PageRequest::offset`] and [`PageRequest::limit`] into a
//! `LIMIT/OFFSET` clause and counts the total with a separate query.

use serde::{Deserialize, Serialize};

/// A requested page window.
///
/// `from` overrides the computed start offset. When `page_size` is zero the
/// window ends at `to`, or at the end of the items if `to` is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_number: usize,
    pub page_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<usize>,
}

impl PageRequest {
    pub fn new(page_number: usize, page_size: usize) -> Self {
        Self {
            page_number,
            page_size,
            from: None,
            to: None,
        }
    }

    /// An unsized window over `[from, to)`.
    pub fn range(from: usize, to: usize) -> Self {
        Self {
            page_number: 0,
            page_size: 0,
            from: Some(from),
            to: Some(to),
        }
    }

    /// First item of the window.
    pub fn offset(&self) -> usize {
        self.from
            .unwrap_or_else(|| self.page_number.saturating_mul(self.page_size))
    }

    /// Number of items requested, `None` when the window is unbounded.
    pub fn limit(&self) -> Option<usize> {
        if self.page_size > 0 {
            return Some(self.page_size);
        }
        self.to.map(|to| to.saturating_sub(self.offset()))
    }
}

/// One page of results.
///
/// `page_elements == content.len()` and `total_elements >= page_elements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: usize,
    pub page_elements: usize,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page_number: usize, total_elements: u64) -> Self {
        let page_elements = content.len();
        Self {
            content,
            page_number,
            page_elements,
            total_elements: total_elements.max(page_elements as u64),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_elements: self.page_elements,
            total_elements: self.total_elements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Cut the requested window out of `items`.
///
/// Without a request every item is returned as page 0. A window starting past
/// the end yields an empty page rather than an error.
pub fn slice<T>(request: Option<&PageRequest>, items: Vec<T>) -> Page<T> {
    let total = items.len();
    let Some(request) = request else {
        return Page::new(items, 0, total as u64);
    };

    let start = request.offset().min(total);
    let rows = request
        .limit()
        .unwrap_or(total - start)
        .min(total - start);

    let content: Vec<T> = items.into_iter().skip(start).take(rows).collect();
    Page::new(content, request.page_number, total as u64)
}
