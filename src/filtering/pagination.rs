use serde::Serialize;
use std::ops::Range;

use crate::config::ResultViewPaginationConfig;

/// Option value of the "show every row" page size
pub const PAGE_SIZE_ALL_VALUE: &str = "__all__";

/// Pages listed without gaps up to this many pages
const MAX_UNCOLLAPSED_PAGES: usize = 7;

/// An entry of the page size selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSizeOption {
    pub value: String,
    pub label: String,
    /// `None` for the "all" option
    pub page_size: Option<usize>,
}

/// Page size options offered by the result grid.
///
/// Configured sizes are truncated to integers; non-finite, non-positive and repeated sizes are
/// dropped. A non-blank `ListItemAll` label appends the [`PAGE_SIZE_ALL_VALUE`] option. No
/// pagination block means pagination is disabled and no options are returned.
#[must_use]
pub fn pagination_options(pagination: Option<&ResultViewPaginationConfig>) -> Vec<PageSizeOption> {
    let Some(pagination) = pagination else {
        return Vec::new();
    };

    let mut sizes: Vec<usize> = Vec::new();
    for size in pagination.list.iter().flatten() {
        if !size.is_finite() || size.trunc() < 1.0 {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let size = size.trunc() as usize;
        if !sizes.contains(&size) {
            sizes.push(size);
        }
    }

    let mut options: Vec<PageSizeOption> = sizes
        .into_iter()
        .map(|size| PageSizeOption {
            value: size.to_string(),
            label: size.to_string(),
            page_size: Some(size),
        })
        .collect();

    if let Some(label) = pagination.list_item_all.as_deref().map(str::trim)
        && !label.is_empty()
    {
        options.push(PageSizeOption {
            value: PAGE_SIZE_ALL_VALUE.to_string(),
            label: label.to_string(),
            page_size: None,
        });
    }

    options
}

/// A button of the page navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PageItem {
    Page(usize),
    Gap,
}

/// Page buttons to show for `current_page` of `total_pages` (both 1-based).
///
/// Up to seven pages are all listed. Beyond that the first and last page stay visible and a
/// window of five pages follows the current page, with [`PageItem::Gap`] for the hidden runs.
#[must_use]
pub fn visible_page_items(current_page: usize, total_pages: usize) -> Vec<PageItem> {
    use PageItem::{Gap, Page};

    if total_pages <= MAX_UNCOLLAPSED_PAGES {
        return (1..=total_pages).map(Page).collect();
    }
    if current_page <= 4 {
        return vec![Page(1), Page(2), Page(3), Page(4), Page(5), Gap, Page(total_pages)];
    }
    if current_page >= total_pages - 3 {
        let mut items = vec![Page(1), Gap];
        items.extend((total_pages - 4..=total_pages).map(Page));
        return items;
    }

    let mut items = vec![Page(1), Gap];
    items.extend((current_page - 2..=current_page + 2).map(Page));
    items.extend([Gap, Page(total_pages)]);
    items
}

/// Number of pages, at least one. `None` page size shows every row on one page.
#[must_use]
pub fn total_pages(total_rows: usize, page_size: Option<usize>) -> usize {
    match page_size {
        Some(size) if size > 0 => total_rows.div_ceil(size).max(1),
        _ => 1,
    }
}

/// Rows shown on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    /// Page actually shown, clamped to the existing pages
    pub page: usize,
    /// 1-based number of the first row, 0 when there are no rows
    pub start: usize,
    /// 1-based number of the last row, 0 when there are no rows
    pub end: usize,
    pub total: usize,
    /// Index range into the result rows
    pub rows: Range<usize>,
}

impl PageRange {
    /// The rows of this page
    #[must_use]
    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        rows.get(self.rows.clone()).unwrap_or_default()
    }
}

/// Bounds of `current_page` (1-based, clamped) for `total_rows` rows.
#[must_use]
pub fn page_range(total_rows: usize, page_size: Option<usize>, current_page: usize) -> PageRange {
    let page = current_page.clamp(1, total_pages(total_rows, page_size));
    if total_rows == 0 {
        return PageRange {
            page,
            start: 0,
            end: 0,
            total: 0,
            rows: 0..0,
        };
    }

    let (offset, end) = match page_size {
        Some(size) if size > 0 => {
            let offset = (page - 1) * size;
            (offset, (page * size).min(total_rows))
        }
        _ => (0, total_rows),
    };

    PageRange {
        page,
        start: offset + 1,
        end,
        total: total_rows,
        rows: offset..end,
    }
}

/// Fill a `DisplaySummary` template: `{0}` first row, `{1}` last row, `{2}` total.
#[must_use]
pub fn format_pagination_summary(template: &str, start: usize, end: usize, total: usize) -> String {
    template
        .replace("{0}", &start.to_string())
        .replace("{1}", &end.to_string())
        .replace("{2}", &total.to_string())
}
