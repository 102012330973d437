//! Pagination control layout: a bounded window of page links with ellipses.

use serde::Serialize;

/// Up to this many pages are all listed.
const MAX_UNCOMPRESSED: u32 = 7;

/// Current pages at or within this distance of an end use the edge layout.
const EDGE_SPAN: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "page")]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub item: PageItem,
    pub active: bool,
    pub disabled: bool,
}

/// Rendered pagination control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pager {
    pub links: Vec<PageLink>,
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

/// Page numbers and ellipses for `current` of `total` pages.
pub fn page_items(current: u32, total: u32) -> Vec<PageItem> {
    if total == 0 {
        return Vec::new();
    }
    if total <= MAX_UNCOMPRESSED {
        return (1..=total).map(PageItem::Page).collect();
    }
    let current = current.clamp(1, total);

    let window = if current <= EDGE_SPAN + 1 {
        1..=(current + 1).max(3)
    } else if current >= total - EDGE_SPAN {
        (current - 1).min(total - 2)..=total
    } else {
        (current - 1)..=(current + 1)
    };

    let mut pages: Vec<u32> = Vec::with_capacity(7);
    pages.push(1);
    pages.extend(window);
    pages.push(total);
    pages.sort_unstable();
    pages.dedup();

    let mut items = Vec::with_capacity(pages.len() + 2);
    let mut previous = None;
    for page in pages {
        if let Some(prev) = previous {
            match page - prev {
                1 => {}
                // One missing page is shown, never elided.
                2 => items.push(PageItem::Page(prev + 1)),
                _ => items.push(PageItem::Ellipsis),
            }
        }
        items.push(PageItem::Page(page));
        previous = Some(page);
    }
    items
}

/// Full control state; every link is disabled while a fetch is in flight.
pub fn render(current: u32, total: u32, loading: bool) -> Pager {
    let links = page_items(current, total)
        .into_iter()
        .map(|item| PageLink {
            item,
            active: item == PageItem::Page(current),
            disabled: loading || item == PageItem::Ellipsis,
        })
        .collect();
    Pager {
        links,
        previous_enabled: !loading && total > 0 && current > 1,
        next_enabled: !loading && current < total,
    }
}
