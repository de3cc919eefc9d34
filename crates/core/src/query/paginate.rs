//! Offset/limit pagination with a hard page-size ceiling.

use super::params::Pagination;
use crate::record::Record;

/// One page of results plus the numbers needed for metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Slice `records` according to `pagination`.
///
/// `limit` is clamped to `[1, max_limit]` regardless of what was requested.
/// An explicit offset wins over the page number.
pub fn paginate(records: Vec<Record>, pagination: Option<&Pagination>, default_limit: usize, max_limit: usize) -> Page {
    let max_limit = max_limit.max(1);
    let requested = pagination.copied().unwrap_or_default();

    let limit = requested.limit.unwrap_or(default_limit).clamp(1, max_limit);
    let (page, offset) = match requested.offset {
        Some(offset) => (offset / limit + 1, offset),
        None => {
            let page = requested.page.unwrap_or(1).max(1);
            (page, (page - 1).saturating_mul(limit))
        }
    };

    let total = records.len();
    let has_more = offset.saturating_add(limit) < total;
    let records = records.into_iter().skip(offset).take(limit).collect();

    Page { records, total, page, limit, offset, has_more }
}
