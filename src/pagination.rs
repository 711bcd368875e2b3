use crate::models::Filters;
use hyper::HeaderMap;
use hyper::header::{CONTENT_RANGE, HeaderName, HeaderValue};

/// Correct a compiled [`Filters`] report against the total row count, once
/// the storage engine has produced it.
///
/// A negative offset clamps to zero; an offset at or past the end moves back
/// to the start of the last page (or zero without a positive limit); an
/// empty result set pins the report to offset zero, page one. The current
/// page and `count` are recomputed either way, `adjusted` is sticky, and a
/// second call with the same count changes nothing.
pub fn normalize(filters: &mut Filters, total_count: i64) -> bool {
    let mut adjusted = false;
    filters.count = total_count;

    if filters.offset < 0 {
        filters.offset = 0;
        adjusted = true;
    }
    if total_count <= 0 {
        if filters.offset != 0 {
            filters.offset = 0;
            adjusted = true;
        }
    } else if filters.offset >= total_count {
        filters.offset = if filters.limit > 0 {
            ((total_count - 1) / filters.limit) * filters.limit
        } else {
            0
        };
        adjusted = true;
    }

    filters.page = if filters.limit > 0 {
        filters.offset / filters.limit + 1
    } else {
        1
    };
    if adjusted {
        filters.adjusted = true;
    }
    adjusted
}

/// Pagination headers for a list response: `Content-Range` in
/// `<resource> start-end/total` form plus `X-Total-Count`.
#[must_use]
pub fn content_range_headers(
    offset: i64,
    limit: i64,
    total_count: i64,
    resource: &str,
) -> HeaderMap {
    let start = offset.max(0);
    let last = (total_count - 1).max(0);
    let end = if limit > 0 {
        (start + limit - 1).min(last)
    } else {
        last
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("{resource} {start}-{end}/{total_count}")) {
        headers.insert(CONTENT_RANGE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&total_count.to_string()) {
        headers.insert(HeaderName::from_static("x-total-count"), value);
    }
    headers
}
