use garde::Validate;
use http::Uri;
use serde::Serialize;
use url::{form_urlencoded, Url};
use yamdb_dal::{Batch, ListingParams};

use crate::{error::ApiResult, state::AppState};

const PAGE_PARAM: &str = "page";

#[derive(Debug, Clone, Default, Validate, serde::Deserialize)]
pub struct Paging {
    #[garde(range(min = 1))]
    page: Option<u32>,
    #[garde(range(min = 1, max = 1000))]
    page_size: Option<u32>,
}

impl Paging {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self { page, page_size }
    }

    pub fn page_size(&self, default_page_size: u32) -> u32 {
        self.page_size.unwrap_or(default_page_size).max(1)
    }

    pub fn into_listing_params(self, default_page_size: u32) -> ListingParams {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size(default_page_size);
        let offset = i64::from(page - 1) * i64::from(page_size);
        ListingParams::new(offset, page_size.into())
    }
}

/// Page of results with absolute links to neighbour pages.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<Url>,
    pub previous: Option<Url>,
    pub results: Vec<T>,
}

impl<T: Serialize> Page<T> {
    /// `uri` is the original request URI, its other query parameters are kept in links.
    pub fn from_batch(batch: Batch<T>, state: &AppState, uri: &Uri) -> ApiResult<Self> {
        let limit = batch.limit.max(1);
        let page = batch.offset / limit + 1;
        let total = i64::try_from(batch.total).unwrap_or(i64::MAX);
        let next = if batch.offset + limit < total {
            Some(page_link(state, uri, page + 1)?)
        } else {
            None
        };
        let previous = if page > 1 {
            Some(page_link(state, uri, page - 1)?)
        } else {
            None
        };
        Ok(Page {
            count: batch.total,
            next,
            previous,
            results: batch.rows,
        })
    }
}

// First page link has no page parameter
fn page_query(query: Option<&str>, page: i64) -> Option<String> {
    let pairs = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .filter(|(name, _)| name != PAGE_PARAM);
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs);
    if page > 1 {
        serializer.append_pair(PAGE_PARAM, &page.to_string());
    }
    let query = serializer.finish();
    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}

fn page_link(state: &AppState, uri: &Uri, page: i64) -> ApiResult<Url> {
    let query = page_query(uri.query(), page);
    Ok(state.build_url(uri.path(), query.as_deref())?)
}
