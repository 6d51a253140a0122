//! Offset-based pagination over the tracker's paged endpoints.
//!
//! Both the issue search and the per-issue changelog answer with a `total` and a
//! page of items. [`Pager`] walks such an endpoint lazily, one page per call, and
//! [`fetch_all`] drives a [`PageAccumulator`] across every page.

use crate::error::ReportError;
use crate::transport::{ApiRequest, Transport};
use crate::types::Paged;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Page size used when the caller gives no hint.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const START_AT: &str = "startAt";
const MAX_RESULTS: &str = "maxResults";

/// Receives each fetched page and reports how many items it consumed.
///
/// The returned count is what moves the offset forward, so it need not equal the
/// page length.
pub trait PageAccumulator {
    type Page: Paged + DeserializeOwned;

    fn accumulate(&mut self, page: Self::Page) -> usize;
}

/// Walks one paged endpoint lazily; the page type is chosen per [`Pager::next_page`] call.
pub struct Pager<'a, T: Transport + ?Sized> {
    transport: &'a T,
    request: ApiRequest,
    page_size: u32,
    offset: u64,
    total: Option<u64>,
}

impl<'a, T: Transport + ?Sized> Pager<'a, T> {
    pub fn new(transport: &'a T, request: ApiRequest, page_size: Option<u32>) -> Self {
        Self {
            transport,
            request,
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: 0,
            total: None,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Fetches the page at the current offset, or `None` once the offset has
    /// reached the reported total.
    pub async fn next_page<P>(&mut self) -> Result<Option<P>, ReportError>
    where
        P: Paged + DeserializeOwned,
    {
        if let Some(total) = self.total {
            if self.offset >= total {
                return Ok(None);
            }
        }

        let request = self.page_request();
        tracing::debug!(
            path = %request.path,
            offset = self.offset,
            page_size = self.page_size,
            "Requesting page"
        );

        let body = self.transport.send(&request).await?;
        let page: P = serde_json::from_value(body)
            .map_err(|e| ReportError::decode(format!("page of {}", request.path), e))?;
        self.total = Some(page.total());

        Ok(Some(page))
    }

    /// Moves the offset past `consumed` items of the last page.
    ///
    /// Consuming nothing while the offset is still short of the total would
    /// request the same page forever, so that is reported as
    /// [`ReportError::PaginationStalled`].
    pub fn advance(&mut self, consumed: usize) -> Result<(), ReportError> {
        let total = self.total.unwrap_or(0);
        self.offset += consumed as u64;

        if consumed == 0 && self.offset < total {
            return Err(ReportError::PaginationStalled {
                offset: self.offset,
                total,
            });
        }
        Ok(())
    }

    fn page_request(&self) -> ApiRequest {
        let mut request = self.request.clone();
        match request.body.as_mut() {
            Some(Value::Object(body)) => {
                body.insert(START_AT.to_string(), Value::from(self.offset));
                body.entry(MAX_RESULTS)
                    .or_insert_with(|| Value::from(self.page_size));
            }
            _ => {
                request.set_query(START_AT, self.offset);
                if request.query_value(MAX_RESULTS).is_none() {
                    request.set_query(MAX_RESULTS, self.page_size);
                }
            }
        }
        request
    }
}

/// Fetches every page of `request`, handing each to `accumulator`.
///
/// Stops once the offset reaches the `total` reported by the endpoint. Any
/// transport failure aborts the whole walk; nothing is retried.
pub async fn fetch_all<T, A>(
    transport: &T,
    request: ApiRequest,
    accumulator: &mut A,
    page_size: Option<u32>,
) -> Result<(), ReportError>
where
    T: Transport + ?Sized,
    A: PageAccumulator,
{
    let mut pager = Pager::new(transport, request, page_size);
    while let Some(page) = pager.next_page::<A::Page>().await? {
        let consumed = accumulator.accumulate(page);
        pager.advance(consumed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Deserialize)]
    struct NumberPage {
        total: u64,
        values: Vec<u64>,
    }

    impl Paged for NumberPage {
        fn total(&self) -> u64 {
            self.total
        }
    }

    /// Serves `total` sequential numbers and records every request it sees.
    struct NumberSource {
        total: u64,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl NumberSource {
        fn new(total: u64) -> Self {
            Self {
                total,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn offsets(&self) -> Vec<u64> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| match &r.body {
                    Some(body) => body["startAt"].as_u64().unwrap(),
                    None => r.query_value("startAt").unwrap().parse().unwrap(),
                })
                .collect()
        }
    }

    #[async_trait]
    impl Transport for NumberSource {
        async fn send(&self, request: &ApiRequest) -> Result<Value, ReportError> {
            self.requests.lock().unwrap().push(request.clone());
            let (start, size) = match &request.body {
                Some(body) => (
                    body["startAt"].as_u64().unwrap(),
                    body["maxResults"].as_u64().unwrap(),
                ),
                None => (
                    request.query_value("startAt").unwrap().parse().unwrap(),
                    request.query_value("maxResults").unwrap().parse().unwrap(),
                ),
            };
            let end = (start + size).min(self.total);
            let values: Vec<u64> = (start..end).collect();
            Ok(json!({ "total": self.total, "values": values }))
        }
    }

    #[derive(Default)]
    struct Collect {
        calls: usize,
        seen: Vec<u64>,
    }

    impl PageAccumulator for Collect {
        type Page = NumberPage;

        fn accumulate(&mut self, page: NumberPage) -> usize {
            self.calls += 1;
            let consumed = page.values.len();
            self.seen.extend(page.values);
            consumed
        }
    }

    #[tokio::test]
    async fn test_fetch_all_walks_every_page() {
        let source = NumberSource::new(25);
        let mut collect = Collect::default();

        fetch_all(&source, ApiRequest::get("/numbers"), &mut collect, Some(10))
            .await
            .unwrap();

        assert_eq!(source.offsets(), vec![0, 10, 20]);
        assert_eq!(collect.calls, 3);
        assert_eq!(collect.seen.len(), 25);
        assert_eq!(collect.seen, (0..25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fetch_all_embeds_offset_in_json_body() {
        let source = NumberSource::new(5);
        let mut collect = Collect::default();
        let request = ApiRequest::post("/search", json!({ "jql": "project = SI", "maxResults": 2 }));

        fetch_all(&source, request, &mut collect, None).await.unwrap();

        assert_eq!(source.offsets(), vec![0, 2, 4]);
        let requests = source.requests.lock().unwrap();
        assert_eq!(requests[0].body.as_ref().unwrap()["jql"], "project = SI");
    }

    #[tokio::test]
    async fn test_default_page_size() {
        let source = NumberSource::new(150);
        let mut collect = Collect::default();

        fetch_all(&source, ApiRequest::get("/numbers"), &mut collect, None)
            .await
            .unwrap();

        assert_eq!(source.offsets(), vec![0, 100]);
        let requests = source.requests.lock().unwrap();
        assert_eq!(requests[0].query_value("maxResults"), Some("100"));
    }

    #[tokio::test]
    async fn test_empty_result_set_makes_one_request() {
        let source = NumberSource::new(0);
        let mut collect = Collect::default();

        fetch_all(&source, ApiRequest::get("/numbers"), &mut collect, Some(10))
            .await
            .unwrap();

        assert_eq!(source.offsets(), vec![0]);
        assert_eq!(collect.calls, 1);
        assert!(collect.seen.is_empty());
    }

    struct ConsumeNothing;

    impl PageAccumulator for ConsumeNothing {
        type Page = NumberPage;

        fn accumulate(&mut self, _page: NumberPage) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn test_stalled_offset_is_an_error() {
        let source = NumberSource::new(25);

        let err = fetch_all(&source, ApiRequest::get("/numbers"), &mut ConsumeNothing, Some(10))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReportError::PaginationStalled {
                offset: 0,
                total: 25
            }
        ));
        assert_eq!(source.offsets(), vec![0]);
    }

    /// Consumes one item per page regardless of page length.
    struct OneAtATime(usize);

    impl PageAccumulator for OneAtATime {
        type Page = NumberPage;

        fn accumulate(&mut self, _page: NumberPage) -> usize {
            self.0 += 1;
            1
        }
    }

    #[tokio::test]
    async fn test_offset_follows_consumed_count() {
        let source = NumberSource::new(3);
        let mut acc = OneAtATime(0);

        fetch_all(&source, ApiRequest::get("/numbers"), &mut acc, Some(10))
            .await
            .unwrap();

        assert_eq!(acc.0, 3);
        assert_eq!(source.offsets(), vec![0, 1, 2]);
    }

    struct Failing;

    #[async_trait]
    impl Transport for Failing {
        async fn send(&self, request: &ApiRequest) -> Result<Value, ReportError> {
            Err(ReportError::Transport {
                status: 500,
                path: request.path.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let mut collect = Collect::default();
        let err = fetch_all(&Failing, ApiRequest::get("/numbers"), &mut collect, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::Transport { status: 500, .. }));
        assert_eq!(collect.calls, 0);
    }
}
