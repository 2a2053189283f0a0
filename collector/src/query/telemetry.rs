use crate::model::{HostSample, RunWindow, TelemetryDocument};
use crate::query::{epoch_second_range, sort_ascending};
use crate::store::{search_hits, SearchStore, StoreError};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// Search body for telemetry recorded in `window`, continuing after `cursor` when given.
///
/// The cursor is sent as epoch milliseconds, the sort value the store uses for date fields.
pub fn telemetry_query(
    window: RunWindow,
    cursor: Option<DateTime<Utc>>,
    page_size: usize,
) -> Value {
    let mut body = Map::new();
    body.insert("from".to_string(), json!(0));
    body.insert(
        "query".to_string(),
        epoch_second_range("@timestamp", window.start, Some(window.end)),
    );
    if let Some(cursor) = cursor {
        body.insert(
            "search_after".to_string(),
            json!([cursor.timestamp_millis()]),
        );
    }
    body.insert("size".to_string(), json!(page_size));
    body.insert("sort".to_string(), sort_ascending("@timestamp"));

    Value::Object(body)
}

#[derive(Debug)]
pub enum PageOutcome {
    /// The next page of samples, possibly empty if the page only held other document kinds.
    Page(Vec<HostSample>),
    /// No more samples in the window.
    Done,
    /// The store failed; no further pages will be requested.
    Failed(StoreError),
}

/// Cursor-based pagination over the telemetry recorded in a run window.
///
/// Each call to [TelemetryPages::next_page] issues one query. The cursor only moves forward, and
/// once [PageOutcome::Done] or [PageOutcome::Failed] has been returned every further call returns
/// [PageOutcome::Done].
pub struct TelemetryPages<'a, S: ?Sized> {
    store: &'a S,
    index: &'a str,
    window: RunWindow,
    page_size: usize,
    cursor: Option<DateTime<Utc>>,
    finished: bool,
}

impl<'a, S> TelemetryPages<'a, S>
where
    S: SearchStore + ?Sized,
{
    pub fn new(store: &'a S, index: &'a str, window: RunWindow, page_size: usize) -> Self {
        Self {
            store,
            index,
            window,
            page_size,
            cursor: None,
            finished: false,
        }
    }

    /// Timestamp of the last document seen so far.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    pub async fn next_page(&mut self) -> PageOutcome {
        if self.finished {
            return PageOutcome::Done;
        }

        let query = telemetry_query(self.window, self.cursor, self.page_size);
        let hits = match search_hits(self.store, self.index, &query).await {
            Ok(hits) => hits,
            Err(e) => {
                self.finished = true;
                return PageOutcome::Failed(e);
            }
        };

        if hits.is_empty() {
            self.finished = true;
            return PageOutcome::Done;
        }

        let mut first = None;
        let mut last = None;
        let mut samples = Vec::with_capacity(hits.len());
        for hit in hits {
            match TelemetryDocument::parse(&hit.source) {
                Ok(document) => {
                    first.get_or_insert(document.timestamp);
                    last = Some(document.timestamp);
                    samples.extend(document.sample);
                }
                Err(e) => log::warn!("Skipping malformed telemetry document: {e}"),
            }
        }

        let (Some(first), Some(last)) = (first, last) else {
            log::warn!("Telemetry page had no readable documents, stopping");
            self.finished = true;
            return PageOutcome::Done;
        };

        if self.cursor.is_some_and(|cursor| last <= cursor) {
            log::warn!("Telemetry cursor did not advance past {last}, stopping");
            self.finished = true;
            return PageOutcome::Done;
        }

        log::info!("{first} {last}");
        self.cursor = Some(last);

        PageOutcome::Page(samples)
    }
}
