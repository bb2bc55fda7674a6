//! Segment pool behavior against a local fixture server.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hlsget_engine::assemble::{AssembleError, assemble};
use hlsget_engine::config::DownloaderConfig;
use hlsget_engine::fetch::{FailureCause, ProgressEvent, SegmentFetcher};
use hlsget_engine::playlist::SegmentEntry;
use url::Url;

use common::Route;

fn segment_entries(count: usize) -> Vec<SegmentEntry> {
    (0..count)
        .map(|index| SegmentEntry {
            uri: format!("seg{index}.ts"),
            index,
        })
        .collect()
}

fn segment_routes(count: usize) -> HashMap<String, Route> {
    (0..count)
        .map(|index| {
            (
                format!("/seg{index}.ts"),
                Route::ok(format!("payload-{index}")),
            )
        })
        .collect()
}

fn fetcher(config: DownloaderConfig) -> SegmentFetcher {
    let client = config.build_client().unwrap();
    SegmentFetcher::new(client, Arc::new(config))
}

#[tokio::test]
async fn every_index_gets_a_result_for_each_worker_count() {
    let base = Url::parse(&format!("{}/", common::start(segment_routes(8)))).unwrap();
    let segments = segment_entries(8);

    for workers in 1..=4 {
        let fetcher = fetcher(DownloaderConfig::default().with_workers(workers));
        let summary = fetcher.fetch_all(&base, &segments, None).await.unwrap();
        assert_eq!(summary.total, 8);
        assert_eq!(summary.results.len(), 8, "workers={workers}");
        assert_eq!(summary.failed(), 0, "workers={workers}");
        for (index, result) in &summary.results {
            assert_eq!(
                result.as_ref().unwrap(),
                &bytes::Bytes::from(format!("payload-{index}")),
                "workers={workers}"
            );
        }
    }
}

#[tokio::test]
async fn progress_fires_exactly_once_per_segment() {
    let base = Url::parse(&format!("{}/", common::start(segment_routes(6)))).unwrap();
    let segments = segment_entries(6);

    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::default();
    let sink: hlsget_engine::ProgressSink = {
        let events = Arc::clone(&events);
        Arc::new(move |event: ProgressEvent| {
            events.lock().unwrap().push(event);
        })
    };

    let fetcher = fetcher(DownloaderConfig::default());
    fetcher.fetch_all(&base, &segments, Some(sink)).await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 6);
    // The collector increments per completion, so events are monotone.
    for (position, event) in events.iter().enumerate() {
        assert_eq!(event.completed, position + 1);
        assert_eq!(event.total, 6);
    }
}

#[tokio::test]
async fn failures_are_data_and_do_not_abort_siblings() {
    let mut routes = segment_routes(5);
    routes.insert("/seg2.ts".to_owned(), Route::status(404));
    routes.insert(
        "/seg3.ts".to_owned(),
        Route::delayed("late", Duration::from_secs(5)),
    );
    let base = Url::parse(&format!("{}/", common::start(routes))).unwrap();
    let segments = segment_entries(5);

    let config = DownloaderConfig::default()
        .with_segment_timeout(Duration::from_millis(400));
    let summary = fetcher(config).fetch_all(&base, &segments, None).await.unwrap();

    assert_eq!(summary.results.len(), 5);
    assert_eq!(summary.failed(), 2);
    assert!(matches!(
        summary.results[&2],
        Err(FailureCause::HttpStatus(status)) if status.as_u16() == 404
    ));
    assert!(matches!(summary.results[&3], Err(FailureCause::Timeout)));
    assert!(summary.results[&0].is_ok());
    assert!(summary.results[&4].is_ok());

    // The partial map is refused at the assembly boundary, naming exactly
    // the failed indices.
    let AssembleError::Incomplete { missing } = assemble(summary).unwrap_err();
    assert_eq!(missing, vec![2, 3]);
}

#[tokio::test]
async fn unreachable_host_classifies_as_connection_error() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();

    let summary = fetcher(DownloaderConfig::default())
        .fetch_all(&base, &segment_entries(1), None)
        .await
        .unwrap();
    assert!(matches!(summary.results[&0], Err(FailureCause::Connection)));
}
