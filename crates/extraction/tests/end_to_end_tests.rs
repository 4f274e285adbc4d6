//! Fetch from an in-memory archive, then extract and write the table.

mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{NaiveDate, NaiveTime};
use object_store::{memory::InMemory, path::Path, ObjectStore};

use acquisition::{FetchConfig, Fetcher, KeySpace};
use common::{band, options, SyntheticDecoder};
use extraction::{scan_groups, DateRange, Extractor};
use himawari_common::{Segment, TimeWindow};
use storage::{LocalArtifactStore, RemoteStore};
use test_utils::{count_entries, object_key, segment_artifact, temp_test_dir, test_product, time};

#[tokio::test]
async fn test_fetch_then_extract() {
    let data = temp_test_dir();
    let work = temp_test_dir();
    let out = temp_test_dir();
    let product = test_product();

    // Archive: two instants x two bands of segment 4, one object missing
    let archive = InMemory::new();
    for (group, b, value) in [
        (time::MORNING, 14, 300.0),
        (time::MORNING, 15, 301.0),
        (time::MORNING_NEXT, 14, 302.0),
    ] {
        let key = object_key(group, b, 4);
        archive
            .put(
                &Path::from(key.remote_path(&product)),
                Bytes::from(segment_artifact(value)).into(),
            )
            .await
            .unwrap();
    }
    let remote = Arc::new(RemoteStore::from_store(Arc::new(archive), "noaa-himawari9"));

    let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let window = TimeWindow {
        from: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        to: NaiveTime::from_hms_opt(10, 10, 0).unwrap(),
    };
    let space = KeySpace::new(
        day,
        day,
        10,
        Some(window),
        vec![band(14), band(15)],
        vec![Segment::new(4).unwrap()],
    )
    .unwrap();
    assert_eq!(space.len(), 4);

    let local = LocalArtifactStore::open(data.path()).unwrap();
    let config = FetchConfig {
        max_concurrent: 2,
        max_retries: 0,
        initial_retry_delay: Duration::from_millis(1),
        max_retry_delay: Duration::from_millis(1),
    };
    let fetcher = Fetcher::new(remote, local.clone(), product.clone(), config);
    let fetched = fetcher.run(space.iter()).await;

    assert_eq!(fetched.fetched, 3);
    assert_eq!(fetched.absent, 1);
    assert_eq!(fetched.failed, 0);
    assert_eq!(local.list().unwrap().len(), 3);

    // Extraction
    let range = DateRange { start: day, end: day };
    let groups = scan_groups(&local, &product, Some(range)).unwrap();
    assert_eq!(groups.len(), 2);

    let extractor = Extractor::new(SyntheticDecoder::default(), options(work.path()));
    let (table, summary) = extractor.run(groups, &AtomicBool::new(false));
    assert_eq!(summary.extracted, 2);
    assert_eq!(table.len(), 2);
    assert_eq!(count_entries(work.path()), 0);

    let csv_path = out.path().join("himawari_point.csv");
    table.write_to_path(&csv_path, "").unwrap();
    let text = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "timestamp_ph,timestamp_utc,latitude,longitude,B14,B15",
            "2025-03-01 18:00:00,2025-03-01 10:00:00,14.77083,120.45537,300,301",
            "2025-03-01 18:10:00,2025-03-01 10:10:00,14.77083,120.45537,302,",
        ]
    );
}
