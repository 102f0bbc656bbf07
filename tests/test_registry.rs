/// Multi-book routing and replay tests

use depth_sync::{
    BookRegistry, OrderBook, PartialUpdate, PriceLevel, Replay, ReplayConfig, SequenceGap, Snapshot,
};

fn lvl(price: f64, quantity: f64) -> PriceLevel {
    PriceLevel::new(price, quantity)
}

fn snapshot(last_update_id: i64) -> Snapshot {
    Snapshot::new(
        vec![lvl(100.0, 1.0), lvl(99.0, 2.0)],
        vec![lvl(101.0, 1.0), lvl(102.0, 2.0)],
        last_update_id,
    )
}

fn diff(first: i64, last: i64) -> PartialUpdate {
    PartialUpdate::new(vec![lvl(100.0, last as f64)], vec![], first, last)
}

fn registry_with(epochs: &[(i64, i64)]) -> BookRegistry {
    let mut registry = BookRegistry::new();
    for &(epoch, last_update_id) in epochs {
        registry.insert(epoch, &snapshot(last_update_id));
    }
    registry
}

#[test]
fn test_route_skips_and_applies_per_book() {
    // Book 1 at id 100, book 2 at id 110
    let mut registry = registry_with(&[(1, 100), (2, 110)]);
    let mut notified = Vec::new();

    let report = registry.route(&diff(101, 105), &mut |book: &OrderBook| notified.push(book.id()));
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.retired.is_empty());
    assert_eq!(notified, vec![1]);

    let report = registry.route(&diff(106, 111), &mut |book: &OrderBook| notified.push(book.id()));
    assert_eq!(report.applied, 2);
    assert_eq!(notified, vec![1, 1, 2]);
    assert_eq!(registry.get(1).unwrap().last_update_id(), 111);
    assert_eq!(registry.get(2).unwrap().last_update_id(), 111);
}

#[test]
fn test_gap_retires_only_affected_book() {
    let mut registry = registry_with(&[(1, 100), (2, 105)]);

    let report = registry.route(&diff(106, 108), &mut |_: &OrderBook| {});
    assert_eq!(report.applied, 1);
    assert_eq!(
        report.retired,
        vec![SequenceGap {
            book_id: 1,
            expected: 101,
            received: 106,
        }]
    );

    assert_eq!(registry.live().collect::<Vec<_>>(), vec![2]);
    assert_eq!(registry.gaps().gap_count(), 1);
    assert_eq!(registry.gaps().total_missing(), 5);
    assert_eq!(registry.stats().gap_events(), 1);
    assert_eq!(registry.stats().applied(), 1);
}

#[test]
fn test_retired_book_can_be_rebuilt() {
    let mut registry = registry_with(&[(1, 100)]);
    registry.route(&diff(110, 112), &mut |_: &OrderBook| {});
    assert!(registry.is_empty());

    registry.insert(1, &snapshot(112));
    let report = registry.route(&diff(113, 113), &mut |_: &OrderBook| {});
    assert_eq!(report.applied, 1);
}

#[test]
fn test_parallel_route_matches_sequential() {
    let epochs: Vec<(i64, i64)> = (0..16).map(|i| (i, 100 + i * 3)).collect();
    let mut sequential = registry_with(&epochs);
    let mut parallel = registry_with(&epochs);

    let diffs = [diff(95, 101), diff(102, 120), diff(121, 121), diff(125, 130), diff(131, 140)];
    for d in &diffs {
        let mut seq_seen = Vec::new();
        let mut par_seen = Vec::new();
        let a = sequential.route(d, &mut |b: &OrderBook| seq_seen.push(b.id()));
        let b = parallel.route_parallel(d, &mut |b: &OrderBook| par_seen.push(b.id()));
        assert_eq!(a, b);
        assert_eq!(seq_seen, par_seen);
    }

    assert_eq!(sequential.live().collect::<Vec<_>>(), parallel.live().collect::<Vec<_>>());
    for (s, p) in sequential.books().zip(parallel.books()) {
        assert_eq!(s.last_update_id(), p.last_update_id());
        assert_eq!(s.depth(10), p.depth(10));
    }
}

fn snapshot_record(last_update_id: i64) -> String {
    format!(
        r#"1700000000000|{{"lastUpdateId":{last_update_id},"bids":[["100.0","1.0"],["99.0","2.0"]],"asks":[["101.0","1.0"],["102.0","2.0"]]}}"#
    )
}

fn update_record(first: i64, last: i64, bid_price: &str, bid_qty: &str) -> String {
    format!(
        r#"1700000000100|{{"stream":"btcusdt@depth@100ms","data":{{"e":"depthUpdate","U":{first},"u":{last},"b":[["{bid_price}","{bid_qty}"]],"a":[]}}}}"#
    )
}

#[test]
fn test_replay_end_to_end() {
    let config = ReplayConfig {
        depth: 2,
        ..ReplayConfig::default()
    };
    let mut replay = Replay::new(config).unwrap();

    let early = replay
        .add_snapshot_record("./binance.BTCUSDT@orderbook5000.1000", &snapshot_record(100))
        .unwrap();
    let late = replay
        .add_snapshot_record("./binance.BTCUSDT@orderbook5000.2000", &snapshot_record(104))
        .unwrap();
    assert_eq!((early, late), (1000, 2000));

    let lines = [
        update_record(95, 99, "100.0", "9.0"),
        update_record(100, 102, "100.5", "1.0"),
        "garbage without separator".to_string(),
        update_record(103, 105, "100.0", "0"),
        update_record(108, 110, "99.0", "5.0"),
    ]
    .join("\n");
    let decoded = replay.feed_lines(&lines);
    assert_eq!(decoded, 4);

    let (recorder, summary) = replay.finish();
    assert_eq!(summary.records, 5);
    assert_eq!(summary.decode_failures, 1);
    assert_eq!(summary.live_books, 0);
    assert_eq!(summary.retired.len(), 2);

    let early_series = recorder.series(1000).unwrap();
    assert_eq!(early_series.len(), 2);
    assert_eq!(early_series.bid_prices[0], vec![100.5, 100.0]);
    assert_eq!(early_series.bid_prices[1], vec![100.5, 99.0]);

    let late_series = recorder.series(2000).unwrap();
    assert_eq!(late_series.len(), 1);
    // The 100.5 bid arrived before this book's snapshot id
    assert_eq!(late_series.bid_prices[0], vec![99.0]);
    assert_eq!(late_series.ask_prices[0], vec![101.0, 102.0]);
}

#[test]
fn test_replay_parallel_config() {
    let config = ReplayConfig::from_json(r#"{"parallel": true, "depth": 1}"#).unwrap();
    let mut replay = Replay::new(config).unwrap();
    replay
        .add_snapshot_record("binance.BTCUSDT@orderbook5000.1", &snapshot_record(10))
        .unwrap();

    let report = replay
        .feed_update_line(&update_record(11, 12, "100.0", "3.0"))
        .unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(replay.recorder().series(1).unwrap().bid_sizes[0], vec![3.0]);
}
