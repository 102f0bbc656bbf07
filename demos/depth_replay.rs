/// Synthetic depth feed replay
///
/// Generates a snapshot per epoch plus a random diff stream (with one
/// injected gap), replays it through the registry and logs what survived.
///
///   cargo run --example depth_replay -- [diff_count] [epochs]
///   RUST_LOG=depth_sync=debug cargo run --example depth_replay

use std::env;

use depth_sync::{Replay, ReplayConfig};
use rand::Rng;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MID: f64 = 30_000.0;
const TICK: f64 = 0.1;

fn level<R: Rng>(rng: &mut R, side: f64, max_ticks: u32, allow_delete: bool) -> [String; 2] {
    let price = MID + side * rng.gen_range(1..=max_ticks) as f64 * TICK;
    let qty = if allow_delete && rng.gen_bool(0.3) {
        0.0
    } else {
        rng.gen_range(1u32..5000) as f64 / 1000.0
    };
    [format!("{price:.1}"), format!("{qty:.8}")]
}

fn snapshot_record<R: Rng>(rng: &mut R, last_update_id: i64) -> String {
    let bids: Vec<_> = (0..200).map(|_| level(rng, -1.0, 400, false)).collect();
    let asks: Vec<_> = (0..200).map(|_| level(rng, 1.0, 400, false)).collect();
    let body = json!({ "lastUpdateId": last_update_id, "bids": bids, "asks": asks });
    format!("{}|{}", last_update_id, body)
}

fn update_record<R: Rng>(rng: &mut R, first: i64, last: i64) -> String {
    let bids: Vec<_> = (0..rng.gen_range(0..8)).map(|_| level(rng, -1.0, 60, true)).collect();
    let asks: Vec<_> = (0..rng.gen_range(0..8)).map(|_| level(rng, 1.0, 60, true)).collect();
    let body = json!({
        "stream": "btcusdt@depth@100ms",
        "data": { "e": "depthUpdate", "s": "BTCUSDT", "U": first, "u": last, "b": bids, "a": asks }
    });
    format!("{}|{}", first, body)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let diff_count: usize = args.get(1).and_then(|a| a.parse().ok()).unwrap_or(20_000);
    let epochs: i64 = args.get(2).and_then(|a| a.parse().ok()).unwrap_or(4);

    let config = ReplayConfig {
        log_every: 5_000,
        parallel: epochs > 1,
        ..ReplayConfig::default()
    };
    let prefix = config.snapshot_prefix.clone();
    let mut replay = Replay::new(config)?;
    let mut rng = rand::thread_rng();

    // Snapshots spaced through the stream; the late ones start after the gap
    let spacing = (diff_count as i64 / epochs.max(1)).max(1);
    for epoch in 0..epochs {
        let last_update_id = 1_000 + epoch * spacing * 3;
        let record = snapshot_record(&mut rng, last_update_id);
        replay.add_snapshot_record(&format!("./{prefix}.{}", 1_700_000_000 + epoch * 3600), &record)?;
    }

    let gap_at = diff_count / 2;
    let mut next_id = 990i64;
    let mut lines = Vec::with_capacity(diff_count);
    for i in 0..diff_count {
        if i == gap_at {
            next_id += 25;
        }
        let span = rng.gen_range(1..=5);
        lines.push(update_record(&mut rng, next_id, next_id + span - 1));
        next_id += span;
    }
    lines.push("corrupted record".to_string());

    let decoded = replay.feed_lines(&lines.join("\n"));
    info!(decoded, total = lines.len(), "diff stream replayed");

    let (recorder, summary) = replay.finish();
    for gap in &summary.retired {
        info!(%gap, "retired");
    }
    for (epoch, series) in recorder.iter() {
        info!(epoch, rows = series.len(), "recorded depth series");
    }
    info!(live_books = summary.live_books, "replay complete");

    Ok(())
}
