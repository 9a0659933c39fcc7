//! recountd - demo counting daemon
//!
//! Drives the engine end-to-end with a synthetic detector backend:
//! 1. Loads configuration (file + environment)
//! 2. Opens the SQLite-backed counter state
//! 3. Ticks the pipeline at a fixed rate - the engine never self-schedules
//! 4. Stops on Ctrl-C: no further ticks, and an inference result still in
//!    flight at stop time is discarded rather than applied

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use clap::Parser;

use recount::{
    is_model_not_ready, CounterStore, DetectorBackend, Engine, ItemType, RecountConfig,
    SqliteStateStore, StubBackend,
};

#[derive(Parser, Debug)]
#[command(name = "recountd", about = "Recyclable-item counting daemon (synthetic input)")]
struct Args {
    /// Pipeline tick rate in frames per second
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Stop after this many frames (0 = run until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    max_frames: u64,
    /// Seed for the synthetic detector scene
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Frames the synthetic model spends "loading" before it is ready
    #[arg(long, default_value_t = 5)]
    warmup_frames: u64,
    /// Seconds between count summaries in the log
    #[arg(long, default_value_t = 5)]
    summary_interval: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = RecountConfig::load()?;
    let store = SqliteStateStore::open(&cfg.db_path)?;
    let counter = CounterStore::open(Box::new(store))?;
    let mut engine = Engine::new(cfg.engine.clone(), counter)?;

    let mut backend = StubBackend::new(args.seed).with_warmup(args.warmup_frames);
    backend.warm_up()?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    // Synthetic frame buffer; the stub backend ignores its content.
    let (width, height) = (640u32, 480u32);
    let pixels = vec![0u8; (width * height * 3) as usize];

    let tick = Duration::from_millis(1_000 / args.fps.max(1) as u64);
    let mut last_summary = Instant::now();
    let mut frame_count = 0u64;

    log::info!("recountd running. counters in {}", cfg.db_path);
    log::info!(
        "area={:?} unit={:?} tick={}ms",
        engine.detection_area(),
        engine.area_unit(),
        tick.as_millis()
    );

    while running.load(Ordering::SeqCst) {
        let detections = match backend.detect(&pixels, width, height) {
            Ok(detections) => detections,
            Err(err) if is_model_not_ready(&err) => {
                log::debug!("model not ready; frame contributes zero detections");
                Vec::new()
            }
            Err(err) => {
                log::warn!("inference failed, degrading to empty frame: {}", err);
                Vec::new()
            }
        };

        // The detect call is the loop's only suspension point. If the user
        // stopped the session while it was in flight, the result must be
        // discarded, not applied.
        if !running.load(Ordering::SeqCst) {
            log::info!("session stopped; discarding in-flight inference result");
            break;
        }

        let update = engine.process_frame(detections, Utc::now())?;
        for track in &update.confirmed {
            log::info!("counted {} ({} live tracks)", track.item_type, update.live.len());
        }

        frame_count += 1;
        if args.max_frames > 0 && frame_count >= args.max_frames {
            break;
        }

        if last_summary.elapsed() >= Duration::from_secs(args.summary_interval) {
            log_summary(&engine, frame_count);
            last_summary = Instant::now();
        }

        std::thread::sleep(tick);
    }

    log::info!("session ended after {} frames", frame_count);
    log_summary(&engine, frame_count);
    if engine.counter().flush_pending() {
        log::warn!("latest counts not yet durable (flush pending)");
    }
    Ok(())
}

fn log_summary(engine: &Engine, frame_count: u64) {
    let totals: Vec<String> = ItemType::ALL
        .into_iter()
        .map(|item| format!("{}={}", item, engine.counter().total(item)))
        .collect();
    log::info!("frames={} totals: {}", frame_count, totals.join(" "));
}
