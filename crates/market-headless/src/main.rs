//! Headless host: load a scene, play it with the scripted bot, report.
//!
//! ```text
//! market-headless [SCENE_DIR] [TICKS]
//! ```
//!
//! Defaults to `scenes/default` and 36000 ticks (ten minutes at 60 Hz).
//! The run is played twice from the same scene and the final state hashes
//! must match. Set `MARKET_SAVE_DIR` to persist the save blob between runs;
//! otherwise an in-memory store is used.

mod bot;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use market_core::event::{Event, EventKind};
use market_core::persistence::{MemoryStore, SaveStore};
use market_core::session::Session;
use market_data::{DataLoadError, FileStore, Scene, load_scene};
use tracing::{debug, error, info, warn};

use crate::bot::Bot;

const DEFAULT_SCENE: &str = "scenes/default";
const DEFAULT_TICKS: u64 = 36_000;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunSummary {
    ticks: u64,
    money: u64,
    sales: u64,
    abandoned: u64,
    upgrades_bought: u64,
    state_hash: u64,
}

/// Play `ticks` frames of `scene` through a session backed by `store`.
fn play<S: SaveStore>(scene: &Scene, store: S, ticks: u64) -> Result<RunSummary, DataLoadError> {
    let loaded = scene.build_world()?;
    let mut session = Session::new(loaded.world, store);

    // Stand-in for an audio sink.
    session.world_mut().on_passive(
        EventKind::SaleCompleted,
        Box::new(|e: &Event| {
            if let Event::SaleCompleted { customer, value, tick, .. } = e {
                debug!(tick, customer = customer.0, value, "ka-ching");
            }
        }),
    );

    let report = session.start();
    if !report.is_clean() {
        warn!(fields = ?report.defaulted, "save loaded with defaults");
    }

    let mut bot = Bot::default();
    let mut upgrades_bought = 0;
    for _ in 0..ticks {
        let input = bot.steer(&session.world().snapshot());
        session.frame(input);

        let kind = bot.shopping_item();
        if session.world().money() >= session.world().upgrade_cost(kind) && session.purchase(kind).is_ok() {
            bot.bought();
            upgrades_bought += 1;
        }
    }
    if let Err(e) = session.save() {
        warn!(error = %e, "final save failed");
    }

    let world = session.world();
    let bus = world.event_bus();
    Ok(RunSummary {
        ticks: world.tick(),
        money: world.money(),
        sales: bus.total_emitted(EventKind::SaleCompleted),
        abandoned: bus.total_emitted(EventKind::SaleAbandoned),
        upgrades_bought,
        state_hash: world.state_hash(),
    })
}

/// Returns whether the two seeded runs agreed.
fn run(scene_dir: &Path, ticks: u64) -> Result<bool, DataLoadError> {
    let scene = load_scene(scene_dir)?;

    let first = play(&scene, MemoryStore::new(), ticks)?;
    let second = play(&scene, MemoryStore::new(), ticks)?;
    info!(
        ticks = first.ticks,
        money = first.money,
        sales = first.sales,
        abandoned = first.abandoned,
        upgrades = first.upgrades_bought,
        hash = %format_args!("{:016x}", first.state_hash),
        "run complete"
    );
    let deterministic = first == second;
    if deterministic {
        info!("determinism check passed");
    } else {
        error!(?first, ?second, "determinism check failed");
    }

    if let Ok(dir) = std::env::var("MARKET_SAVE_DIR") {
        let store = FileStore::in_dir(Path::new(&dir));
        let path = store.path().to_path_buf();
        let persisted = play(&scene, store, ticks)?;
        info!(
            path = %path.display(),
            money = persisted.money,
            upgrades = persisted.upgrades_bought,
            "persistent run complete"
        );
    }
    Ok(deterministic)
}

fn main() -> ExitCode {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let scene_dir = args
        .next()
        .map_or_else(|| PathBuf::from(DEFAULT_SCENE), PathBuf::from);
    let ticks = match args.next().map(|t| t.parse::<u64>()) {
        None => DEFAULT_TICKS,
        Some(Ok(t)) => t,
        Some(Err(e)) => {
            error!(error = %e, "TICKS must be a whole number");
            return ExitCode::FAILURE;
        }
    };

    match run(&scene_dir, ticks) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(scene = %scene_dir.display(), error = %e, "failed to run scene");
            ExitCode::FAILURE
        }
    }
}
