//! DL command-line driver.
//!
//! Loads a scene, drops the given shapes onto a target, runs the auto-layout
//! pipeline once, and prints the resulting scene as JSON on stdout.
//!
//! ```text
//! dl-cli --scene demos/scene.json --drop photo --canned
//! RUST_LOG=debug dl-cli --scene demos/scene.json --drop photo --config layout.json
//! ```

use anyhow::{Context, bail};
use clap::Parser;
use dl_core::id::ShapeId;
use dl_core::scene::Canvas;
use dl_editor::{BusyFlag, DropBus, LayoutConfig, LayoutMode, Notice, Orchestrator, SharedCanvas};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "dl-cli", version, about = "Drop shapes onto a target and auto-layout them")]
struct Args {
    /// Scene JSON: `{ "shapes": [...] }`.
    #[arg(long)]
    scene: PathBuf,

    /// Ids of the dropped shapes. The first one is laid out.
    #[arg(long = "drop", required = true, num_args = 1..)]
    dropped: Vec<String>,

    /// Drop target id. Defaults to the topmost shape under the dropped set.
    #[arg(long)]
    target: Option<String>,

    /// Layout config JSON. `DL_*` environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use fixed margins instead of the remote agent.
    #[arg(long)]
    canned: bool,
}

fn load_config(args: &Args) -> anyhow::Result<LayoutConfig> {
    let mut config = match &args.config {
        Some(path) => LayoutConfig::load(path)?,
        None => LayoutConfig::default(),
    };
    config.apply_env_overrides();
    if args.canned {
        config.mode = LayoutMode::Canned;
    }
    config.validate()?;
    Ok(config)
}

fn load_scene(args: &Args) -> anyhow::Result<Canvas> {
    let text = std::fs::read_to_string(&args.scene)
        .with_context(|| format!("cannot read scene {}", args.scene.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid scene {}", args.scene.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = load_config(&args)?;
    let canvas = SharedCanvas::new(load_scene(&args)?);

    let dropped: Vec<ShapeId> = args.dropped.iter().map(|id| ShapeId::intern(id)).collect();
    let target = args.target.as_deref().map(ShapeId::intern);
    let event = canvas.drop_event(&dropped, target)?;
    log::info!(
        "dropping {} shape(s) onto {} ({:?} mode)",
        event.shapes.len(),
        event.target.id,
        config.mode
    );

    let busy = BusyFlag::new();
    let orchestrator = Orchestrator::from_config(&config, Arc::new(canvas.clone()), busy.clone());
    let mut notices = orchestrator.notices();
    let bus = DropBus::new();
    let activation = orchestrator.activate(&bus);

    let notice = if event.is_actionable() {
        bus.publish(event);
        let notice = notices.recv().await.context("pipeline ended without a notice")?;
        busy.wait_idle().await;
        Some(notice)
    } else {
        log::warn!("drop rejected; scene left as is");
        None
    };
    activation.deactivate().await;

    let scene = canvas.snapshot()?;
    println!("{}", serde_json::to_string_pretty(&scene)?);

    match notice {
        Some(Notice::Applied { shape, x, y }) => {
            eprintln!("applied: {shape} moved to ({x}, {y})");
            Ok(())
        }
        Some(Notice::Aborted { stage, message }) => bail!("aborted while {stage}: {message}"),
        None => Ok(()),
    }
}
