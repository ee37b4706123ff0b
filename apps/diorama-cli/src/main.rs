use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use diorama_params::{ParamKind, ParamValue};
use diorama_render::DebugTextRenderer;
use diorama_stage::config::parse_color;
use diorama_stage::{Stage, StageConfig};
use diorama_tools::SceneInspector;
use glam::Vec2;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diorama-cli", about = "Headless diorama runs and inspection")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Stage configuration (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Skip the startup mesh import
    #[arg(long, global = true)]
    no_asset: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// List parameters with their ranges and current values
    Params,
    /// Simulate frames and print what the renderer would draw
    Run {
        /// Number of frames to run
        #[arg(short, long, default_value = "1")]
        frames: u64,
        /// Pointer position in NDC, e.g. `0.1,-0.2`
        #[arg(short, long, allow_hyphen_values = true)]
        pointer: Option<String>,
        /// Parameter write applied before the first frame, e.g. `wireframe=true`
        #[arg(short, long = "set")]
        set: Vec<String>,
        /// Seconds to wait for the startup import
        #[arg(long, default_value = "5")]
        wait: u64,
        /// Print every frame instead of only the last
        #[arg(long)]
        all: bool,
    },
    /// Run frames, then list every entity
    Inspect {
        #[arg(short, long, default_value = "1")]
        frames: u64,
        #[arg(short, long, allow_hyphen_values = true)]
        pointer: Option<String>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Info => {
            println!("diorama-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("params: {}", diorama_params::crate_info());
            println!("assets: {}", diorama_assets::crate_info());
            println!("render: {}", diorama_render::crate_info());
            println!("input: {}", diorama_input::crate_info());
            println!("tools: {}", diorama_tools::crate_info());
            println!("stage: {}", diorama_stage::crate_info());
        }
        Commands::Params => {
            let stage = open_stage(cli.config.as_ref(), true)?;
            for desc in stage.descriptors() {
                let range = match desc.kind {
                    ParamKind::Number { min, max, step } => match step {
                        Some(step) => format!("[{min}, {max}] step {step}"),
                        None => format!("[{min}, {max}]"),
                    },
                    other => other.label().to_string(),
                };
                let bound = if desc.bound { "" } else { " (unbound)" };
                println!("{:<16} {:<10} {:<22} {}{bound}", desc.name, desc.kind.label(), range, desc.value);
            }
        }
        Commands::Run {
            frames,
            pointer,
            set,
            wait,
            all,
        } => {
            let mut stage = open_stage(cli.config.as_ref(), cli.no_asset)?;
            let added = stage.wait_for_assets(Duration::from_secs(wait));
            tracing::info!(imported = added.len(), "startup loads settled");
            for assignment in &set {
                let (name, value) = parse_assignment(assignment)?;
                let stored = stage.set_param(&name, value)?;
                println!("set {name} = {stored}");
            }
            if let Some(p) = &pointer {
                stage.set_pointer(Some(parse_pointer(p)?));
            }

            let mut renderer = DebugTextRenderer::new();
            let mut last = String::new();
            for _ in 0..frames {
                last = stage.frame(&mut renderer);
                if all {
                    print!("{last}");
                }
            }
            if !all {
                print!("{last}");
            }
            let scene = stage.scene();
            println!(
                "{}",
                SceneInspector::summary(&scene.registry, &scene.clock, &scene.camera)
            );
        }
        Commands::Inspect {
            frames,
            pointer,
            json,
        } => {
            let mut stage = open_stage(cli.config.as_ref(), cli.no_asset)?;
            stage.wait_for_assets(Duration::from_secs(5));
            if let Some(p) = &pointer {
                stage.set_pointer(Some(parse_pointer(p)?));
            }
            let mut renderer = DebugTextRenderer::new();
            for _ in 0..frames {
                stage.frame(&mut renderer);
            }

            let scene = stage.scene();
            let entities = SceneInspector::entities(&scene.registry);
            if json {
                let summary = SceneInspector::summary(&scene.registry, &scene.clock, &scene.camera);
                let doc = serde_json::json!({ "summary": summary, "entities": entities });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                for info in &entities {
                    let [x, y, z] = info.position;
                    println!(
                        "{} {:<8} {:<9} ({x:>6.2}, {y:>6.2}, {z:>6.2}) {}{}{}",
                        info.id.short(),
                        info.name,
                        info.kind,
                        info.color,
                        if info.highlighted { " highlighted" } else { "" },
                        if info.wireframe { " wireframe" } else { "" },
                    );
                }
            }
        }
    }

    Ok(())
}

fn open_stage(path: Option<&PathBuf>, no_asset: bool) -> Result<Stage> {
    let mut config = match path {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    if no_asset {
        config.asset_path = None;
    }
    Ok(Stage::new(&config)?)
}

/// `name=value`, where value is `true`/`false`, a hex colour or a number.
fn parse_assignment(s: &str) -> Result<(String, ParamValue)> {
    let Some((name, raw)) = s.split_once('=') else {
        bail!("expected name=value, got {s:?}");
    };
    let (name, raw) = (name.trim(), raw.trim());
    let value = match raw {
        "true" => ParamValue::Toggle(true),
        "false" => ParamValue::Toggle(false),
        _ if raw.starts_with('#') || raw.starts_with("0x") || raw.starts_with("0X") => {
            ParamValue::Color(parse_color(raw)?)
        }
        _ => raw
            .parse::<f32>()
            .map(ParamValue::Number)
            .with_context(|| format!("invalid value for {name}: {raw:?}"))?,
    };
    Ok((name.to_string(), value))
}

/// `x,y` in NDC.
fn parse_pointer(s: &str) -> Result<Vec2> {
    let Some((x, y)) = s.split_once(',') else {
        bail!("expected x,y, got {s:?}");
    };
    let x: f32 = x.trim().parse().with_context(|| format!("invalid pointer x {x:?}"))?;
    let y: f32 = y.trim().parse().with_context(|| format!("invalid pointer y {y:?}"))?;
    Ok(Vec2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_pick_their_kind() {
        assert_eq!(
            parse_assignment("wireframe=true").unwrap(),
            ("wireframe".into(), ParamValue::Toggle(true))
        );
        assert_eq!(
            parse_assignment(" speed = 0.02 ").unwrap(),
            ("speed".into(), ParamValue::Number(0.02))
        );
        let (name, value) = parse_assignment("sphere_color=#ff0000").unwrap();
        assert_eq!(name, "sphere_color");
        assert!(matches!(value, ParamValue::Color(c) if c.to_hex() == 0xff0000));
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        assert!(parse_assignment("speed").is_err());
        assert!(parse_assignment("speed=fast").is_err());
        assert!(parse_assignment("sphere_color=#12").is_err());
        assert!(parse_assignment("sphere_color=#+fffff").is_err());
    }

    #[test]
    fn pointer_accepts_negative_ndc() {
        assert_eq!(parse_pointer("0.5,-0.25").unwrap(), Vec2::new(0.5, -0.25));
        assert!(parse_pointer("0.5").is_err());
        assert!(parse_pointer("a,b").is_err());
    }

    #[test]
    fn stage_without_asset_has_no_pending_loads() {
        let stage = open_stage(None, true).unwrap();
        assert_eq!(stage.pending_loads(), 0);
        assert_eq!(stage.descriptors().len(), 15);
    }
}
