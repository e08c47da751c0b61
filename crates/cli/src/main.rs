use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use exporters::relinking::build_relink_map;
use exporters::{import_timeline, EdlOptions, ExportConfig, ExportFormat, Exporter};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use timeline::assembly::{
    assemble_from_shot_list, conform_timeline, create_sequence_from_scenes, fill_gaps,
    get_timeline_statistics, remove_gaps, AssemblyConfig, SceneSpec, ShotSpec,
};
use timeline::{Fps, Timeline, TimelineManager, TransitionKind, DEFAULT_FPS};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "timeline-cli")]
#[command(about = "Editorial timeline tool - convert, inspect, assemble and conform edits")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert between interchange formats
    Convert {
        /// Input file (format is detected from content)
        input: PathBuf,

        /// Output file path
        output: PathBuf,

        /// Output format (edl, fcpxml, otio, cut_list, aaf, json); guessed from the extension if omitted
        #[arg(long)]
        to: Option<String>,

        /// Frame rate for inputs that do not carry one (e.g. 24, 25, 23.976)
        #[arg(long)]
        fps: Option<f64>,

        /// Write dissolves and wipes as D/W events in EDL output
        #[arg(long)]
        edl_transitions: bool,
    },

    /// Print timeline statistics as JSON
    Info {
        /// Input file
        input: PathBuf,

        /// Frame rate for inputs that do not carry one
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Build a timeline from a JSON shot list (or scene list)
    Assemble {
        /// Shot list JSON file
        shot_list: PathBuf,

        /// Output file path
        output: PathBuf,

        /// Timeline name
        #[arg(long, default_value = "Assembly")]
        name: String,

        /// Frame rate
        #[arg(long, default_value = "24")]
        fps: f64,

        /// `cut` for straight cuts; any other kind joins shots with a dissolve
        #[arg(long, default_value = "cut")]
        transition: String,

        /// Transition length in frames
        #[arg(long, default_value = "24")]
        transition_frames: i64,
    },

    /// Relink clips to new media locations
    Conform {
        /// Input file
        input: PathBuf,

        /// Output file path
        output: PathBuf,

        /// Directories searched for media with matching file names
        #[arg(long = "search")]
        search: Vec<PathBuf>,

        /// JSON object mapping clip names to new source paths
        #[arg(long)]
        map: Option<PathBuf>,

        /// Frame rate for inputs that do not carry one
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Fill or close gaps on video track 1
    Gaps {
        /// Input file
        input: PathBuf,

        /// Output file path
        output: PathBuf,

        /// Cover each gap with a slug clip
        #[arg(long, conflicts_with = "remove", required_unless_present = "remove")]
        fill: bool,

        /// Pull later clips back to close each gap
        #[arg(long)]
        remove: bool,

        /// Frame rate for inputs that do not carry one
        #[arg(long)]
        fps: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            to,
            fps,
            edl_transitions,
        } => convert_command(&input, &output, to.as_deref(), rate(fps), edl_transitions),
        Commands::Info { input, fps } => info_command(&input, rate(fps)),
        Commands::Assemble {
            shot_list,
            output,
            name,
            fps,
            transition,
            transition_frames,
        } => assemble_command(&shot_list, &output, &name, Fps::from_f64(fps), &transition, transition_frames),
        Commands::Conform {
            input,
            output,
            search,
            map,
            fps,
        } => conform_command(&input, &output, &search, map.as_deref(), rate(fps)),
        Commands::Gaps {
            input,
            output,
            fill,
            remove: _,
            fps,
        } => gaps_command(&input, &output, fill, rate(fps)),
    }
}

fn rate(fps: Option<f64>) -> Fps {
    fps.map(Fps::from_f64).unwrap_or(DEFAULT_FPS)
}

fn output_format(output: &Path, explicit: Option<&str>) -> Result<ExportFormat> {
    match explicit {
        Some(name) => Ok(name.parse()?),
        None => ExportFormat::from_path(output).with_context(|| {
            format!("cannot infer a format from {}; pass --to", output.display())
        }),
    }
}

fn write_timeline(timeline: &Timeline, output: &Path, format: ExportFormat, edl: EdlOptions) -> Result<()> {
    let config = ExportConfig::new(format, output)
        .with_fps(timeline.fps)
        .with_edl_options(edl);
    Exporter::new(config).export_timeline(timeline)
}

fn convert_command(
    input: &Path,
    output: &Path,
    to: Option<&str>,
    fps: Fps,
    edl_transitions: bool,
) -> Result<()> {
    let format = output_format(output, to)?;
    info!("Converting {:?} to {:?} (format: {})", input, output, format);

    let timeline = import_timeline(input, fps)?;
    if format == ExportFormat::Edl && !edl_transitions && !timeline.transitions.is_empty() {
        warn!(
            "{} transitions will be written as cuts; pass --edl-transitions to keep them",
            timeline.transitions.len()
        );
    }
    write_timeline(
        &timeline,
        output,
        format,
        EdlOptions {
            emit_transitions: edl_transitions,
        },
    )?;

    info!("Conversion completed");
    Ok(())
}

fn info_command(input: &Path, fps: Fps) -> Result<()> {
    let timeline = import_timeline(input, fps)?;
    let stats = get_timeline_statistics(&timeline);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn assemble_command(
    shot_list: &Path,
    output: &Path,
    name: &str,
    fps: Fps,
    transition: &str,
    transition_frames: i64,
) -> Result<()> {
    let transition_kind: TransitionKind = transition.parse()?;
    let config = AssemblyConfig::default()
        .with_fps(fps)
        .with_transition(transition_kind, transition_frames);

    let content = std::fs::read_to_string(shot_list)
        .with_context(|| format!("reading {}", shot_list.display()))?;
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&content).context("shot list must be a JSON array")?;

    // Entries carrying a `shots` array make this a scene list.
    let timeline = if entries.iter().any(|e| e.get("shots").is_some()) {
        let scenes: Vec<SceneSpec> = serde_json::from_value(serde_json::Value::Array(entries))?;
        debug!("assembling {} scenes", scenes.len());
        create_sequence_from_scenes(&scenes, name, &config)
    } else {
        let shots: Vec<ShotSpec> = serde_json::from_value(serde_json::Value::Array(entries))?;
        debug!("assembling {} shots", shots.len());
        assemble_from_shot_list(&shots, name, &config)
    };

    let format = output_format(output, None)?;
    write_timeline(&timeline, output, format, EdlOptions::default())?;
    info!(
        "Assembled {} clips ({})",
        timeline.clip_count(),
        get_timeline_statistics(&timeline).runtime
    );
    Ok(())
}

fn conform_command(
    input: &Path,
    output: &Path,
    search: &[PathBuf],
    map: Option<&Path>,
    fps: Fps,
) -> Result<()> {
    let timeline = import_timeline(input, fps)?;

    let mut relink_map = build_relink_map(&timeline, search);
    if let Some(map_path) = map {
        let content = std::fs::read_to_string(map_path)
            .with_context(|| format!("reading {}", map_path.display()))?;
        let explicit: HashMap<String, String> =
            serde_json::from_str(&content).context("relink map must be a JSON object of strings")?;
        relink_map.extend(explicit);
    }
    if relink_map.is_empty() {
        bail!("nothing to relink: pass --search and/or --map");
    }

    let conformed = conform_timeline(&timeline, &relink_map)?;
    let missing: Vec<&str> = conformed
        .get_all_clips()
        .into_iter()
        .filter(|c| !relink_map.contains_key(&c.name))
        .map(|c| c.name.as_str())
        .collect();
    if !missing.is_empty() {
        warn!("{} clips left unlinked: {}", missing.len(), missing.join(", "));
    }

    let format = output_format(output, None)?;
    write_timeline(&conformed, output, format, EdlOptions::default())?;
    info!("Relinked {} clips", relink_map.len());
    Ok(())
}

fn gaps_command(input: &Path, output: &Path, fill: bool, fps: Fps) -> Result<()> {
    let timeline = import_timeline(input, fps)?;
    let mut manager = TimelineManager::new(timeline);

    let count = if fill {
        fill_gaps(&mut manager, &AssemblyConfig::default())?
    } else {
        remove_gaps(&mut manager)?
    };
    info!(
        "{} {} gaps; runtime now {}",
        if fill { "Filled" } else { "Closed" },
        count,
        manager.calculate_runtime_formatted()
    );

    let format = output_format(output, None)?;
    write_timeline(manager.timeline(), output, format, EdlOptions::default())
}
