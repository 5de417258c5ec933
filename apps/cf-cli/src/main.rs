use cf_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, experiment_service, query,
    run_service,
};
use cf_sim::AtChem2Runner;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chamberflow")]
#[command(
    about = "Chamberflow - segmented AtChem2 runs for chamber experiments",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an experiment file and show how it would be run
    Validate {
        /// Path to the experiment YAML or JSON file
        experiment_path: PathBuf,
    },
    /// List the species in the experiment's mechanism
    Species {
        /// Path to the experiment YAML or JSON file
        experiment_path: PathBuf,
    },
    /// Run an experiment and write the combined result
    Run {
        /// Path to the experiment YAML or JSON file
        experiment_path: PathBuf,
        /// Result directory (defaults to `<experiment name>_result` next to the file)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show a summary of a result directory
    Show {
        /// Result directory written by `run`
        result_dir: PathBuf,
    },
    /// Export one time series from a result as CSV
    ExportSeries {
        /// Result directory written by `run`
        result_dir: PathBuf,
        /// Species or environment variable name
        name: String,
        /// Which table to read from
        #[arg(long, value_enum, default_value_t = SeriesKind::Species)]
        kind: SeriesKind,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SeriesKind {
    Species,
    Environment,
    LossRate,
    ProductionRate,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { experiment_path } => cmd_validate(&experiment_path),
        Commands::Species { experiment_path } => cmd_species(&experiment_path),
        Commands::Run {
            experiment_path,
            out,
        } => cmd_run(&experiment_path, out.as_deref()),
        Commands::Show { result_dir } => cmd_show(&result_dir),
        Commands::ExportSeries {
            result_dir,
            name,
            kind,
            output,
        } => cmd_export_series(&result_dir, &name, kind, output.as_deref()),
    }
}

fn cmd_validate(experiment_path: &Path) -> AppResult<()> {
    println!("Validating experiment: {}", experiment_path.display());
    let experiment = experiment_service::load_experiment(experiment_path)?;
    experiment_service::validate_experiment(&experiment)?;
    let summary = experiment_service::summarize(&experiment)?;
    println!("✓ Experiment is valid");
    println!("  Name: {}", summary.name);
    println!("  Mode: {}", summary.mode);
    println!(
        "  Window: {} - {} s, step {} s ({} steps)",
        summary.t_start, summary.t_end, summary.step_size, summary.steps
    );
    println!("  Segments: {}", summary.segments);
    if summary.injection_events > 0 {
        println!("  Injection events: {}", summary.injection_events);
    }
    if summary.nox_points > 0 {
        println!("  NOx constraint points: {}", summary.nox_points);
    }
    if let Some(warning) = summary.mode.warning() {
        println!("  Note: {}", warning);
    }
    Ok(())
}

fn cmd_species(experiment_path: &Path) -> AppResult<()> {
    let experiment = experiment_service::load_experiment(experiment_path)?;
    let species = experiment_service::mechanism_species(&experiment)?;
    println!(
        "{} species in {}:",
        species.len(),
        experiment.model.mechanism_path.display()
    );
    for name in species {
        println!("  {}", name);
    }
    Ok(())
}

fn default_out_dir(experiment_path: &Path, name: &str) -> PathBuf {
    let dir = experiment_path.parent().unwrap_or(Path::new("."));
    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    dir.join(format!("{}_result", safe))
}

fn cmd_run(experiment_path: &Path, out: Option<&Path>) -> AppResult<()> {
    let experiment = experiment_service::load_experiment(experiment_path)?;
    println!("Running experiment: {}", experiment.name);

    let request = RunRequest {
        experiment: &experiment,
        options: RunOptions::default(),
    };
    let mut runner = AtChem2Runner::new(experiment.model.clone());

    let mut last_emit = Instant::now();
    let mut last_stage = String::new();
    let response = run_service::run_experiment_with_progress(
        &request,
        &mut runner,
        Some(&mut |event| {
            let stage_key = format!("{:?}", event.stage);
            let emit_now = stage_key != last_stage
                || event.segment.is_some()
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = stage_key;
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    let out_dir = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_out_dir(experiment_path, &experiment.name));
    tracing::debug!(out = %out_dir.display(), "writing result");
    run_service::write_response(&out_dir, &response)?;

    println!("✓ Run completed: {}", response.run_id);
    println!("  Mode: {}", response.mode);
    println!("  Result: {}", out_dir.display());
    for warning in &response.warnings {
        println!("  Warning: {}", warning);
    }
    print_timing_summary(&response.timing);

    let summary = query::get_result_summary(&response.tables)?;
    println!("  Time points: {}", summary.row_count);
    println!("  Species: {}", summary.species_count);

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn stage_label(stage: &RunStage) -> &'static str {
    match stage {
        RunStage::Validating => "validating",
        RunStage::Planning => "planning",
        RunStage::RunningSegment => "running",
        RunStage::SelectingOutputs => "selecting outputs",
        RunStage::Completed => "completed",
    }
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.segment) {
        (RunStage::RunningSegment, Some(s)) => {
            let width = 28usize;
            let filled = ((s.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] segment {}/{}  t={}..{}s  elapsed={:.1}s",
                bar,
                s.index + 1,
                s.count,
                s.start,
                s.end,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                stage_label(&event.stage),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &cf_app::RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    println!("\nTiming summary:");
    println!(
        "  Plan:     {:.3}s ({:.1}%)",
        timing.plan_time_s,
        100.0 * timing.plan_time_s / total
    );
    println!(
        "  Segments: {:.3}s ({:.1}%) over {} run(s)",
        timing.segment_time_s,
        100.0 * timing.segment_time_s / total,
        timing.segments_run
    );
    println!(
        "  Stitch:   {:.3}s ({:.1}%)",
        timing.stitch_time_s,
        100.0 * timing.stitch_time_s / total
    );
    println!("  Total:    {:.3}s", timing.total_time_s);
}

fn cmd_show(result_dir: &Path) -> AppResult<()> {
    println!("Loading result: {}", result_dir.display());

    let (manifest, tables) = run_service::load_response(result_dir)?;
    let summary = query::get_result_summary(&tables)?;

    println!("\nResult Summary:");
    println!("  Run: {}", manifest.run_id);
    println!("  Experiment: {}", manifest.experiment_name);
    println!("  Created: {}", manifest.timestamp);
    println!("  Mode: {} ({} segments)", manifest.mode, manifest.segments);
    println!("  Time points: {}", summary.row_count);
    println!(
        "  Time range: {} - {} s",
        summary.time_range.0, summary.time_range.1
    );
    println!("  Loss rate rows: {}", summary.loss_rate_rows);
    println!("  Production rate rows: {}", summary.production_rate_rows);

    println!("\nSpecies:");
    for name in query::list_species(&tables) {
        println!("  {}", name);
    }
    println!("\nEnvironment:");
    for name in query::list_environment_variables(&tables) {
        println!("  {}", name);
    }
    if !manifest.missing.is_empty() {
        println!("\nMissing outputs:");
        for name in manifest.missing.species.iter().chain(&manifest.missing.rates) {
            println!("  {}", name);
        }
    }

    Ok(())
}

fn cmd_export_series(
    result_dir: &Path,
    name: &str,
    kind: SeriesKind,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, tables) = run_service::load_response(result_dir)?;

    let series = match kind {
        SeriesKind::Species => query::extract_species_series(&tables, name)?,
        SeriesKind::Environment => query::extract_environment_series(&tables, name)?,
        SeriesKind::LossRate => query::total_rate_series(&tables, name, false)?,
        SeriesKind::ProductionRate => query::total_rate_series(&tables, name, true)?,
    };

    let mut csv = String::from("time_s,value\n");
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}
