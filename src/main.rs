//! HoopSense CLI
//!
//! Usage:
//!   hoopsense --replay session.csv           # Classify a recorded session
//!   hoopsense --interactive                  # JSON sample batches on stdin
//!   hoopsense --serve                        # HTTP API + UDP sensor receiver
//!   hoopsense --replay session.csv --json    # JSON output

use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::io::{self, BufRead};
use std::process;
use tracing_subscriber::EnvFilter;

use hoopsense::core::{
    run_server, BasketPolicyKind, ClassifierOptions, CsvReplay, MergeMode, ShotClassifier,
};
use hoopsense::types::{RawSample, ShotEvent, ShotTally, StepOutput, ThresholdConfig};
use hoopsense::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "hoopsense",
    version = VERSION,
    about = "HoopSense - Classify basketball shots from backboard sensor streams",
    long_about = "HoopSense fuses the backboard accelerometer and the rim time-of-flight\n\
                  sensor into MAKE / MISS shot events.\n\n\
                  Modes:\n  \
                  --replay       Classify a recorded CSV session\n  \
                  --interactive  Read JSON sample batches from stdin\n  \
                  --serve        HTTP API + UDP sensor receiver\n\n\
                  Phases:\n  \
                  IDLE             - Waiting for an impact or basket\n  \
                  IMPACT_DETECTED  - Ball hit the backboard, watching the rim\n  \
                  BLACKOUT         - Cooldown after a completed shot"
)]
struct Args {
    /// Recorded session to classify (CSV)
    #[arg(short, long)]
    replay: Option<String>,

    /// Interactive mode - one JSON array of samples per line
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// UDP address for sensor packets (serve mode)
    #[arg(long)]
    udp_addr: Option<String>,

    /// Record received sensor packets to a replayable CSV log (serve mode)
    #[arg(long, value_name = "CSV")]
    log: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Print every phase transition
    #[arg(long)]
    verbose: bool,

    /// Threshold file (JSON); flags below override it
    #[arg(long)]
    config: Option<String>,

    /// Impact threshold (g)
    #[arg(long)]
    impact_threshold: Option<f64>,

    /// Basket distance threshold (mm)
    #[arg(long)]
    distance_threshold: Option<u16>,

    /// Basket signal rate threshold
    #[arg(long)]
    signal_rate_threshold: Option<f64>,

    /// Seconds after an impact in which a basket counts
    #[arg(long)]
    max_time_after_impact: Option<f64>,

    /// Cooldown after each shot (seconds)
    #[arg(long)]
    blackout_window: Option<f64>,

    /// SWISH vs BANK rule for makes after an impact
    #[arg(long, value_enum, default_value_t = PolicyArg::Impact)]
    basket_policy: PolicyArg,

    /// When buffered samples are released to the state machine
    #[arg(long, value_enum, default_value_t = MergeArg::Watermark)]
    merge: MergeArg,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PolicyArg {
    Impact,
    SignalRate,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum MergeArg {
    Watermark,
    Drain,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "hoopsense=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    let classifier = match build_classifier(&args) {
        Ok(classifier) => classifier,
        Err(e) => fail(&e),
    };

    if args.serve {
        run_serve(&args, classifier).await;
    } else if let Some(ref path) = args.replay {
        run_replay(path, classifier, &args);
    } else {
        run_interactive(classifier, &args);
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", "error:".red().bold(), message);
    process::exit(1);
}

/// Thresholds from file (if any), then flag overrides
fn build_classifier(args: &Args) -> Result<ShotClassifier, String> {
    let mut config = match args.config {
        Some(ref path) => ThresholdConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => ThresholdConfig::default(),
    };
    if let Some(v) = args.impact_threshold {
        config.impact_accel_threshold = v;
    }
    if let Some(v) = args.distance_threshold {
        config.tof_distance_threshold = v;
    }
    if let Some(v) = args.signal_rate_threshold {
        config.tof_signal_rate_threshold = v;
    }
    if let Some(v) = args.max_time_after_impact {
        config.max_time_after_impact = v;
    }
    if let Some(v) = args.blackout_window {
        config.blackout_window = v;
    }

    let basket_policy = match args.basket_policy {
        PolicyArg::Impact => BasketPolicyKind::Impact,
        PolicyArg::SignalRate => BasketPolicyKind::SignalRate,
    };
    let merge_mode = match args.merge {
        MergeArg::Drain => MergeMode::Drain,
        MergeArg::Watermark => MergeMode::Watermark,
    };
    let options = ClassifierOptions {
        basket_policy: basket_policy.build(),
        merge_mode,
    };
    ShotClassifier::with_options(config, options).map_err(|e| e.to_string())
}

/// Classify a recorded session
fn run_replay(path: &str, mut classifier: ShotClassifier, args: &Args) {
    let replay = match CsvReplay::from_path(path) {
        Ok(replay) => replay,
        Err(e) => fail(&e.to_string()),
    };

    if !args.json {
        print_header("Replay", args.no_color);
        println!("{} rows from {} ({} skipped)", replay.rows().len(), path, replay.rows_skipped());
        println!();
    }

    let verbose = args.verbose && !args.json;
    let summary = replay.run(&mut classifier, |step| {
        if verbose && step.is_transition() {
            print_step(step);
        }
    });

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(&e.to_string()),
        }
        return;
    }

    for event in &summary.events {
        print_shot(event, args.no_color);
    }
    if summary.batches_rejected > 0 {
        println!("{} of {} batches rejected", summary.batches_rejected, summary.batches);
    }
    println!();
    print_tally(&summary.tally);
}

/// One JSON array of samples per stdin line
fn run_interactive(mut classifier: ShotClassifier, args: &Args) {
    if !args.json {
        print_header("Interactive", args.no_color);
        println!("Enter a JSON array of samples per line, e.g.");
        println!(r#"  [{{"sensor":"ACCEL","timestamp":10.0,"magnitude":6.2}}]"#);
        println!("Commands: flush, stats, reset, quit");
        println!();
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = match line {
            "quit" | "exit" => break,
            "stats" => {
                print_tally(&classifier.tally());
                continue;
            }
            "reset" => {
                classifier.reset();
                println!("Session reset");
                continue;
            }
            "flush" => classifier.flush(),
            _ => match serde_json::from_str::<Vec<RawSample>>(line) {
                Ok(batch) => {
                    let verbose = args.verbose && !args.json;
                    classifier.process_batch_with(&batch, |step| {
                        if verbose && step.is_transition() {
                            print_step(step);
                        }
                    })
                }
                Err(e) => {
                    eprintln!("{} {}", "invalid batch:".yellow(), e);
                    continue;
                }
            },
        };

        match result {
            Ok(events) => emit_shots(&events, args),
            Err(e) => eprintln!("{} {}", "rejected:".red(), e),
        }
    }

    match classifier.flush() {
        Ok(events) => emit_shots(&events, args),
        Err(e) => eprintln!("{} {}", "rejected:".red(), e),
    }
    if !args.json {
        println!();
        print_tally(&classifier.tally());
    }
}

async fn run_serve(args: &Args, classifier: ShotClassifier) {
    if let Err(e) = run_server(&args.addr, args.udp_addr.as_deref(), args.log.as_deref(), classifier).await {
        fail(&format!("server error: {}", e));
    }
}

fn print_header(mode: &str, no_color: bool) {
    let title = format!("HoopSense v{} - {}", VERSION, mode);
    if no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", "════════════════════════════════════════".bold());
        println!("  {}", title.bold());
        println!("{}", "════════════════════════════════════════".bold());
    }
    println!();
}

fn print_shot(event: &ShotEvent, no_color: bool) {
    if no_color {
        println!("{}", event.to_parseable_string());
        return;
    }
    let label = if event.is_make() {
        "MAKE".green().bold()
    } else {
        "MISS".red().bold()
    };
    let kind = event
        .basket_type()
        .map(|t| format!(" {}", t))
        .unwrap_or_default();
    let at = event
        .basket_time()
        .or(event.impact_time())
        .unwrap_or_default();
    println!(
        "🏀 {}{} at {:.3}s {}",
        label,
        kind.cyan(),
        at,
        format!("(confidence {:.2})", event.confidence()).dimmed()
    );
}

/// One JSON object per line, or the terminal rendering
fn emit_shots(events: &[ShotEvent], args: &Args) {
    for event in events {
        if args.json {
            println!("{}", serde_json::to_string(event).unwrap_or_default());
        } else {
            print_shot(event, args.no_color);
        }
    }
}

fn print_step(step: &StepOutput) {
    println!("  {} {}", step.phase.emoji(), step.to_parseable_string().dimmed());
}

fn print_tally(tally: &ShotTally) {
    println!(
        "Shots: {}  Makes: {} (swish {}, bank {})  Misses: {}",
        tally.total, tally.makes, tally.swishes, tally.banks, tally.misses
    );
    println!("Percentage: {}", tally.to_string().bold());
}
