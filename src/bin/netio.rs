//! netio command-line driver
//!
//! Runs one job from flags, or every job in a TOML job file (one thread per
//! job), and prints a summary per job.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use tracing_subscriber::EnvFilter;

use netio::{parse_size, run_job, EngineRegistry, JobFile, JobReport, JobSpec, RwMode};

/// Command-line configuration
struct Config {
    /// Job file; overrides the single-job flags when set
    job_file: Option<PathBuf>,
    /// Single job built from flags
    spec: JobSpec,
    /// Print reports as JSON
    json: bool,
}

fn usage() {
    println!("netio - depth-one TCP transfer engine");
    println!();
    println!("USAGE:");
    println!("    netio [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -r, --rw <read|write>     Direction; read listens, write connects [default: write]");
    println!("    -t, --target <HOST:PORT>  Peer for write jobs, listen port for read jobs");
    println!("    -s, --size <SIZE>         Total bytes, e.g. 64m [default: 1m]");
    println!("    -b, --bs <SIZE>           Block size [default: 4k]");
    println!("    -n, --name <NAME>         Job name [default: netio]");
    println!("    -e, --engine <NAME>       Engine [default: net]");
    println!("    -j, --job <FILE>          Run the jobs in a TOML job file");
    println!("        --json                Print reports as JSON");
    println!("    -h, --help                Print help information");
}

fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    std::process::exit(2);
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config {
        job_file: None,
        spec: JobSpec::new("netio", RwMode::Write, "", 1 << 20),
        json: false,
    };
    let mut target: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .cloned()
                .unwrap_or_else(|| fail(&format!("{flag} requires a value")))
        };

        match flag {
            "--rw" | "-r" => {
                config.spec.rw = match value().as_str() {
                    "read" => RwMode::Read,
                    "write" => RwMode::Write,
                    "readwrite" | "rw" => RwMode::ReadWrite,
                    other => fail(&format!("invalid --rw value: {other}")),
                };
                i += 2;
            }
            "--target" | "-t" => {
                target = Some(value());
                i += 2;
            }
            "--size" | "-s" => {
                let v = value();
                config.spec.size.0 = parse_size(&v).unwrap_or_else(|e| fail(&e.to_string()));
                i += 2;
            }
            "--bs" | "-b" => {
                let v = value();
                config.spec.bs.0 = parse_size(&v).unwrap_or_else(|e| fail(&e.to_string()));
                i += 2;
            }
            "--name" | "-n" => {
                config.spec.name = value();
                i += 2;
            }
            "--engine" | "-e" => {
                config.spec.engine = value();
                i += 2;
            }
            "--job" | "-j" => {
                config.job_file = Some(PathBuf::from(value()));
                i += 2;
            }
            "--json" => {
                config.json = true;
                i += 1;
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            arg => fail(&format!("unknown argument: {arg}")),
        }
    }

    config.spec.filename = target;
    if config.job_file.is_none() && config.spec.filename.is_none() {
        fail("--target or --job is required");
    }
    config
}

fn print_human(report: &JobReport) {
    let mib_s = report.throughput() / f64::from(1u32 << 20);
    match &report.error {
        None => println!(
            "{}: {} {} bytes in {} ops, {:.3}s ({:.2} MiB/s)",
            report.job, report.rw, report.bytes, report.ops, report.elapsed_secs, mib_s
        ),
        Some(err) => println!(
            "{}: {} stopped after {} bytes in {} ops: {}",
            report.job, report.rw, report.bytes, report.ops, err
        ),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = parse_args();
    let registry = EngineRegistry::with_builtin();

    let specs = match &config.job_file {
        Some(path) => match JobFile::load(path) {
            Ok(file) => file.jobs,
            Err(e) => fail(&e.to_string()),
        },
        None => vec![config.spec.clone()],
    };

    // Parallelism across jobs belongs to the harness: one thread per job.
    let registry = &registry;
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = specs
            .iter()
            .map(|spec| scope.spawn(move || run_job(registry, spec)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| fail("job thread panicked")))
            .collect()
    });

    let mut ok = true;
    let mut reports = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(report) => {
                ok &= report.is_ok();
                reports.push(report);
            }
            Err(e) => {
                ok = false;
                eprintln!("error: {e}");
            }
        }
    }

    if config.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(s) => println!("{s}"),
            Err(e) => fail(&format!("failed to serialize reports: {e}")),
        }
    } else {
        reports.iter().for_each(print_human);
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
