use std::process;

use clap::{Parser, Subcommand};
use pyscope_core::config::DecoderConfig;
use pyscope_core::layout::{layout_for, ObjectKind};
use pyscope_core::types::{ProcessSnapshot, RemoteAddress, ThreadSnapshot};
use pyscope_core::version::{select_with_model, DataModel, Release, ReleaseFamily, SUPPORTED_RELEASES};
use pyscope_core::{InterpreterVersion, Result as DecodeResult};
use pyscope_utils::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingGuard, LoggingError};

/// Inspect the Python stacks of a running CPython 2.4-3.1 process.
#[derive(Parser, Debug)]
#[command(name = "pyscope")]
#[command(version)]
#[command(about = "Inspect the Python stacks of a running CPython 2.4-3.1 process", long_about = None)]
struct Cli
{
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Interpreter build the target runs.
#[derive(clap::Args, Debug)]
struct TargetArgs
{
    /// Interpreter release, e.g. 2.7
    #[arg(long = "python", value_name = "X.Y")]
    release: Release,
    /// Pointer width of the target in bytes
    #[arg(long, default_value_t = 8)]
    pointer_width: usize,
    /// C data model of the target build (lp64 or llp64)
    #[arg(long, default_value = "lp64")]
    data_model: DataModel,
}

impl TargetArgs
{
    fn version(&self) -> DecodeResult<InterpreterVersion>
    {
        select_with_model(
            self.release.major,
            self.release.minor,
            self.pointer_width,
            self.data_model,
        )
    }
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Capture the Python stack of a live process (Linux)
    Stack
    {
        /// Process ID (PID) of the interpreter
        pid: u32,
        /// Address of a PyThreadState (hex format: 0x7f... or decimal)
        #[arg(long, value_parser = parse_address)]
        thread_state: RemoteAddress,
        #[command(flatten)]
        target: TargetArgs,
        /// Maximum frames per thread (default: PYSCOPE_MAX_DEPTH or 256)
        #[arg(long)]
        max_depth: Option<usize>,
        /// Treat the thread state as a list head and capture every thread
        #[arg(long, default_value_t = false)]
        all_threads: bool,
    },
    /// Print the field offsets of one object kind
    Layout
    {
        /// Object kind (frame, code, threadstate, string, bytes, unicode, ...)
        kind: ObjectKind,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// List supported interpreter releases
    Versions,
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match start_logging(cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn start_logging(verbose: u8) -> Result<LoggingGuard, LoggingError>
{
    if verbose == 0 {
        init_logging()
    } else {
        init_logging_with_level(LogLevel::from_verbosity(verbose), LogFormat::Pretty)
    }
}

fn run_command(command: Commands) -> DecodeResult<()>
{
    match command {
        Commands::Stack {
            pid,
            thread_state,
            target,
            max_depth,
            all_threads,
        } => {
            let mut config = DecoderConfig::from_env();
            if let Some(max_depth) = max_depth {
                config = config.with_max_depth(max_depth);
            }
            capture(pid, thread_state, target.version()?, config, all_threads)
        }
        Commands::Layout { kind, target } => print_layout(kind, &target.version()?),
        Commands::Versions => {
            print_versions();
            Ok(())
        }
    }
}

#[cfg(target_os = "linux")]
fn capture(
    pid: u32,
    thread_state: RemoteAddress,
    version: InterpreterVersion,
    config: DecoderConfig,
    all_threads: bool,
) -> DecodeResult<()>
{
    use pyscope_core::platform::linux::ProcessMemory;
    use pyscope_core::types::ProcessId;
    use pyscope_core::StackDecoder;
    use pyscope_utils::info;

    let memory = ProcessMemory::attach(ProcessId::from(pid))?;
    let decoder = StackDecoder::new(memory, version)?.with_config(config);
    info!("capturing process {pid} as {version}");

    let snapshot = if all_threads {
        decoder.capture_all(thread_state)?
    } else {
        ProcessSnapshot {
            threads: vec![decoder.capture(thread_state)?],
            error: None,
        }
    };
    print_snapshot(&snapshot);
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn capture(
    _pid: u32,
    _thread_state: RemoteAddress,
    _version: InterpreterVersion,
    _config: DecoderConfig,
    _all_threads: bool,
) -> DecodeResult<()>
{
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "live capture is only supported on Linux",
    )
    .into())
}

fn print_snapshot(snapshot: &ProcessSnapshot)
{
    for thread in &snapshot.threads {
        print_thread(thread);
    }
    if let Some(error) = &snapshot.error {
        println!("[thread list incomplete: {error}]");
    }
}

fn print_thread(thread: &ThreadSnapshot)
{
    println!("Thread {} (state {}):", thread.thread, thread.thread_state);
    if thread.frames.is_empty() && thread.error.is_none() {
        println!("  <no Python frames>");
    }
    for frame in &thread.frames {
        println!("  #{:<3} {}", frame.index, frame);
    }
    if let Some(error) = &thread.error {
        println!("  [stack incomplete: {error}]");
    }
}

fn print_layout(kind: ObjectKind, version: &InterpreterVersion) -> DecodeResult<()>
{
    let layout = layout_for(kind, version)?;
    println!("{kind} layout for {version}, entry {}:", layout.range());
    println!("  {:<24} {:>6} {:>6}  type", "field", "offset", "size");
    for field in layout.fields() {
        println!(
            "  {:<24} {:>6} {:>6}  {}",
            field.name,
            field.offset,
            field.size,
            field.ty.label()
        );
    }
    println!("  sizeof = {}", layout.size());
    Ok(())
}

fn print_versions()
{
    println!("{:<8} {:<10} pointer widths", "release", "family");
    for release in SUPPORTED_RELEASES {
        let family = if ReleaseFamily::Python2.range().contains(release) {
            "Python2"
        } else {
            "Python3"
        };
        let widths = if release == Release::new(2, 4) { "4" } else { "4, 8" };
        println!("{:<8} {family:<10} {widths}", release.to_string());
    }
}

fn parse_address(s: &str) -> Result<RemoteAddress, String>
{
    let trimmed = s.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed
        .map(RemoteAddress::new)
        .map_err(|_| format!("Invalid address: {s}. Use hex (0x7f...) or decimal"))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_address()
    {
        assert_eq!(parse_address("0x1000").unwrap(), RemoteAddress::new(0x1000));
        assert_eq!(parse_address("4096").unwrap(), RemoteAddress::new(4096));
        assert!(parse_address("0xzz").is_err());
    }

    #[test]
    fn test_cli_parses_stack_command()
    {
        let cli = Cli::try_parse_from([
            "pyscope",
            "stack",
            "1234",
            "--python",
            "2.7",
            "--thread-state",
            "0x7f0000001000",
            "--pointer-width",
            "4",
            "--all-threads",
        ])
        .unwrap();

        match cli.command {
            Commands::Stack {
                pid,
                thread_state,
                target,
                all_threads,
                ..
            } => {
                assert_eq!(pid, 1234);
                assert_eq!(thread_state, RemoteAddress::new(0x7f00_0000_1000));
                assert_eq!(target.release, Release::new(2, 7));
                assert_eq!(target.pointer_width, 4);
                assert!(all_threads);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_layout_rejects_unknown_kind()
    {
        assert!(Cli::try_parse_from(["pyscope", "layout", "dict", "--python", "3.1"]).is_err());
        assert!(Cli::try_parse_from(["pyscope", "layout", "frame", "--python", "3.1"]).is_ok());
    }
}
