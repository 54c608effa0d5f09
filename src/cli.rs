// Command-line front end for oxipatch.
//
// Subcommands map one-to-one onto the file-level operations in `io`, plus
// two inspection commands (`header`, `config`).

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::engine::DiffOptions;
use crate::error::PatchError;
use crate::format::{CONTROL_SIZE, HEADER_SIZE, MAGIC, PatchHeader};
use crate::io::{self as fileio, ApplyStats, DiffStats};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_LEVEL: u32 = 9;
const STAGING_SUFFIX: &str = ".oxipatch-new";

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// bsdiff-compatible binary diff and patch tool.
#[derive(Parser, Debug)]
#[command(
    name = "oxipatch",
    version,
    about = "BSDIFF40 binary diff/patch tool",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a patch turning OLD into NEW.
    Diff(DiffArgs),
    /// Rebuild NEW from OLD and a patch into a separate output file.
    Apply(ApplyArgs),
    /// Patch a file in place.
    Dirty(DirtyArgs),
    /// Print the validated header of a patch.
    Header(HeaderArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Original file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Updated file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Patch file to write.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// bzip2 compression level (1-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(1..=9), default_value_t = DEFAULT_LEVEL)]
    level: u32,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Original file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Reconstructed file to write.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct DirtyArgs {
    /// File to patch in place.
    #[arg(value_hint = ValueHint::FilePath)]
    target: PathBuf,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Where to stage the reconstruction before it replaces the target
    /// (default: `<target>.oxipatch-new`).
    #[arg(long, value_hint = ValueHint::FilePath)]
    staging: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HeaderArgs {
    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Diff,
    Apply,
    Dirty,
    Header,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    level: u32,
    old_file: Option<PathBuf>,
    new_file: Option<PathBuf>,
    patch_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl Options {
    fn base(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            level: DEFAULT_LEVEL,
            old_file: None,
            new_file: None,
            patch_file: None,
            output_file: None,
        }
    }
}

fn default_staging(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Diff(args) => Options {
            level: args.level,
            old_file: Some(args.old.clone()),
            new_file: Some(args.new.clone()),
            patch_file: Some(args.patch.clone()),
            ..Options::base(Command::Diff, &cli)
        },
        Cmd::Apply(args) => Options {
            old_file: Some(args.old.clone()),
            patch_file: Some(args.patch.clone()),
            output_file: Some(args.output.clone()),
            ..Options::base(Command::Apply, &cli)
        },
        // For dirty the target doubles as the old file; the staging path is
        // the intermediate output.
        Cmd::Dirty(args) => Options {
            old_file: Some(args.target.clone()),
            patch_file: Some(args.patch.clone()),
            output_file: Some(
                args.staging
                    .clone()
                    .unwrap_or_else(|| default_staging(&args.target)),
            ),
            ..Options::base(Command::Dirty, &cli)
        },
        Cmd::Header(args) => Options {
            patch_file: Some(args.patch.clone()),
            ..Options::base(Command::Header, &cli)
        },
        Cmd::Config => Options::base(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxipatch".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn required<'a>(path: &'a Option<PathBuf>, what: &str) -> Result<&'a Path, i32> {
    path.as_deref().ok_or_else(|| {
        eprintln!("oxipatch: missing {what}");
        1
    })
}

fn refuse_overwrite(path: &Path, opts: &Options) -> bool {
    if path.exists() && !opts.force {
        eprintln!(
            "oxipatch: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return true;
    }
    false
}

fn report_error(command: &str, err: &PatchError) -> i32 {
    eprintln!("oxipatch: {command}: {err}");
    1
}

fn hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn emit_json(json: serde_json::Value) {
    eprintln!("{json:#}");
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxipatch version {version} (Rust), Copyright (C) oxipatch contributors");
    eprintln!("Licensed under the Apache License, Version 2.0");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();
    let magic = String::from_utf8_lossy(&MAGIC);

    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("MAGIC={magic}");
    eprintln!("HEADER_SIZE={HEADER_SIZE}");
    eprintln!("CONTROL_SIZE={CONTROL_SIZE}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Diff command
// ---------------------------------------------------------------------------

fn cmd_diff(opts: &Options) -> i32 {
    let (old, new, patch) = match (
        required(&opts.old_file, "old file"),
        required(&opts.new_file, "new file"),
        required(&opts.patch_file, "patch file"),
    ) {
        (Ok(o), Ok(n), Ok(p)) => (o, n, p),
        _ => return 1,
    };
    if refuse_overwrite(patch, opts) {
        return 1;
    }

    let diff_opts = DiffOptions { level: opts.level };
    let stats: DiffStats = match fileio::clean_with_options(old, new, patch, &diff_opts) {
        Ok(s) => s,
        Err(e) => return report_error("diff", &e),
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxipatch: diff: old size: {}, new size: {}, patch size: {}, controls: {}",
            stats.old_size, stats.new_size, stats.patch_size, stats.controls
        );
    }

    if opts.json_output {
        emit_json(serde_json::json!({
            "command": "diff",
            "old_size": stats.old_size,
            "new_size": stats.new_size,
            "patch_size": stats.patch_size,
            "controls": stats.controls,
            "copied": stats.copied,
            "inserted": stats.inserted,
            "level": opts.level,
            "new_sha256": stats.new_sha256.as_ref().map(hex),
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Apply / dirty commands
// ---------------------------------------------------------------------------

fn cmd_apply(opts: &Options) -> i32 {
    let (old, patch, output) = match (
        required(&opts.old_file, "old file"),
        required(&opts.patch_file, "patch file"),
        required(&opts.output_file, "output file"),
    ) {
        (Ok(o), Ok(p), Ok(out)) => (o, p, out),
        _ => return 1,
    };
    if refuse_overwrite(output, opts) {
        return 1;
    }

    match fileio::apply_file(old, patch, output) {
        Ok(stats) => {
            report_apply("apply", &stats, opts);
            0
        }
        Err(e) => report_error("apply", &e),
    }
}

fn cmd_dirty(opts: &Options) -> i32 {
    let (target, patch, staging) = match (
        required(&opts.old_file, "target file"),
        required(&opts.patch_file, "patch file"),
        required(&opts.output_file, "staging file"),
    ) {
        (Ok(t), Ok(p), Ok(s)) => (t, p, s),
        _ => return 1,
    };
    if staging != target && refuse_overwrite(staging, opts) {
        return 1;
    }

    match fileio::dirty(target, staging, patch) {
        Ok(stats) => {
            report_apply("dirty", &stats, opts);
            0
        }
        Err(e) => report_error("dirty", &e),
    }
}

fn report_apply(command: &str, stats: &ApplyStats, opts: &Options) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxipatch: {command}: old size: {}, patch size: {}, output size: {}, controls: {}",
            stats.old_size, stats.patch_size, stats.output_size, stats.controls
        );
    }

    if opts.json_output {
        emit_json(serde_json::json!({
            "command": command,
            "old_size": stats.old_size,
            "patch_size": stats.patch_size,
            "output_size": stats.output_size,
            "controls": stats.controls,
            "output_sha256": stats.output_sha256.as_ref().map(hex),
        }));
    }
}

// ---------------------------------------------------------------------------
// Header command
// ---------------------------------------------------------------------------

fn read_header(path: &Path) -> Result<(PatchHeader, u64), PatchError> {
    let file = File::open(path).map_err(PatchError::file(path))?;
    let patch_len = file.metadata().map_err(PatchError::file(path))?.len();
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    file.take(HEADER_SIZE as u64)
        .read_to_end(&mut buf)
        .map_err(PatchError::file(path))?;
    let header = PatchHeader::parse(&buf)?;
    header.check_bounds(patch_len)?;
    Ok((header, patch_len))
}

fn cmd_header(opts: &Options) -> i32 {
    let path = match required(&opts.patch_file, "patch file") {
        Ok(p) => p,
        Err(code) => return code,
    };

    let (header, patch_len) = match read_header(path) {
        Ok(h) => h,
        Err(e) => return report_error("header", &e),
    };
    let extra_len = patch_len - header.extra_offset();

    println!("magic:                 {}", String::from_utf8_lossy(&MAGIC));
    println!("control length:        {}", header.control_len);
    println!("diff length:           {}", header.diff_len);
    println!("extra length:          {extra_len}");
    println!("new size:              {}", header.new_size);
    println!("patch size:            {patch_len}");

    if opts.json_output {
        emit_json(serde_json::json!({
            "command": "header",
            "control_len": header.control_len,
            "diff_len": header.diff_len,
            "extra_len": extra_len,
            "new_size": header.new_size,
            "patch_size": patch_len,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the CLI. Never returns.
pub fn run() -> ! {
    let cli = Cli::parse();

    let default_filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let opts = resolve_options(cli);

    let exit_code = match opts.command {
        Command::Diff => cmd_diff(&opts),
        Command::Apply => cmd_apply(&opts),
        Command::Dirty => cmd_dirty(&opts),
        Command::Header => cmd_header(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("oxipatch".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    fn parse_err(args: &[&str]) -> bool {
        let argv: Vec<String> = std::iter::once("oxipatch".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        Cli::try_parse_from(argv).is_err()
    }

    #[test]
    fn diff_subcommand_maps_correctly() {
        let opts = parse_opts(&["diff", "--level", "3", "old.bin", "new.bin", "out.patch"]);
        assert_eq!(opts.command, Command::Diff);
        assert_eq!(opts.level, 3);
        assert_eq!(opts.old_file, Some(PathBuf::from("old.bin")));
        assert_eq!(opts.new_file, Some(PathBuf::from("new.bin")));
        assert_eq!(opts.patch_file, Some(PathBuf::from("out.patch")));
    }

    #[test]
    fn diff_level_defaults_and_range() {
        let opts = parse_opts(&["diff", "a", "b", "c"]);
        assert_eq!(opts.level, DEFAULT_LEVEL);
        assert!(parse_err(&["diff", "--level", "0", "a", "b", "c"]));
        assert!(parse_err(&["diff", "--level", "10", "a", "b", "c"]));
    }

    #[test]
    fn apply_subcommand_maps_correctly() {
        let opts = parse_opts(&["--quiet", "apply", "old.bin", "p.patch", "new.bin"]);
        assert_eq!(opts.command, Command::Apply);
        assert!(opts.quiet);
        assert_eq!(opts.old_file, Some(PathBuf::from("old.bin")));
        assert_eq!(opts.patch_file, Some(PathBuf::from("p.patch")));
        assert_eq!(opts.output_file, Some(PathBuf::from("new.bin")));
    }

    #[test]
    fn dirty_uses_default_staging() {
        let opts = parse_opts(&["dirty", "app.bin", "app.patch"]);
        assert_eq!(opts.command, Command::Dirty);
        assert_eq!(opts.old_file, Some(PathBuf::from("app.bin")));
        assert_eq!(
            opts.output_file,
            Some(PathBuf::from("app.bin.oxipatch-new"))
        );

        let opts = parse_opts(&["dirty", "--staging", "/tmp/s", "app.bin", "app.patch"]);
        assert_eq!(opts.output_file, Some(PathBuf::from("/tmp/s")));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let opts = parse_opts(&["header", "p.patch", "--force", "--json", "-vvv"]);
        assert_eq!(opts.command, Command::Header);
        assert!(opts.force);
        assert!(opts.json_output);
        assert_eq!(opts.verbose, 2);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(parse_err(&["-q", "-v", "config"]));
    }

    #[test]
    fn missing_positionals_rejected() {
        assert!(parse_err(&["diff", "old", "new"]));
        assert!(parse_err(&["apply", "old"]));
        assert!(parse_err(&["dirty"]));
    }

    #[test]
    fn hex_formats_digest() {
        let mut d = [0u8; 32];
        d[0] = 0xab;
        d[31] = 0x01;
        let s = hex(&d);
        assert_eq!(s.len(), 64);
        assert!(s.starts_with("ab00"));
        assert!(s.ends_with("01"));
    }

    #[test]
    fn fuzz_parse_never_panics() {
        fuzz_try_parse_args(&["diff".into(), "--level".into(), "x".into()]);
        fuzz_try_parse_args(&[]);
    }
}
