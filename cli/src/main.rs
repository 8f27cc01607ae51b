//! dcp - digest-aware copy command.
//!
//! Parses the command line and environment, resolves owner/group names to
//! numeric ids, builds the change-detection index from prior result
//! files, and drives the copy engine. The engine itself only ever sees
//! fully-resolved values.

mod ident;
mod sink;

use clap::Parser;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use engine::{
    peek_algorithms, Algorithm, AlgorithmSet, CopyEngine, CopyOptions, Index, DEFAULT_BUFFER_SIZE,
};
use sink::{CliSink, RunMetadata};

/// Environment variables dcp responds to.
const ENV_OWNER: &str = "DCP_OWNER";
const ENV_GROUP: &str = "DCP_GROUP";
const ENV_CACHE_SIZE: &str = "DCP_CACHE_SIZE";

/// dcp - copy files and directories, digesting content as it streams
#[derive(Parser, Debug)]
#[command(name = "dcp")]
#[command(version)]
#[command(about = "Copy files and directories, computing content digests in the same pass")]
struct Args {
    /// Source paths followed by the destination
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Compute MD5 digests (the default when no digest flag is given)
    #[arg(long)]
    md5: bool,

    /// Compute SHA-1 digests
    #[arg(long)]
    sha1: bool,

    /// Compute SHA-256 digests
    #[arg(long)]
    sha256: bool,

    /// Compute SHA-512 digests
    #[arg(long)]
    sha512: bool,

    /// Compute every supported digest
    #[arg(long)]
    all: bool,

    /// Result file from a previous run; may be repeated. Enables change
    /// detection and overrides the digest flags with the recorded set.
    #[arg(long, value_name = "FILE")]
    input: Vec<PathBuf>,

    /// Where to write this run's results (default: dcp.out in the CWD)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Owner applied to the copies (default: $DCP_OWNER, then the
    /// effective user)
    #[arg(long, value_name = "USER")]
    owner: Option<String>,

    /// Group applied to the copies (default: $DCP_GROUP, then the
    /// effective group)
    #[arg(long, value_name = "GROUP")]
    group: Option<String>,

    /// Read/write buffer size in bytes, with optional k/m/g suffix
    /// (default: $DCP_CACHE_SIZE, then 32k)
    #[arg(long, value_name = "SIZE")]
    cache_size: Option<String>,

    /// Report every item to stderr as it is processed
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let exit_code = match run_cli(&args) {
        Ok(failures) if failures > 0 => 1,
        Ok(_) => 0,
        Err(msg) => {
            eprintln!("dcp: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability. Returns the number of
/// failed items; configuration errors come back as Err.
fn run_cli(args: &Args) -> Result<usize, String> {
    if args.paths.is_empty() {
        return Err("missing file operand".to_string());
    }
    if args.paths.len() == 1 {
        return Err(format!(
            "missing destination file operand after '{}'",
            args.paths[0].display()
        ));
    }
    let (sources, dest) = args.paths.split_at(args.paths.len() - 1);
    let dest = &dest[0];

    let mut algorithms = digest_flags(args);

    // When prior results are given, re-verification computes whatever the
    // historical files recorded instead of the flags.
    let mut index = None;
    if !args.input.is_empty() {
        algorithms = peek_algorithms(&args.input).map_err(|e| e.to_string())?;
        index = Some(Index::build(&args.input).map_err(|e| e.to_string())?);
    }

    let (uid, owner_name) = resolve_owner(args.owner.as_deref());
    let (gid, group_name) = resolve_group(args.group.as_deref());
    let buffer_size = parse_cache_size(args.cache_size.as_deref())?;
    let (stream, outfile) = open_output(args.output.as_deref())?;

    let options = CopyOptions {
        buffer_size,
        algorithms,
        uid,
        gid,
        index,
        verbose: args.verbose,
    };

    let metadata = RunMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        command: command_line(),
        digests: algorithms,
        host: ident::hostname(),
        cwd: env::current_dir().ok(),
        sources: sources.to_vec(),
        destination: dest.clone(),
        output: outfile,
        owner: owner_name,
        group: group_name,
    };
    let mut sink = CliSink::new(stream, options.verbose, metadata);

    let mut engine = CopyEngine::new(options);
    let summary = engine.run(sources, dest, &mut sink).map_err(|e| e.to_string())?;
    Ok(summary.failed())
}

/// Translate the digest flags into the enabled set; no flag means MD5.
fn digest_flags(args: &Args) -> AlgorithmSet {
    if args.all {
        return AlgorithmSet::all();
    }
    let mut set = AlgorithmSet::empty();
    if args.md5 {
        set.insert(Algorithm::Md5);
    }
    if args.sha1 {
        set.insert(Algorithm::Sha1);
    }
    if args.sha256 {
        set.insert(Algorithm::Sha256);
    }
    if args.sha512 {
        set.insert(Algorithm::Sha512);
    }
    if set.is_empty() {
        set = AlgorithmSet::default();
    }
    set
}

/// Resolve the owner of the copies: the command line overrides the
/// environment; a failed lookup warns and falls back to the effective
/// uid. The name is kept for the result-file header either way.
fn resolve_owner(arg: Option<&str>) -> (u32, Option<String>) {
    let name = arg.map(str::to_owned).or_else(|| env::var(ENV_OWNER).ok());
    let Some(name) = name else {
        return (rustix::process::geteuid().as_raw(), None);
    };
    match ident::user_id(&name) {
        Some(uid) => (uid, Some(name)),
        None => {
            eprintln!(
                "dcp: uid lookup for '{}' failed, defaulting to the effective uid",
                name
            );
            (rustix::process::geteuid().as_raw(), Some(name))
        }
    }
}

/// Same as `resolve_owner`, for the group.
fn resolve_group(arg: Option<&str>) -> (u32, Option<String>) {
    let name = arg.map(str::to_owned).or_else(|| env::var(ENV_GROUP).ok());
    let Some(name) = name else {
        return (rustix::process::getegid().as_raw(), None);
    };
    match ident::group_id(&name) {
        Some(gid) => (gid, Some(name)),
        None => {
            eprintln!(
                "dcp: gid lookup for '{}' failed, defaulting to the effective gid",
                name
            );
            (rustix::process::getegid().as_raw(), Some(name))
        }
    }
}

/// Parse the buffer size, honoring k/m/g suffixes; the command line
/// overrides the environment.
fn parse_cache_size(arg: Option<&str>) -> Result<usize, String> {
    let value = arg.map(str::to_owned).or_else(|| env::var(ENV_CACHE_SIZE).ok());
    let Some(value) = value else {
        return Ok(DEFAULT_BUFFER_SIZE);
    };
    let value = value.trim();

    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, suffix) = value.split_at(digits_end);
    let base: usize = digits
        .parse()
        .map_err(|_| format!("invalid cache size: '{}'", value))?;
    let multiplier: usize = match suffix {
        "" => 1,
        "k" | "K" => 1024,
        "m" | "M" => 1024 * 1024,
        "g" | "G" => 1024 * 1024 * 1024,
        _ => return Err(format!("invalid cache size suffix: '{}'", value)),
    };
    base.checked_mul(multiplier)
        .ok_or_else(|| format!("cache size too large: '{}'", value))
}

/// Open the result stream. Without --output, create dcp.out in the CWD,
/// stepping to dcp(1).out, dcp(2).out, ... if it already exists.
fn open_output(arg: Option<&Path>) -> Result<(File, PathBuf), String> {
    if let Some(path) = arg {
        let file = File::create(path)
            .map_err(|e| format!("cannot create output file '{}': {}", path.display(), e))?;
        return Ok((file, path.to_path_buf()));
    }

    let mut attempt = 0usize;
    loop {
        let name = if attempt == 0 {
            "dcp.out".to_string()
        } else {
            format!("dcp({}).out", attempt)
        };
        match OpenOptions::new().write(true).create_new(true).open(&name) {
            Ok(file) => return Ok((file, PathBuf::from(name))),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(format!("cannot create output file '{}': {}", name, e)),
        }
    }
}

fn command_line() -> String {
    env::args().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args_for(paths: Vec<PathBuf>, output: Option<PathBuf>) -> Args {
        Args {
            paths,
            md5: false,
            sha1: false,
            sha256: false,
            sha512: false,
            all: false,
            input: Vec::new(),
            output,
            owner: None,
            group: None,
            cache_size: None,
            verbose: false,
        }
    }

    #[test]
    fn test_cli_copies_and_writes_result_file() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let out_dir = TempDir::new().expect("Failed to create temp dir");

        fs::write(src_dir.path().join("test.txt"), "hello").expect("Failed to write file");

        let output = out_dir.path().join("run.out");
        let args = args_for(
            vec![
                src_dir.path().join("test.txt"),
                dst_dir.path().to_path_buf(),
            ],
            Some(output.clone()),
        );

        let failures = run_cli(&args).expect("CLI should succeed");
        assert_eq!(failures, 0);
        assert_eq!(
            fs::read_to_string(dst_dir.path().join("test.txt")).unwrap(),
            "hello"
        );

        let report = fs::read_to_string(&output).expect("Failed to read result file");
        assert!(report.contains("File generated by dcp DO NOT EDIT"));
        assert!(report.contains("digests     md5"));
        // md5 of "hello"
        assert!(report.contains("md5 5d41402abc4b2a76b9719d911017c592 test.txt"));
    }

    #[test]
    fn test_cli_rejects_missing_operands() {
        let result = run_cli(&args_for(Vec::new(), None));
        assert_eq!(result.unwrap_err(), "missing file operand");

        let result = run_cli(&args_for(vec![PathBuf::from("only")], None));
        assert!(result.unwrap_err().contains("missing destination file operand"));
    }

    #[test]
    fn test_cli_second_run_detects_changes() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let out_dir = TempDir::new().expect("Failed to create temp dir");

        fs::write(src_dir.path().join("keep.txt"), "same").expect("Failed to write file");
        fs::write(src_dir.path().join("edit.txt"), "before").expect("Failed to write file");

        let first_out = out_dir.path().join("first.out");
        let args = args_for(
            vec![src_dir.path().to_path_buf(), dst_dir.path().to_path_buf()],
            Some(first_out.clone()),
        );
        run_cli(&args).expect("First run should succeed");

        fs::write(src_dir.path().join("edit.txt"), "after!").expect("Failed to rewrite file");

        let second_out = out_dir.path().join("second.out");
        let mut args = args_for(
            vec![src_dir.path().to_path_buf(), dst_dir.path().to_path_buf()],
            Some(second_out.clone()),
        );
        args.input = vec![first_out];
        let failures = run_cli(&args).expect("Second run should succeed");
        assert_eq!(failures, 0);

        let report = fs::read_to_string(&second_out).expect("Failed to read result file");
        assert!(report.contains("digests     md5"));
    }

    #[test]
    fn test_cli_input_overrides_digest_flags() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let out_dir = TempDir::new().expect("Failed to create temp dir");

        fs::write(src_dir.path().join("data.txt"), "payload").expect("Failed to write file");

        let first_out = out_dir.path().join("first.out");
        let mut args = args_for(
            vec![src_dir.path().to_path_buf(), dst_dir.path().to_path_buf()],
            Some(first_out.clone()),
        );
        args.sha256 = true;
        run_cli(&args).expect("First run should succeed");

        // second run asks for md5, but the recorded set wins
        let second_out = out_dir.path().join("second.out");
        let mut args = args_for(
            vec![src_dir.path().to_path_buf(), dst_dir.path().to_path_buf()],
            Some(second_out.clone()),
        );
        args.md5 = true;
        args.input = vec![first_out];
        run_cli(&args).expect("Second run should succeed");

        let report = fs::read_to_string(&second_out).expect("Failed to read result file");
        assert!(report.contains("digests     sha256"));
        assert!(report.contains("sha256 "));
        assert!(!report.contains("\nmd5 "));
    }

    #[test]
    fn test_cli_rejects_unreadable_input() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let out_dir = TempDir::new().expect("Failed to create temp dir");

        fs::write(src_dir.path().join("a.txt"), "x").expect("Failed to write file");

        let mut args = args_for(
            vec![src_dir.path().to_path_buf(), dst_dir.path().to_path_buf()],
            Some(out_dir.path().join("run.out")),
        );
        args.input = vec![out_dir.path().join("missing.out")];
        assert!(run_cli(&args).is_err());
    }

    #[test]
    fn test_digest_flags_default_to_md5() {
        let args = args_for(vec![PathBuf::from("a"), PathBuf::from("b")], None);
        let set = digest_flags(&args);
        assert!(set.contains(Algorithm::Md5));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_digest_flags_all() {
        let mut args = args_for(vec![PathBuf::from("a"), PathBuf::from("b")], None);
        args.all = true;
        assert_eq!(digest_flags(&args).len(), 4);
    }

    #[test]
    fn test_parse_cache_size_suffixes() {
        assert_eq!(parse_cache_size(Some("4096")).unwrap(), 4096);
        assert_eq!(parse_cache_size(Some("64k")).unwrap(), 64 * 1024);
        assert_eq!(parse_cache_size(Some("2M")).unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_cache_size(Some("1g")).unwrap(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_cache_size_rejects_garbage() {
        assert!(parse_cache_size(Some("fast")).is_err());
        assert!(parse_cache_size(Some("64q")).is_err());
        assert!(parse_cache_size(Some("")).is_err());
    }

    #[test]
    fn test_open_output_steps_past_collisions() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let cwd = env::current_dir().expect("Failed to read cwd");
        env::set_current_dir(dir.path()).expect("Failed to enter temp dir");

        let (_, first) = open_output(None).expect("Failed to open first output");
        let (_, second) = open_output(None).expect("Failed to open second output");
        assert_eq!(first, PathBuf::from("dcp.out"));
        assert_eq!(second, PathBuf::from("dcp(1).out"));

        env::set_current_dir(cwd).expect("Failed to restore cwd");
    }

    #[test]
    fn test_resolve_owner_without_name_uses_effective_uid() {
        // make sure the environment does not leak into the test
        if env::var(ENV_OWNER).is_err() {
            let (uid, name) = resolve_owner(None);
            assert_eq!(uid, rustix::process::geteuid().as_raw());
            assert_eq!(name, None);
        }
    }

    #[test]
    fn test_resolve_owner_unknown_name_falls_back() {
        let (uid, name) = resolve_owner(Some("no-such-user-dcp-test"));
        assert_eq!(uid, rustix::process::geteuid().as_raw());
        assert_eq!(name.as_deref(), Some("no-such-user-dcp-test"));
    }
}
