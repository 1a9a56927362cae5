//! poifs-dump CLI
//!
//! Extracts every stream of one or more compound files into
//! `<file>_dump/` directories next to the inputs.

use clap::Parser;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poifs::poifs::{default_dump_dir, dump_filesystem, DumpOptions, PoifsFileSystem, PoifsOptions};

#[derive(Parser, Debug)]
#[command(name = "poifs-dump")]
#[command(version, about = "Dump the streams of OLE2 compound files to disk", long_about = None)]
struct Cli {
    /// Compound files to dump
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Also write the raw directory stream to `_properties.bin` (also `-dumpprops`)
    #[arg(long, alias = "dumpprops")]
    dump_props: bool,

    /// Also write the raw mini stream to `_mini_stream.bin` (also `-dumpmini`)
    #[arg(long, alias = "dumpmini")]
    dump_mini: bool,

    /// YAML file with `options` and `dump` sections
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Layout of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    options: PoifsOptions,
    dump: DumpOptions,
}

/// Map the single-dash `-dumpprops` / `-dumpmini` spellings to long flags.
///
/// clap reads a single dash as a cluster of short flags, so these are
/// rewritten before parsing.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-dumpprops") => OsString::from("--dump-props"),
            Some("-dumpmini") => OsString::from("--dump-mini"),
            _ => arg,
        })
        .collect()
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "poifs=warn,poifs_dump=info",
        1 => "poifs=debug,poifs_dump=debug",
        _ => "poifs=trace,poifs_dump=trace",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    serde_saphyr::from_str(&text).map_err(|e| format!("invalid config {}: {}", path.display(), e))
}

fn dump_one(file: &Path, options: &PoifsOptions, dump: DumpOptions) -> poifs::Result<usize> {
    let fs = PoifsFileSystem::open_path(file, options.clone())?;
    let out_dir = default_dump_dir(file);
    dump_filesystem(&fs, &out_dir, dump)
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        },
    };
    let dump = DumpOptions {
        dump_props: cli.dump_props || config.dump.dump_props,
        dump_mini: cli.dump_mini || config.dump.dump_mini,
    };

    let mut failed = false;
    for file in &cli.files {
        match dump_one(file, &config.options, dump) {
            Ok(count) => {
                info!(file = %file.display(), documents = count, "dumped");
                println!("{}: {} documents", file.display(), count);
            },
            Err(e) => {
                error!(file = %file.display(), error = %e, "dump failed");
                eprintln!("Error: {}: {}", file.display(), e);
                failed = true;
            },
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_args(args.iter().map(|arg| OsString::from(*arg))))
    }

    #[test]
    fn test_single_dash_dump_flags() {
        let cli = parse(&["poifs-dump", "a.doc", "-dumpprops", "-dumpmini", "b.xls"]).unwrap();
        assert!(cli.dump_props);
        assert!(cli.dump_mini);
        assert_eq!(cli.files, vec![PathBuf::from("a.doc"), PathBuf::from("b.xls")]);
    }

    #[test]
    fn test_long_dump_flags_and_aliases() {
        let cli = parse(&["poifs-dump", "--dump-props", "a.doc"]).unwrap();
        assert!(cli.dump_props);
        assert!(!cli.dump_mini);

        let cli = parse(&["poifs-dump", "--dumpmini", "-vv", "a.doc"]).unwrap();
        assert!(cli.dump_mini);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_files_required() {
        assert!(parse(&["poifs-dump", "-dumpprops"]).is_err());
    }
}
