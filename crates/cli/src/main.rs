use std::{
    fs,
    io::{Write, stderr, stdout},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
    time::Instant,
};

use clap::{
    ArgAction, ArgGroup, Args, ColorChoice, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::styling::{AnsiColor, Color, Style, Styles},
};
use mimalloc::MiMalloc;
use rayon::{ThreadPoolBuilder, prelude::*};
use regex::Regex;
use serde::Serialize;

use cifti::{Cifti2Header, ValidationPolicy, XmlSerializable, load, parse_cifti_header};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const VERSION: &str = "0.1.0";

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_GREEN: &str = "\x1b[1;32m";
const ANSI_RED: &str = "\x1b[1;31m";
const ANSI_BLUE: &str = "\x1b[1;34m";

const AFTER_HELP: &str = "
\x1b[1;33mQUICK REFERENCE\x1b[0m (full flags are in `cifti cat --help` / `cifti validate --help`)

\x1b[1;32mUSAGE:\x1b[0m
  \x1b[96mcifti cat\x1b[0m PATH [--json]

  \x1b[96mcifti validate\x1b[0m -i, --input-path DIR
                 [--strict] [--cores N]
                 [--pattern TEXT | --pattern-exact TEXT | --regex RE]

\x1b[1;32mOPTIONS:\x1b[0m
  \x1b[96m-V\x1b[0m, \x1b[96m--verbose\x1b[0m  (repeat for more)
  \x1b[96m-h\x1b[0m, \x1b[96m--help\x1b[0m
  \x1b[96m-v\x1b[0m, \x1b[96m--version\x1b[0m

\x1b[1;32mEXAMPLES:\x1b[0m
  \x1b[96mcifti cat\x1b[0m sub-01.dscalar.nii
  \x1b[96mcifti cat\x1b[0m --json sub-01.dlabel.nii
  \x1b[96mcifti validate\x1b[0m -i derivatives/ --strict --cores 8 --pattern dtseries
";

fn cli_styles() -> Styles {
    Styles::styled().literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
}

#[derive(Parser)]
#[command(
    name = "cifti",
    version = VERSION,
    arg_required_else_help = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct Cli {
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue, global = true)]
    version: bool,

    #[arg(short = 'V', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the CIFTI-2 header of a .nii or .xml file
    Cat(CatArgs),
    /// Load every .nii under a directory and check that its header re-serializes
    Validate(ValidateArgs),
}

#[derive(Args)]
struct CatArgs {
    #[arg(value_name = "PATH")]
    file_path: PathBuf,

    /// Print the header tree as JSON instead of XML
    #[arg(long = "json", action = ArgAction::SetTrue, default_value_t = false)]
    json: bool,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("pattern_mode")
        .args(["pattern", "pattern_exact", "regex"])
        .multiple(false)
))]
struct ValidateArgs {
    #[arg(short = 'i', long = "input-path", required = true)]
    input_path: PathBuf,

    /// Also enforce index-type legality and the controlled vocabularies
    #[arg(long, default_value_t = false, action = ArgAction::SetTrue)]
    strict: bool,

    #[arg(long = "pattern")]
    pattern: Option<String>,

    #[arg(long = "pattern-exact")]
    pattern_exact: Option<String>,

    #[arg(long = "regex")]
    regex: Option<String>,

    #[arg(
        long = "cores",
        default_value_t = 1u16,
        value_parser = clap::value_parser!(u16).range(1..=1024)
    )]
    cores: u16,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Cli::command();
    cmd = cmd
        .styles(cli_styles())
        .color(ColorChoice::Auto)
        .after_help(AFTER_HELP);

    let matches = cmd.get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if cli.version {
        println!("{VERSION}");
        return Ok(());
    }

    init_logger(cli.verbose);

    match cli.cmd {
        Some(Cmd::Cat(cmd)) => cat(cmd).map_err(|e| e.into()),
        Some(Cmd::Validate(cmd)) => validate(cmd).map_err(|e| e.into()),
        None => Ok(()),
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if let Err(e) = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .try_init()
    {
        eprintln!("failed to set up logger: {e}");
    }
}

fn print_json_full<T: Serialize>(v: &T) -> Result<(), String> {
    let s = serde_json::to_string_pretty(v).map_err(|e| format!("json failed: {e}"))?;
    println!("{s}");
    Ok(())
}

fn cat(cmd: CatArgs) -> Result<(), String> {
    let cwd = std::env::current_dir().map_err(|e| format!("get current dir failed: {e}"))?;
    let file_path = resolve_user_path(&cwd, &cmd.file_path);
    let header = read_header(&file_path)?;
    if cmd.json {
        return print_json_full(&header);
    }
    let xml = header
        .to_xml_string()
        .map_err(|e| format!("to_xml failed: {e}"))?;
    println!("{xml}");
    Ok(())
}

fn read_header(file_path: &Path) -> Result<Cifti2Header, String> {
    match file_ext_lower(file_path).as_str() {
        "nii" => load(file_path)
            .map(|img| img.header)
            .map_err(|e| format!("load failed: {e}")),
        "xml" => {
            let bytes = fs::read(file_path).map_err(|e| format!("read failed: {e}"))?;
            parse_cifti_header(&bytes).map_err(|e| format!("parse failed: {e}"))
        }
        ext => Err(format!(
            "unsupported file extension: {ext:?} (expected .nii or .xml)"
        )),
    }
}

/// Loads one file and checks that its header writes out the same document twice under `policy`.
fn check_file(path: &Path, policy: ValidationPolicy) -> Result<usize, String> {
    let img = load(path).map_err(|e| format!("load failed: {e}"))?;
    let stable = img
        .header
        .rewrite_is_stable(policy)
        .map_err(|e| format!("rewrite failed: {e}"))?;
    if !stable {
        return Err("header XML changed after a write/read/write cycle".to_string());
    }
    Ok(img.header.matrix.len())
}

fn file_ext_lower(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn build_name_filter(
    pattern: Option<&str>,
    pattern_exact: Option<&str>,
    regex: Option<&str>,
) -> Result<Option<Box<dyn Fn(&str) -> bool>>, String> {
    if let Some(p) = pattern {
        let needle = p.to_lowercase();
        return Ok(Some(Box::new(move |name: &str| {
            name.to_lowercase().contains(&needle)
        })));
    }

    if let Some(p) = pattern_exact {
        let needle = p.to_string();
        return Ok(Some(Box::new(move |name: &str| name.contains(&needle))));
    }

    if let Some(r) = regex {
        let re = Regex::new(r).map_err(|e| format!("invalid regex: {e}"))?;
        return Ok(Some(Box::new(move |name: &str| re.is_match(name))));
    }

    Ok(None)
}

fn collect_files_with_exts(
    input_root: &Path,
    exts: &[&str],
    name_filter: Option<&dyn Fn(&str) -> bool>,
) -> Result<Vec<PathBuf>, String> {
    let mut out = Vec::new();
    let mut stack = vec![input_root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| format!("read dir failed: {e}"))?;
        for entry in entries {
            let entry = entry.map_err(|e| format!("read dir entry failed: {e}"))?;
            let p = entry.path();
            if p.is_dir() {
                stack.push(p);
                continue;
            }
            if !p.is_file() || !exts.iter().any(|want| file_ext_lower(&p) == *want) {
                continue;
            }
            if let Some(f) = name_filter {
                let name = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
                if !f(name) {
                    continue;
                }
            }
            out.push(p);
        }
    }

    out.sort();
    Ok(out)
}

fn validate(cmd: ValidateArgs) -> Result<(), String> {
    let cwd = std::env::current_dir().map_err(|e| format!("get current dir failed: {e}"))?;
    let input_root = resolve_user_path(&cwd, &cmd.input_path);

    let filter = build_name_filter(
        cmd.pattern.as_deref(),
        cmd.pattern_exact.as_deref(),
        cmd.regex.as_deref(),
    )?;

    let policy = if cmd.strict {
        ValidationPolicy::Strict
    } else {
        ValidationPolicy::Permissive
    };

    let pool = ThreadPoolBuilder::new()
        .num_threads(cmd.cores as usize)
        .build()
        .map_err(|e| format!("rayon thread pool init failed: {e}"))?;

    let files = collect_files_with_exts(&input_root, &["nii"], filter.as_deref())?;
    if files.is_empty() {
        return Err(format!(
            "no matching .nii files found under {}",
            input_root.display()
        ));
    }

    let t_all = Instant::now();
    let total = files.len();
    let print_lock = Arc::new(Mutex::new(()));
    let done = Arc::new(AtomicUsize::new(0));
    let ok = Arc::new(AtomicU32::new(0));
    let failed = Arc::new(AtomicU32::new(0));

    pool.install(|| {
        files.par_iter().for_each(|path| {
            let t0 = Instant::now();
            let result = check_file(path, policy);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            let name = basename(path);
            let _g = print_lock.lock().unwrap_or_else(|e| e.into_inner());
            match result {
                Ok(maps) => {
                    ok.fetch_add(1, Ordering::Relaxed);
                    println!(
                        "{ANSI_GREEN}[ok]{ANSI_RESET} [{}/{}] {}  maps={}, {:.1} ms",
                        n,
                        total,
                        name,
                        maps,
                        t0.elapsed().as_secs_f64() * 1000.0
                    );
                    let _ = stdout().flush();
                }
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    eprintln!("{ANSI_RED}[fail]{ANSI_RESET} [{}/{}] {}: {}", n, total, name, e);
                    let _ = stderr().flush();
                }
            }
        });
    });

    let secs = t_all.elapsed().as_secs();
    let failed = failed.load(Ordering::Relaxed);
    println!(
        "{ANSI_BLUE}[done]{ANSI_RESET} ok={}, failed={}, total_time={:02}:{:02}:{:02}",
        ok.load(Ordering::Relaxed),
        failed,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );

    if failed > 0 {
        return Err(format!("{failed} of {total} files failed validation"));
    }
    Ok(())
}

fn resolve_user_path(cwd: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        cwd.join(p)
    }
}

#[inline]
fn basename(p: &Path) -> std::borrow::Cow<'_, str> {
    p.file_name()
        .unwrap_or_else(|| p.as_os_str())
        .to_string_lossy()
}
