use std::env;
use std::io::{self, BufWriter, Write as _};
use std::path::PathBuf;

use anyhow::{anyhow, bail};
use packspu_generator::{ApiUtil, Config, SwapMode, generate_flush};

#[cfg(all(feature = "swap-always", feature = "swap-never"))]
compile_error!("features `swap-always` and `swap-never` are mutually exclusive");

const SWAP_MODE: SwapMode = swap_mode(
    cfg!(feature = "swap-always"),
    cfg!(feature = "swap-never"),
);

const fn swap_mode(swap_always: bool, swap_never: bool) -> SwapMode {
    match (swap_always, swap_never) {
        (true, false) => SwapMode::Always,
        (false, true) => SwapMode::Never,
        _ => SwapMode::Runtime,
    }
}

const USAGE: &str = "usage: packspu-flush <dir containing APIspec.txt>";

/// the one positional argument: the directory that holds `APIspec.txt`.
fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<PathBuf> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(spec_dir), None) => Ok(PathBuf::from(spec_dir)),
        (None, _) => bail!("missing spec dir\n{USAGE}"),
        (Some(_), Some(extra)) => bail!("unexpected argument {extra:?}\n{USAGE}"),
    }
}

// stdout carries the generated source, logs go to stderr.
struct Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        eprintln!(
            "{level:<5} {file}:{line} > {text}",
            level = record.level(),
            file = record.file().unwrap_or_else(|| record.target()),
            line = record
                .line()
                .map_or_else(|| "??".to_string(), |line| line.to_string()),
            text = record.args(),
        );
    }

    fn flush(&self) {}
}

impl Logger {
    fn init() -> anyhow::Result<()> {
        log::set_logger(&Logger).map_err(|err| anyhow!("could not set logger: {err}"))?;
        log::set_max_level(if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        });
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    Logger::init()?;

    let spec_dir = parse_args(env::args().skip(1))?;

    let config = Config {
        swap: SWAP_MODE,
        ..Config::default()
    };
    let mut api_util = ApiUtil::new(env::current_dir()?);

    let mut w = BufWriter::new(io::stdout().lock());
    generate_flush(&mut w, &mut api_util, &spec_dir, &config)?;
    w.flush()?;

    Ok(())
}

#[test]
fn test_parse_args() {
    let args = |args: &[&str]| parse_args(args.iter().map(|arg| arg.to_string()));

    assert_eq!(
        args(&["src/VBox/GuestHost/OpenGL/glapi_parser"]).unwrap(),
        PathBuf::from("src/VBox/GuestHost/OpenGL/glapi_parser")
    );

    let err = args(&[]).unwrap_err();
    assert!(format!("{err}").contains("usage: packspu-flush"));

    let err = args(&["glapi_parser", "extra"]).unwrap_err();
    assert!(format!("{err}").contains("\"extra\""));
}

#[test]
fn test_swap_mode() {
    assert_eq!(swap_mode(false, false), SwapMode::Runtime);
    assert_eq!(swap_mode(true, false), SwapMode::Always);
    assert_eq!(swap_mode(false, true), SwapMode::Never);
    #[cfg(not(any(feature = "swap-always", feature = "swap-never")))]
    assert_eq!(SWAP_MODE, SwapMode::Runtime);
}
