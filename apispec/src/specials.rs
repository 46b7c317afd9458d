use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::Context as _;

/// parses a `<table>_special` file: one function name per line, `#` comments. names come back
/// deduplicated and sorted.
pub fn parse_specials(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// loads `<dir>/<table>_special`.
pub fn load_specials<P: AsRef<Path>>(table: &str, dir: P) -> anyhow::Result<Vec<String>> {
    let path = dir.as_ref().join(format!("{table}_special"));
    let input =
        fs::read_to_string(&path).with_context(|| format!("could not read {}", path.display()))?;
    let specials = parse_specials(&input);
    if specials.is_empty() {
        log::warn!("{} lists no functions", path.display());
    }
    Ok(specials)
}

#[test]
fn test_parse_specials() {
    const SPECIALS: &str = "
# functions that flush the pack buffer
Flush
  Finish
Flush

ChromiumParametervCR
";
    assert_eq!(
        parse_specials(SPECIALS),
        ["ChromiumParametervCR", "Finish", "Flush"]
    );
    assert!(parse_specials("").is_empty());
}

#[test]
fn test_load_specials() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("packspu_flush_special"), "Flush\nFinish\n").unwrap();
    assert_eq!(
        load_specials("packspu_flush", dir.path()).unwrap(),
        ["Finish", "Flush"]
    );
    let err = load_specials("packspu_vertex", dir.path()).unwrap_err();
    assert!(format!("{err}").contains("packspu_vertex_special"));
}
