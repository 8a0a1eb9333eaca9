use std::fs;
use std::path::{Path, PathBuf};

use crate::error::KiraError;

/// Turns the positional arguments after the mode into the id list.
///
/// When the first argument names an existing file, ids are read from it one
/// per line (trimmed, blank lines dropped, order and duplicates kept) and the
/// remaining arguments are ignored. Otherwise the arguments are the ids.
pub fn resolve_ids(args: &[String]) -> Result<Vec<String>, KiraError> {
    let Some(first) = args.first() else {
        return Ok(Vec::new());
    };
    let path = Path::new(first);
    if !path.is_file() {
        return Ok(args.to_vec());
    }
    tracing::debug!(path = %path.display(), "reading ids from file");
    read_id_file(path)
}

pub fn read_id_file(path: &Path) -> Result<Vec<String>, KiraError> {
    let content =
        fs::read_to_string(path).map_err(|_| KiraError::IdFileRead(PathBuf::from(path)))?;
    Ok(parse_id_lines(&content))
}

pub fn parse_id_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_drops_blank_lines() {
        assert_eq!(parse_id_lines("A1\n\nB2\n  \nC3"), vec!["A1", "B2", "C3"]);
    }

    #[test]
    fn parse_keeps_duplicates_and_order() {
        assert_eq!(
            parse_id_lines(" B2 \r\nA1\nB2\n"),
            vec!["B2", "A1", "B2"]
        );
    }
}
