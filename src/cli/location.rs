//! `file:line[:column]` parsing for position-based commands

use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::models::lsp::Position;

/// A one-based position inside a file, as typed on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl ParsedLocation {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("Location cannot be empty");
        }

        // Peel numeric segments off the right so drive letters and colons
        // inside the path survive
        let mut numbers: Vec<&str> = Vec::with_capacity(2);
        let mut file = input;
        while numbers.len() < 2 {
            match file.rsplit_once(':') {
                Some((head, tail)) if is_number_like(tail) && !head.is_empty() => {
                    numbers.push(tail);
                    file = head;
                }
                _ => break,
            }
        }
        numbers.reverse();

        let (line, column) = match numbers.as_slice() {
            [line] => (parse_component("line", line)?, 1),
            [line, column] => (
                parse_component("line", line)?,
                parse_component("column", column)?,
            ),
            _ => bail!(
                "Invalid location format. Expected: file:line[:column]\nExample: src/index.ts:10:5"
            ),
        };

        Ok(Self {
            file: PathBuf::from(file),
            line,
            column,
        })
    }

    /// Zero-based protocol position
    pub fn position(&self) -> Position {
        Position::from_cli(self.line, self.column)
    }
}

fn is_number_like(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_component(what: &str, raw: &str) -> Result<u32> {
    if raw.starts_with('-') {
        bail!("Invalid {what} number '{raw}': negative values not allowed (1-indexed)");
    }
    let value: u32 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {what} number '{raw}': must be a positive integer"))?;
    if value == 0 {
        bail!("{what} number must be >= 1 (got 0); positions are 1-indexed");
    }
    Ok(value)
}

impl std::fmt::Display for ParsedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}
