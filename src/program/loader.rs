//! Intcode program text format.
//!
//! A program is a single stream of comma-separated signed decimal
//! integers. Whitespace around each value (including a trailing newline)
//! is ignored.

use std::path::Path;
use std::io::Write;
use thiserror::Error;

/// A loaded Intcode program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    /// Initial memory contents, starting at address 0.
    pub cells: Vec<i64>,
}

impl Program {
    /// Wrap a list of cells.
    pub fn new(cells: Vec<i64>) -> Self {
        Self { cells }
    }

    /// Parse comma-separated program text.
    pub fn parse(text: &str) -> Result<Self, ProgramError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }

        let cells = text
            .split(',')
            .enumerate()
            .map(|(i, token)| {
                let token = token.trim();
                token.parse::<i64>().map_err(|e| ProgramError::ParseError {
                    index: i + 1,
                    token: token.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { cells })
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", cell)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Program {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<i64>> for Program {
    fn from(cells: Vec<i64>) -> Self {
        Self::new(cells)
    }
}

/// Load a program file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Program, ProgramError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    Program::parse(&text)
}

/// Save a program to disk in its comma-separated form.
pub fn save_program<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), ProgramError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;

    writeln!(file, "{}", program)
        .map_err(|e| ProgramError::IoError(e.to_string()))?;

    Ok(())
}

/// Errors that can occur while loading or saving programs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error at value {index} ({token:?}): {message}")]
    ParseError { index: usize, token: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let program = Program::parse("1,9,10,3,2,3,11,0,99,30,40,50\n").unwrap();
        assert_eq!(program.len(), 12);
        assert_eq!(program.cells[0], 1);
        assert_eq!(program.cells[11], 50);
    }

    #[test]
    fn test_parse_negative_and_spaces() {
        let program = Program::parse(" 1101, 100 ,-1,4,0 ").unwrap();
        assert_eq!(program.cells, vec![1101, 100, -1, 4, 0]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(Program::parse("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_names_token() {
        let err = Program::parse("1,2,x3,99").unwrap_err();
        match err {
            ProgramError::ParseError { index, token, .. } => {
                assert_eq!(index, 3);
                assert_eq!(token, "x3");
            }
            other => panic!("unexpected error: {}", other),
        }

        // Trailing comma leaves an empty token
        assert!(Program::parse("1,2,").is_err());
    }

    #[test]
    fn test_display() {
        let program = Program::new(vec![3, 0, 4, 0, 99]);
        assert_eq!(program.to_string(), "3,0,4,0,99");
        assert_eq!(program.to_string().parse::<Program>().unwrap(), program);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("intcode-loader-{}.txt", std::process::id()));
        let program = Program::new(vec![104, -7, 99]);

        save_program(&path, &program).unwrap();
        let loaded = load_program(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, program);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_program("/nonexistent/intcode/program.txt").unwrap_err();
        assert!(matches!(err, ProgramError::IoError(_)));
    }
}
