//! Program loader
//!
//! Reads the text segment produced by an external compiler. The format is a
//! stream of whitespace-separated integers, conventionally one `OP L M`
//! triple per line:
//!
//! ```text
//! 7 0 10
//! 6 0 4
//! 1 0 5
//! ```
//!
//! Any token that is not an integer, and any trailing partial triple, makes
//! the whole program invalid; nothing is executed.

use crate::interpreter::isa::RawInstruction;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading a program
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read program: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid token '{token}' at line {line}: expected an integer")]
    InvalidToken { line: usize, token: String },

    #[error("Incomplete instruction: {count} trailing word(s) after the last full triple")]
    IncompleteInstruction { count: usize },

    #[error("Program of {instructions} instructions does not fit in the {capacity}-word text segment")]
    ProgramTooLarge { instructions: usize, capacity: usize },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// A loaded text segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<RawInstruction>,
}

impl Program {
    /// Parse program text
    pub fn parse(source: &str) -> Result<Self, LoadError> {
        let mut words = Vec::new();
        for (line_index, line) in source.lines().enumerate() {
            for token in line.split_whitespace() {
                let word = token.parse::<i32>().map_err(|_| LoadError::InvalidToken {
                    line: line_index + 1,
                    token: token.to_string(),
                })?;
                words.push(word);
            }
        }

        let trailing = words.len() % 3;
        if trailing != 0 {
            return Err(LoadError::IncompleteInstruction { count: trailing });
        }

        let instructions = words
            .chunks_exact(3)
            .map(|triple| RawInstruction::new(triple[0], triple[1], triple[2]))
            .collect();
        Ok(Program { instructions })
    }

    /// Read and parse a program file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source)
    }

    pub fn instructions(&self) -> &[RawInstruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Listing of the text segment as it will sit in memory
    pub fn dump(&self, code_start: usize) -> String {
        let mut out = String::from("pas[index]:\tOP\tL\tM\n");
        for (n, raw) in self.instructions.iter().enumerate() {
            let first = code_start + n * 3;
            out.push_str(&format!(
                "pas[{}-{}]:\t{}\t{}\t{}\n",
                first,
                first + 2,
                raw.op,
                raw.l,
                raw.m
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triples() {
        let program = Program::parse("7 0 10\n1 0 5\n9 0 3\n").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.instructions()[1], RawInstruction::new(1, 0, 5));
    }

    #[test]
    fn test_parse_free_form_whitespace() {
        let program = Program::parse("1 0\t5 9\n0 3").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.instructions()[1], RawInstruction::new(9, 0, 3));
    }

    #[test]
    fn test_empty_program() {
        let program = Program::parse("  \n").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn test_invalid_token() {
        let err = Program::parse("1 0 5\n9 x 3\n").unwrap_err();
        match err {
            LoadError::InvalidToken { line, token } => {
                assert_eq!(line, 2);
                assert_eq!(token, "x");
            }
            other => panic!("Expected invalid token, got {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_instruction() {
        let err = Program::parse("1 0 5\n9 0").unwrap_err();
        assert!(matches!(err, LoadError::IncompleteInstruction { count: 2 }));
    }

    #[test]
    fn test_dump() {
        let program = Program::parse("1 0 5\n9 0 3").unwrap();
        let dump = program.dump(10);
        assert!(dump.contains("pas[10-12]:\t1\t0\t5"));
        assert!(dump.contains("pas[13-15]:\t9\t0\t3"));
    }
}
