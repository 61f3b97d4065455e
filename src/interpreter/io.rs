//! Input collaborators for `SYS 0 2`
//!
//! The engine never touches stdin directly; it asks an [`InputSource`] for
//! one reply and parses it as an integer itself.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Prompt shown before an interactive read
pub const INPUT_PROMPT: &str = "Please enter an integer: ";

/// Supplies replies to the read system call
pub trait InputSource {
    /// Return the text of the next reply, or `None` at end of input
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Whether the source already showed its own prompt to the user
    fn is_interactive(&self) -> bool {
        false
    }
}

/// Reads replies from a buffered reader, prompting on a writer first
pub struct StdinInput<R, W> {
    reader: R,
    prompt: W,
}

impl StdinInput<io::StdinLock<'static>, io::Stdout> {
    pub fn stdin() -> Self {
        StdinInput {
            reader: io::stdin().lock(),
            prompt: io::stdout(),
        }
    }
}

impl<R: BufRead, W: Write> StdinInput<R, W> {
    pub fn new(reader: R, prompt: W) -> Self {
        StdinInput { reader, prompt }
    }
}

impl<R: BufRead, W: Write> InputSource for StdinInput<R, W> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        write!(self.prompt, "{}", INPUT_PROMPT)?;
        self.prompt.flush()?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            // skip blank lines like scanf skips whitespace
            if !line.trim().is_empty() {
                return Ok(Some(line.trim().to_string()));
            }
        }
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

/// A fixed queue of replies
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    replies: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedInput {
            replies: replies.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_values(values: &[i32]) -> Self {
        Self::new(values.iter().map(|v| v.to_string()))
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.replies.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input() {
        let mut input = ScriptedInput::from_values(&[4, -2]);
        assert_eq!(input.read_line().unwrap().as_deref(), Some("4"));
        assert_eq!(input.read_line().unwrap().as_deref(), Some("-2"));
        assert_eq!(input.read_line().unwrap(), None);
    }

    #[test]
    fn test_stdin_input_prompts_and_skips_blank_lines() {
        let reader = io::Cursor::new("\n  17 \n");
        let mut prompt = Vec::new();
        let mut input = StdinInput::new(reader, &mut prompt);
        assert_eq!(input.read_line().unwrap().as_deref(), Some("17"));
        assert_eq!(input.read_line().unwrap(), None);
        drop(input);
        assert_eq!(
            String::from_utf8(prompt).unwrap(),
            format!("{}{}", INPUT_PROMPT, INPUT_PROMPT)
        );
    }
}
