use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, Write};

/// Line-based questions on an input/output pair (stdin/stdout in the binary)
pub struct Prompter<R, W> {
  input: R,
  output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
  pub fn new(input: R, output: W) -> Self {
    Self { input, output }
  }

  /// Ask a question and return the trimmed answer
  pub fn ask(&mut self, question: &str) -> Result<String> {
    write!(self.output, "{question}: ")?;
    self.output.flush()?;

    let mut line = String::new();
    let read = self.input.read_line(&mut line).context("Failed to read input")?;
    if read == 0 {
      return Err(anyhow!("No answer given for '{}'", question));
    }
    Ok(line.trim().to_string())
  }

  /// Ask for a value that may be left blank
  pub fn ask_optional(&mut self, question: &str) -> Result<Option<String>> {
    let answer = self.ask(question)?;
    Ok((!answer.is_empty()).then_some(answer))
  }

  /// Ask for a whole number; anything else is an error
  pub fn ask_integer(&mut self, question: &str) -> Result<i64> {
    let answer = self.ask(question)?;
    parse_integer(&answer)
  }
}

pub fn parse_integer(answer: &str) -> Result<i64> {
  answer.trim().parse::<i64>().with_context(|| format!("'{}' is not a whole number", answer.trim()))
}
