use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::debug;

use crate::utils;

/// Line-oriented prompts that re-ask until the answer is valid
pub struct Prompter<R, W> {
  reader: R,
  writer: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
  pub fn new(reader: R, writer: W) -> Self {
    Self { reader, writer }
  }

  pub fn into_writer(self) -> W {
    self.writer
  }

  fn read_answer(&mut self, label: &str) -> Result<String> {
    write!(self.writer, "{} {}: ", "?".green().bold(), label.bold())?;
    self.writer.flush()?;

    let mut line = String::new();
    let read = self
      .reader
      .read_line(&mut line)
      .with_context(|| format!("Failed to read answer for {label:?}"))?;
    if read == 0 {
      bail!("Input closed before answering {label:?}");
    }

    Ok(line.trim().to_owned())
  }

  fn reject(&mut self, message: &str) -> Result<()> {
    writeln!(self.writer, "{} {message}", "✗".red().bold())?;
    Ok(())
  }

  /// Ask for a number
  pub fn number(&mut self, label: &str) -> Result<f64> {
    loop {
      let answer = self.read_answer(label)?;
      match utils::parse_number(&answer) {
        Ok(value) => {
          debug!("{label}: {value}");
          return Ok(value);
        }
        Err(_) => self.reject("Invalid number")?,
      }
    }
  }

  /// Ask to pick one of `items` by position (1-based) or by name; returns the index
  pub fn select(&mut self, label: &str, items: &[&str]) -> Result<usize> {
    writeln!(self.writer, "{} {}", "?".green().bold(), label.bold())?;
    for (i, item) in items.iter().enumerate() {
      writeln!(self.writer, "  {}) {item}", i + 1)?;
    }

    loop {
      let answer = self.read_answer("Choice")?;
      let position = answer
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=items.len()).contains(n))
        .map(|n| n - 1);
      let selected = position.or_else(|| items.iter().position(|item| item.eq_ignore_ascii_case(&answer)));

      match selected {
        Some(index) => {
          debug!("{label}: {}", items[index]);
          return Ok(index);
        }
        None => self.reject(&format!("Choose 1-{} or one of {}", items.len(), items.join(", ")))?,
      }
    }
  }

  /// Print a hint line ahead of a prompt
  pub fn hint(&mut self, line: &str) -> Result<()> {
    writeln!(self.writer, "{}", line.green().italic())?;
    Ok(())
  }
}
