// Console decision source: blocks on a line of operator input per question.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use super::traits::DecisionSource;
use crate::output::plots;

/// Prompts on `output` and reads one line per answer from `input`.
pub struct ConsoleDecisions<R, W> {
    input: R,
    output: W,
}

impl ConsoleDecisions<StdinLock<'static>, Stdout> {
    /// Prompt on stdout, read from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleDecisions<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read operator input")?;
        if read == 0 {
            anyhow::bail!("Input closed while waiting for an answer");
        }
        Ok(line)
    }
}

impl<R: BufRead, W: Write> DecisionSource for ConsoleDecisions<R, W> {
    fn merge_answer(&mut self, source: &str, sink: &str) -> Result<String> {
        self.ask(&format!("Merge {source} to {sink}? (y/n/q): "))
    }

    fn cluster_count_answer(&mut self, inertia: &[f64]) -> Result<String> {
        writeln!(self.output, "{}", plots::render_inertia(inertia))?;
        self.ask("Select the number of clusters: ")
    }

    fn reject(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message.yellow())?;
        Ok(())
    }
}
