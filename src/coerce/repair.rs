//! Repair policies for cells that fail their declared type

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::error::PipelineError;

/// Two-way channel to a human operator
pub trait OperatorChannel {
    /// Show a message and wait for one line of input
    fn prompt(&mut self, message: &str) -> io::Result<String>;

    /// Tell the operator something; `to_console` asks for it to be shown, not just logged
    fn notify(&mut self, message: &str, to_console: bool);
}

/// Operator channel on stdin/stdout
pub struct ConsoleChannel {
    color_choice: ColorChoice,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self {
            color_choice: ColorChoice::Auto,
        }
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorChannel for ConsoleChannel {
    fn prompt(&mut self, message: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", message)?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for input",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn notify(&mut self, message: &str, to_console: bool) {
        tracing::info!("{}", message);
        if !to_console {
            return;
        }
        let mut stdout = StandardStream::stdout(self.color_choice);
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(stdout, "{}", message);
        let _ = stdout.reset();
    }
}

/// Operator channel replaying pre-recorded answers
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    answers: VecDeque<String>,
    /// Every prompt shown, in order
    pub prompts: Vec<String>,
    /// Every notice sent, in order
    pub notices: Vec<String>,
}

impl ScriptedChannel {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl OperatorChannel for ScriptedChannel {
    fn prompt(&mut self, message: &str) -> io::Result<String> {
        self.prompts.push(message.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left")
        })
    }

    fn notify(&mut self, message: &str, _to_console: bool) {
        self.notices.push(message.to_string());
    }
}

/// Where and why a cell failed
#[derive(Debug, Clone)]
pub struct RepairContext<'a> {
    pub file: &'a str,
    pub column: &'a str,
    pub row: usize,
    pub value: &'a str,
    pub expected: &'a str,
}

impl RepairContext<'_> {
    fn mismatch(&self) -> PipelineError {
        PipelineError::CellTypeMismatch {
            file: self.file.to_string(),
            column: self.column.to_string(),
            row: self.row,
            value: self.value.to_string(),
            expected: self.expected.to_string(),
        }
    }
}

/// Resolution of one mismatched cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairDecision {
    /// Delete the row from the table
    RemoveRow,
    /// Retry conversion with a new raw value
    Replace(String),
    /// Keep the row, empty the cell
    SetNull,
}

/// Decides how a mismatched cell is resolved
pub trait RepairPolicy {
    fn decide(&mut self, ctx: &RepairContext<'_>) -> Result<RepairDecision, PipelineError>;
}

/// Asks an operator: remove the row or enter a new value
pub struct InteractiveRepair<C: OperatorChannel> {
    channel: C,
}

impl<C: OperatorChannel> InteractiveRepair<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn into_channel(self) -> C {
        self.channel
    }
}

impl<C: OperatorChannel> RepairPolicy for InteractiveRepair<C> {
    fn decide(&mut self, ctx: &RepairContext<'_>) -> Result<RepairDecision, PipelineError> {
        let question = format!(
            "Error in file '{}', column '{}', row {} with value '{}'.\n\
             Data type: {}\n\
             Would you like to [r]emove the row or [e]nter a new value?: ",
            ctx.file, ctx.column, ctx.row, ctx.value, ctx.expected
        );

        loop {
            let answer = self.channel.prompt(&question)?;
            match answer.trim().to_lowercase().as_str() {
                "r" => return Ok(RepairDecision::RemoveRow),
                "e" => {
                    let value = self
                        .channel
                        .prompt(&format!("Enter new value for column '{}': ", ctx.column))?;
                    return Ok(RepairDecision::Replace(value));
                }
                _ => self.channel.notify(
                    "Invalid choice. Please enter 'r' to remove the row or 'e' to enter a new value.",
                    true,
                ),
            }
        }
    }
}

/// Drops every row with a bad cell
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoSkip;

impl RepairPolicy for AutoSkip {
    fn decide(&mut self, _ctx: &RepairContext<'_>) -> Result<RepairDecision, PipelineError> {
        Ok(RepairDecision::RemoveRow)
    }
}

/// Empties every bad cell, keeping the row
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoNull;

impl RepairPolicy for AutoNull {
    fn decide(&mut self, _ctx: &RepairContext<'_>) -> Result<RepairDecision, PipelineError> {
        Ok(RepairDecision::SetNull)
    }
}

/// Aborts the run on the first bad cell
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

impl RepairPolicy for FailFast {
    fn decide(&mut self, ctx: &RepairContext<'_>) -> Result<RepairDecision, PipelineError> {
        Err(ctx.mismatch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RepairContext<'static> {
        RepairContext {
            file: "a.csv",
            column: "age",
            row: 3,
            value: "abc",
            expected: "int",
        }
    }

    #[test]
    fn test_interactive_rejects_invalid_choice() {
        let mut policy = InteractiveRepair::new(ScriptedChannel::new(["x", "", "E", "42"]));
        let decision = policy.decide(&ctx()).unwrap();

        assert_eq!(decision, RepairDecision::Replace("42".into()));
        let channel = policy.into_channel();
        assert_eq!(channel.notices.len(), 2);
        assert_eq!(channel.prompts.len(), 4);
        assert!(channel.prompts[0].contains("row 3"));
    }

    #[test]
    fn test_interactive_remove() {
        let mut policy = InteractiveRepair::new(ScriptedChannel::new(["r"]));
        assert_eq!(policy.decide(&ctx()).unwrap(), RepairDecision::RemoveRow);
    }

    #[test]
    fn test_closed_channel_is_an_error() {
        let mut policy = InteractiveRepair::new(ScriptedChannel::new(Vec::<String>::new()));
        assert!(matches!(
            policy.decide(&ctx()),
            Err(PipelineError::Operator(_))
        ));
    }

    #[test]
    fn test_fail_fast() {
        let err = FailFast.decide(&ctx()).unwrap_err();
        assert!(matches!(err, PipelineError::CellTypeMismatch { row: 3, .. }));
    }
}
