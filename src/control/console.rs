use std::fmt::Display;
use std::io::{BufRead, Write};

use colored::Colorize;
use tracing::warn;

/// Line that stops the program when typed on the console
pub const EXIT_COMMAND: &str = "exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleOutcome {
    /// The exit command was entered
    Exit,
    /// Input ended or became unreadable before the exit command was seen
    Closed,
}

/// Prompts on `out` and consumes lines from `input` until the exit command shows up.
pub fn read_until_exit(input: impl BufRead, mut out: impl Write) -> ConsoleOutcome {
    let prompt = format!("Enter \"{EXIT_COMMAND}\" to stop the program:");
    print_line(&mut out, prompt.bold());

    for line in input.lines() {
        match line {
            Ok(line) if line.trim() == EXIT_COMMAND => return ConsoleOutcome::Exit,
            Ok(_) => {
                let hint = format!(
                    "Invalid input. Please enter \"{EXIT_COMMAND}\" to stop the program."
                );
                print_line(&mut out, hint.yellow());
            }
            Err(e) => {
                warn!("Failed to read console input: {}", e);
                return ConsoleOutcome::Closed;
            }
        }
    }

    ConsoleOutcome::Closed
}

/// A console that cannot be written to still accepts the exit command.
fn print_line(out: &mut impl Write, text: impl Display) {
    if let Err(e) = writeln!(out, "{}", text) {
        warn!("Failed to write to the console: {}", e);
    }
}
