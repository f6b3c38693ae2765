use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use thiserror::Error;

use super::Cli;

pub trait PromptValue: FromStr + Display + Copy {
    const KIND: &'static str;
}

impl PromptValue for f64 {
    const KIND: &'static str = "number";
}

impl PromptValue for u32 {
    const KIND: &'static str = "integer";
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Please enter a valid {kind}.")]
pub struct InvalidAnswer {
    pub kind: &'static str,
    pub input: String,
}

/// Blank answers take the default.
pub fn parse_answer<T: PromptValue>(answer: &str, default: T) -> Result<T, InvalidAnswer> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed.parse::<T>().map_err(|_| InvalidAnswer {
        kind: T::KIND,
        input: trimmed.to_string(),
    })
}

/// Ask until the answer parses. End of input falls back to the default.
pub fn prompt_value<T, R, W>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: T,
) -> io::Result<T>
where
    T: PromptValue,
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(output, "{label} (default {default}): ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(default);
        }

        match parse_answer(&line, default) {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(input = %err.input, "rejected answer");
                writeln!(output, "{err}")?;
            }
        }
    }
}

/// Fill the simulation flags from the terminal, using the current values as
/// defaults.
pub fn prompt_cli<R: BufRead, W: Write>(
    mut cli: Cli,
    input: &mut R,
    output: &mut W,
) -> io::Result<Cli> {
    cli.initial_investment = prompt_value(
        input,
        output,
        "Enter the initial investment amount",
        cli.initial_investment,
    )?;
    cli.years = prompt_value(input, output, "Enter number of years to simulate", cli.years)?;
    cli.mean_return = prompt_value(
        input,
        output,
        "Enter expected average annual return in percent (e.g. 7 for 7%)",
        cli.mean_return,
    )?;
    cli.volatility = prompt_value(
        input,
        output,
        "Enter annual volatility in percent (e.g. 15 for 15%)",
        cli.volatility,
    )?;
    cli.simulations = prompt_value(
        input,
        output,
        "Enter number of simulations to run",
        cli.simulations,
    )?;
    cli.plot_paths = prompt_value(
        input,
        output,
        "Enter number of paths to plot (0 for none)",
        cli.plot_paths,
    )?;
    Ok(cli)
}
