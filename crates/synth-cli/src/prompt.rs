//! Interactive batch selection on stdin

use std::io::{BufRead, Write};

use anyhow::{Context, bail};
use synth_agent::{BatchPlan, Profile};

/// Build a plan from command-line flags, or `None` when the user has to
/// be asked. A negative `--start` selects random mode like the prompt does.
pub fn plan_from_args(
    start: Option<i64>,
    end: Option<u32>,
    count: Option<u32>,
) -> anyhow::Result<Option<BatchPlan>> {
    match (start, count) {
        (None, None) => Ok(None),
        (None, Some(count)) => Ok(Some(BatchPlan::Random { count })),
        (Some(start), _) if start < 0 => match count.or(end) {
            Some(count) => Ok(Some(BatchPlan::Random { count })),
            None => bail!("random mode needs --count"),
        },
        (Some(start), _) => {
            let start = u32::try_from(start).context("--start is out of range")?;
            let end = end.unwrap_or(start);
            if end < start {
                bail!("--end ({}) is before --start ({})", end, start);
            }
            Ok(Some(BatchPlan::Numbered { start, end }))
        }
    }
}

/// Ask for the batch plan
pub fn ask_plan<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> anyhow::Result<BatchPlan> {
    let start: i64 = ask_parsed(
        input,
        out,
        "Enter the starting order number (or -1 for random generation): ",
    )?;

    if start < 0 {
        let count = ask_parsed(input, out, "Enter the number of dialogs to generate: ")?;
        return Ok(BatchPlan::Random { count });
    }

    let start = u32::try_from(start).context("order number is out of range")?;
    loop {
        let end: u32 = ask_parsed(input, out, "Enter the ending order number: ")?;
        if end >= start {
            return Ok(BatchPlan::Numbered { start, end });
        }
        writeln!(out, "The ending number must not be less than {}.", start)?;
    }
}

/// Ask for a customer profile; a blank answer means random per dialog
pub fn ask_profile<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<Option<Profile>> {
    let names = Profile::ALL.map(|p| p.name()).join(", ");
    loop {
        let answer = ask_line(
            input,
            out,
            &format!("Enter the client type ({}, or leave blank for random): ", names),
        )?;
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<Profile>() {
            Ok(profile) => return Ok(Some(profile)),
            Err(e) => writeln!(out, "{}", e)?,
        }
    }
}

fn ask_parsed<T, R, W>(input: &mut R, out: &mut W, question: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    R: BufRead,
    W: Write,
{
    loop {
        let answer = ask_line(input, out, question)?;
        match answer.parse() {
            Ok(value) => return Ok(value),
            Err(_) => writeln!(out, "'{}' is not a valid number.", answer)?,
        }
    }
}

fn ask_line<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> anyhow::Result<String> {
    write!(out, "{}", question)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed before an answer was given");
    }
    Ok(line.trim().to_string())
}
