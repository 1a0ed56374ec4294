use anyhow::{bail, Context, Result};
use clap::ValueEnum;

/// How the application consumes the scanner's output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Report keycodes.
    Report,
    /// Capture a numeric passcode, then report.
    Passcode,
    /// Buffer transitions without reporting them.
    Pause,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Press { row: usize, col: usize },
    Release { row: usize, col: usize },
    Mode(Mode),
}

/// A scripted action at a point in simulated time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub at_ms: u32,
    pub action: Action,
}

/// Parse a key script into time-ordered steps.
///
/// One step per line, `#` starts a comment:
/// - `<ms> press <row> <col>`
/// - `<ms> release <row> <col>`
/// - `<ms> tap <row> <col> [<hold ms>]` (press, then release after the hold, 50 ms by default)
/// - `<ms> mode report|passcode|pause`
pub fn parse_script(input: &str, rows: usize, cols: usize) -> Result<Vec<Step>> {
    let mut steps: Vec<Step> = Vec::new();
    let mut last_ms = 0u32;

    for (line_num, line) in input.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            bail!("line {}: expected '<ms> <command> ...'", line_num + 1);
        }

        let at_ms: u32 = fields[0]
            .parse()
            .with_context(|| format!("line {}: invalid time '{}'", line_num + 1, fields[0]))?;
        if at_ms < last_ms {
            bail!(
                "line {}: time {} ms is before the previous step at {} ms",
                line_num + 1,
                at_ms,
                last_ms
            );
        }
        last_ms = at_ms;

        let args = &fields[2..];
        match fields[1] {
            "press" => {
                let (row, col) = parse_position(args, rows, cols)
                    .with_context(|| format!("line {}: bad key position", line_num + 1))?;
                steps.push(Step { at_ms, action: Action::Press { row, col } });
            }
            "release" => {
                let (row, col) = parse_position(args, rows, cols)
                    .with_context(|| format!("line {}: bad key position", line_num + 1))?;
                steps.push(Step { at_ms, action: Action::Release { row, col } });
            }
            "tap" => {
                let (row, col) = parse_position(&args[..args.len().min(2)], rows, cols)
                    .with_context(|| format!("line {}: bad key position", line_num + 1))?;
                let hold_ms: u32 = match args.get(2) {
                    Some(hold) => hold
                        .parse()
                        .with_context(|| format!("line {}: invalid hold time '{}'", line_num + 1, hold))?,
                    None => 50,
                };
                if args.len() > 3 {
                    bail!("line {}: trailing arguments after tap", line_num + 1);
                }
                let Some(release_ms) = at_ms.checked_add(hold_ms) else {
                    bail!("line {}: release time overflows", line_num + 1);
                };
                steps.push(Step { at_ms, action: Action::Press { row, col } });
                steps.push(Step { at_ms: release_ms, action: Action::Release { row, col } });
            }
            "mode" => {
                let [name] = args else {
                    bail!("line {}: expected 'mode report|passcode|pause'", line_num + 1);
                };
                let mode = Mode::from_str(name, true)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("line {}: unknown mode '{}'", line_num + 1, name))?;
                steps.push(Step { at_ms, action: Action::Mode(mode) });
            }
            other => bail!("line {}: unknown command '{}'", line_num + 1, other),
        }
    }

    // Taps may release after a later step starts.
    steps.sort_by_key(|step| step.at_ms);
    Ok(steps)
}

fn parse_position(args: &[&str], rows: usize, cols: usize) -> Result<(usize, usize)> {
    let [row, col] = args else {
        bail!("expected '<row> <col>'");
    };
    let row: usize = row.parse().with_context(|| format!("invalid row '{}'", row))?;
    let col: usize = col.parse().with_context(|| format!("invalid column '{}'", col))?;
    if row >= rows || col >= cols {
        bail!("key ({}, {}) outside a {}x{} matrix", row, col, rows, cols);
    }
    Ok((row, col))
}
