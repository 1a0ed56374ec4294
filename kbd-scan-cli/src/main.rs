mod keymap;
mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use kbd_scan::sim::SimMatrix;
use kbd_scan::{
    KeyOutput, KeyPos, KeyboardConfig, Notification, Notifier, ReportMode, ScanSignals,
    ScanTimingBudget, Scanner,
};
use std::fs;

use keymap::{COLS, ROWS};
use script::{Action, Mode};

/// Tracked debounce slots in the simulated keyboard.
const SLOTS: usize = 5;
/// Buffered transitions in the simulated keyboard.
const BUFFER: usize = 32;
/// Simulated time after the last step, enough for every key to settle.
const SETTLE_MS: u32 = 200;

type SimScanner<'a> = Scanner<'a, SimMatrix<'a, ROWS, COLS>, Log, ROWS, COLS, SLOTS, BUFFER>;

#[derive(Parser)]
#[command(name = "kbd-scan")]
#[command(about = "Keyboard matrix scanner, driven against a simulated ErgoDox matrix")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a key script and print what the scanner reports
    Simulate {
        /// Path to the key script
        script: String,
        /// How the output is consumed at start
        #[arg(long, value_enum, default_value_t = Mode::Report)]
        mode: Mode,
        /// Make Fn sticky when tapped alone
        #[arg(long)]
        fn_lock: bool,
        /// Print raw key detections as well
        #[arg(long)]
        raw: bool,
        /// Show a progress bar over the script steps
        #[arg(long)]
        progress: bool,
    },
    /// Print a modifier set of the demo keymap
    Keymap {
        /// Modifier set to print
        #[arg(long, default_value_t = 0)]
        set: usize,
    },
    /// Convert a scan timing budget to debounce cycle counts
    Timing {
        /// Matrix rows
        #[arg(long, default_value_t = ROWS)]
        rows: usize,
        #[arg(long, default_value_t = ScanTimingBudget::default().row_settle_us)]
        row_settle_us: u32,
        #[arg(long, default_value_t = ScanTimingBudget::default().full_scan_cycle_us)]
        full_scan_us: u32,
        #[arg(long, default_value_t = ScanTimingBudget::default().partial_scan_cycle_us)]
        partial_scan_us: u32,
        #[arg(long, default_value_t = ScanTimingBudget::default().press_debounce_us)]
        press_us: u32,
        #[arg(long, default_value_t = ScanTimingBudget::default().release_debounce_us)]
        release_us: u32,
    },
}

/// Collects notifications until the next print.
#[derive(Default)]
struct Log {
    raw: bool,
    lines: Vec<String>,
}

impl Notifier for Log {
    fn notify(&mut self, notification: Notification) {
        match notification {
            Notification::KeyAction => {}
            Notification::PasscodeEntered => self.lines.push("passcode entered".into()),
            Notification::FnLockPressed => self.lines.push("fn lock on".into()),
            Notification::FnLockReleased => self.lines.push("fn lock off".into()),
            Notification::Custom { action, pressed } => self.lines.push(format!(
                "custom {} {}",
                action,
                if pressed { "down" } else { "up" }
            )),
        }
    }

    fn key_detected(&mut self, pos: KeyPos, pressed: bool) {
        if self.raw {
            self.lines.push(format!(
                "key ({}, {}) {}",
                pos.row,
                pos.col,
                if pressed { "down" } else { "up" }
            ));
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Simulate { script, mode, fn_lock, raw, progress } => {
            let contents =
                fs::read_to_string(&script).with_context(|| format!("reading {}", script))?;
            let steps = script::parse_script(&contents, ROWS, COLS).context("parsing key script")?;
            simulate(&steps, mode, fn_lock, raw, progress)?;
        }
        Command::Keymap { set } => {
            if set >= keymap::NUM_SETS {
                eprintln!("Modifier set {} does not exist.", set);
                eprintln!("The demo keymap has sets 0-{}.", keymap::NUM_SETS - 1);
                std::process::exit(1);
            }
            print!("{}", keymap::render(set));
        }
        Command::Timing { rows, row_settle_us, full_scan_us, partial_scan_us, press_us, release_us } => {
            let budget = ScanTimingBudget {
                row_settle_us,
                full_scan_cycle_us: full_scan_us,
                partial_scan_cycle_us: partial_scan_us,
                press_debounce_us: press_us,
                release_debounce_us: release_us,
            };
            let ticks = budget.ticks(rows).context("invalid timing budget")?;
            println!("Press debounce:   {} cycles", ticks.press);
            println!("Release debounce: {} cycles", ticks.release);
            println!("Global settle:    {} full scans", ticks.global_settle);
        }
    }

    Ok(())
}

fn simulate(steps: &[script::Step], mode: Mode, fn_lock: bool, raw: bool, progress: bool) -> Result<()> {
    let signals = ScanSignals::new();
    let mut config = KeyboardConfig::new(
        SimMatrix::<ROWS, COLS>::row_pins(),
        SimMatrix::<ROWS, COLS>::column_pins(),
        keymap::keymap(),
    );
    config.has_fn_lock = fn_lock;

    let log = Log { raw, lines: Vec::new() };
    let mut scanner: SimScanner<'_> = Scanner::new(SimMatrix::new(&signals), log, &signals, config)
        .context("configuring the scanner")?;
    scanner.start();
    set_mode(&mut scanner, mode);

    let pb = if progress {
        let pb = ProgressBar::new(steps.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} steps")
                .context("progress bar template")?
                .progress_chars("=> "),
        );
        pb.set_message("Simulating");
        pb
    } else {
        ProgressBar::hidden()
    };

    for step in steps {
        scanner.run_until(u64::from(step.at_ms) * 1000);
        report(&mut scanner, &pb);
        match step.action {
            Action::Press { row, col } => scanner.platform_mut().press(row, col),
            Action::Release { row, col } => scanner.platform_mut().release(row, col),
            Action::Mode(mode) => set_mode(&mut scanner, mode),
        }
        pb.inc(1);
    }

    let end_ms = steps.last().map_or(0, |step| step.at_ms).saturating_add(SETTLE_MS);
    scanner.run_until(u64::from(end_ms) * 1000);
    report(&mut scanner, &pb);
    pb.finish_with_message("Done");

    if !scanner.is_idle() {
        eprintln!("Scanner still active {} ms after the last step.", SETTLE_MS);
    }
    if scanner.report_mode() == ReportMode::Disabled {
        println!("Passcode incomplete: {}", scanner.current_passcode());
    }
    Ok(())
}

fn set_mode(scanner: &mut SimScanner<'_>, mode: Mode) {
    match mode {
        Mode::Report => scanner.start_reporting(),
        Mode::Passcode => scanner.start_passcode(),
        Mode::Pause => scanner.stop_reporting(),
    }
}

/// Print notifications and drain the keycodes reported so far.
fn report(scanner: &mut SimScanner<'_>, pb: &ProgressBar) {
    let at_ms = scanner.platform().now_us() as f64 / 1000.0;
    let mut lines = std::mem::take(&mut scanner.notifier_mut().lines);
    loop {
        match scanner.next_keycode() {
            KeyOutput::Empty => break,
            KeyOutput::FullRelease => lines.push("release all".into()),
            KeyOutput::Keycode { code, pressed } => lines.push(format!(
                "{} {}",
                if pressed { "press  " } else { "release" },
                keymap::label(code)
            )),
        }
    }
    pb.suspend(|| {
        for line in &lines {
            println!("{:>9.1} ms  {}", at_ms, line);
        }
    });
}
