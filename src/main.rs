use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::{prelude::*, TimeDelta};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colored::Colorize;
use prettytable::{color, format, Attr, Cell, Row, Table};

use lapse::config::{self, Config};
use lapse::counter::Counter;
use lapse::countdown::Countdown;
use lapse::greeting;
use lapse::hooks::Hook;
use lapse::stopwatch::{Lap, Stopwatch};
use lapse::store::{keys, FileStore, Store};
use lapse::ticker::Ticker;
use lapse::time::TimeDeltaExt;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Config file to use. [default: ${XDG_CONFIG_DIR}/lapse/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the greeting, stopwatch, timer, and counter at a glance
    Status,
    /// Stopwatch with lap recording
    #[command(subcommand)]
    Sw(SwCommand),
    /// Countdown timer
    #[command(subcommand)]
    Timer(TimerCommand),
    /// Tally counter
    #[command(subcommand)]
    Counter(CounterCommand),
    /// Greeting name
    #[command(subcommand)]
    Name(NameCommand),
    /// Delete all state and configuration files
    Purge,
}

#[derive(Debug, Subcommand)]
enum SwCommand {
    /// Start the stopwatch, or resume it after a pause
    Start,
    /// Pause the stopwatch, keeping the elapsed time
    Pause,
    /// Record a lap at the current elapsed time
    Lap,
    /// Stop the stopwatch and clear the elapsed time and laps
    Reset,
    /// Show the elapsed time and recorded laps
    Status,
    /// Show a live elapsed-time display until interrupted
    Watch,
}

#[derive(Debug, Subcommand)]
enum TimerCommand {
    /// Set the countdown duration without starting it
    Set {
        /// Duration, e.g. "5m", "1h30m", "90s", or "05:00"
        #[arg(value_parser = TimeDelta::from_human)]
        duration: TimeDelta,
    },
    /// Start the countdown
    Start {
        /// Duration to count down from; defaults to the configured or
        /// previously set duration
        #[arg(value_parser = TimeDelta::from_human)]
        duration: Option<TimeDelta>,
    },
    /// Pause the countdown, keeping the remaining time
    Pause,
    /// Stop the countdown and clear the remaining time
    Reset,
    /// Show the remaining time
    Status,
    /// Show a live countdown display until it expires
    Watch,
}

#[derive(Debug, Subcommand)]
enum CounterCommand {
    /// Increase the counter
    Add {
        #[arg(default_value_t = 1)]
        n: i64,
    },
    /// Decrease the counter
    Sub {
        #[arg(default_value_t = 1)]
        n: i64,
    },
    /// Set the counter back to zero
    Reset,
    /// Show the current value
    Show,
}

#[derive(Debug, Subcommand)]
enum NameCommand {
    /// Store the name used in the greeting
    Set { name: String },
    /// Forget the stored name
    Clear,
    /// Show the stored name
    Show,
}

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbosity.log_level_filter())
        .init();

    let config_path = match args.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    let config = Config::init(&config_path)?;
    let store = config.store();

    match args.command {
        Command::Status => print_overview(&config, &store),
        Command::Sw(cmd) => sw_command(cmd, &config, &store)?,
        Command::Timer(cmd) => timer_command(cmd, &config, &store)?,
        Command::Counter(cmd) => counter_command(cmd, &store),
        Command::Name(cmd) => name_command(cmd, &store)?,
        Command::Purge => purge(&store, &config_path)?,
    }

    Ok(())
}

fn print_overview(config: &Config, store: &FileStore) {
    let now = Local::now();

    println!("{}", greeting::greeting(store).yellow());
    println!();

    if greeting::is_first_run(store) {
        println!(
            "{}",
            "(use \"lapse name set <NAME>\" to personalize your greeting)".dimmed()
        );
        println!();
    }

    let sw = Stopwatch::load(store, now);
    let state = if sw.is_running() {
        "running".magenta().bold()
    } else if sw.is_idle() {
        "idle".dimmed()
    } else {
        "paused".cyan().bold()
    };
    println!(
        "Stopwatch: {} ({}, {} laps)",
        sw.elapsed(now).to_clock().cyan(),
        state,
        sw.laps().len()
    );

    let cd = Countdown::load(store, now);
    let state = if cd.is_running() {
        "running".magenta().bold()
    } else if cd.is_idle() {
        "idle".dimmed()
    } else {
        "paused".cyan().bold()
    };
    println!(
        "Timer:     {} remaining ({})",
        cd.remaining(now).to_kitchen().cyan(),
        state
    );

    println!("Counter:   {}", Counter::load(store).value().to_string().cyan());
    println!();
    println!("{}", "(use \"lapse sw start\" to start the stopwatch)".dimmed());
    println!(
        "{}",
        format!(
            "(use \"lapse timer start\" to count down {})",
            config.timer_duration.to_human()
        )
        .dimmed()
    );
}

fn sw_command(cmd: SwCommand, config: &Config, store: &FileStore) -> Result<()> {
    let now = Local::now();
    let mut sw = Stopwatch::load(store, now);

    match cmd {
        SwCommand::Start => {
            if sw.is_running() {
                println!("Stopwatch is already running");
                return Ok(());
            }

            let snap = sw.start(now);
            sw.save(store, now);

            Hook::StopwatchStart.run(&config.hooks_directory)?;

            println!("Stopwatch running from {}", snap.elapsed.to_clock().cyan());
            println!();
            println!("{}", "(use \"lapse sw watch\" for a live display)".dimmed());
        }
        SwCommand::Pause => {
            if !sw.is_running() {
                println!("Stopwatch is not running");
                return Ok(());
            }

            let snap = sw.pause(now);
            sw.save(store, now);

            Hook::StopwatchPause.run(&config.hooks_directory)?;

            println!("Stopwatch paused at {}", snap.elapsed.to_clock().cyan());
        }
        SwCommand::Lap => match sw.lap(now) {
            Some(lap) => {
                let line = format!(
                    "Lap {}  {}  (+{})",
                    lap.index,
                    lap.total.to_clock(),
                    lap.delta.to_clock()
                );
                sw.save(store, now);
                println!("{}", line);
            }
            None => println!("Stopwatch is not running"),
        },
        SwCommand::Reset => {
            sw.reset(now);
            sw.save(store, now);

            println!("Stopwatch reset");
        }
        SwCommand::Status => {
            let state = if sw.is_running() {
                "Running".magenta().bold()
            } else if sw.is_idle() {
                "Idle".dimmed()
            } else {
                "Paused".cyan().bold()
            };

            println!("Elapsed: {}", sw.elapsed(now).to_clock().cyan());
            println!("Status: {}", state);

            if !sw.laps().is_empty() {
                println!();
                print_lap_table(sw.laps());
            }
        }
        SwCommand::Watch => watch_stopwatch(&mut sw, store)?,
    }

    Ok(())
}

fn timer_command(cmd: TimerCommand, config: &Config, store: &FileStore) -> Result<()> {
    let now = Local::now();
    let mut cd = Countdown::load(store, now);

    match cmd {
        TimerCommand::Set { duration } => {
            if !cd.configure(duration) {
                println!("Duration must be positive");
                return Ok(());
            }

            cd.save(store, now);
            println!("Timer set to {}", duration.to_human().cyan());
        }
        TimerCommand::Start { duration } => {
            if cd.is_running() {
                println!("Timer is already running");
                return Ok(());
            }

            if let Some(duration) = duration {
                if !cd.configure(duration) {
                    println!("Duration must be positive");
                    return Ok(());
                }
            } else if cd.is_idle() {
                cd.configure(config.timer_duration);
            }

            let snap = cd.start(now);
            cd.save(store, now);

            Hook::TimerStart.run(&config.hooks_directory)?;

            println!("Timer running, {} remaining", snap.remaining.to_kitchen().cyan());
            println!();
            println!("{}", "(use \"lapse timer watch\" to wait for it)".dimmed());
        }
        TimerCommand::Pause => {
            if !cd.is_running() {
                println!("Timer is not running");
                return Ok(());
            }

            let snap = cd.pause(now);
            cd.save(store, now);

            println!("Timer paused, {} remaining", snap.remaining.to_kitchen().cyan());
        }
        TimerCommand::Reset => {
            cd.reset(now);
            cd.save(store, now);

            println!("Timer reset");
        }
        TimerCommand::Status => {
            let snap = cd.poll(now);

            if snap.expired {
                cd.save(store, now);
                alert_expiry(config)?;
                return Ok(());
            }

            let state = if snap.running {
                "Running".magenta().bold()
            } else if cd.is_idle() {
                "Idle".dimmed()
            } else {
                "Paused".cyan().bold()
            };

            println!("Remaining: {}", snap.remaining.to_kitchen().cyan());
            println!("Status: {}", state);
        }
        TimerCommand::Watch => watch_timer(&mut cd, config, store)?,
    }

    Ok(())
}

fn counter_command(cmd: CounterCommand, store: &FileStore) {
    let mut counter = Counter::load(store);

    let value = match cmd {
        CounterCommand::Add { n } => {
            let value = counter.add(n);
            counter.save(store);
            value
        }
        CounterCommand::Sub { n } => {
            let value = counter.sub(n);
            counter.save(store);
            value
        }
        CounterCommand::Reset => {
            let value = counter.reset();
            counter.save(store);
            value
        }
        CounterCommand::Show => counter.value(),
    };

    println!("{}", value.to_string().cyan());
}

fn name_command(cmd: NameCommand, store: &FileStore) -> Result<()> {
    match cmd {
        NameCommand::Set { name } => {
            greeting::set_name(store, &name)?;
            println!("{}", greeting::greeting(store).yellow());
        }
        NameCommand::Clear => {
            greeting::clear_name(store);
            println!("Name cleared");
        }
        NameCommand::Show => match greeting::name(store) {
            Some(name) => println!("{}", name),
            None => println!("No name stored"),
        },
    }

    Ok(())
}

fn purge(store: &FileStore, config_path: &Path) -> Result<()> {
    for key in keys::ALL {
        let path = store.path(key);

        if path.exists() {
            println!(
                "Removing state file at {}",
                path.display().to_string().cyan()
            );
            store.remove(key)?;
        }
    }

    if config_path.exists() {
        println!(
            "Removing config file at {}",
            config_path.display().to_string().cyan()
        );
        std::fs::remove_file(config_path)?;
    }

    Ok(())
}

/// Render the live stopwatch readout at ~30 Hz until interrupted,
/// persisting at most once per 500ms so a crash loses little.
fn watch_stopwatch(sw: &mut Stopwatch, store: &FileStore) -> Result<()> {
    let now = Local::now();

    if !sw.is_running() {
        println!("Stopwatch is not running");
        return Ok(());
    }

    let ticker = Ticker::new(Duration::from_millis(33));
    let mut last_saved = now;

    while ticker.wait() {
        let now = Local::now();

        print!("\r{}", sw.elapsed(now).to_clock().cyan());
        io::stdout().flush()?;

        if now - last_saved >= TimeDelta::milliseconds(500) {
            sw.save(store, now);
            last_saved = now;
        }
    }

    Ok(())
}

/// Render the live countdown readout once per second until it expires.
fn watch_timer(cd: &mut Countdown, config: &Config, store: &FileStore) -> Result<()> {
    let now = Local::now();

    if !cd.is_running() {
        println!("Timer is not running");
        return Ok(());
    }

    print!("\r{} remaining", cd.remaining(now).to_kitchen().cyan());
    io::stdout().flush()?;

    let ticker = Ticker::new(Duration::from_secs(1));
    let mut last_saved = now;

    while ticker.wait() {
        let now = Local::now();
        let snap = cd.poll(now);

        if snap.expired {
            cd.save(store, now);
            println!();
            alert_expiry(config)?;
            break;
        }

        print!("\r{} remaining", snap.remaining.to_kitchen().cyan());
        io::stdout().flush()?;

        if now - last_saved >= TimeDelta::milliseconds(500) {
            cd.save(store, now);
            last_saved = now;
        }
    }

    Ok(())
}

/// Best-effort audible alert plus the expiry hook.
fn alert_expiry(config: &Config) -> Result<()> {
    print!("\x07");
    io::stdout().flush()?;

    println!("{}", "Timer finished!".magenta().bold());

    Hook::TimerExpired.run(&config.hooks_directory)
}

fn print_lap_table(laps: &[Lap]) {
    let mut table = Table::new();

    table.set_titles(Row::new(vec![
        Cell::new("Lap").with_style(Attr::Underline(true)),
        Cell::new("Total").with_style(Attr::Underline(true)),
        Cell::new("Delta").with_style(Attr::Underline(true)),
    ]));

    // Newest lap first
    for lap in laps.iter().rev() {
        table.add_row(Row::new(vec![
            Cell::new(&lap.index.to_string()).with_style(Attr::ForegroundColor(color::BLUE)),
            Cell::new(&lap.total.to_clock())
                .style_spec("r")
                .with_style(Attr::ForegroundColor(color::CYAN)),
            Cell::new(&format!("+{}", lap.delta.to_clock())).style_spec("r"),
        ]));
    }

    table.set_format(*format::consts::FORMAT_CLEAN);
    table.printstd();
}
