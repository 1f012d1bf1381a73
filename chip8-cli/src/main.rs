//! Entrypoint for CLI
mod error;
mod inputmap;
mod terminal;

use std::{env, error::Error, path::PathBuf, time::Instant};

use chip8::{prelude::*, IMPL_VERSION};
use log::{error, info, LevelFilter};

use self::{error::AppError, inputmap::InputMap, terminal::Terminal};

static USAGE: &str = r#"
usage: chip8 run FILE [OPTIONS]

commands:
    run     Run the target ROM file

options:
    --hz N          Instructions per second, 0 runs unthrottled (default 500)
    --keymap FILE   YAML keymap, the conventional layout is used when omitted
    --seed N        Seed for the random number generator

keys:
    Esc, Ctrl+C or p stops the program

examples:
    chip8 run breakout.rom
    chip8 run breakout.rom --hz 700 --keymap keymap.yaml
"#;

const DEFAULT_CLOCK: Hz = Hz(500);

fn run_rom(opts: RunOpts) -> Result<(), AppError> {
    let inputmap = match &opts.keymap {
        Some(path) => InputMap::from_file(path)?,
        None => InputMap::conventional(),
    };

    let keypad = Keypad::new();
    let (sender, frames) = FrameSender::channel();

    let mut vm = Chip8Vm::new(Chip8Conf {
        clock_frequency: Some(opts.clock),
        rng_seed: opts.seed,
    })
    .with_keyboard(keypad.clone())
    .with_screen(sender);

    vm.load_rom(&opts.filepath)?;
    info!("running at {} Hz", opts.clock.0);

    let start = Instant::now();
    let result = {
        // Terminal is restored before anything is reported.
        let _terminal = Terminal::start(keypad, inputmap, vm.interrupt_handle(), frames)?;
        vm.execute()
    };

    info!(
        "time taken: {}ms",
        start.elapsed().as_nanos() as f64 / 1000000.0
    ); // to millis

    result?;

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()?;

    match parse_args(env::args().skip(1)) {
        Ok(Cmd::Run(opts)) => {
            if let Err(err) = run_rom(opts) {
                error!("{err}");
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cmd, AppError> {
    match args.next().as_deref() {
        Some("run") => {
            let mut filepath = None;
            let mut opts = RunOpts {
                filepath: PathBuf::new(),
                clock: DEFAULT_CLOCK,
                keymap: None,
                seed: None,
            };

            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--hz" => opts.clock = Hz(consume_number(&mut args, "--hz")?),
                    "--seed" => opts.seed = Some(consume_number(&mut args, "--seed")?),
                    "--keymap" => opts.keymap = Some(consume_arg(&mut args, "--keymap")?.into()),
                    _ if arg.starts_with("--") => {
                        return Err(AppError::config(format!("unknown option {arg}")))
                    }
                    _ if filepath.is_none() => filepath = Some(PathBuf::from(arg)),
                    _ => return Err(AppError::config(format!("unexpected argument {arg}"))),
                }
            }

            opts.filepath = filepath.ok_or_else(|| AppError::config("missing ROM file"))?;
            Ok(Cmd::Run(opts))
        }
        Some(cmd) => Err(AppError::config(format!("unknown command {cmd}"))),
        None => Err(AppError::config("missing command")),
    }
}

/// Consumes the value following an option.
fn consume_arg(mut args: impl Iterator<Item = String>, option: &str) -> Result<String, AppError> {
    args.next()
        .ok_or_else(|| AppError::config(format!("option {option} expects a value")))
}

fn consume_number(args: impl Iterator<Item = String>, option: &str) -> Result<u64, AppError> {
    let value = consume_arg(args, option)?;
    value
        .parse()
        .map_err(|_| AppError::config(format!("option {option} expects a number, got {value}")))
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

#[derive(Debug)]
enum Cmd {
    /// Run file
    Run(RunOpts),
}

#[derive(Debug)]
struct RunOpts {
    filepath: PathBuf,
    clock: Hz,
    keymap: Option<PathBuf>,
    seed: Option<u64>,
}
