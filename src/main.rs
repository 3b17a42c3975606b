use std::path::PathBuf;

use clap::Parser;

use octet::emulator::{DEFAULT_FRAME_RATE, DEFAULT_INSTRUCTIONS_PER_SECOND, Emulator, Settings};

/// Run a CHIP-8 program in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the ROM image
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(
        long,
        default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND,
        value_parser = clap::value_parser!(u64).range(1..=100_000)
    )]
    ips: u64,

    /// Screen refreshes and timer ticks per second
    #[arg(
        long,
        default_value_t = DEFAULT_FRAME_RATE,
        value_parser = clap::value_parser!(u64).range(1..=1_000)
    )]
    frame_rate: u64,

    /// Seed for the random number instruction, for repeatable runs
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Settings {
            frame_rate: args.frame_rate,
            ips: args.ips,
            rom: args.rom,
            seed: args.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = Settings::from(Args::parse());
    let mut emulator = Emulator::new(settings)?;
    emulator.run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_rates_and_seed() {
        let args =
            Args::try_parse_from(["octet", "pong.ch8", "--ips", "700", "--seed", "42"]).unwrap();
        let settings = Settings::from(args);
        assert_eq!(settings.ips, 700);
        assert_eq!(settings.frame_rate, DEFAULT_FRAME_RATE);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.rom, PathBuf::from("pong.ch8"));
    }

    #[test]
    fn rejects_a_zero_rate() {
        assert!(Args::try_parse_from(["octet", "pong.ch8", "--frame-rate", "0"]).is_err());
    }
}
