use anyhow::{Context, Result};
use clap::Parser;
use emu_core::apu::TimingMode;
use emu_core::logging::{LogCategory, LogConfig, LogLevel};
use emu_core::System;
use emu_sms::SmsSystem;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Headless Sega Master System runner
#[derive(Parser)]
struct Args {
    /// Cartridge ROM (.sms); a sibling .sav file is loaded and written back
    rom: Option<PathBuf>,

    /// BIOS image to boot through
    #[arg(long)]
    bios: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, default_value_t = 5)]
    frames: u32,

    /// Dump save-state to this file as JSON
    #[arg(long, default_value = "state.json")]
    save: PathBuf,

    /// PAL timing (313 lines, 50 Hz) instead of NTSC
    #[arg(long, default_value_t = false)]
    pal: bool,

    /// Core log level for every category: off, error, warn, info, debug, trace
    #[arg(long, default_value = "off")]
    log_level: String,

    /// Per-category override such as `cpu=trace` or `vdp=debug` (repeatable)
    #[arg(long = "log", value_name = "CATEGORY=LEVEL")]
    log_overrides: Vec<String>,

    /// Send core logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Suppress all per-frame output (still writes --save)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn parse_level(name: &str) -> Result<LogLevel> {
    LogLevel::from_str(name).with_context(|| format!("unknown log level '{}'", name))
}

fn parse_override(arg: &str) -> Result<(LogCategory, LogLevel)> {
    let (category, level) = arg
        .split_once('=')
        .with_context(|| format!("expected CATEGORY=LEVEL, got '{}'", arg))?;
    let category = LogCategory::from_name(category)
        .with_context(|| format!("unknown log category '{}'", category))?;
    Ok((category, parse_level(level)?))
}

fn configure_logging(args: &Args) -> Result<()> {
    let config = LogConfig::global();
    config.set_global_level(parse_level(&args.log_level)?);
    for arg in &args.log_overrides {
        let (category, level) = parse_override(arg)?;
        config.set_level(category, level);
    }
    if let Some(path) = &args.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    Ok(())
}

/// Load a ROM into the console. Any failure leaves the slot empty and the
/// console runs without a cartridge.
fn insert_cartridge(sys: &mut SmsSystem, rom: &Path) -> bool {
    match sys.load_rom_from_path(rom) {
        Ok(()) => {
            if let Some(cart) = sys.cartridge() {
                log::info!(
                    "Loaded {} ({} KB, region {:X}{})",
                    rom.display(),
                    cart.size().bytes() / 1024,
                    cart.region(),
                    if cart.uses_sram() { ", battery RAM" } else { "" }
                );
            }
            true
        }
        Err(e) => {
            log::error!("{}: {}; running without a cartridge", rom.display(), e);
            false
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_logging(&args)?;

    let timing = if args.pal {
        TimingMode::Pal
    } else {
        TimingMode::Ntsc
    };
    let mut sys = SmsSystem::with_timing(timing);

    if let Some(bios) = &args.bios {
        match sys.load_bios_from_path(bios) {
            Ok(()) => log::info!("BIOS loaded from {}", bios.display()),
            Err(e) => log::warn!("BIOS {} not loaded, booting without it: {}", bios.display(), e),
        }
    }

    match &args.rom {
        Some(rom) => {
            insert_cartridge(&mut sys, rom);
        }
        None => log::warn!("No ROM given, running an empty console"),
    }

    for fnum in 1..=args.frames {
        let frame = sys
            .step_frame()
            .with_context(|| format!("emulation stopped in frame {}", fnum))?;
        if !args.quiet {
            println!(
                "Frame {}: {}x{} PC={:04X}",
                fnum,
                frame.width,
                frame.height,
                sys.cpu().regs.pc
            );
        }
    }

    if sys.cartridge().is_some() && sys.save_sram()? {
        log::info!("Battery RAM written");
    }

    let state = sys.save_state();
    let mut f = File::create(&args.save)
        .with_context(|| format!("creating {}", args.save.display()))?;
    write!(f, "{}", serde_json::to_string_pretty(&state)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_parsing() {
        let (category, level) = parse_override("cpu=trace").unwrap();
        assert_eq!(category, LogCategory::CPU);
        assert_eq!(level, LogLevel::Trace);

        assert!(parse_override("cpu").is_err());
        assert!(parse_override("gpu=info").is_err());
        assert!(parse_override("vdp=loud").is_err());
    }

    #[test]
    fn bad_rom_runs_without_cartridge() {
        let mut sys = SmsSystem::new();
        assert!(!insert_cartridge(&mut sys, Path::new("/nonexistent/game.sms")));
        assert!(sys.cartridge().is_none());
        sys.step_frame().unwrap();

        let path = std::env::temp_dir().join(format!("emu_cli_odd_{}.sms", std::process::id()));
        std::fs::write(&path, vec![0u8; 0x9000]).unwrap();
        assert!(!insert_cartridge(&mut sys, &path));
        assert!(sys.cartridge().is_none());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn args_defaults() {
        let args = Args::parse_from(["emu_cli", "game.sms"]);
        assert_eq!(args.frames, 5);
        assert!(!args.pal);
        assert_eq!(args.log_level, "off");
        assert_eq!(args.rom, Some(PathBuf::from("game.sms")));

        let args = Args::parse_from([
            "emu_cli", "--pal", "--log", "vdp=debug", "--log", "io=trace", "--frames", "60",
        ]);
        assert!(args.pal);
        assert_eq!(args.frames, 60);
        assert_eq!(args.log_overrides.len(), 2);
        assert!(args.rom.is_none());
    }
}
