use emu_core::System;
use emu_sms::SmsSystem;
use std::env;

fn main() -> anyhow::Result<()> {
    let mut sys = SmsSystem::new();
    if let Some(rom) = env::args().nth(1) {
        sys.load_rom_from_path(&rom)?;
    }
    let frame = sys.step_frame()?;
    println!("Headless SMS frame: {}x{}", frame.width, frame.height);
    println!("Save-state: {}", serde_json::to_string_pretty(&sys.save_state())?);
    Ok(())
}
