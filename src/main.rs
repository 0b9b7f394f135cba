// gba-rs - command-line entry point
//
// Wires the `Emulator` coordinator to a `winit` presentation window and
// (when the `audio` feature is enabled) a `cpal` output stream, pacing
// frames to the configured target FPS. Host-boundary failures are reported
// via `log::error!` and a nonzero exit code, per §7's error handling design.

use clap::Parser;
use gba_rs::display::{self, FrameBuffer, WindowConfig};
use gba_rs::{Emulator, EmulatorConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

#[derive(Parser, Debug)]
#[command(name = "gba-rs", about = "A Game Boy Advance emulator")]
struct Cli {
    /// Path to the ROM file (.gba)
    rom: PathBuf,

    /// Path to the GBA BIOS image (16 KiB); falls back to the config file's
    /// saved path if omitted
    #[arg(long)]
    bios: Option<PathBuf>,

    /// Window scale factor (1-8)
    #[arg(long)]
    scale: Option<u32>,

    /// Disable VSync
    #[arg(long)]
    no_vsync: bool,

    /// Run without frame pacing, as fast as the host can go
    #[arg(long)]
    fast_forward: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EmulatorConfig::load_or_default();
    if let Some(scale) = cli.scale {
        config.video.scale = scale.clamp(1, 8);
    }
    if cli.no_vsync {
        config.video.vsync = false;
    }
    let bios_path = cli.bios.clone().or_else(|| config.bios_path.clone());

    let mut emulator = Emulator::new(config);
    match bios_path {
        Some(bios_path) => {
            emulator.load_bios(&bios_path)?;
            emulator.config_mut().bios_path = Some(bios_path);
        }
        None => {
            log::info!("no BIOS image given, booting straight into the cartridge");
            emulator.skip_bios();
        }
    }
    emulator.load_rom(&cli.rom)?;
    emulator.config_mut().save()?;

    let window_config = WindowConfig::new()
        .with_scale(emulator.config().video.scale)
        .with_vsync(emulator.config().video.vsync && !cli.fast_forward);

    let emulator = Arc::new(Mutex::new(emulator));

    #[cfg(feature = "audio")]
    let audio_state = {
        let queue = gba_rs::audio::new_queue();
        let sample_rate = emulator.lock().unwrap().config().audio.sample_rate;
        let output = gba_rs::audio::AudioOutput::new(queue.clone(), sample_rate).ok();
        if output.is_none() {
            log::warn!("audio output unavailable, continuing without sound");
        }
        (output, queue)
    };

    let key_emulator = emulator.clone();
    let on_key = move |button, pressed| {
        key_emulator
            .lock()
            .unwrap()
            .system_mut()
            .keypad
            .set_pressed(button, pressed);
    };

    let on_redraw = move |frame_buffer: &mut FrameBuffer| {
        let mut guard = emulator.lock().unwrap();
        guard.run_frame();
        #[cfg(feature = "audio")]
        {
            let (_output, queue) = &audio_state;
            gba_rs::audio::pump(&mut guard.system_mut().apu, queue);
        }
        frame_buffer.load_from_rgb555(&guard.system().ppu.framebuffer);
    };

    display::run_display(window_config, on_key, on_redraw)
}
