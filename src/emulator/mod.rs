// Emulator module - host-facing coordinator
//
// Wraps `System` (the pinned core) with the things a desktop build needs
// around it: loading ROM/BIOS/`.sav` files from disk, persisting the save
// backend back out at shutdown, and owning the user-facing `EmulatorConfig`.
// None of this changes core semantics; it is the thin shell §7 describes.

mod config;

pub use config::{AudioConfig, EmulatorConfig, KeyBindings, VideoConfig};

use crate::cartridge::Cartridge;
use crate::error::{BootError, SaveError};
use crate::system::System;
use std::fs;
use std::path::{Path, PathBuf};

const BIOS_SIZE: usize = 16 * 1024;

/// Coordinates the emulator core, the loaded cartridge, and host settings.
pub struct Emulator {
    system: System,
    config: EmulatorConfig,
    rom_path: Option<PathBuf>,
}

impl Emulator {
    pub fn new(config: EmulatorConfig) -> Self {
        Emulator {
            system: System::new(),
            config,
            rom_path: None,
        }
    }

    /// Load the GBA BIOS image. Required before `run_frame` will produce
    /// correct output (the boot vector lives in BIOS, not the cartridge).
    pub fn load_bios<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BootError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| BootError::BiosRead {
            path: path.to_path_buf(),
            source,
        })?;
        if data.len() != BIOS_SIZE {
            return Err(BootError::BiosSize {
                expected: BIOS_SIZE,
                actual: data.len(),
            });
        }
        self.system.load_bios(&data);
        Ok(())
    }

    /// Boot straight into the cartridge without a real BIOS image, for
    /// users who don't have one to provide.
    pub fn skip_bios(&mut self) {
        self.system.skip_bios_boot();
    }

    /// Load a ROM file, detect its save type, and restore any existing
    /// `.sav` sidecar file next to it.
    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BootError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| BootError::RomRead {
            path: path.to_path_buf(),
            source,
        })?;
        if data.is_empty() {
            return Err(BootError::EmptyRom {
                path: path.to_path_buf(),
            });
        }

        let cartridge = Cartridge::load(data);
        log::info!(
            "loaded '{}' ({:?} save)",
            cartridge.title(),
            cartridge.save_kind
        );
        self.system.load_cartridge(&cartridge);

        if let Ok(bytes) = fs::read(save_path(path)) {
            self.system.bus.save.load_raw_bytes(&bytes);
        }

        self.rom_path = Some(path.to_path_buf());
        self.config.push_recent_rom(path.to_path_buf());
        Ok(())
    }

    /// Write the save backend's contents to its `.sav` sidecar file.
    /// Logged and ignored on failure per §7 (never aborts the process).
    pub fn persist_save(&self) -> Result<(), SaveError> {
        let Some(rom_path) = &self.rom_path else {
            return Ok(());
        };
        let path = save_path(rom_path);
        fs::write(&path, self.system.bus.save.raw_bytes()).map_err(|source| SaveError::Write {
            path,
            source,
        })
    }

    pub fn run_frame(&mut self) {
        self.system.run_frame();
    }

    pub fn reset(&mut self) {
        self.system.cpu.reset();
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut System {
        &mut self.system
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EmulatorConfig {
        &mut self.config
    }

    pub fn rom_path(&self) -> Option<&Path> {
        self.rom_path.as_deref()
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        if let Err(err) = self.persist_save() {
            log::warn!("could not persist save file: {err}");
        }
    }
}

fn save_path(rom_path: &Path) -> PathBuf {
    rom_path.with_extension("sav")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rom_rejects_empty_file() {
        let mut emulator = Emulator::new(EmulatorConfig::default());
        let dir = std::env::temp_dir().join("gba_rs_test_empty_rom.gba");
        fs::write(&dir, []).unwrap();
        let result = emulator.load_rom(&dir);
        assert!(matches!(result, Err(BootError::EmptyRom { .. })));
        let _ = fs::remove_file(&dir);
    }

    #[test]
    fn load_bios_rejects_wrong_size() {
        let mut emulator = Emulator::new(EmulatorConfig::default());
        let path = std::env::temp_dir().join("gba_rs_test_bad_bios.bin");
        fs::write(&path, vec![0u8; 100]).unwrap();
        let result = emulator.load_bios(&path);
        assert!(matches!(result, Err(BootError::BiosSize { .. })));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn skip_bios_jumps_to_cartridge_entry_point() {
        let mut emulator = Emulator::new(EmulatorConfig::default());
        emulator.skip_bios();
        assert_eq!(emulator.system().cpu.regs[15], 0x0800_0000);
    }

    #[test]
    fn load_rom_tracks_rom_path_and_recent_list() {
        let mut emulator = Emulator::new(EmulatorConfig::default());
        let path = std::env::temp_dir().join("gba_rs_test_rom.gba");
        fs::write(&path, vec![0xAAu8; 256]).unwrap();
        emulator.load_rom(&path).unwrap();
        assert_eq!(emulator.rom_path(), Some(path.as_path()));
        assert_eq!(emulator.config().recent_roms[0], path);
        let _ = fs::remove_file(&path);
    }
}
