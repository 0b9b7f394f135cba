// Save backends module - the three battery-backed storage kinds a cartridge
// may wire into the 0x0C000000-0x0FFFFFFF bus windows.
//
// Grounded on the teacher's cartridge/mappers factory pattern (one enum
// picks the concrete backend up front instead of re-deciding on every
// access) but the backends themselves - SRAM, Flash, EEPROM - have no
// NES equivalent and are modeled directly from §4.3.

mod eeprom;
mod flash;
mod sram;

pub use eeprom::Eeprom;
pub use flash::{Flash, FlashState};
pub use sram::Sram;

/// Which save chip, if any, the cartridge ROM appears to carry.
///
/// Detected by `Cartridge::detect_save_type` scanning the ROM's ASCII ID
/// strings (§4.9); falls back to `Sram` when no string is found, matching
/// "detected implicitly by first access pattern" in §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Sram,
    Flash,
    Eeprom512,
    Eeprom8k,
}

/// The battery-backed storage attached to a cartridge.
///
/// Only one variant is active per cartridge; the bus dispatches reads and
/// writes in the 0xC/0xD/0xE/0xF address windows to whichever one is
/// present (§4.1, §4.3).
pub enum SaveBackend {
    Sram(Sram),
    Flash(Flash),
    Eeprom(Eeprom),
}

impl SaveBackend {
    pub fn new(kind: SaveKind) -> Self {
        match kind {
            SaveKind::Sram => SaveBackend::Sram(Sram::new()),
            SaveKind::Flash => SaveBackend::Flash(Flash::new()),
            SaveKind::Eeprom512 => SaveBackend::Eeprom(Eeprom::new(512)),
            SaveKind::Eeprom8k => SaveBackend::Eeprom(Eeprom::new(8192)),
        }
    }

    /// Raw bytes to persist to a `.sav` file at shutdown (§6, §4.10).
    pub fn raw_bytes(&self) -> &[u8] {
        match self {
            SaveBackend::Sram(s) => &s.data,
            SaveBackend::Flash(f) => &f.data,
            SaveBackend::Eeprom(e) => &e.data,
        }
    }

    /// Restore a previously persisted `.sav` file's bytes.
    pub fn load_raw_bytes(&mut self, bytes: &[u8]) {
        let dst: &mut [u8] = match self {
            SaveBackend::Sram(s) => &mut s.data,
            SaveBackend::Flash(f) => &mut f.data,
            SaveBackend::Eeprom(e) => &mut e.data,
        };
        let n = bytes.len().min(dst.len());
        dst[..n].copy_from_slice(&bytes[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_backend_matches_kind() {
        assert!(matches!(SaveBackend::new(SaveKind::Sram), SaveBackend::Sram(_)));
        assert!(matches!(SaveBackend::new(SaveKind::Flash), SaveBackend::Flash(_)));
        assert!(matches!(
            SaveBackend::new(SaveKind::Eeprom512),
            SaveBackend::Eeprom(_)
        ));
    }

    #[test]
    fn raw_bytes_roundtrip() {
        let mut backend = SaveBackend::new(SaveKind::Sram);
        if let SaveBackend::Sram(s) = &mut backend {
            s.write(0x10, 0xAB);
        }
        let snapshot = backend.raw_bytes().to_vec();

        let mut restored = SaveBackend::new(SaveKind::Sram);
        restored.load_raw_bytes(&snapshot);
        if let SaveBackend::Sram(s) = &restored {
            assert_eq!(s.read(0x10), 0xAB);
        } else {
            panic!("wrong backend kind");
        }
    }
}
