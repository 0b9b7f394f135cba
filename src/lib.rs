// GBA emulator core and host shell library root.

pub mod apu;
#[cfg(feature = "audio")]
pub mod audio;
pub mod bits;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod display;
pub mod dma;
pub mod emulator;
pub mod error;
pub mod interrupt;
pub mod keypad;
pub mod ppu;
pub mod save;
pub mod system;
pub mod timers;

pub use cartridge::Cartridge;
pub use emulator::{Emulator, EmulatorConfig};
pub use system::System;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_components_construct() {
        let _system = System::new();
        let _emulator = Emulator::new(EmulatorConfig::default());
    }
}
