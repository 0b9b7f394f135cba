// System module - the aggregate that owns every subsystem and arbitrates
// the memory-mapped I/O window (§2, §5).
//
// `Bus` owns flat memory and has no opinion about side effects; `System`
// sits in front of it, intercepting 0x04000000-0x040003FE and routing each
// register to whichever stateful subsystem owns it, then falling through
// to `Bus` for everything else. This is the same split the teacher draws
// between its `Bus` and the individual `MemoryMappedDevice`s, just with
// one extra layer since the GBA's I/O space fans out to many small owners
// instead of one PPU.

use crate::apu::Apu;
use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::cpu::{self, Cpu};
use crate::dma::{Dma, DmaTiming};
use crate::interrupt::{Interrupt, InterruptController};
use crate::keypad::Keypad;
use crate::ppu::{FrameEvent, Ppu};
use crate::timers::Timers;

const CYCLES_PER_LINE: u32 = 1232;
const HDRAW_CYCLES: u32 = 1006;
const LINES_PER_FRAME: u32 = 228;
const SEQUENCER_PERIOD: u32 = 16_777_216 / 16_384; // APU frame sequencer tick

pub struct System {
    pub cpu: Cpu,
    pub bus: Bus,
    pub ppu: Ppu,
    pub apu: Apu,
    pub dma: Dma,
    pub timers: Timers,
    pub keypad: Keypad,
    pub interrupts: InterruptController,

    waitcnt: u16,
    ime_raw: u32,
    sequencer_acc: u32,
    halted: bool,
    rcnt: u16,
    postflg: u16,
}

impl System {
    pub fn new() -> Self {
        System {
            cpu: Cpu::new(),
            bus: Bus::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            dma: Dma::new(),
            timers: Timers::new(),
            keypad: Keypad::new(),
            interrupts: InterruptController::new(),
            waitcnt: 0,
            ime_raw: 0,
            sequencer_acc: 0,
            halted: false,
            rcnt: 0,
            postflg: 0,
        }
    }

    pub fn load_cartridge(&mut self, cartridge: &Cartridge) {
        self.bus.load_rom(&cartridge.rom);
        self.bus.set_save_backend(cartridge.save_kind);
    }

    pub fn load_bios(&mut self, data: &[u8]) {
        self.bus.load_bios(data);
    }

    /// Boot straight into the cartridge's entry point, seeding the register
    /// and I/O state the real BIOS would have left behind (§4.4 "Boot with
    /// BIOS skip"). Used when no BIOS image is available to run.
    pub fn skip_bios_boot(&mut self) {
        self.cpu.skip_bios_boot();
        self.bus.set_bios_latch(0xE129_F000);
        self.postflg = 1;
        self.rcnt = 0x8000;
    }

    // ---- memory access: dispatch the I/O window, fall through to Bus ----

    pub fn read8(&mut self, addr: u32) -> u8 {
        if is_io(addr) {
            self.io_read8(addr)
        } else {
            self.bus.read8(addr)
        }
    }

    pub fn write8(&mut self, addr: u32, value: u8) {
        if is_io(addr) {
            self.io_write8(addr, value);
        } else {
            self.bus.write8(addr, value);
        }
    }

    pub fn read16(&mut self, addr: u32) -> u16 {
        let addr = addr & !1;
        let lo = self.read8(addr) as u16;
        let hi = self.read8(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write16(&mut self, addr: u32, value: u16) {
        let addr = addr & !1;
        self.write8(addr, (value & 0xFF) as u8);
        self.write8(addr.wrapping_add(1), (value >> 8) as u8);
    }

    pub fn read32(&mut self, addr: u32) -> u32 {
        let addr = addr & !3;
        let lo = self.read16(addr) as u32;
        let hi = self.read16(addr.wrapping_add(2)) as u32;
        (hi << 16) | lo
    }

    pub fn write32(&mut self, addr: u32, value: u32) {
        let addr = addr & !3;
        // FIFO_A/FIFO_B are write-only push targets, not byte-addressable
        // registers; a 32-bit store must push all 4 bytes as one unit
        // instead of being split into two 16-bit RMW halves.
        if is_io(addr) {
            match addr & 0x3FE {
                0x0A0 => {
                    self.apu.fifo_a.push(&value.to_le_bytes());
                    return;
                }
                0x0A4 => {
                    self.apu.fifo_b.push(&value.to_le_bytes());
                    return;
                }
                _ => {}
            }
        }
        self.write16(addr, (value & 0xFFFF) as u16);
        self.write16(addr.wrapping_add(2), (value >> 16) as u16);
    }

    fn io_read8(&mut self, addr: u32) -> u8 {
        let reg = self.io_read16(addr & !1);
        if addr & 1 == 0 {
            (reg & 0xFF) as u8
        } else {
            (reg >> 8) as u8
        }
    }

    fn io_write8(&mut self, addr: u32, value: u8) {
        let half_addr = addr & !1;
        let mut reg = self.io_read16(half_addr);
        if addr & 1 == 0 {
            reg = (reg & 0xFF00) | value as u16;
        } else {
            reg = (reg & 0x00FF) | ((value as u16) << 8);
        }
        self.io_write16(half_addr, reg);
    }

    fn io_read16(&mut self, addr: u32) -> u16 {
        match addr & 0x3FE {
            0x000 => self.ppu.dispcnt,
            0x004 => self.ppu.dispstat,
            0x006 => self.ppu.vcount,
            0x008 => self.ppu.bgcnt[0],
            0x00A => self.ppu.bgcnt[1],
            0x00C => self.ppu.bgcnt[2],
            0x00E => self.ppu.bgcnt[3],
            0x040 => self.ppu.win0h,
            0x042 => self.ppu.win1h,
            0x044 => self.ppu.win0v,
            0x046 => self.ppu.win1v,
            0x048 => self.ppu.winin,
            0x04A => self.ppu.winout,
            0x04C => self.ppu.mosaic,
            0x050 => self.ppu.bldcnt,
            0x052 => self.ppu.bldalpha,
            0x054 => self.ppu.bldy,

            0x060 => ((self.apu.ch1.sweep_shift as u16) | ((self.apu.ch1.sweep_increase as u16) << 3) | ((self.apu.ch1.sweep_period as u16) << 4)),
            0x062 => ((self.apu.ch1.le.length as u16) | ((self.apu.ch1.duty as u16) << 6) | ((self.apu.ch1.le.envelope_period as u16) << 8) | ((self.apu.ch1.le.envelope_increase as u16) << 11) | ((self.apu.ch1.le.envelope_initial as u16) << 12)),
            0x064 => self.apu.ch1.frequency & 0x7FF,
            0x068 => ((self.apu.ch2.le.length as u16) | ((self.apu.ch2.duty as u16) << 6) | ((self.apu.ch2.le.envelope_period as u16) << 8) | ((self.apu.ch2.le.envelope_increase as u16) << 11) | ((self.apu.ch2.le.envelope_initial as u16) << 12)),
            0x06C => self.apu.ch2.frequency & 0x7FF,
            0x070 => {
                ((self.apu.ch3.dimension as u16) << 5)
                    | ((self.apu.ch3.number as u16) << 6)
                    | ((self.apu.ch3.enabled as u16) << 7)
            }
            0x072 => self.apu.ch3.length | ((self.apu.ch3.volume_shift as u16) << 13),
            0x074 => self.apu.ch3.frequency & 0x7FF,
            0x078 => (self.apu.ch4.le.envelope_period as u16) << 8 | ((self.apu.ch4.le.envelope_increase as u16) << 11) | ((self.apu.ch4.le.envelope_initial as u16) << 12),
            0x07C => (self.apu.ch4.divisor_code as u16) | ((self.apu.ch4.narrow_width as u16) << 3) | ((self.apu.ch4.shift_clock as u16) << 4),
            0x080 => self.apu.soundcnt_l,
            0x082 => self.apu.soundcnt_h,
            0x084 => self.apu.soundcnt_x,
            0x090..=0x09E => {
                let idx = self.wave_ram_io_index(addr);
                let lo = self.apu.ch3.wave_ram[idx];
                let hi = self.apu.ch3.wave_ram[idx + 1];
                lo as u16 | ((hi as u16) << 8)
            }

            0x0B0..=0x0DE => self.dma_read16(addr),
            0x100 => self.timers.timers[0].counter,
            0x102 => self.timers.timers[0].control,
            0x104 => self.timers.timers[1].counter,
            0x106 => self.timers.timers[1].control,
            0x108 => self.timers.timers[2].counter,
            0x10A => self.timers.timers[2].control,
            0x10C => self.timers.timers[3].counter,
            0x10E => self.timers.timers[3].control,

            0x130 => self.keypad.keyinput(),
            0x132 => self.keypad.keycnt(),
            0x134 => self.rcnt,

            0x200 => self.interrupts.ie,
            0x202 => self.interrupts.if_,
            0x204 => self.waitcnt,
            0x208 => self.ime_raw as u16,
            0x300 => self.postflg,

            _ => 0,
        }
    }

    fn io_write16(&mut self, addr: u32, value: u16) {
        match addr & 0x3FE {
            0x000 => {
                // CGB-mode bit (3) is only writable while the PC is still
                // inside BIOS; cartridge code can read it but never set it.
                let cgb_locked = self.cpu.regs[15] >= 0x4000;
                let mut new_value = value;
                if cgb_locked {
                    new_value = (new_value & !(1 << 3)) | (self.ppu.dispcnt & (1 << 3));
                }
                self.ppu.dispcnt = new_value;
            }
            0x004 => self.ppu.dispstat = (self.ppu.dispstat & 0x0007) | (value & 0xFFF8),
            0x008 => self.ppu.bgcnt[0] = value,
            0x00A => self.ppu.bgcnt[1] = value,
            0x00C => self.ppu.bgcnt[2] = value,
            0x00E => self.ppu.bgcnt[3] = value,
            0x010 => self.ppu.bghofs[0] = value & 0x1FF,
            0x012 => self.ppu.bgvofs[0] = value & 0x1FF,
            0x014 => self.ppu.bghofs[1] = value & 0x1FF,
            0x016 => self.ppu.bgvofs[1] = value & 0x1FF,
            0x018 => self.ppu.bghofs[2] = value & 0x1FF,
            0x01A => self.ppu.bgvofs[2] = value & 0x1FF,
            0x01C => self.ppu.bghofs[3] = value & 0x1FF,
            0x01E => self.ppu.bgvofs[3] = value & 0x1FF,
            0x020 => self.ppu.bg_affine[0].pa = value as i16,
            0x022 => self.ppu.bg_affine[0].pb = value as i16,
            0x024 => self.ppu.bg_affine[0].pc = value as i16,
            0x026 => self.ppu.bg_affine[0].pd = value as i16,
            0x028 => self.ppu.bg_affine[0].x = set_low16(self.ppu.bg_affine[0].x, value),
            0x02A => self.ppu.bg_affine[0].x = set_high16_signed20(self.ppu.bg_affine[0].x, value),
            0x02C => self.ppu.bg_affine[0].y = set_low16(self.ppu.bg_affine[0].y, value),
            0x02E => self.ppu.bg_affine[0].y = set_high16_signed20(self.ppu.bg_affine[0].y, value),
            0x030 => self.ppu.bg_affine[1].pa = value as i16,
            0x032 => self.ppu.bg_affine[1].pb = value as i16,
            0x034 => self.ppu.bg_affine[1].pc = value as i16,
            0x036 => self.ppu.bg_affine[1].pd = value as i16,
            0x038 => self.ppu.bg_affine[1].x = set_low16(self.ppu.bg_affine[1].x, value),
            0x03A => self.ppu.bg_affine[1].x = set_high16_signed20(self.ppu.bg_affine[1].x, value),
            0x03C => self.ppu.bg_affine[1].y = set_low16(self.ppu.bg_affine[1].y, value),
            0x03E => self.ppu.bg_affine[1].y = set_high16_signed20(self.ppu.bg_affine[1].y, value),
            0x040 => self.ppu.win0h = value,
            0x042 => self.ppu.win1h = value,
            0x044 => self.ppu.win0v = value,
            0x046 => self.ppu.win1v = value,
            0x048 => self.ppu.winin = value,
            0x04A => self.ppu.winout = value,
            0x04C => self.ppu.mosaic = value,
            0x050 => self.ppu.bldcnt = value,
            0x052 => self.ppu.bldalpha = value,
            0x054 => self.ppu.bldy = value,

            0x060 => {
                self.apu.ch1.sweep_shift = (value & 0b111) as u8;
                self.apu.ch1.sweep_increase = value & (1 << 3) == 0;
                self.apu.ch1.sweep_period = ((value >> 4) & 0b111) as u8;
            }
            0x062 => {
                self.apu.ch1.le.length = value & 0x3F;
                self.apu.ch1.duty = ((value >> 6) & 0b11) as u8;
                self.apu.ch1.le.envelope_period = ((value >> 8) & 0b111) as u8;
                self.apu.ch1.le.envelope_increase = value & (1 << 11) != 0;
                self.apu.ch1.le.envelope_initial = ((value >> 12) & 0xF) as u8;
            }
            0x064 => {
                self.apu.ch1.frequency = value & 0x7FF;
                self.apu.ch1.le.length_enabled = value & (1 << 14) != 0;
                if value & (1 << 15) != 0 {
                    self.apu.ch1.trigger(true);
                }
            }
            0x068 => {
                self.apu.ch2.le.length = value & 0x3F;
                self.apu.ch2.duty = ((value >> 6) & 0b11) as u8;
                self.apu.ch2.le.envelope_period = ((value >> 8) & 0b111) as u8;
                self.apu.ch2.le.envelope_increase = value & (1 << 11) != 0;
                self.apu.ch2.le.envelope_initial = ((value >> 12) & 0xF) as u8;
            }
            0x06C => {
                self.apu.ch2.frequency = value & 0x7FF;
                self.apu.ch2.le.length_enabled = value & (1 << 14) != 0;
                if value & (1 << 15) != 0 {
                    self.apu.ch2.trigger(false);
                }
            }
            0x070 => {
                self.apu.ch3.dimension = value & (1 << 5) != 0;
                self.apu.ch3.number = value & (1 << 6) != 0;
                self.apu.ch3.enabled = value & (1 << 7) != 0;
            }
            0x072 => {
                self.apu.ch3.length = value & 0xFF;
                self.apu.ch3.volume_shift = ((value >> 13) & 0b11) as u8;
            }
            0x074 => {
                self.apu.ch3.frequency = value & 0x7FF;
                self.apu.ch3.length_enabled = value & (1 << 14) != 0;
                if value & (1 << 15) != 0 {
                    self.apu.ch3.trigger();
                }
            }
            0x078 => {
                self.apu.ch4.le.length = value & 0x3F;
                self.apu.ch4.le.envelope_period = ((value >> 8) & 0b111) as u8;
                self.apu.ch4.le.envelope_increase = value & (1 << 11) != 0;
                self.apu.ch4.le.envelope_initial = ((value >> 12) & 0xF) as u8;
            }
            0x07C => {
                self.apu.ch4.divisor_code = (value & 0b111) as u8;
                self.apu.ch4.narrow_width = value & (1 << 3) != 0;
                self.apu.ch4.shift_clock = ((value >> 4) & 0xF) as u8;
                self.apu.ch4.le.length_enabled = value & (1 << 14) != 0;
                if value & (1 << 15) != 0 {
                    self.apu.ch4.trigger();
                }
            }
            0x080 => self.apu.soundcnt_l = value,
            0x082 => self.apu.soundcnt_h = value,
            0x084 => {
                let was_enabled = self.apu.soundcnt_x & 0x0080 != 0;
                self.apu.soundcnt_x = (self.apu.soundcnt_x & 0xFF0F) | (value & 0x0080);
                if was_enabled && value & 0x0080 == 0 {
                    self.apu.power_off_reset();
                }
            }
            0x090..=0x09E => {
                let idx = self.wave_ram_io_index(addr);
                self.apu.ch3.wave_ram[idx] = (value & 0xFF) as u8;
                self.apu.ch3.wave_ram[idx + 1] = (value >> 8) as u8;
            }
            // FIFO A/B are write-only, side-effecting push targets; a 32-bit
            // store must push all 4 bytes atomically rather than going
            // through the generic write32 -> 2x write16 -> 4x write8 split,
            // which would drop the upper half and double-push the low one.
            0x0A0 => self.apu.fifo_a.push(&value.to_le_bytes()),
            0x0A2 => {}
            0x0A4 => self.apu.fifo_b.push(&value.to_le_bytes()),
            0x0A6 => {}

            0x0B0..=0x0DE => self.dma_write16(addr, value),
            0x100 => self.timers.timers[0].reload = value,
            0x102 => self.timers.timers[0].set_control(value),
            0x104 => self.timers.timers[1].reload = value,
            0x106 => self.timers.timers[1].set_control(value),
            0x108 => self.timers.timers[2].reload = value,
            0x10A => self.timers.timers[2].set_control(value),
            0x10C => self.timers.timers[3].reload = value,
            0x10E => self.timers.timers[3].set_control(value),

            0x132 => self.keypad.set_keycnt(value),
            0x134 => self.rcnt = value,

            0x200 => self.interrupts.ie = value,
            0x202 => self.interrupts.acknowledge(value),
            0x204 => self.waitcnt = value,
            0x208 => {
                self.ime_raw = value as u32;
                self.interrupts.ime = value & 1 != 0;
            }
            0x300 => {
                self.postflg = value & 0xFF;
                if value & 0x8000 == 0 {
                    self.halted = true;
                }
            }
            _ => {}
        }
    }

    /// Wave-RAM I/O always addresses the bank channel 3 is NOT currently
    /// playing from (§6 SOUND3CNT_L "number" bit), so the CPU can prepare
    /// the next waveform while the other bank plays.
    fn wave_ram_io_index(&self, addr: u32) -> usize {
        let offset = (addr & 0x0E) as usize;
        let base = if self.apu.ch3.number { 0 } else { 16 };
        base + offset
    }

    fn dma_read16(&mut self, addr: u32) -> u16 {
        let channel = ((addr - 0x0B0) / 0xC) as usize;
        let offset = (addr - 0x0B0) % 0xC;
        if channel >= 4 {
            return 0;
        }
        match offset {
            0x8 => self.dma.channels[channel].count,
            0xA => self.dma.channels[channel].control,
            _ => 0,
        }
    }

    fn dma_write16(&mut self, addr: u32, value: u16) {
        let channel = ((addr - 0x0B0) / 0xC) as usize;
        let offset = (addr - 0x0B0) % 0xC;
        if channel >= 4 {
            return;
        }
        match offset {
            0x0 => {
                self.dma.channels[channel].src = (self.dma.channels[channel].src & 0xFFFF_0000) | value as u32
            }
            0x2 => {
                self.dma.channels[channel].src =
                    (self.dma.channels[channel].src & 0x0000_FFFF) | ((value as u32) << 16)
            }
            0x4 => {
                self.dma.channels[channel].dst = (self.dma.channels[channel].dst & 0xFFFF_0000) | value as u32
            }
            0x6 => {
                self.dma.channels[channel].dst =
                    (self.dma.channels[channel].dst & 0x0000_FFFF) | ((value as u32) << 16)
            }
            0x8 => self.dma.channels[channel].count = value,
            0xA => self.dma.write_control(channel, value),
            _ => {}
        }
    }

    // ---- frame driver (§2 control flow) ----

    pub fn run_frame(&mut self) {
        for _ in 0..LINES_PER_FRAME {
            self.run_scanline();
        }
    }

    fn run_scanline(&mut self) {
        self.run_for_cycles(HDRAW_CYCLES);
        let event = self.ppu.tick(
            HDRAW_CYCLES,
            &self.bus.palette,
            &self.bus.vram,
            &self.bus.oam,
            &mut self.interrupts,
        );
        self.on_frame_event(event);

        self.run_for_cycles(CYCLES_PER_LINE - HDRAW_CYCLES);
        let event = self.ppu.tick(
            CYCLES_PER_LINE - HDRAW_CYCLES,
            &self.bus.palette,
            &self.bus.vram,
            &self.bus.oam,
            &mut self.interrupts,
        );
        self.on_frame_event(event);
    }

    fn on_frame_event(&mut self, event: FrameEvent) {
        match event {
            FrameEvent::VBlankStart => {
                for t in self.dma.poll(DmaTiming::VBlank) {
                    self.execute_transfer(t);
                }
            }
            FrameEvent::HBlankStart => {
                for t in self.dma.poll(DmaTiming::HBlank) {
                    self.execute_transfer(t);
                }
            }
            _ => {}
        }
    }

    fn run_for_cycles(&mut self, budget: u32) {
        let mut remaining = budget as i64;
        while remaining > 0 {
            let cycles = if self.halted || self.cpu.halted {
                1
            } else {
                cpu::step(self)
            };
            self.advance_peripherals(cycles);
            remaining -= cycles as i64;
        }
    }

    fn advance_peripherals(&mut self, cycles: u32) {
        let overflow_mask = self.timers.step(cycles);
        for i in 0..4 {
            if overflow_mask & (1 << i) != 0 {
                self.interrupts.request(match i {
                    0 => Interrupt::Timer0,
                    1 => Interrupt::Timer1,
                    2 => Interrupt::Timer2,
                    _ => Interrupt::Timer3,
                });
                // SOUNDCNT_H picks which timer's overflow refills each FIFO
                // independently (bit 10 for A, bit 14 for B) - not a fixed
                // timer0->A/timer1->B wiring.
                let soundcnt_h = self.apu.soundcnt_h;
                let fifo_a_timer = (soundcnt_h >> 10) & 1;
                let fifo_b_timer = (soundcnt_h >> 14) & 1;
                if i as u16 == fifo_a_timer && self.apu.on_timer_overflow(0) {
                    if let Some(t) = self.dma.poll_fifo(1) {
                        self.execute_transfer(t);
                    }
                }
                if i as u16 == fifo_b_timer && self.apu.on_timer_overflow(1) {
                    if let Some(t) = self.dma.poll_fifo(2) {
                        self.execute_transfer(t);
                    }
                }
            }
        }

        self.apu.tick(cycles);
        self.sequencer_acc += cycles;
        while self.sequencer_acc >= SEQUENCER_PERIOD {
            self.sequencer_acc -= SEQUENCER_PERIOD;
            self.apu.step_sequencer();
        }

        if self.keypad.irq_condition_met() {
            self.interrupts.request(Interrupt::Keypad);
        }

        self.cpu.service_interrupts(&self.interrupts);
        if self.interrupts.pending() {
            self.halted = false;
        }
    }

    fn execute_transfer(&mut self, t: crate::dma::Transfer) {
        let mut src = t.src;
        let mut dst = t.dst;
        for _ in 0..t.count {
            if t.word_size == 4 {
                let v = self.read32(src);
                self.write32(dst, v);
            } else {
                let v = self.read16(src);
                self.write16(dst, v);
            }
            src = src.wrapping_add(t.src_step as u32);
            dst = dst.wrapping_add(t.dst_step as u32);
        }
        if t.irq {
            self.interrupts.request(match t.channel {
                0 => Interrupt::Dma0,
                1 => Interrupt::Dma1,
                2 => Interrupt::Dma2,
                _ => Interrupt::Dma3,
            });
        }
    }
}

fn is_io(addr: u32) -> bool {
    addr >= 0x0400_0000 && addr < 0x0400_0400
}

fn set_low16(current: i32, value: u16) -> i32 {
    sign_extend20(((current as u32) & 0xFFF0_0000) | value as u32)
}

fn set_high16_signed20(current: i32, value: u16) -> i32 {
    let low = current as u32 & 0x0000_FFFF;
    sign_extend20(((value as u32 & 0x0FFF) << 16) | low)
}

/// BG affine reference points are 20-bit signed fixed-point values stored
/// across two 16-bit registers.
fn sign_extend20(value: u32) -> i32 {
    ((value << 12) as i32) >> 12
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_window_is_distinguished_from_bus_memory() {
        assert!(is_io(0x0400_0000));
        assert!(is_io(0x0400_03FE));
        assert!(!is_io(0x0400_0400));
        assert!(!is_io(0x0600_0000));
    }

    #[test]
    fn dispcnt_roundtrips_through_system_io() {
        let mut system = System::new();
        system.write16(0x0400_0000, 0x0403);
        assert_eq!(system.read16(0x0400_0000), 0x0403);
        assert_eq!(system.ppu.dispcnt, 0x0403);
    }

    #[test]
    fn keyinput_reads_through_system_io() {
        let mut system = System::new();
        assert_eq!(system.read16(0x0400_0130), 0x03FF);
    }

    #[test]
    fn non_io_address_falls_through_to_bus() {
        let mut system = System::new();
        system.write8(0x0200_0000, 0x42);
        assert_eq!(system.read8(0x0200_0000), 0x42);
    }

    #[test]
    fn affine_reference_point_sign_extends_20_bits() {
        let mut system = System::new();
        system.write16(0x0400_0028, 0x0000);
        system.write16(0x0400_002A, 0x0FFF); // all 1s in the 12 high bits -> negative
        assert!(system.ppu.bg_affine[0].x < 0);
    }

    #[test]
    fn ime_gates_interrupt_controller() {
        let mut system = System::new();
        system.write16(0x0400_0208, 1);
        assert!(system.interrupts.ime);
    }

    #[test]
    fn dispcnt_cgb_bit_locks_once_pc_leaves_bios() {
        let mut system = System::new();
        system.cpu.regs[15] = 0x0800_0000;
        system.write16(0x0400_0000, 0x0008); // try to set CGB mode bit
        assert_eq!(system.ppu.dispcnt & (1 << 3), 0, "locked once outside BIOS");

        system.cpu.regs[15] = 0x0000_0100;
        system.write16(0x0400_0000, 0x0008);
        assert_eq!(system.ppu.dispcnt & (1 << 3), 1 << 3, "writable while still in BIOS");
    }

    #[test]
    fn skip_bios_boot_jumps_straight_to_cartridge_entry() {
        let mut system = System::new();
        system.skip_bios_boot();
        assert_eq!(system.cpu.regs[15], 0x0800_0000);
        assert_eq!(system.cpu.mode(), crate::cpu::Mode::System);
        assert_eq!(system.read16(0x0400_0300) & 0xFF, 1, "POSTFLG set");
        assert_eq!(system.read16(0x0400_0134), 0x8000, "RCNT set");
        assert_eq!(system.read32(0x0000_0000), 0xE129_F000, "BIOS latch seeded");
    }

    #[test]
    fn fifo_a_32bit_write_pushes_all_four_bytes_atomically() {
        let mut system = System::new();
        system.write32(0x0400_00A0, 0x0403_0201);
        system.apu.fifo_a.pop_latch();
        assert_eq!(system.apu.fifo_a.latched, 0x01);
    }

    #[test]
    fn timer_overflow_only_refills_the_fifo_it_is_selected_for() {
        let mut system = System::new();
        // SOUNDCNT_H: bit 10 = 1 selects timer 1 to drive FIFO A.
        system.write16(0x0400_0082, 1 << 10);
        system.apu.fifo_a.push(&[1, 2, 3, 4]);

        // Timer 0, free-running with no prescaling, overflows on the very
        // next tick.
        system.write16(0x0400_0100, 0xFFFF);
        system.write16(0x0400_0102, 1 << 7);

        // Timer 0 overflowing should NOT refill FIFO A once timer 1 is selected.
        let before = system.apu.fifo_a.latched;
        system.advance_peripherals(1);
        assert_eq!(system.apu.fifo_a.latched, before);
    }

    #[test]
    fn soundcnt_x_disable_resets_fifos_and_channel3() {
        let mut system = System::new();
        system.write16(0x0400_0084, 0x0080); // enable
        system.apu.fifo_a.push(&[1, 2, 3, 4]);
        system.apu.ch3.volume_shift = 2;

        system.write16(0x0400_0084, 0x0000); // disable: 1->0 transition
        assert_eq!(system.apu.fifo_a.needs_refill(), true);
        assert_eq!(system.apu.ch3.volume_shift, 0);
    }

    #[test]
    fn wave_ram_io_addresses_the_non_playing_bank() {
        let mut system = System::new();
        system.write16(0x0400_0070, 0); // number = 0, selects bank 0 for playback
        system.write16(0x0400_0090, 0xBBAA); // I/O should land in the OTHER bank (16..)
        assert_eq!(system.apu.ch3.wave_ram[16], 0xAA);
        assert_eq!(system.apu.ch3.wave_ram[17], 0xBB);
        assert_eq!(system.apu.ch3.wave_ram[0], 0, "selected bank untouched");

        system.write16(0x0400_0070, 1 << 6); // number = 1, selects bank 1
        system.write16(0x0400_0090, 0xDDCC);
        assert_eq!(system.apu.ch3.wave_ram[0], 0xCC);
        assert_eq!(system.apu.ch3.wave_ram[1], 0xDD);
    }
}
