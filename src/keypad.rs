// Keypad module - button input handling
//
// The GBA has no strobe/shift protocol like older consoles: all 10 buttons
// are exposed directly as active-low bits in one 16-bit register, plus a
// second register that optionally raises an interrupt when a chosen
// combination becomes pressed (§4.7).
//
// # I/O Registers
//
// | Address     | Name   | Access | Description                        |
// |-------------|--------|--------|------------------------------------|
// | 0x04000130  | KEYINPUT | R    | Button state, 0 = pressed          |
// | 0x04000132  | KEYCNT   | R/W  | IRQ select mask + AND/OR condition |

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
    R,
    L,
}

impl Button {
    fn bit(self) -> u16 {
        match self {
            Button::A => 0,
            Button::B => 1,
            Button::Select => 2,
            Button::Start => 3,
            Button::Right => 4,
            Button::Left => 5,
            Button::Up => 6,
            Button::Down => 7,
            Button::R => 8,
            Button::L => 9,
        }
    }
}

/// Keypad state and IRQ-condition register.
pub struct Keypad {
    /// Active-high internal state; KEYINPUT inverts this on read.
    pressed: u16,
    keycnt: u16,
}

impl Keypad {
    pub fn new() -> Self {
        Keypad {
            pressed: 0,
            keycnt: 0,
        }
    }

    pub fn set_pressed(&mut self, button: Button, is_pressed: bool) {
        let mask = 1 << button.bit();
        if is_pressed {
            self.pressed |= mask;
        } else {
            self.pressed &= !mask;
        }
    }

    pub fn keyinput(&self) -> u16 {
        (!self.pressed) & 0x03FF
    }

    pub fn keycnt(&self) -> u16 {
        self.keycnt
    }

    pub fn set_keycnt(&mut self, value: u16) {
        self.keycnt = value & 0xC3FF;
    }

    /// Whether the condition configured in KEYCNT currently holds: bit 14
    /// enables the check, bit 15 selects AND (all selected buttons down)
    /// vs OR (any selected button down).
    pub fn irq_condition_met(&self) -> bool {
        if self.keycnt & 0x4000 == 0 {
            return false;
        }
        let selected = self.keycnt & 0x03FF;
        if selected == 0 {
            return false;
        }
        let held = self.pressed & selected;
        if self.keycnt & 0x8000 != 0 {
            held == selected
        } else {
            held != 0
        }
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyinput_is_active_low() {
        let mut kp = Keypad::new();
        assert_eq!(kp.keyinput(), 0x03FF, "nothing pressed reads all 1s");
        kp.set_pressed(Button::A, true);
        assert_eq!(kp.keyinput() & 1, 0, "A pressed clears bit 0");
    }

    #[test]
    fn irq_and_condition_requires_all_selected_buttons() {
        let mut kp = Keypad::new();
        kp.set_keycnt(0xC000 | (1 << Button::A.bit()) | (1 << Button::B.bit()));
        kp.set_pressed(Button::A, true);
        assert!(!kp.irq_condition_met(), "only A held, AND needs both");
        kp.set_pressed(Button::B, true);
        assert!(kp.irq_condition_met());
    }

    #[test]
    fn irq_or_condition_needs_any_selected_button() {
        let mut kp = Keypad::new();
        kp.set_keycnt(0x4000 | (1 << Button::Start.bit()));
        assert!(!kp.irq_condition_met());
        kp.set_pressed(Button::Start, true);
        assert!(kp.irq_condition_met());
    }

    #[test]
    fn irq_disabled_when_enable_bit_clear() {
        let mut kp = Keypad::new();
        kp.set_keycnt(1 << Button::A.bit());
        kp.set_pressed(Button::A, true);
        assert!(!kp.irq_condition_met());
    }
}
