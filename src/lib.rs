#![no_std]
//! Driver to write characters to LCD modules built around the ST7032 controller and connected
//! via i2c, like the Midas SPTLYI 2x16/2x20 series. It requires an I2C instance implementing
//! [`embedded_hal::i2c::I2c`], a reset pin implementing [`embedded_hal::digital::OutputPin`]
//! and an instance to delay execution implementing [`embedded_hal::delay::DelayNs`].
//!
//! Unlike the common PCF8574 backpacks there is no 4-bit nibble dance: the controller speaks
//! i2c natively, so every transaction is a control byte (`0x00` command, `0x40` data) followed
//! by the payload bytes.
//!
//! The driver keeps a logical cursor on the 2x40 character grid and a shadow copy of every
//! character it transmitted, so on-screen content can be read back without touching the bus.
//!
//! Usage:
//! ```ignore
//! const LCD_ADDRESS: u8 = 0x7C; // Address depends on hardware wiring
//!
//! // i2c, reset pin and delay come from the HAL of your target, e.g. stm32 or avr HALs.
//! let mut lcd = lcd_st7032_i2c::sync_lcd::Lcd::new(&mut i2c, &mut rst, &mut delay)
//!     .with_address(LCD_ADDRESS)
//!     .init()?;
//!
//! lcd.set_position(4, 0)?;
//! lcd.write_str("temp:")?;
//! // any formatted output goes through ufmt
//! ufmt::uwrite!(&mut lcd, " {}C", 23)?;
//! ```

pub mod sync_lcd;

#[cfg(feature = "async")]
pub mod async_lcd;

/// Addressable width of one display line in characters.
pub const COLUMNS: u8 = 40;
/// Number of display lines.
pub const ROWS: u8 = 2;
/// Longest character payload accepted by a single write transaction. Longer
/// input is truncated, not rejected.
pub const MAX_PAYLOAD: usize = 79;

const CELLS: usize = COLUMNS as usize * ROWS as usize;

/// Power-up sequence sent as one transaction: function set, extended function set,
/// internal osc/bias, contrast, power/icon/contrast, follower control, display on,
/// clear, return home, entry mode.
const INIT_SEQUENCE: [u8; 12] = [
    0x80, 0x38, 0x00, 0x39, 0x14, 0x79, 0x50, 0x6F, 0x0F, 0x01, 0x02, 0x04,
];

/// Register-select control byte, first byte of every transaction.
#[repr(u8)]
#[derive(Copy, Clone)]
enum Mode {
    Cmd = 0x00,
    Data = 0x40,
}

enum Commands {
    Clear = 0x01,
    ReturnHome = 0x02,
    FunctionSet = 0x38,
    SetCgramAddr = 0x40,
    SetDdramAddr = 0x80,
}

/// Display on/off control bytes. 0x0F switches display, cursor and blink on at once,
/// which is why "display on" and "cursor on" share a code.
#[repr(u8)]
enum DisplayControl {
    DisplayOff = 0x08,
    CursorOff = 0x0C,
    AllOn = 0x0F,
}

/// Single-step shift command bytes.
#[repr(u8)]
#[derive(Copy, Clone)]
enum ShiftCode {
    CursorLeft = 0x10,
    CursorRight = 0x14,
    DisplayLeft = 0x18,
    DisplayRight = 0x1C,
}

/// Direction for [`sync_lcd::Lcd::shift_cursor`] and [`sync_lcd::Lcd::shift_display`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShiftDirection {
    Left,
    Right,
}

/// Entry mode applied by the controller after each character write.
///
/// The controller keeps this mode itself and never reports it back; the driver
/// does not mirror it in software.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AutoShift {
    /// Cursor decrements after each write, display window fixed.
    CursorLeft = 0x04,
    /// Display window shifts right after each write.
    DisplayRight = 0x05,
    /// Power-on default: cursor increments, display window fixed.
    Off = 0x06,
    /// Display window shifts left after each write.
    DisplayLeft = 0x07,
}

/// Errors reported by the driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error<I2cError, PinError> {
    /// The addressed device did not acknowledge an i2c transaction.
    I2c(I2cError),
    /// The reset line could not be driven.
    ResetPin(PinError),
}

/// Logical cursor location on the 2x40 character grid.
///
/// The controller's address space is split: row 1 starts at byte offset 0x27 in
/// the command's secondary (CGRAM-style) field but at 0x40 in DDRAM. Both
/// offsets are derived from the logical position on demand, never stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CursorPosition {
    /// Column on the full addressable line, `0..=39`.
    pub column: u8,
    /// Display line, `0` or `1`.
    pub row: u8,
}

impl CursorPosition {
    const HOME: Self = Self { column: 0, row: 0 };

    /// Builds a position from possibly out-of-range coordinates by clamping,
    /// never by rejecting.
    fn clamped(column: i8, row: i8) -> Self {
        Self {
            column: column.clamp(0, COLUMNS as i8 - 1) as u8,
            row: row.clamp(0, ROWS as i8 - 1) as u8,
        }
    }

    /// Secondary address field of the position command; row 1 begins at 0x27.
    fn cgram_offset(self) -> u8 {
        self.column + self.row * (COLUMNS - 1)
    }

    /// DDRAM address of this position; row 1 begins at 0x40.
    fn ddram_offset(self) -> u8 {
        self.column + self.row * 0x40
    }

    fn index(self) -> usize {
        self.row as usize * COLUMNS as usize + self.column as usize
    }

    /// Moves by `n` cells. Walking past column 39 continues on the other row,
    /// walking before (0, 0) ends up at (39, 1), in either direction.
    fn offset_by(self, n: i16) -> Self {
        let index = (self.index() as i16 + n).rem_euclid(CELLS as i16);
        Self {
            column: (index % COLUMNS as i16) as u8,
            row: (index / COLUMNS as i16) as u8,
        }
    }
}

/// Shadow copy of the characters transmitted to the display, one byte per cell.
/// Cells never written stay zero.
struct TextBuffer {
    cells: [u8; CELLS],
}

impl TextBuffer {
    const fn new() -> Self {
        Self { cells: [0; CELLS] }
    }

    fn get(&self, position: CursorPosition) -> u8 {
        self.cells[position.index()]
    }

    fn set(&mut self, position: CursorPosition, byte: u8) {
        self.cells[position.index()] = byte;
    }

    fn reset(&mut self) {
        self.cells = [0; CELLS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_coordinates_clamp_into_the_grid() {
        for column in -10i8..=50 {
            let p = CursorPosition::clamped(column, 0);
            assert!(p.column <= 39, "column {} escaped the grid", column);
        }
        assert_eq!(
            CursorPosition::clamped(-10, -3),
            CursorPosition { column: 0, row: 0 }
        );
        assert_eq!(
            CursorPosition::clamped(50, 7),
            CursorPosition { column: 39, row: 1 }
        );
    }

    #[test]
    fn address_split_is_asymmetric_on_row_one() {
        let p = CursorPosition { column: 5, row: 1 };
        assert_eq!(p.cgram_offset(), 0x2C);
        assert_eq!(p.ddram_offset(), 0x45);

        let p = CursorPosition { column: 5, row: 0 };
        assert_eq!(p.cgram_offset(), 0x05);
        assert_eq!(p.ddram_offset(), 0x05);
    }

    #[test]
    fn steps_wrap_across_line_ends_and_grid_ends() {
        let end_of_line = CursorPosition { column: 39, row: 0 };
        assert_eq!(end_of_line.offset_by(1), CursorPosition { column: 0, row: 1 });

        assert_eq!(
            CursorPosition::HOME.offset_by(-1),
            CursorPosition { column: 39, row: 1 }
        );
        assert_eq!(CursorPosition::HOME.offset_by(80), CursorPosition::HOME);
        assert_eq!(CursorPosition::HOME.offset_by(-80), CursorPosition::HOME);
    }

    #[test]
    fn buffer_returns_last_written_byte_and_zero_otherwise() {
        let mut buffer = TextBuffer::new();
        let slot = CursorPosition { column: 7, row: 1 };
        assert_eq!(buffer.get(slot), 0);
        buffer.set(slot, b'q');
        buffer.set(slot, b'r');
        assert_eq!(buffer.get(slot), b'r');
        assert_eq!(buffer.get(CursorPosition::HOME), 0);
        buffer.reset();
        assert_eq!(buffer.get(slot), 0);
    }
}
