use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

use ufmt_write::uWrite;

use crate::{
    AutoShift, Commands, CursorPosition, DisplayControl, Error, Mode, ShiftCode, ShiftDirection,
    TextBuffer, INIT_SEQUENCE, MAX_PAYLOAD,
};

/// API to drive the LCD.
///
/// Every operation that touches the bus returns the transport outcome. Local
/// cursor and shadow-buffer state is updated even when a transaction is not
/// acknowledged: the hardware may well have latched part of the bytes, so the
/// shadow keeps tracking what was sent rather than rolling back. There are no
/// internal retries.
pub struct Lcd<'a, I, P, D>
where
    I: I2c,
    P: OutputPin,
    D: DelayNs,
{
    i2c: &'a mut I,
    reset: &'a mut P,
    delay: &'a mut D,
    address: u8,
    cursor: CursorPosition,
    buffer: TextBuffer,
}

impl<'a, I, P, D> Lcd<'a, I, P, D>
where
    I: I2c,
    P: OutputPin,
    D: DelayNs,
{
    /// Create a new instance from the I2C bus, the reset line and a delay provider.
    pub fn new(i2c: &'a mut I, reset: &'a mut P, delay: &'a mut D) -> Self {
        Self {
            i2c,
            reset,
            delay,
            address: 0,
            cursor: CursorPosition::HOME,
            buffer: TextBuffer::new(),
        }
    }

    /// Set the I2C address of the module, depends on hardware wiring.
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Initializes the hardware.
    ///
    /// Pulses the reset line low, then transmits the whole power-up command
    /// sequence (extended function set, bias, contrast, power/icon control,
    /// follower control, display on, clear, return home, entry mode) as a
    /// single transaction and waits for the controller to settle.
    pub fn init(mut self) -> Result<Self, Error<I::Error, P::Error>> {
        self.reset.set_low().map_err(Error::ResetPin)?;
        self.delay.delay_ms(1);
        self.reset.set_high().map_err(Error::ResetPin)?;
        self.delay.delay_ms(1);

        self.i2c
            .write(self.address, &INIT_SEQUENCE)
            .map_err(Error::I2c)?;
        self.delay.delay_ms(1);
        Ok(self)
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), Error<I::Error, P::Error>> {
        self.i2c.write(self.address, frame).map_err(Error::I2c)
    }

    fn command(&mut self, cmd: u8) -> Result<(), Error<I::Error, P::Error>> {
        self.send(&[Mode::Cmd as u8, cmd])
    }

    /// Clear the display. The cursor returns to (0, 0) and the shadow buffer
    /// is blanked to match the now empty screen.
    pub fn clear(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        let sent = self.command(Commands::Clear as u8);
        self.cursor = CursorPosition::HOME;
        self.buffer.reset();
        // The controller needs settle time after a clear.
        self.delay.delay_ms(1);
        sent
    }

    /// Return the cursor to (0, 0) without touching display content.
    pub fn return_home(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        let sent = self.command(Commands::ReturnHome as u8);
        self.cursor = CursorPosition::HOME;
        sent
    }

    /// Show or hide the cursor indicator. Does not move the cursor.
    pub fn set_cursor_visible(&mut self, visible: bool) -> Result<(), Error<I::Error, P::Error>> {
        let ctrl = if visible {
            DisplayControl::AllOn
        } else {
            DisplayControl::CursorOff
        };
        self.command(ctrl as u8)
    }

    /// Switch the whole display on or off. Content and cursor state survive.
    pub fn set_display_visible(&mut self, visible: bool) -> Result<(), Error<I::Error, P::Error>> {
        let ctrl = if visible {
            DisplayControl::AllOn
        } else {
            DisplayControl::DisplayOff
        };
        self.command(ctrl as u8)
    }

    /// Move the cursor to (column, row). Out-of-range coordinates are clamped
    /// to the 40x2 grid instead of being rejected.
    ///
    /// The command carries both halves of the controller's split address
    /// space: the secondary field where row 1 starts at 0x27 and the DDRAM
    /// address where row 1 starts at 0x40.
    pub fn set_position(&mut self, column: i8, row: i8) -> Result<(), Error<I::Error, P::Error>> {
        let target = CursorPosition::clamped(column, row);
        let sent = self.send(&[
            Mode::Cmd as u8,
            Commands::FunctionSet as u8,
            Commands::SetCgramAddr as u8 + target.cgram_offset(),
            Commands::SetDdramAddr as u8 + target.ddram_offset(),
        ]);
        self.cursor = target;
        sent
    }

    /// Move the cursor within the current line.
    pub fn set_column(&mut self, column: i8) -> Result<(), Error<I::Error, P::Error>> {
        let row = self.cursor.row as i8;
        self.set_position(column, row)
    }

    /// Jump to the start of the second line.
    ///
    /// Always targets row 1; it never toggles back to row 0.
    pub fn advance_line(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        let sent = self.send(&[
            Mode::Cmd as u8,
            Commands::FunctionSet as u8,
            Commands::SetCgramAddr as u8,
            Commands::SetDdramAddr as u8 + 0x40,
        ]);
        self.cursor = CursorPosition { column: 0, row: 1 };
        sent
    }

    /// Shift the cursor by `n` single steps, one transaction per step.
    ///
    /// The logical position follows with wraparound: past column 39 onto the
    /// other row, and from the first cell back to the last.
    pub fn shift_cursor(
        &mut self,
        n: u8,
        direction: ShiftDirection,
    ) -> Result<(), Error<I::Error, P::Error>> {
        let code = match direction {
            ShiftDirection::Left => ShiftCode::CursorLeft,
            ShiftDirection::Right => ShiftCode::CursorRight,
        };
        let sent = self.shift_steps(n, code);
        let steps = match direction {
            ShiftDirection::Left => -(n as i16),
            ShiftDirection::Right => n as i16,
        };
        self.cursor = self.cursor.offset_by(steps);
        sent
    }

    /// Shift the visible window by `n` single steps, one transaction per step.
    /// The logical cursor stays where it is.
    pub fn shift_display(
        &mut self,
        n: u8,
        direction: ShiftDirection,
    ) -> Result<(), Error<I::Error, P::Error>> {
        let code = match direction {
            ShiftDirection::Left => ShiftCode::DisplayLeft,
            ShiftDirection::Right => ShiftCode::DisplayRight,
        };
        self.shift_steps(n, code)
    }

    fn shift_steps(&mut self, n: u8, code: ShiftCode) -> Result<(), Error<I::Error, P::Error>> {
        let mut sent = Ok(());
        for _ in 0..n {
            if let Err(e) = self.send(&[Mode::Cmd as u8, Commands::FunctionSet as u8, code as u8]) {
                sent = Err(e);
            }
        }
        sent
    }

    /// Select the entry mode applied after each character write.
    pub fn set_auto_shift(&mut self, mode: AutoShift) -> Result<(), Error<I::Error, P::Error>> {
        self.command(mode as u8)
    }

    /// Write a string starting at the current cursor position, one transaction.
    ///
    /// Payloads longer than [`MAX_PAYLOAD`](crate::MAX_PAYLOAD) characters are
    /// silently truncated. Every transmitted character lands in the shadow
    /// buffer and advances the cursor with wraparound, also when the bus
    /// reports a failure.
    pub fn write_str(&mut self, text: &str) -> Result<(), Error<I::Error, P::Error>> {
        let bytes = text.as_bytes();
        let len = bytes.len().min(MAX_PAYLOAD);

        let mut frame = [0u8; MAX_PAYLOAD + 1];
        frame[0] = Mode::Data as u8;
        frame[1..=len].copy_from_slice(&bytes[..len]);
        let sent = self.i2c
            .write(self.address, &frame[..=len])
            .map_err(Error::I2c);

        for &byte in &bytes[..len] {
            self.buffer.set(self.cursor, byte);
            self.cursor = self.cursor.offset_by(1);
        }
        sent
    }

    /// Last character known to occupy (column, row), without a bus transaction.
    /// Out-of-range coordinates are clamped. Cells never written read as `'\0'`.
    pub fn read_at(&self, column: i8, row: i8) -> char {
        self.buffer.get(CursorPosition::clamped(column, row)) as char
    }

    /// Last character known to occupy the cell under the cursor.
    pub fn read_current(&self) -> char {
        self.buffer.get(self.cursor) as char
    }

    /// Current logical cursor position.
    pub fn position(&self) -> CursorPosition {
        self.cursor
    }
}

impl<'a, I, P, D> uWrite for Lcd<'a, I, P, D>
where
    I: I2c,
    P: OutputPin,
    D: DelayNs,
{
    type Error = Error<I::Error, P::Error>;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.write_str(s)
    }
}
