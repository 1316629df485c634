use embedded_hal::digital::OutputPin;
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

use crate::{
    AutoShift, Commands, CursorPosition, DisplayControl, Error, Mode, ShiftCode, ShiftDirection,
    TextBuffer, INIT_SEQUENCE, MAX_PAYLOAD,
};

/// API to drive the LCD, async mirror of [`sync_lcd::Lcd`](crate::sync_lcd::Lcd).
///
/// The reset line stays a blocking pin; only the bus and the delays are async.
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

    /// Initializes the hardware: reset pulse, then the whole power-up command
    /// sequence as a single transaction.
    pub async fn init(mut self) -> Result<Self, Error<I::Error, P::Error>> {
        self.reset.set_low().map_err(Error::ResetPin)?;
        self.delay.delay_ms(1).await;
        self.reset.set_high().map_err(Error::ResetPin)?;
        self.delay.delay_ms(1).await;

        self.i2c
            .write(self.address, &INIT_SEQUENCE)
            .await
            .map_err(Error::I2c)?;
        self.delay.delay_ms(1).await;
        Ok(self)
    }

    async fn send(&mut self, frame: &[u8]) -> Result<(), Error<I::Error, P::Error>> {
        self.i2c
            .write(self.address, frame)
            .await
            .map_err(Error::I2c)
    }

    async fn command(&mut self, cmd: u8) -> Result<(), Error<I::Error, P::Error>> {
        self.send(&[Mode::Cmd as u8, cmd]).await
    }

    /// Clear the display, blank the shadow buffer and return the cursor to (0, 0).
    pub async fn clear(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        let sent = self.command(Commands::Clear as u8).await;
        self.cursor = CursorPosition::HOME;
        self.buffer.reset();
        self.delay.delay_ms(1).await;
        sent
    }

    /// Return the cursor to (0, 0) without touching display content.
    pub async fn return_home(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        let sent = self.command(Commands::ReturnHome as u8).await;
        self.cursor = CursorPosition::HOME;
        sent
    }

    /// Show or hide the cursor indicator.
    pub async fn set_cursor_visible(
        &mut self,
        visible: bool,
    ) -> Result<(), Error<I::Error, P::Error>> {
        let ctrl = if visible {
            DisplayControl::AllOn
        } else {
            DisplayControl::CursorOff
        };
        self.command(ctrl as u8).await
    }

    /// Switch the whole display on or off.
    pub async fn set_display_visible(
        &mut self,
        visible: bool,
    ) -> Result<(), Error<I::Error, P::Error>> {
        let ctrl = if visible {
            DisplayControl::AllOn
        } else {
            DisplayControl::DisplayOff
        };
        self.command(ctrl as u8).await
    }

    /// Move the cursor to (column, row), clamping out-of-range coordinates.
    pub async fn set_position(
        &mut self,
        column: i8,
        row: i8,
    ) -> Result<(), Error<I::Error, P::Error>> {
        let target = CursorPosition::clamped(column, row);
        let sent = self
            .send(&[
                Mode::Cmd as u8,
                Commands::FunctionSet as u8,
                Commands::SetCgramAddr as u8 + target.cgram_offset(),
                Commands::SetDdramAddr as u8 + target.ddram_offset(),
            ])
            .await;
        self.cursor = target;
        sent
    }

    /// Move the cursor within the current line.
    pub async fn set_column(&mut self, column: i8) -> Result<(), Error<I::Error, P::Error>> {
        let row = self.cursor.row as i8;
        self.set_position(column, row).await
    }

    /// Jump to the start of the second line. Never toggles back to row 0.
    pub async fn advance_line(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        let sent = self
            .send(&[
                Mode::Cmd as u8,
                Commands::FunctionSet as u8,
                Commands::SetCgramAddr as u8,
                Commands::SetDdramAddr as u8 + 0x40,
            ])
            .await;
        self.cursor = CursorPosition { column: 0, row: 1 };
        sent
    }

    /// Shift the cursor by `n` single steps, one transaction per step, with
    /// wraparound of the logical position.
    pub async fn shift_cursor(
        &mut self,
        n: u8,
        direction: ShiftDirection,
    ) -> Result<(), Error<I::Error, P::Error>> {
        let code = match direction {
            ShiftDirection::Left => ShiftCode::CursorLeft,
            ShiftDirection::Right => ShiftCode::CursorRight,
        };
        let sent = self.shift_steps(n, code).await;
        let steps = match direction {
            ShiftDirection::Left => -(n as i16),
            ShiftDirection::Right => n as i16,
        };
        self.cursor = self.cursor.offset_by(steps);
        sent
    }

    /// Shift the visible window by `n` single steps; the cursor stays put.
    pub async fn shift_display(
        &mut self,
        n: u8,
        direction: ShiftDirection,
    ) -> Result<(), Error<I::Error, P::Error>> {
        let code = match direction {
            ShiftDirection::Left => ShiftCode::DisplayLeft,
            ShiftDirection::Right => ShiftCode::DisplayRight,
        };
        self.shift_steps(n, code).await
    }

    async fn shift_steps(
        &mut self,
        n: u8,
        code: ShiftCode,
    ) -> Result<(), Error<I::Error, P::Error>> {
        let mut sent = Ok(());
        for _ in 0..n {
            if let Err(e) = self
                .send(&[Mode::Cmd as u8, Commands::FunctionSet as u8, code as u8])
                .await
            {
                sent = Err(e);
            }
        }
        sent
    }

    /// Select the entry mode applied after each character write.
    pub async fn set_auto_shift(&mut self, mode: AutoShift) -> Result<(), Error<I::Error, P::Error>> {
        self.command(mode as u8).await
    }

    /// Write a string starting at the current cursor position, one transaction,
    /// truncated to [`MAX_PAYLOAD`](crate::MAX_PAYLOAD) characters. Shadow buffer
    /// and cursor advance also when the bus reports a failure.
    pub async fn write_str(&mut self, text: &str) -> Result<(), Error<I::Error, P::Error>> {
        let bytes = text.as_bytes();
        let len = bytes.len().min(MAX_PAYLOAD);

        let mut frame = [0u8; MAX_PAYLOAD + 1];
        frame[0] = Mode::Data as u8;
        frame[1..=len].copy_from_slice(&bytes[..len]);
        let sent = self
            .i2c
            .write(self.address, &frame[..=len])
            .await
            .map_err(Error::I2c);

        for &byte in &bytes[..len] {
            self.buffer.set(self.cursor, byte);
            self.cursor = self.cursor.offset_by(1);
        }
        sent
    }

    /// Last character known to occupy (column, row); out-of-range coordinates
    /// are clamped.
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
