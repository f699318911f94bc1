//! Byte-level command/data exchange with the panel controller.
//!
//! `Transport` is the capability set the panel driver needs from the board:
//! one SPI peripheral and four GPIO lines (CS, D/C, RST, BUSY). The crate
//! never constructs these from board-specific pin types itself -- that
//! wiring is the caller's job, same as `DisplayInterface::new` in the
//! reference driver took already-configured peripherals rather than pin
//! numbers.

use std::time::{Duration, Instant};

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::error::{EpdError, Result};

/// Capability set required by `Ssd1680` from the board.
///
/// A mock implementation recording every call is used throughout this
/// crate's own test suite; hardware users implement this once over
/// `embedded-hal` peripherals via `SpiTransport`.
pub trait Transport {
    /// Send a command byte, optionally followed by data bytes.
    fn write_command(&mut self, cmd: u8, data: &[u8]) -> Result<()>;

    /// Read `len` bytes from a register. Transports without a MISO line
    /// (the canonical MagTag wiring) must return
    /// `Err(EpdError::Unsupported { feature: "read_data" })` rather than a
    /// plausible-looking bogus value.
    fn read_data(&mut self, cmd: u8, len: usize) -> Result<Vec<u8>>;

    /// Toggle the RST line: low for `pulse`, then high for `recovery`.
    fn hardware_reset(&mut self, pulse: Duration, recovery: Duration) -> Result<()>;

    /// Block until BUSY deasserts or `timeout` elapses.
    ///
    /// Returns the time actually spent waiting. `operation` names the
    /// caller for inclusion in a `Timeout` error.
    fn wait_ready(&mut self, timeout: Duration, operation: &'static str) -> Result<Duration>;
}

/// `embedded-hal`-backed `Transport` over a real SPI bus and four GPIO
/// lines.
///
/// Mirrors the reference crate's `DisplayInterface`: command bytes are
/// written with D/C low, data bytes with D/C high, each inside its own
/// CS-low/CS-high bracket. Busy-polling uses no inter-poll delay, matching
/// the reference crate's `wait_until_idle` (its comment notes the delay
/// was measured and removed as unnecessary).
pub struct SpiTransport<SPI, CS, DC, RST, BUSY> {
    spi: SPI,
    cs: CS,
    dc: DC,
    rst: RST,
    busy: BUSY,
    busy_is_high_when_busy: bool,
    has_miso: bool,
}

impl<SPI, CS, DC, RST, BUSY> SpiTransport<SPI, CS, DC, RST, BUSY>
where
    SPI: SpiDevice,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
{
    /// Build a transport over already-configured peripherals.
    ///
    /// `has_miso` should be `false` for the canonical MagTag wiring, which
    /// has no MISO line; `read_data` then eagerly fails with
    /// `Unsupported` instead of returning a bogus value (Open Question 4).
    pub fn new(spi: SPI, cs: CS, dc: DC, rst: RST, busy: BUSY, has_miso: bool) -> Self {
        Self {
            spi,
            cs,
            dc,
            rst,
            busy,
            busy_is_high_when_busy: true,
            has_miso,
        }
    }

    fn is_busy(&mut self) -> Result<bool> {
        let level = if self.busy_is_high_when_busy {
            self.busy.is_high()
        } else {
            self.busy.is_low()
        };
        level.map_err(|_| EpdError::Io(std::io::Error::other("busy pin read failed")))
    }

    fn write(&mut self, dc_high: bool, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.dc
            .set_state(if dc_high {
                embedded_hal::digital::PinState::High
            } else {
                embedded_hal::digital::PinState::Low
            })
            .map_err(|_| EpdError::Io(std::io::Error::other("dc pin set failed")))?;
        self.cs
            .set_low()
            .map_err(|_| EpdError::Io(std::io::Error::other("cs pin set failed")))?;
        let result = self
            .spi
            .write(data)
            .map_err(|_| EpdError::Io(std::io::Error::other("spi write failed")));
        self.cs
            .set_high()
            .map_err(|_| EpdError::Io(std::io::Error::other("cs pin set failed")))?;
        result
    }
}

impl<SPI, CS, DC, RST, BUSY> Transport for SpiTransport<SPI, CS, DC, RST, BUSY>
where
    SPI: SpiDevice,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
{
    fn write_command(&mut self, cmd: u8, data: &[u8]) -> Result<()> {
        self.write(false, &[cmd])?;
        self.write(true, data)
    }

    fn read_data(&mut self, cmd: u8, len: usize) -> Result<Vec<u8>> {
        if !self.has_miso {
            return Err(EpdError::Unsupported {
                feature: "read_data",
            });
        }
        self.write(false, &[cmd])?;
        self.dc
            .set_high()
            .map_err(|_| EpdError::Io(std::io::Error::other("dc pin set failed")))?;
        self.cs
            .set_low()
            .map_err(|_| EpdError::Io(std::io::Error::other("cs pin set failed")))?;
        let mut buf = vec![0u8; len + 1];
        let result = self
            .spi
            .transfer_in_place(&mut buf)
            .map_err(|_| EpdError::Io(std::io::Error::other("spi read failed")));
        self.cs
            .set_high()
            .map_err(|_| EpdError::Io(std::io::Error::other("cs pin set failed")))?;
        result?;
        // First byte read back is dummy data (datasheet convention).
        Ok(buf[1..].to_vec())
    }

    fn hardware_reset(&mut self, pulse: Duration, recovery: Duration) -> Result<()> {
        self.rst
            .set_low()
            .map_err(|_| EpdError::Io(std::io::Error::other("rst pin set failed")))?;
        std::thread::sleep(pulse);
        self.rst
            .set_high()
            .map_err(|_| EpdError::Io(std::io::Error::other("rst pin set failed")))?;
        std::thread::sleep(recovery);
        Ok(())
    }

    fn wait_ready(&mut self, timeout: Duration, operation: &'static str) -> Result<Duration> {
        let start = Instant::now();
        while self.is_busy()? {
            if start.elapsed() > timeout {
                return Err(EpdError::Timeout { operation });
            }
        }
        Ok(start.elapsed())
    }
}
