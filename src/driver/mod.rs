//! The SSD1680 panel driver: refresh state machine, differential-update
//! engine, and power/wake transitions.

pub mod command;
pub mod constants;
pub mod state;

use std::time::Duration;

use bit_field::BitField;

use crate::error::{EpdError, Result};
use crate::transport::Transport;
use command::Command;
use constants::*;
use state::DriverState;

/// No-ops unless the `log` feature is enabled, so call sites never need
/// to be cfg-gated individually.
macro_rules! log_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!($($arg)*);
    };
}
macro_rules! log_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::debug!($($arg)*);
    };
}
macro_rules! log_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::warn!($($arg)*);
    };
}

/// Decoded `STATUS` register contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBits {
    /// High-voltage rail ready.
    pub hv_ready: bool,
    /// VCI level detector passed.
    pub vci_ok: bool,
    /// Controller reports busy.
    pub busy: bool,
    /// Chip ID field; must equal `0x01` for SSD1680.
    pub chip_id: u8,
}

/// One region to write in a batched `display_regions` call.
#[derive(Debug, Clone, Copy)]
pub struct RegionUpdate<'a> {
    /// Packed 1-bit pixel data for the region, row-major MSB-first.
    pub data: &'a [u8],
    /// Physical X origin, must be a multiple of 8.
    pub x: usize,
    /// Physical Y origin.
    pub y: usize,
    /// Physical width, must be a multiple of 8.
    pub w: usize,
    /// Physical height.
    pub h: usize,
}

/// The capability set `Canvas` depends on: everything the façade needs
/// from a panel driver, independent of the concrete controller.
pub trait DisplayDriver {
    /// Bring the panel out of reset into a known state; optionally clear
    /// to white and sleep.
    fn init(&mut self, clear: bool) -> Result<()>;

    /// Push a full 1-bit frame and refresh, full or partial.
    fn display(
        &mut self,
        frame: &[u8],
        full: bool,
        force_full: bool,
        stay_awake: bool,
    ) -> Result<f64>;

    /// Push a 2-bit (4-gray) frame split into black/red planes.
    fn display_gray(&mut self, bw_plane: &[u8], red_plane: &[u8]) -> Result<f64>;

    /// Like `display_gray` but with a caller-supplied waveform and
    /// voltages.
    fn display_lut(
        &mut self,
        lut: &[u8; LUT_LEN],
        bw: &[u8],
        red: Option<&[u8]>,
        voltages: Voltages,
    ) -> Result<f64>;

    /// Partial update of a single region.
    fn display_region(&mut self, data: &[u8], x: usize, y: usize, w: usize, h: usize)
        -> Result<f64>;

    /// Partial update of several regions, single activation.
    fn display_regions(&mut self, regions: &[RegionUpdate<'_>]) -> Result<f64>;

    /// Enter deep sleep.
    fn sleep(&mut self, retain_ram: bool) -> Result<()>;

    /// Hardware-reset out of deep sleep.
    fn wake(&mut self) -> Result<()>;

    /// Hardware-accelerated solid fill without streaming a full frame.
    fn fast_clear(&mut self, color_byte: u8) -> Result<()>;

    /// Toggle hardware display inversion.
    fn set_invert(&mut self, invert_bw: bool, invert_red: bool) -> Result<()>;

    /// Read the panel's internal temperature sensor, in °C.
    fn read_temperature(&mut self) -> Result<f32>;

    /// Read temperature and whether it's within the operating envelope.
    fn check_temperature(&mut self) -> Result<(f32, bool)>;

    /// Read and decode the `STATUS` register.
    fn read_status(&mut self) -> Result<StatusBits>;

    /// Current consecutive-partial-refresh count.
    fn partial_count(&self) -> u32;
    /// Overwrite the consecutive-partial-refresh count.
    fn set_partial_count(&mut self, value: u32);
    /// Current auto-escalation threshold (0 = disabled).
    fn partial_threshold(&self) -> u32;
    /// Change the auto-escalation threshold.
    fn set_partial_threshold(&mut self, value: u32);
    /// Whether the panel is currently in deep sleep.
    fn is_sleeping(&self) -> bool;
}

/// Concrete SSD1680 driver for the 296x128 panel.
///
/// Owns its `Transport` and `DriverState`; optionally keeps a `prev_frame`
/// differential buffer so region updates can precompute the RED-RAM write
/// from the last committed image. `prev_frame` is exclusively owned here
/// and never exposed.
pub struct Ssd1680<T> {
    transport: T,
    state: DriverState,
    prev_frame: Option<Vec<u8>>,
    /// Cached first `UPDATE_CTRL1` byte (inversion bits), preserved across
    /// writes so `set_invert` never clobbers the other bit (Open
    /// Question 1).
    update_ctrl1_byte: u8,
}

impl<T: Transport> Ssd1680<T> {
    /// Build a driver over `transport`. `use_diff_buffer` controls whether
    /// a `prev_frame` differential buffer is allocated; disabling it saves
    /// `FRAME_BYTES_1BIT` of RAM at the cost of not being able to
    /// precompute RED-RAM writes for partial updates (the full `frame` is
    /// still always written to BW RAM).
    pub fn new(transport: T, use_diff_buffer: bool) -> Self {
        Self {
            transport,
            state: DriverState::new(),
            prev_frame: use_diff_buffer.then(|| vec![0xFFu8; FRAME_BYTES_1BIT]),
            update_ctrl1_byte: 0x00,
        }
    }

    /// Access the refresh state machine (read-only; driver-internal
    /// transitions are the only way to mutate it).
    pub fn state(&self) -> &DriverState {
        &self.state
    }

    fn cmd(&mut self, c: Command, data: &[u8]) -> Result<()> {
        log_trace!("cmd {:#04x} ({} data bytes)", c.address(), data.len());
        self.transport.write_command(c.address(), data)
    }

    fn wait(&mut self, timeout: Duration, op: &'static str) -> Result<Duration> {
        self.transport.wait_ready(timeout, op)
    }

    fn hw_reset(&mut self) -> Result<()> {
        self.transport.hardware_reset(RESET_PULSE, RESET_RECOVERY)
    }

    fn set_ram_window(&mut self, x_byte_start: u8, x_byte_end: u8, y_start: u16, y_end: u16) -> Result<()> {
        self.cmd(Command::RAM_X, &[x_byte_start, x_byte_end])?;
        self.cmd(
            Command::RAM_Y,
            &[
                (y_start & 0xFF) as u8,
                (y_start >> 8) as u8,
                (y_end & 0xFF) as u8,
                (y_end >> 8) as u8,
            ],
        )
    }

    fn set_ram_counter(&mut self, x_byte: u8, y: u16) -> Result<()> {
        self.cmd(Command::RAM_X_CNT, &[x_byte])?;
        self.cmd(Command::RAM_Y_CNT, &[(y & 0xFF) as u8, (y >> 8) as u8])
    }

    fn write_update_ctrl1(&mut self) -> Result<()> {
        self.cmd(Command::UPDATE_CTRL1, &[self.update_ctrl1_byte, 0x80])
    }

    /// Full-mode init (§4.2.1). No-op if already `Ready` and not
    /// partial-windowed.
    fn init_full(&mut self) -> Result<()> {
        if self.state.is_ready() && !self.state.in_partial_mode() {
            return Ok(());
        }
        if self.state.is_sleeping() {
            self.hw_reset()?;
        }
        self.wait(TIMEOUT_SIMPLE, "init_full:pre")?;
        self.cmd(Command::SW_RESET, &[])?;
        self.wait(TIMEOUT_SIMPLE, "init_full:sw_reset")?;

        let h_minus_1 = (PHYS_H - 1) as u16;
        self.cmd(
            Command::DRIVER_OUTPUT,
            &[(h_minus_1 & 0xFF) as u8, (h_minus_1 >> 8) as u8, 0x00],
        )?;
        self.cmd(Command::DATA_ENTRY, &[DATA_ENTRY_XY_INC])?;
        self.set_ram_window(0, (PHYS_W / 8 - 1) as u8, 0, h_minus_1)?;
        self.cmd(Command::BORDER, &[BORDER_FULL])?;
        self.update_ctrl1_byte = 0x00;
        self.write_update_ctrl1()?;
        self.cmd(Command::TEMP_SENSOR, &[0x80])?;
        self.cmd(Command::SOFT_START, &SOFT_START_BYTES)?;
        self.set_ram_counter(0, 0)?;
        self.wait(TIMEOUT_SIMPLE, "init_full:post")?;

        self.state.set_in_partial_mode(false);
        self.state.on_init_complete();
        Ok(())
    }

    /// Partial-mode init (§4.2.1), windowed to `(x, y, w, h)` in physical
    /// pixel coordinates.
    fn init_partial(&mut self, x: usize, y: usize, w: usize, h: usize) -> Result<()> {
        let x_byte_start = (x / 8) as u8;
        let x_byte_end = ((x + w) / 8 - 1) as u8;
        let y_start = y as u16;
        let y_end = (y + h - 1) as u16;

        if self.state.in_partial_mode() && !self.state.is_sleeping() && self.state.is_ready() {
            self.set_ram_window(x_byte_start, x_byte_end, y_start, y_end)?;
            return Ok(());
        }

        if self.state.is_ready() {
            self.cmd(Command::BORDER, &[BORDER_PARTIAL])?;
            self.set_ram_window(x_byte_start, x_byte_end, y_start, y_end)?;
            self.state.set_in_partial_mode(true);
            return Ok(());
        }

        self.hw_reset()?;
        self.wait(TIMEOUT_SIMPLE, "init_partial:pre")?;

        let h_minus_1 = (PHYS_H - 1) as u16;
        self.cmd(
            Command::DRIVER_OUTPUT,
            &[(h_minus_1 & 0xFF) as u8, (h_minus_1 >> 8) as u8, 0x00],
        )?;
        self.cmd(Command::DATA_ENTRY, &[DATA_ENTRY_XY_INC])?;
        self.cmd(Command::BORDER, &[BORDER_PARTIAL])?;
        self.write_update_ctrl1()?;
        self.cmd(Command::TEMP_SENSOR, &[0x80])?;
        self.cmd(Command::SOFT_START, &SOFT_START_BYTES)?;
        self.set_ram_window(x_byte_start, x_byte_end, y_start, y_end)?;

        self.state.on_init_complete();
        self.state.set_in_partial_mode(true);
        Ok(())
    }

    fn write_lut_and_voltages(&mut self, lut: &[u8; LUT_LEN], voltages: Voltages) -> Result<()> {
        self.cmd(Command::LUT, lut)?;
        self.cmd(Command::VGH, &[voltages.vgh])?;
        self.cmd(Command::VSH_VSL, &[voltages.vsh1, voltages.vsh2, voltages.vsl])?;
        self.cmd(Command::VCOM, &[voltages.vcom])
    }

    fn activate_and_wait(&mut self, seq: u8, timeout: Duration, op: &'static str) -> Result<Duration> {
        self.cmd(Command::UPDATE_CTRL2, &[seq])?;
        self.cmd(Command::ACTIVATE, &[])?;
        self.wait(timeout, op)
    }

    fn display_full(
        &mut self,
        frame: &[u8],
        lut: Option<(&[u8; LUT_LEN], Voltages)>,
        stay_awake: bool,
    ) -> Result<f64> {
        if frame.len() != FRAME_BYTES_1BIT {
            return Err(EpdError::InvalidArgument {
                what: "frame length must equal FRAME_BYTES_1BIT",
            });
        }
        self.init_full()?;
        if let Some((lut, voltages)) = lut {
            self.write_lut_and_voltages(lut, voltages)?;
        }
        self.cmd(Command::RAM_BW, frame)?;
        self.cmd(Command::RAM_RED, frame)?;

        let seq = if lut.is_some() { SEQ_CUSTOM_LUT } else { SEQ_FULL };
        let waited = self.activate_and_wait(seq, TIMEOUT_FULL, "display_full")?;

        self.state.on_full_refresh_complete();
        if lut.is_some() {
            self.state.invalidate_basemap();
        }
        if let Some(prev) = &mut self.prev_frame {
            prev.copy_from_slice(frame);
        }
        if !stay_awake {
            self.sleep(true)?;
        }
        Ok(waited.as_secs_f64())
    }

    fn display_partial(
        &mut self,
        frame: &[u8],
        lut: Option<(&[u8; LUT_LEN], Voltages)>,
        force_full: bool,
        stay_awake: bool,
    ) -> Result<f64> {
        if self.state.needs_full_refresh() || force_full {
            log_debug!(
                "escalating to full refresh (needs_full_refresh={}, force_full={})",
                self.state.needs_full_refresh(),
                force_full
            );
            return self.display_full(frame, lut, stay_awake);
        }
        log_debug!("partial refresh, count={}", self.state.partial_count());
        if frame.len() != FRAME_BYTES_1BIT {
            return Err(EpdError::InvalidArgument {
                what: "frame length must equal FRAME_BYTES_1BIT",
            });
        }

        self.init_partial(0, 0, PHYS_W, PHYS_H)?;
        self.set_ram_window(0, (PHYS_W / 8 - 1) as u8, 0, (PHYS_H - 1) as u16)?;

        if let Some((lut, voltages)) = lut {
            self.write_lut_and_voltages(lut, voltages)?;
        }
        if let Some(prev) = &self.prev_frame {
            let prev = prev.clone();
            self.cmd(Command::RAM_RED, &prev)?;
        }
        self.cmd(Command::RAM_BW, frame)?;

        let seq = if lut.is_some() { SEQ_CUSTOM_LUT } else { SEQ_PARTIAL };
        let waited = self.activate_and_wait(seq, TIMEOUT_PARTIAL, "display_partial")?;

        if let Some(prev) = &mut self.prev_frame {
            prev.copy_from_slice(frame);
        }
        self.state.on_partial_refresh_complete();
        if !stay_awake {
            self.sleep(true)?;
        }
        Ok(waited.as_secs_f64())
    }

    /// Read the low-level OTP display/user-ID registers. Supplemental
    /// diagnostic, not part of the façade surface.
    pub fn read_otp_info(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        let display = self.transport.read_data(Command::OTP_DISPLAY.address(), 1)?;
        let user_id = self.transport.read_data(Command::OTP_USER_ID.address(), 11)?;
        Ok((display, user_id))
    }

    /// CRC-16/CCITT-FALSE of `data`, used internally to sanity-check
    /// caller-supplied LUT bytes before writing them to the panel.
    /// Supplemental helper carried over from the reference implementation;
    /// not part of the façade surface.
    pub fn calculate_crc(data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &byte in data {
            crc ^= (byte as u16) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x1021
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    /// Write the gate-scan start offset register. Supplemental low-level
    /// control not exercised by any `Canvas` path for the 296x128 panel
    /// (gate start is always 0 here), provided for advanced callers and
    /// driver-level tests.
    pub fn set_gate_start(&mut self, position: u16) -> Result<()> {
        self.cmd(
            Command::DRIVER_OUTPUT,
            &[
                ((PHYS_H - 1) & 0xFF) as u8,
                ((PHYS_H - 1) >> 8) as u8,
                (position & 0x01) as u8,
            ],
        )
    }
}

impl<T: Transport> DisplayDriver for Ssd1680<T> {
    fn init(&mut self, clear: bool) -> Result<()> {
        log_debug!("init(clear={clear})");
        self.init_full()?;
        if clear {
            let white = vec![0xFFu8; FRAME_BYTES_1BIT];
            self.display_full(&white, None, false)?;
        }
        Ok(())
    }

    fn display(
        &mut self,
        frame: &[u8],
        full: bool,
        force_full: bool,
        stay_awake: bool,
    ) -> Result<f64> {
        if full {
            self.display_full(frame, None, stay_awake)
        } else {
            self.display_partial(frame, None, force_full, stay_awake)
        }
    }

    fn display_gray(&mut self, bw_plane: &[u8], red_plane: &[u8]) -> Result<f64> {
        self.display_lut(&LUT_4GRAY, bw_plane, Some(red_plane), Voltages::default())
    }

    fn display_lut(
        &mut self,
        lut: &[u8; LUT_LEN],
        bw: &[u8],
        red: Option<&[u8]>,
        voltages: Voltages,
    ) -> Result<f64> {
        if bw.len() != FRAME_BYTES_1BIT {
            return Err(EpdError::InvalidArgument {
                what: "bw plane length must equal FRAME_BYTES_1BIT",
            });
        }
        self.init_full()?;
        self.write_lut_and_voltages(lut, voltages)?;
        self.cmd(Command::RAM_BW, bw)?;
        match red {
            Some(red) => {
                if red.len() != FRAME_BYTES_1BIT {
                    return Err(EpdError::InvalidArgument {
                        what: "red plane length must equal FRAME_BYTES_1BIT",
                    });
                }
                self.cmd(Command::RAM_RED, red)?;
            }
            None => self.cmd(Command::RAM_RED, bw)?,
        }
        let waited = self.activate_and_wait(SEQ_CUSTOM_LUT, TIMEOUT_FULL, "display_lut")?;
        self.state.on_full_refresh_complete();
        self.state.invalidate_basemap();
        if let Some(prev) = &mut self.prev_frame {
            prev.copy_from_slice(bw);
        }
        Ok(waited.as_secs_f64())
    }

    fn display_region(
        &mut self,
        data: &[u8],
        x: usize,
        y: usize,
        w: usize,
        h: usize,
    ) -> Result<f64> {
        self.display_regions(&[RegionUpdate { data, x, y, w, h }])
    }

    fn display_regions(&mut self, regions: &[RegionUpdate<'_>]) -> Result<f64> {
        if !self.state.has_basemap() {
            return Err(EpdError::NotReady {
                reason: "display_regions requires a basemap; run a full refresh first",
            });
        }
        for r in regions {
            if r.x % 8 != 0 || r.w % 8 != 0 {
                return Err(EpdError::InvalidArgument {
                    what: "region x and w must be multiples of 8",
                });
            }
            let expected = r.w / 8 * r.h;
            if r.data.len() != expected {
                return Err(EpdError::InvalidArgument {
                    what: "region data length must equal (w/8)*h",
                });
            }
        }
        if regions.is_empty() {
            return Ok(0.0);
        }

        let first = &regions[0];
        self.init_partial(first.x, first.y, first.w, first.h)?;

        let stride = PHYS_W / 8;
        for r in regions {
            let x_byte_start = (r.x / 8) as u8;
            let x_byte_end = ((r.x + r.w) / 8 - 1) as u8;
            let y_start = r.y as u16;
            let y_end = (r.y + r.h - 1) as u16;
            self.set_ram_window(x_byte_start, x_byte_end, y_start, y_end)?;

            if let Some(prev) = &self.prev_frame {
                let row_bytes = r.w / 8;
                let mut stale = Vec::with_capacity(row_bytes * r.h);
                for row in 0..r.h {
                    let off = (r.y + row) * stride + r.x / 8;
                    stale.extend_from_slice(&prev[off..off + row_bytes]);
                }
                self.cmd(Command::RAM_RED, &stale)?;

                let prev = self.prev_frame.as_mut().unwrap();
                let row_bytes = r.w / 8;
                for row in 0..r.h {
                    let off = (r.y + row) * stride + r.x / 8;
                    let src_off = row * row_bytes;
                    prev[off..off + row_bytes]
                        .copy_from_slice(&r.data[src_off..src_off + row_bytes]);
                }

                // The RED write advanced the counters; they must be reset
                // before the BW write.
                log_warn!("resetting RAM counters after RED-plane write for region at ({}, {})", r.x, r.y);
                self.set_ram_counter(x_byte_start, y_start)?;
            }

            self.cmd(Command::RAM_BW, r.data)?;
        }

        let waited = self.activate_and_wait(SEQ_PARTIAL, TIMEOUT_PARTIAL, "display_regions")?;
        self.state.on_partial_refresh_complete();
        Ok(waited.as_secs_f64())
    }

    fn sleep(&mut self, retain_ram: bool) -> Result<()> {
        log_debug!("sleep(retain_ram={retain_ram})");
        self.activate_and_wait(SEQ_POWER_OFF, TIMEOUT_POWER, "sleep:power_off")?;
        let mode = if retain_ram { SLEEP_RETAIN } else { SLEEP_DISCARD };
        self.cmd(Command::DEEP_SLEEP, &[mode])?;
        std::thread::sleep(SLEEP_SETTLE);
        self.state.on_sleep(retain_ram);
        Ok(())
    }

    fn wake(&mut self) -> Result<()> {
        log_debug!("wake");
        self.hw_reset()?;
        self.state.on_wake();
        Ok(())
    }

    fn fast_clear(&mut self, color_byte: u8) -> Result<()> {
        self.init_full()?;
        self.cmd(Command::AUTO_WRITE_RED, &[color_byte, 0xFF])?;
        self.wait(TIMEOUT_SIMPLE, "fast_clear:red")?;
        self.cmd(Command::AUTO_WRITE_BW, &[color_byte, 0xFF])?;
        self.wait(TIMEOUT_SIMPLE, "fast_clear:bw")?;
        self.activate_and_wait(SEQ_FULL, TIMEOUT_FULL, "fast_clear:activate")?;
        self.state.on_full_refresh_complete();
        if let Some(prev) = &mut self.prev_frame {
            prev.iter_mut().for_each(|b| *b = color_byte);
        }
        self.sleep(true)
    }

    fn set_invert(&mut self, invert_bw: bool, invert_red: bool) -> Result<()> {
        if self.state.is_sleeping() {
            self.wake()?;
            self.init_full()?;
        }
        let mut byte = 0u8;
        byte.set_bit(7, invert_red);
        byte.set_bit(3, invert_bw);
        self.update_ctrl1_byte = byte;
        self.write_update_ctrl1()
    }

    fn read_temperature(&mut self) -> Result<f32> {
        self.cmd(Command::TEMP_SENSOR, &[0x80])?;
        self.cmd(Command::UPDATE_CTRL2, &[SEQ_LOAD_TEMP])?;
        self.cmd(Command::ACTIVATE, &[])?;
        self.wait(TIMEOUT_SIMPLE, "read_temperature")?;
        let bytes = self.transport.read_data(Command::TEMP_READ.address(), 2)?;
        let raw = ((bytes[0] as u16) << 4) | ((bytes[1] as u16) >> 4);
        let raw = raw & 0x0FFF;
        let signed = if raw & 0x0800 != 0 {
            raw as i32 - 0x1000
        } else {
            raw as i32
        };
        Ok(signed as f32 / 16.0)
    }

    fn check_temperature(&mut self) -> Result<(f32, bool)> {
        let c = self.read_temperature()?;
        let in_range = c >= TEMP_RANGE_C.0 && c <= TEMP_RANGE_C.1;
        if !in_range {
            log_warn!("panel temperature {c}°C outside operating envelope {TEMP_RANGE_C:?}");
        }
        Ok((c, in_range))
    }

    fn read_status(&mut self) -> Result<StatusBits> {
        let bytes = self.transport.read_data(Command::STATUS.address(), 1)?;
        let raw = bytes[0];
        Ok(StatusBits {
            hv_ready: raw.get_bit(7),
            vci_ok: raw.get_bit(6),
            busy: raw.get_bit(2),
            chip_id: raw.get_bits(0..2),
        })
    }

    fn partial_count(&self) -> u32 {
        self.state.partial_count()
    }

    fn set_partial_count(&mut self, value: u32) {
        self.state.set_partial_count(value);
    }

    fn partial_threshold(&self) -> u32 {
        self.state.partial_threshold()
    }

    fn set_partial_threshold(&mut self, value: u32) {
        self.state.set_partial_threshold(value);
    }

    fn is_sleeping(&self) -> bool {
        self.state.is_sleeping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    fn driver() -> Ssd1680<MockTransport> {
        Ssd1680::new(MockTransport::new(), true)
    }

    #[test]
    fn fresh_init_emits_sw_reset_then_clear_sleep() {
        let mut d = driver();
        d.init(true).unwrap();
        let cmds = d.transport.commands();
        assert_eq!(cmds[0], Command::SW_RESET.address());
        assert!(cmds.contains(&Command::DEEP_SLEEP.address()));
        assert!(d.state().has_basemap());
        assert_eq!(d.state().partial_count(), 0);
    }

    #[test]
    fn partial_refresh_writes_red_before_bw_and_updates_prev_frame() {
        let mut d = driver();
        d.init(true).unwrap();
        let frame = vec![0x00u8; FRAME_BYTES_1BIT];
        d.display(&frame, false, false, true).unwrap();
        assert_eq!(d.state().partial_count(), 1);
        assert_eq!(d.prev_frame.as_ref().unwrap(), &frame);
    }

    #[test]
    fn eleven_partials_with_default_threshold_escalates_to_full() {
        let mut d = driver();
        d.init(true).unwrap();
        let frame = vec![0x00u8; FRAME_BYTES_1BIT];
        for _ in 0..10 {
            d.display(&frame, false, false, true).unwrap();
        }
        assert_eq!(d.state().partial_count(), 10);
        d.transport.clear_log();
        d.display(&frame, false, false, true).unwrap();
        assert_eq!(d.state().partial_count(), 0);
        assert!(d.transport.data_log().contains(&vec![SEQ_FULL]));
    }

    #[test]
    fn custom_lut_refresh_invalidates_basemap_forcing_next_full() {
        let mut d = driver();
        d.init(true).unwrap();
        let frame = vec![0x00u8; FRAME_BYTES_1BIT];
        d.display_lut(&LUT_4GRAY, &frame, None, Voltages::default())
            .unwrap();
        assert!(!d.state().has_basemap());
        assert!(d.state().needs_full_refresh());
    }

    #[test]
    fn display_regions_emits_single_activate() {
        let mut d = driver();
        d.init(true).unwrap();
        d.transport.clear_log();
        let data = vec![0x00u8; 4 * 32];
        let regions = [
            RegionUpdate { data: &data, x: 0, y: 0, w: 32, h: 32 },
            RegionUpdate { data: &data, x: 48, y: 0, w: 32, h: 32 },
            RegionUpdate { data: &data, x: 96, y: 0, w: 32, h: 32 },
        ];
        d.display_regions(&regions).unwrap();
        let activates = d
            .transport
            .commands()
            .iter()
            .filter(|&&c| c == Command::ACTIVATE.address())
            .count();
        assert_eq!(activates, 1);
    }

    #[test]
    fn display_regions_without_basemap_is_not_ready() {
        let mut d = driver();
        let data = vec![0u8; 4];
        let err = d
            .display_region(&data, 0, 0, 32, 4)
            .expect_err("should require a basemap");
        assert!(matches!(err, EpdError::NotReady { .. }));
    }

    #[test]
    fn misaligned_region_is_invalid_argument() {
        let mut d = driver();
        d.init(true).unwrap();
        let data = vec![0u8; 4];
        let err = d
            .display_region(&data, 3, 0, 32, 4)
            .expect_err("x must be a multiple of 8");
        assert!(matches!(err, EpdError::InvalidArgument { .. }));
    }

    #[test]
    fn temperature_sign_extension_matches_boundary_values() {
        let cases: [(u16, f32); 3] = [(0xFFF, -0.0625), (0x320, 50.0), (0x000, 0.0)];
        for (raw, expected) in cases {
            let signed = if raw & 0x0800 != 0 {
                raw as i32 - 0x1000
            } else {
                raw as i32
            };
            assert_eq!(signed as f32 / 16.0, expected);
        }
    }
}
