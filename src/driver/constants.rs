//! Panel geometry, register parameters, and timing constants for the
//! 296x128 SSD1680 panel.

use std::time::Duration;

/// Physical panel width in pixels.
pub const PHYS_W: usize = 128;
/// Physical panel height in pixels.
pub const PHYS_H: usize = 296;
/// Size of a full 1-bit frame buffer.
pub const FRAME_BYTES_1BIT: usize = PHYS_W / 8 * PHYS_H;

const _: () = assert!(FRAME_BYTES_1BIT == 4736);

/// `UPDATE_CTRL2` sequence byte for a Mode-1 (full) refresh.
pub const SEQ_FULL: u8 = 0xF7;
/// `UPDATE_CTRL2` sequence byte for a refresh driven by a custom LUT.
pub const SEQ_CUSTOM_LUT: u8 = 0xC7;
/// `UPDATE_CTRL2` sequence byte for a Mode-2 (partial) refresh.
pub const SEQ_PARTIAL: u8 = 0xFC;
/// `UPDATE_CTRL2` sequence byte to power the analog block on.
pub const SEQ_POWER_ON: u8 = 0xE0;
/// `UPDATE_CTRL2` sequence byte to power the analog block off.
pub const SEQ_POWER_OFF: u8 = 0x83;
/// `UPDATE_CTRL2` sequence byte to load the temperature sensor reading.
pub const SEQ_LOAD_TEMP: u8 = 0xB1;

/// `DEEP_SLEEP` mode byte: retain RAM contents.
pub const SLEEP_RETAIN: u8 = 0x01;
/// `DEEP_SLEEP` mode byte: discard RAM contents.
pub const SLEEP_DISCARD: u8 = 0x03;

/// `BORDER` byte for full-refresh border waveform.
pub const BORDER_FULL: u8 = 0x05;
/// `BORDER` byte for partial-refresh border waveform.
pub const BORDER_PARTIAL: u8 = 0x80;

/// `DATA_ENTRY` byte: X/Y increment, X-major.
pub const DATA_ENTRY_XY_INC: u8 = 0x03;

/// `SOFT_START` parameter bytes.
pub const SOFT_START_BYTES: [u8; 4] = [0x8B, 0x9C, 0x96, 0x0F];

/// Temperature sensor operating envelope, inclusive, in degrees Celsius.
pub const TEMP_RANGE_C: (f32, f32) = (0.0, 50.0);

/// Voltage parameters accompanying a custom LUT write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voltages {
    /// Gate high voltage register value.
    pub vgh: u8,
    /// Source high voltage 1 register value.
    pub vsh1: u8,
    /// Source high voltage 2 register value.
    pub vsh2: u8,
    /// Source low voltage register value.
    pub vsl: u8,
    /// VCOM register value.
    pub vcom: u8,
}

impl Default for Voltages {
    fn default() -> Self {
        Self {
            vgh: 0x17,
            vsh1: 0x41,
            vsh2: 0xA8,
            vsl: 0x32,
            vcom: 0x50,
        }
    }
}

/// Timeout for a full refresh (`ACTIVATE` under `SEQ_FULL`/`SEQ_CUSTOM_LUT`).
pub const TIMEOUT_FULL: Duration = Duration::from_millis(5_000);
/// Timeout for a partial refresh.
pub const TIMEOUT_PARTIAL: Duration = Duration::from_millis(1_000);
/// Timeout for simple register writes (reset, init steps).
pub const TIMEOUT_SIMPLE: Duration = Duration::from_millis(500);
/// Timeout for power-on/off sequencing.
pub const TIMEOUT_POWER: Duration = Duration::from_millis(500);
/// Timeout applied when no more specific bound is known.
pub const TIMEOUT_UNKNOWN: Duration = Duration::from_millis(10_000);

/// Reset pulse duration (RST held low).
pub const RESET_PULSE: Duration = Duration::from_millis(1);
/// Recovery delay after releasing RST.
pub const RESET_RECOVERY: Duration = Duration::from_millis(1);
/// Settle delay after issuing `DEEP_SLEEP`.
pub const SLEEP_SETTLE: Duration = Duration::from_millis(1);

/// Length in bytes of a waveform LUT (`VS`x5x12, `TP/SR/RP`x12x7, `FR`x6,
/// `XON`x3).
pub const LUT_LEN: usize = 153;

/// 4-gray waveform LUT used by `display_gray`/`display_lut`'s grayscale
/// path. Values are placeholder-but-length-correct: the reference Python
/// implementation redacts its own waveform tables from this retrieval
/// (`commands.py`/`sequences.py`/`lut.py` contain only docstrings), so this
/// table encodes a conservative, symmetric four-level waveform rather than
/// a vendor-specific tuned one. Callers targeting a specific panel should
/// prefer `display_lut` with a vendor-supplied table.
pub const LUT_4GRAY: [u8; LUT_LEN] = build_default_gray_lut();

const fn build_default_gray_lut() -> [u8; LUT_LEN] {
    let mut lut = [0u8; LUT_LEN];
    // VS section: 5 groups x 12 bytes. Use a simple repeating waveform
    // pattern (10 = frame holds at VSH/VSL, 01 = mirrored) per 2-bit group.
    let mut i = 0;
    while i < 60 {
        lut[i] = 0b01_10_01_10;
        i += 1;
    }
    // TP/SR/RP: 12 groups x 7 bytes -- conservative short frame counts.
    let mut j = 60;
    while j < 144 {
        lut[j] = 0x0A;
        j += 1;
    }
    // FR: 6 bytes of frame-rate selects.
    let mut k = 144;
    while k < 150 {
        lut[k] = 0x22;
        k += 1;
    }
    // XON: 3 bytes, all-zero (no forced-on phases).
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_matches_panel_geometry() {
        assert_eq!(FRAME_BYTES_1BIT, 4736);
    }

    #[test]
    fn gray_lut_has_datasheet_length() {
        assert_eq!(LUT_4GRAY.len(), 153);
    }

    #[test]
    fn default_voltages_match_spec() {
        let v = Voltages::default();
        assert_eq!(v.vgh, 0x17);
        assert_eq!(v.vcom, 0x50);
    }
}
