//! Text-mode switcher interface skeleton. An independent firmware utility,
//! unrelated to the filesystem stack beyond being built against the same
//! toolchain. Out of scope: the actual mode-set call into firmware.

#[derive(Debug)]
pub struct ModeSwitchError;

/// Requests `cols` x `rows` text mode from the firmware console.
pub fn set_text_mode(_cols: u16, _rows: u16) -> Result<(), ModeSwitchError> {
    todo!("mode switching is firmware-specific and out of scope")
}
