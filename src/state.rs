//! Persisted brightness state.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Brightness level assumed when no usable state is on disk.
pub const DEFAULT_BRIGHTNESS: u8 = 0x01;

/// Well-known location of the brightness state file.
const STATE_FILE: &str = "/tmp/auracore.state";

/// On-disk store for the last applied brightness level.
///
/// The file holds a single text-encoded integer. Persistence is best-effort:
/// a missing or unreadable file yields the default and a failed write is
/// ignored, so the store never surfaces an error.
pub struct BrightnessStore {
    path: PathBuf,
}

impl BrightnessStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted brightness, falling back to the default.
    pub fn load(&self) -> u8 {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| u8::from_str(content.trim()).ok())
            .unwrap_or(DEFAULT_BRIGHTNESS)
    }

    /// Persist a new brightness level, overwriting any previous value.
    pub fn save(&self, brightness: u8) {
        let _ = fs::write(&self.path, brightness.to_string());
    }
}

impl Default for BrightnessStore {
    fn default() -> Self {
        Self::new(STATE_FILE)
    }
}
