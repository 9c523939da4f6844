
use std::{
    path::Path,
    fs::File,
    io::{
        BufReader,
        BufWriter,
    },
};
use serde::{Serialize, Deserialize};
use anyhow::*;


pub const SETTINGS_FILE_NAME: &'static str = "jalopy.json";


/// Run settings. World tuning lives in code as named constants; this covers the shape
/// of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// View width in pixels.
    pub width: f64,
    /// View height in pixels. Dot size is derived from this.
    pub height: f64,
    /// Simulated frames per second.
    pub fps: u32,
    /// Simulated seconds per run.
    pub seconds: f64,
    /// World generation seed.
    pub seed: u64,
    /// Constant throttle in [-1, 1], scaled to the wheel force range.
    pub throttle: f64,
    /// Directory PNG frames are recorded into.
    pub frames_dir: String,
    /// Record every nth frame. Zero disables recording.
    pub frame_stride: u32,
    /// Pace frames against the wall clock instead of recording.
    pub realtime: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            width: 960.0,
            height: 540.0,
            fps: 60,
            seconds: 20.0,
            seed: 0xcafef00dd15ea5e5,
            throttle: 0.6,
            frames_dir: "frames".to_owned(),
            frame_stride: 2,
            realtime: false,
        }
    }
}

impl Settings {
    pub fn read(path: impl AsRef<Path>) -> Self {
        Self::try_read(path).unwrap_or_default()
    }

    pub fn try_read(path: impl AsRef<Path>) -> Result<Self> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), self)?;
        Ok(())
    }
}
