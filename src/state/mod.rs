use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::threshold::CompressOptions;
use crate::buffer::{PixelBuffer, Threshold};
use crate::error::{AppError, AppResult};
use crate::process::{CompressionResult, Compressor};
use crate::source;
use crate::taskstatus::ProgressSink;

const CONFIG_DIR: &str = ".greedy-compress";
const CONFIG_FILE: &str = "config.toml";

/// Describes the state of the UI carried between launches
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct UiState {
    pub last_opened_folder: Option<PathBuf>,
    pub last_threshold: u8,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            last_opened_folder: None,
            last_threshold: Threshold::DEFAULT.value(),
        }
    }
}

impl UiState {
    pub fn config_file_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Unable to determine home directory"))?;
        Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load_from_userhome() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn save_to_userhome(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn load_from(config_file_path: &Path) -> Result<Self> {
        if config_file_path.exists() {
            info!("UI state config file exists at path: {:?}", config_file_path);
            let t = fs::read_to_string(config_file_path)?;
            Ok(toml::from_str(&t)?)
        } else {
            warn!("UI state config file does not exist. Will be created on exit");
            Err(anyhow!("Config file does not exist"))
        }
    }

    pub fn save_to(&self, config_file_path: &Path) -> Result<()> {
        let toml_str = toml::to_string(&self)?;
        if let Some(config_dir) = config_file_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
            }
        }
        let mut f = File::create(config_file_path)?;
        f.write_all(toml_str.as_bytes())?;
        debug!("{}", toml_str);
        Ok(())
    }

    /// Forgets the last opened folder if it no longer exists
    pub fn validate_paths(&mut self) {
        if !matches!(&self.last_opened_folder, Some(p) if p.exists()) {
            self.last_opened_folder = None;
        }
    }
}

/// The image the user picked, as decoded
pub struct SelectedImage {
    pub path: PathBuf,
    pub buffer: Arc<PixelBuffer>,
}

/// Everything one window works on: the selected image, the threshold, and
/// the worker holding the latest compressed result.
pub struct Session {
    selected: Option<SelectedImage>,
    threshold: Threshold,
    options: CompressOptions,
    compressor: Compressor,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CompressOptions::default())
    }
}

impl Session {
    pub fn new(options: CompressOptions) -> Self {
        Session {
            selected: None,
            threshold: Threshold::DEFAULT,
            options,
            compressor: Compressor::new(),
        }
    }

    /// Loads the image at `path` and makes it the current selection. Only
    /// `.jpg`, `.jpeg` and `.png` files are accepted. On failure the previous
    /// selection stays in place.
    pub fn select<P: AsRef<Path>>(&mut self, path: P) -> AppResult<Arc<PixelBuffer>> {
        let path = path.as_ref();
        if !source::is_supported_input(path) {
            return Err(AppError::DecodeError(format!(
                "Unsupported image type {:?} (use .jpg, .jpeg or .png)",
                path
            )));
        }
        let buffer = Arc::new(source::load(path)?);
        self.selected = Some(SelectedImage {
            path: path.to_owned(),
            buffer: buffer.clone(),
        });
        Ok(buffer)
    }

    pub fn selected_path(&self) -> Option<&Path> {
        self.selected.as_ref().map(|s| s.path.as_path())
    }

    pub fn original(&self) -> Option<Arc<PixelBuffer>> {
        self.selected.as_ref().map(|s| s.buffer.clone())
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn set_threshold(&mut self, value: i64) -> Threshold {
        self.threshold = Threshold::clamped(value);
        self.threshold
    }

    pub fn is_busy(&self) -> bool {
        self.compressor.is_busy()
    }

    /// Starts masking the selected image at the current threshold. The
    /// threshold is read once, here.
    pub fn compress<S, D>(&mut self, on_progress: S, on_done: D) -> AppResult<()>
    where
        S: ProgressSink + Send + 'static,
        D: FnOnce(CompressionResult) + Send + 'static,
    {
        let original = self.original().ok_or(AppError::NoImageSelected)?;
        self.compressor
            .start(original, self.threshold, self.options, on_progress, on_done)
    }

    /// Blocks until a running compression finishes
    pub fn wait(&mut self) {
        self.compressor.wait();
    }

    pub fn latest_compressed(&self) -> Option<Arc<PixelBuffer>> {
        self.compressor.latest()
    }

    /// Writes the latest compressed image. Returns the path written, which
    /// may have gained a `.png` extension.
    pub fn save_compressed<P: AsRef<Path>>(&self, path: P) -> AppResult<PathBuf> {
        let compressed = self.latest_compressed().ok_or(AppError::NoImageSelected)?;
        Ok(source::save(&compressed, path)?)
    }

    /// Same as [`Session::save_compressed`] for a dialog that may have been
    /// dismissed
    pub fn save_compressed_opt<P: AsRef<Path>>(&self, path: Option<P>) -> AppResult<PathBuf> {
        if self.latest_compressed().is_none() {
            return Err(AppError::NoImageSelected);
        }
        match path {
            Some(path) => self.save_compressed(path),
            None => Err(AppError::EncodeError("Download canceled.".to_owned())),
        }
    }
}
