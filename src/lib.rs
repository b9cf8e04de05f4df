//! Threshold masking of RGB images.
//!
//! Channel values below a user-chosen threshold are zeroed. The transform
//! runs on a background worker that reports completion percentages as it
//! goes; a session ties image loading, the worker, and saving together for
//! the window shell and the command line tool.

pub mod analysis;
pub mod buffer;
pub mod error;
pub mod logging;
pub mod process;
pub mod source;
pub mod state;
pub mod taskstatus;

pub mod prelude {
    pub use crate::analysis::threshold::{
        compress, compress_with, mask_stats, mask_value, CompressOptions, MaskStats,
        CHECKPOINT_PIXELS,
    };
    pub use crate::buffer::{PixelBuffer, Threshold, CHANNELS};
    pub use crate::error::{AppError, AppResult, CompressError, SourceError};
    pub use crate::process::{CompressedSlot, CompressionOutcome, CompressionResult, Compressor};
    pub use crate::source::{load, save, thumbnail, PREVIEW_SIZE};
    pub use crate::state::{Session, UiState};
    pub use crate::taskstatus::{
        set_task_completed, set_task_status, MonotonicSink, ProgressSink, StatusSender,
        StatusSink, TaskStatus, TaskStatusContainer,
    };
}
