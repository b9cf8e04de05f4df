use log::debug;
use rayon::prelude::*;
use std::thread;
use std::time::Duration;

use crate::buffer::{PixelBuffer, Threshold, CHANNELS};
use crate::error::CompressError;
use crate::taskstatus::ProgressSink;

///////////////////////////////////////////////////////
/// Threshold Masking
///////////////////////////////////////////////////////

/// Progress is reported after every this many pixel positions
pub const CHECKPOINT_PIXELS: usize = 500;

// Checkpoint blocks masked in parallel between two rounds of progress
// reports. Keeps reports in row-major order on the calling thread.
const WAVE_BLOCKS: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompressOptions {
    /// Pause so a cooperative UI can repaint. Advisory only: it is taken
    /// once per wave of 64 checkpoints (32,000 pixels), not at every
    /// checkpoint, and has no effect on the output or the reported values.
    /// `None` only yields the thread.
    pub pace: Option<Duration>,
}

/// The per-channel rule: values below the threshold become zero, everything
/// else passes through unchanged.
#[inline]
pub fn mask_value(value: u8, threshold: Threshold) -> u8 {
    if value < threshold.0 {
        0
    } else {
        value
    }
}

fn mask_into(src: &[u8], dst: &mut [u8], threshold: Threshold) {
    dst.iter_mut()
        .zip(src)
        .for_each(|(d, s)| *d = mask_value(*s, threshold));
}

fn percent_of(processed: usize, total: usize) -> f64 {
    (processed as f64 / total as f64) * 100.0
}

/// Zeroes every channel value below `threshold`, returning a new buffer of
/// the same shape. The input is left untouched.
pub fn compress<S: ProgressSink>(
    buffer: &PixelBuffer,
    threshold: Threshold,
    on_progress: S,
) -> Result<PixelBuffer, CompressError> {
    compress_with(buffer, threshold, CompressOptions::default(), on_progress)
}

/// Same as [`compress`], with control over pacing.
///
/// `on_progress` receives `processed / total * 100` at every
/// [`CHECKPOINT_PIXELS`] boundary, in increasing order, and then exactly one
/// final `100.0`. It is never called for a zero-area buffer.
pub fn compress_with<S: ProgressSink>(
    buffer: &PixelBuffer,
    threshold: Threshold,
    options: CompressOptions,
    mut on_progress: S,
) -> Result<PixelBuffer, CompressError> {
    buffer.validate()?;

    if buffer.is_empty() {
        debug!(
            "Empty {}x{} buffer, nothing to mask",
            buffer.width(),
            buffer.height()
        );
        return Ok(PixelBuffer::empty(buffer.width(), buffer.height()));
    }

    let total = buffer.pixel_count();
    let input = buffer.as_raw();
    let mut output = vec![0_u8; input.len()];

    let block_len = CHECKPOINT_PIXELS * CHANNELS;
    let wave_len = block_len * WAVE_BLOCKS;

    let mut processed = 0;
    let mut next_checkpoint = CHECKPOINT_PIXELS;

    for (src_wave, dst_wave) in input.chunks(wave_len).zip(output.chunks_mut(wave_len)) {
        dst_wave
            .par_chunks_mut(block_len)
            .zip(src_wave.par_chunks(block_len))
            .for_each(|(dst, src)| mask_into(src, dst, threshold));

        processed += src_wave.len() / CHANNELS;
        while next_checkpoint <= processed {
            on_progress.report(percent_of(next_checkpoint, total));
            next_checkpoint += CHECKPOINT_PIXELS;
        }

        match options.pace {
            Some(pace) => thread::sleep(pace),
            None => thread::yield_now(),
        }
    }

    on_progress.report(100.0);

    debug!(
        "Masked {} pixels at threshold {}",
        processed,
        threshold.value()
    );
    PixelBuffer::from_raw(buffer.width(), buffer.height(), output)
}

/// How many channel values a mask run turned from non-zero to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskStats {
    pub total_channels: usize,
    pub zeroed_channels: usize,
}

impl MaskStats {
    pub fn zeroed_percent(&self) -> f64 {
        if self.total_channels == 0 {
            0.0
        } else {
            percent_of(self.zeroed_channels, self.total_channels)
        }
    }
}

pub fn mask_stats(input: &PixelBuffer, output: &PixelBuffer) -> MaskStats {
    let zeroed_channels = input
        .as_raw()
        .par_iter()
        .zip(output.as_raw().par_iter())
        .filter(|(i, o)| **i != 0 && **o == 0)
        .count();

    MaskStats {
        total_channels: input.as_raw().len(),
        zeroed_channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> PixelBuffer {
        let data = (0..width * height * CHANNELS)
            .map(|i| (i % 256) as u8)
            .collect();
        PixelBuffer::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn single_pixel() {
        let input = PixelBuffer::from_rows(&[vec![[10, 200, 5]]]).unwrap();
        let output = compress(&input, Threshold(100), |_: f64| {}).unwrap();
        assert_eq!(output.get(0, 0), [0, 200, 0]);
    }

    #[test]
    fn two_pixels() {
        let input = PixelBuffer::from_rows(&[vec![[50, 150, 0], [255, 99, 100]]]).unwrap();
        let output = compress(&input, Threshold(100), |_: f64| {}).unwrap();
        let expected = PixelBuffer::from_rows(&[vec![[0, 150, 0], [255, 0, 100]]]).unwrap();
        assert_eq!(output, expected);
    }

    #[test]
    fn input_is_not_modified() {
        let input = gradient(40, 30);
        let copy = input.clone();
        let _ = compress(&input, Threshold(200), |_: f64| {}).unwrap();
        assert_eq!(input, copy);
    }

    #[test]
    fn zero_threshold_is_identity() {
        let input = gradient(33, 17);
        assert_eq!(compress(&input, Threshold(0), |_: f64| {}).unwrap(), input);
    }

    #[test]
    fn max_threshold_keeps_only_255() {
        let input = gradient(64, 4);
        let output = compress(&input, Threshold(255), |_: f64| {}).unwrap();
        assert!(input
            .as_raw()
            .iter()
            .zip(output.as_raw())
            .all(|(i, o)| if *i == 255 { *o == 255 } else { *o == 0 }));
    }

    #[test]
    fn empty_buffer_reports_nothing() {
        let mut calls = 0;
        let output = compress(&PixelBuffer::empty(0, 0), Threshold(10), |_: f64| calls += 1).unwrap();
        assert!(output.is_empty());
        assert_eq!(output.shape(), (0, 0, 3));
        assert_eq!(calls, 0);

        let output = compress(&PixelBuffer::empty(7, 0), Threshold(10), |_: f64| calls += 1).unwrap();
        assert_eq!(output.shape(), (0, 7, 3));
        assert_eq!(calls, 0);
    }

    #[test]
    fn progress_cadence_every_500_pixels() {
        // 1200 pixels: checkpoints at 500 and 1000, then the final 100
        let input = gradient(40, 30);
        let mut seen = vec![];
        compress(&input, Threshold(1), |p: f64| seen.push(p)).unwrap();
        assert_eq!(seen.len(), 3);
        assert!((seen[0] - 500.0 / 1200.0 * 100.0).abs() < 1e-9);
        assert!((seen[1] - 1000.0 / 1200.0 * 100.0).abs() < 1e-9);
        assert_eq!(seen[2], 100.0);
    }

    #[test]
    fn progress_spans_multiple_waves() {
        let width = 1000;
        let height = 70;
        let input = gradient(width, height);
        let mut seen = vec![];
        compress(&input, Threshold(50), |p: f64| seen.push(p)).unwrap();

        assert_eq!(seen.len(), width * height / CHECKPOINT_PIXELS + 1);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100.0);
    }

    #[test]
    fn pacing_leaves_output_and_progress_alone() {
        // Two full waves plus a partial one
        let input = gradient(800, 90);
        let run = |pace| {
            let mut seen = vec![];
            let output = compress_with(
                &input,
                Threshold(77),
                CompressOptions { pace },
                |p: f64| seen.push(p),
            )
            .unwrap();
            (output, seen)
        };

        let (plain, plain_seen) = run(None);
        let (paced, paced_seen) = run(Some(Duration::from_millis(1)));
        assert_eq!(plain, paced);
        assert_eq!(plain_seen, paced_seen);
        assert_eq!(paced_seen.len(), 800 * 90 / CHECKPOINT_PIXELS + 1);
    }

    #[test]
    fn small_buffer_reports_only_completion() {
        let input = gradient(10, 10);
        let mut seen = vec![];
        compress(&input, Threshold(1), |p: f64| seen.push(p)).unwrap();
        assert_eq!(seen, vec![100.0]);
    }

    #[test]
    fn stats_count_zeroed_channels() {
        let input = PixelBuffer::from_rows(&[vec![[50, 150, 0], [255, 99, 100]]]).unwrap();
        let output = compress(&input, Threshold(100), |_: f64| {}).unwrap();
        let stats = mask_stats(&input, &output);
        assert_eq!(stats.total_channels, 6);
        // The input 0 was already zero and is not counted
        assert_eq!(stats.zeroed_channels, 2);
        assert!((stats.zeroed_percent() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn mask_value_rule() {
        assert_eq!(mask_value(99, Threshold(100)), 0);
        assert_eq!(mask_value(100, Threshold(100)), 100);
        assert_eq!(mask_value(0, Threshold(0)), 0);
    }
}
