/*
    Telemetry Logger Resources

    Buffer layout (row major)
        [elapsed_ms] [value_0] ... [value_n-1]
*/

use super::*;

/* --------------------------- Logger -------------------------- */
/// Fixed-capacity sample log written from the control tick.
///
/// The buffer is owned by the caller and handed over for the lifetime of the
/// firmware; the logger never allocates.
pub struct Logger {
    data: Option<&'static mut [i32]>,
    num_values: usize,
    len: usize,
    sampled: usize,
    skipped: u32,
    sample_div: u32,
    start: u32,
    active: bool,
}

impl Logger {
    pub const fn new(num_values: usize) -> Self {
        Self {
            data: None,
            num_values,
            len: 0,
            sampled: 0,
            skipped: 0,
            sample_div: 1,
            start: 0,
            active: false,
        }
    }

    /// Starts logging in the background.
    ///
    /// `buf` must hold at least `len` rows of `cols()` values. Every
    /// `sample_div`-th update produces a row.
    pub fn start(&mut self, buf: &'static mut [i32], len: usize, sample_div: u32, now_ms: u32) -> Result<(), MotorError> {
        let required = len.checked_mul(self.cols()).ok_or(MotorError::InvalidArgument)?;
        if sample_div < 1 || buf.len() < required {
            return Err(MotorError::InvalidArgument);
        }

        self.data = Some(buf);
        self.len = len;
        self.sampled = 0;
        self.skipped = 0;
        self.sample_div = sample_div;
        self.start = now_ms;
        self.active = true;

        Ok(())
    }

    /// Releases the logger without clearing the samples.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn rows(&self) -> usize {
        self.sampled
    }

    pub fn cols(&self) -> usize {
        self.num_values + 1
    }

    pub fn update(&mut self, now_ms: u32, values: &[i32]) {
        if !self.active {
            return;
        }

        // Skip until we are at a multiple of sample_div
        self.skipped += 1;
        if self.skipped != self.sample_div {
            return;
        }
        self.skipped = 0;

        // Full: stop without writing
        if self.sampled >= self.len {
            self.active = false;
            return;
        }

        let cols = self.cols();
        let Some(data) = self.data.as_deref_mut() else {
            self.active = false;
            return;
        };

        let row = &mut data[self.sampled * cols..(self.sampled + 1) * cols];
        row[0] = now_ms.wrapping_sub(self.start) as i32;
        for (slot, value) in row[1..].iter_mut().zip(values.iter()) {
            *slot = *value;
        }

        self.sampled += 1;
    }

    /// Returns a logged row. `-1` selects the most recent one.
    pub fn read(&self, index: i32) -> Result<&[i32], MotorError> {
        if index < -1 {
            return Err(MotorError::InvalidArgument);
        }

        let index = if index == -1 {
            self.sampled.checked_sub(1).ok_or(MotorError::InvalidArgument)?
        }
        else {
            index as usize
        };

        if index >= self.sampled {
            return Err(MotorError::InvalidArgument);
        }

        let cols = self.cols();
        let data = self.data.as_deref().ok_or(MotorError::InvalidArgument)?;
        Ok(&data[index * cols..(index + 1) * cols])
    }
}
