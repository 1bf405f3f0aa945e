//! Frame acquisition.

use camwatch_types::{encodings, Frame, Timestamp};

use crate::error::AcquisitionError;

/// Produces one frame per call.
///
/// `target` is the time the publisher intends to stamp the frame with. The
/// returned frame's header is overwritten by the publisher, so implementors
/// only fill in the image itself.
///
/// Any `FnMut(Timestamp) -> Result<Frame, AcquisitionError>` is an `Acquire`.
pub trait Acquire: Send {
    fn grab(&mut self, target: Timestamp) -> Result<Frame, AcquisitionError>;
}

impl<F> Acquire for F
where
    F: FnMut(Timestamp) -> Result<Frame, AcquisitionError> + Send,
{
    fn grab(&mut self, target: Timestamp) -> Result<Frame, AcquisitionError> {
        self(target)
    }
}

/// Synthetic `mono8` frames with a diagonal gradient that shifts each frame.
///
/// ```rust
/// use camwatch_sdk::{Acquire, TestPattern};
/// use camwatch_types::Timestamp;
///
/// let mut pattern = TestPattern::new(8, 4).fail_every(3);
/// assert!(pattern.grab(Timestamp::ZERO).is_ok());
/// assert!(pattern.grab(Timestamp::ZERO).is_ok());
/// assert!(pattern.grab(Timestamp::ZERO).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TestPattern {
    width: u32,
    height: u32,
    fail_every: Option<u64>,
    grabs: u64,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fail_every: None,
            grabs: 0,
        }
    }

    /// Fail every `n`th grab with a timeout. `0` disables failures.
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    /// Grabs attempted so far, failed ones included.
    pub fn grabs(&self) -> u64 {
        self.grabs
    }
}

impl Default for TestPattern {
    fn default() -> Self {
        Self::new(64, 48)
    }
}

impl Acquire for TestPattern {
    fn grab(&mut self, _target: Timestamp) -> Result<Frame, AcquisitionError> {
        self.grabs += 1;
        if self.fail_every.is_some_and(|n| self.grabs % n == 0) {
            return Err(AcquisitionError::Timeout);
        }

        let shift = self.grabs as u32;
        let data = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x + y + shift) as u8))
            .collect();
        Ok(Frame::new(encodings::MONO8, self.width, self.height, data))
    }
}
