//! # Axis Filter
//!
//! Fixed-window moving average for one analog channel.
//!
//! The mean is recomputed over the whole window on every push instead of
//! keeping a running sum, so rounding never accumulates.
//!
//! ## Warm-up
//!
//! The window starts zeroed and every slot takes part in the average, so the
//! first `N - 1` outputs after construction or [`AxisFilter::reset`] are pulled
//! toward zero. A steady input of 400 reads 100, 200, 300, then 400.

/// Samples in the default window.
pub const DEFAULT_WINDOW: usize = 4;

/// Moving average over the last `N` samples.
///
/// # Examples
///
/// ```
/// use wheel_bridge::signal::filter::AxisFilter;
///
/// let mut filter = AxisFilter::<4>::new();
/// for sample in [10, 20, 30, 40] {
///     filter.push(sample);
/// }
/// // Oldest slot (10) is overwritten
/// assert_eq!(filter.push(0), 22);
/// ```
#[derive(Debug, Clone)]
pub struct AxisFilter<const N: usize = DEFAULT_WINDOW> {
    samples: [i32; N],
    cursor: usize,
}

impl<const N: usize> Default for AxisFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AxisFilter<N> {
    /// Creates a filter with a zeroed window.
    #[must_use]
    pub fn new() -> Self {
        assert!(N > 0, "filter window must hold at least one sample");
        Self {
            samples: [0; N],
            cursor: 0,
        }
    }

    /// Stores `sample` over the oldest slot and returns the truncated mean.
    pub fn push(&mut self, sample: i32) -> i32 {
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % N;
        self.average()
    }

    /// Mean of the current window, truncated toward zero.
    #[must_use]
    pub fn average(&self) -> i32 {
        let sum: i64 = self.samples.iter().map(|&s| i64::from(s)).sum();
        (sum / N as i64) as i32
    }

    /// Most recently pushed sample.
    #[must_use]
    pub fn latest(&self) -> i32 {
        self.samples[(self.cursor + N - 1) % N]
    }

    /// Zeroes the window and rewinds the cursor.
    pub fn reset(&mut self) {
        self.samples = [0; N];
        self.cursor = 0;
    }

    /// Window size.
    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    /// Always false; a window holds at least one sample.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}
