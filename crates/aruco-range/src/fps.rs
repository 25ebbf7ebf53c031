use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling mean of the instantaneous frame rate over the last `window`
/// frames.
///
/// ```
/// use std::time::Duration;
/// use aruco_range::FpsMeter;
///
/// let mut fps = FpsMeter::new(30);
/// fps.record(Duration::from_millis(50));
/// assert_eq!(fps.average().round(), 20.0);
/// ```
#[derive(Clone, Debug)]
pub struct FpsMeter {
    window: usize,
    samples: VecDeque<f64>,
    last: Instant,
}

impl FpsMeter {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            last: Instant::now(),
        }
    }

    /// Mark the end of a frame and return the updated average.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        self.record(dt)
    }

    /// Add one frame that took `dt`. Zero-length frames are ignored.
    pub fn record(&mut self, dt: Duration) -> f64 {
        let secs = dt.as_secs_f64();
        if secs > 0.0 {
            if self.samples.len() == self.window {
                self.samples.pop_front();
            }
            self.samples.push_back(1.0 / secs);
        }
        self.average()
    }

    /// Mean FPS over the window, 0 before the first frame.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(30)
    }
}
