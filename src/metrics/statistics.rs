use log::info;

/// Running statistics that can be updated incrementally
#[derive(Debug, Clone)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f32,
    max: f32,
}

impl RunningStats {
    pub fn new() -> Self {
        RunningStats {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    /// Update with a new value
    pub fn update(&mut self, value: f32) {
        self.count += 1;
        let delta = value as f64 - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value as f64 - self.mean;
        self.m2 += delta * delta2;

        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn mean(&self) -> f32 {
        self.mean as f32
    }

    /// Sample variance, zero below two values.
    pub fn variance(&self) -> f32 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64) as f32
        }
    }

    pub fn std(&self) -> f32 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects a scalar and logs its mean once every `every` values.
///
/// The window restarts after each report. `every == 0` collects silently.
#[derive(Debug, Clone)]
pub struct Statistic {
    label: String,
    every: usize,
    window: RunningStats,
    reports: usize,
}

impl Statistic {
    pub fn new<S: Into<String>>(label: S, every: usize) -> Self {
        Statistic {
            label: label.into(),
            every,
            window: RunningStats::new(),
            reports: 0,
        }
    }

    /// Record a value. Returns the window mean when this value completes a window.
    pub fn record(&mut self, value: f32) -> Option<f32> {
        self.window.update(value);
        if self.every == 0 || self.window.count() < self.every {
            return None;
        }
        let mean = self.window.mean();
        info!("{} {:8.3}", self.label, mean);
        self.window.reset();
        self.reports += 1;
        Some(mean)
    }

    /// Values recorded since the last report.
    pub fn pending(&self) -> usize {
        self.window.count()
    }

    pub fn reports(&self) -> usize {
        self.reports
    }
}
