use glam::Vec3;

/// Fixed-size ring of body velocity samples with an O(1) running average
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityHistory {
    samples: Vec<Vec3>,
    index: usize,
    average: Vec3,
}

impl VelocityHistory {
    pub fn new(size: usize) -> Self {
        Self {
            samples: vec![Vec3::ZERO; size],
            index: 0,
            average: Vec3::ZERO,
        }
    }

    /// Overwrite the oldest sample and update the average incrementally.
    /// The average is recomputed from the ring once per wrap so rounding
    /// error never outlives one window.
    pub fn push(&mut self, sample: Vec3) {
        let size = self.samples.len();
        if size == 0 {
            return;
        }
        self.index = (self.index + 1) % size;
        let oldest = self.samples[self.index];
        self.samples[self.index] = sample;
        if self.index == 0 {
            self.average = self.samples.iter().fold(Vec3::ZERO, |acc, s| acc + *s) / size as f32;
        } else {
            self.average += (sample - oldest) / size as f32;
        }
    }

    /// Mean of the last `len()` samples, counting unfilled slots as zero
    pub fn average(&self) -> Vec3 {
        self.average
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = Vec3::ZERO);
        self.index = 0;
        self.average = Vec3::ZERO;
    }
}
