#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulationPhase {
    Accumulating,
    /// The next frame restarts the average.
    ResetPending,
}

/// Blend parameters for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameBlend {
    /// Number of samples already in the presented image. `0` discards the history.
    pub sample_index: u32,
    /// Weight of the new sample, `1 / (sample_index + 1)`.
    pub weight: f32,
}

impl FrameBlend {
    pub fn new(sample_index: u32) -> Self {
        Self {
            sample_index,
            weight: 1.0 / (sample_index as f32 + 1.0),
        }
    }

    /// Per-pixel blend, the same formula the accumulate shader runs.
    pub fn apply(&self, previous: [f32; 4], raw: [f32; 4]) -> [f32; 4] {
        if self.sample_index == 0 {
            return raw;
        }
        let mut blended = previous;
        for (channel, sample) in blended.iter_mut().zip(raw) {
            *channel += (sample - *channel) * self.weight;
        }
        blended
    }
}

/// Tracks how many samples the presented image averages and when it has to start over.
#[derive(Debug)]
pub struct AccumulationController {
    phase: AccumulationPhase,
    sample_count: u32,
    output_size: (u32, u32),
}

impl Default for AccumulationController {
    fn default() -> Self {
        Self {
            phase: AccumulationPhase::Accumulating,
            sample_count: 0,
            output_size: (0, 0),
        }
    }
}

impl AccumulationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AccumulationPhase {
        self.phase
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    pub fn on_view_changed(&mut self) {
        self.phase = AccumulationPhase::ResetPending;
    }

    pub fn on_output_recreated(&mut self, width: u32, height: u32) {
        self.output_size = (width, height);
        self.phase = AccumulationPhase::ResetPending;
    }

    pub fn on_scene_regenerated(&mut self) {
        self.sample_count = 0;
        self.phase = AccumulationPhase::Accumulating;
    }

    /// Resolves a pending reset and returns the blend parameters of the frame about to be drawn.
    pub fn begin_frame(&mut self) -> FrameBlend {
        if self.phase == AccumulationPhase::ResetPending {
            log::debug!("Accumulation reset after {} samples", self.sample_count);
            self.sample_count = 0;
            self.phase = AccumulationPhase::Accumulating;
        }
        FrameBlend::new(self.sample_count)
    }

    /// Called once the frame's commands were submitted.
    pub fn complete_frame(&mut self) {
        self.sample_count = self.sample_count.saturating_add(1);
    }
}
