/// Frame source interface and an in-memory shared frame
///
/// The capture side (camera reader, detector client) publishes into a
/// `SharedFrame`; the tracking side reads it through the `FrameSource` trait.
use crate::types::{DepthMap, DetectorOutput, Detections, MarkerDetection};
use std::sync::{Arc, PoisonError, RwLock};

/// Latest camera state as seen by the tracker
pub trait FrameSource: Send + Sync {
    /// Update counter, monotonically non-decreasing
    fn current_generation(&self) -> u64;

    /// Detections from both sensing pipelines for the latest frame
    fn latest_detections(&self) -> Detections;

    /// Depth samples for the latest frame, if the sensor produced any
    fn latest_depth_map(&self) -> Option<Arc<DepthMap>>;

    /// `(width_px, height_px)` of the latest camera frame
    fn frame_dimensions(&self) -> (u32, u32);

    /// Generation, detections and dimensions of one and the same frame.
    ///
    /// The default reads the parts separately; sources that can publish
    /// concurrently should override it with a single consistent read.
    fn latest_frame(&self) -> (u64, Detections, (u32, u32)) {
        (
            self.current_generation(),
            self.latest_detections(),
            self.frame_dimensions(),
        )
    }
}

/// Everything captured for one frame
#[derive(Debug, Clone, Default)]
pub struct FramePacket {
    pub width: u32,
    pub height: u32,
    pub detections: Detections,
    pub depth: Option<Arc<DepthMap>>,
}

impl FramePacket {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Attach the detector service payload (base and custom results)
    pub fn with_detector_output(mut self, output: DetectorOutput) -> Self {
        self.detections.learned = output.into_learned();
        self
    }

    pub fn with_markers(mut self, markers: Vec<MarkerDetection>) -> Self {
        self.detections.fiducials = markers;
        self
    }

    pub fn with_depth(mut self, depth: DepthMap) -> Self {
        self.depth = Some(Arc::new(depth));
        self
    }
}

#[derive(Debug, Default)]
struct FrameState {
    generation: u64,
    packet: FramePacket,
}

/// Thread-safe latest-frame store.
///
/// Generation and packet live under one lock so a reader never pairs a new
/// generation with an old packet.
#[derive(Debug, Default)]
pub struct SharedFrame {
    state: RwLock<FrameState>,
}

impl SharedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest frame and advance the generation
    pub fn publish(&self, packet: FramePacket) -> u64 {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        state.packet = packet;
        log::trace!(
            "Published frame generation {} ({} learned, {} markers)",
            state.generation,
            state.packet.detections.learned.len(),
            state.packet.detections.fiducials.len()
        );
        state.generation
    }

    /// Replace only the depth map; the generation is left unchanged
    pub fn set_depth_map(&self, depth: Option<DepthMap>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.packet.depth = depth.map(Arc::new);
    }
}

impl FrameSource for SharedFrame {
    fn current_generation(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    fn latest_detections(&self) -> Detections {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .packet
            .detections
            .clone()
    }

    fn latest_depth_map(&self) -> Option<Arc<DepthMap>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .packet
            .depth
            .clone()
    }

    fn frame_dimensions(&self) -> (u32, u32) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (state.packet.width, state.packet.height)
    }

    fn latest_frame(&self) -> (u64, Detections, (u32, u32)) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (
            state.generation,
            state.packet.detections.clone(),
            (state.packet.width, state.packet.height),
        )
    }
}
