/// Thread-safe tracking service
///
/// The registry sits behind a single mutex that serializes the whole
/// create/update/predict/evict cycle. Each finished cycle publishes an
/// immutable `Snapshot` by swapping an `Arc` under a short write lock, so
/// readers only ever clone a complete object list.
use crate::config::VisionConfig;
use crate::extractor::MeasurementExtractor;
use crate::frame_source::FrameSource;
use objtrack::{Snapshot, TrackingRegistry};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

pub struct TrackingService {
    registry: Mutex<TrackingRegistry>,
    published: RwLock<Snapshot>,
    extractor: MeasurementExtractor,
}

impl TrackingService {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            registry: Mutex::new(TrackingRegistry::new(config.tracker.clone())),
            published: RwLock::new(Arc::new(Vec::new())),
            extractor: MeasurementExtractor::new(config.marker.clone()),
        }
    }

    /// Run a cycle if the source advanced to a new generation
    pub fn refresh<S: FrameSource + ?Sized>(&self, source: &S) -> Snapshot {
        self.refresh_at(source, Instant::now())
    }

    pub fn refresh_at<S: FrameSource + ?Sized>(&self, source: &S, now: Instant) -> Snapshot {
        let generation = source.current_generation();
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if registry.last_generation() == Some(generation) {
            return registry.snapshot();
        }

        // the capture side may have moved on since the guard read
        let (generation, detections, dims) = source.latest_frame();
        let snapshot = registry.sync_at(generation, now, || {
            self.extractor.extract(&detections, dims)
        });
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);

        log::debug!(
            "Generation {}: {} objects, {} trackers",
            generation,
            snapshot.len(),
            registry.num_trackers()
        );
        snapshot
    }

    /// Last published object list without triggering a cycle
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.published.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn num_trackers(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .num_trackers()
    }

    pub fn cycle_count(&self) -> u64 {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cycle_count()
    }

    /// Drop all trackers and publish an empty list
    pub fn reset(&self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.clear();
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = registry.snapshot();
        log::info!("Tracking state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_source::{FramePacket, SharedFrame};
    use crate::types::{
        DepthMap, DetectionBox, DetectorOutput, Detections, LabeledDetection, MarkerDetection,
    };
    use approx::assert_abs_diff_eq;
    use std::time::Duration;

    /// Shared frame whose capture side publishes a queued packet right
    /// after the tracker has read the generation
    struct RacingFrame {
        inner: SharedFrame,
        queued: Mutex<Option<FramePacket>>,
    }

    impl RacingFrame {
        fn publish_on_next_read(&self, packet: FramePacket) {
            *self.queued.lock().unwrap() = Some(packet);
        }

        fn flush_queued(&self) {
            if let Some(packet) = self.queued.lock().unwrap().take() {
                self.inner.publish(packet);
            }
        }
    }

    impl FrameSource for RacingFrame {
        fn current_generation(&self) -> u64 {
            self.inner.current_generation()
        }

        fn latest_detections(&self) -> Detections {
            self.flush_queued();
            self.inner.latest_detections()
        }

        fn latest_depth_map(&self) -> Option<Arc<DepthMap>> {
            self.inner.latest_depth_map()
        }

        fn frame_dimensions(&self) -> (u32, u32) {
            self.inner.frame_dimensions()
        }

        fn latest_frame(&self) -> (u64, Detections, (u32, u32)) {
            self.flush_queued();
            self.inner.latest_frame()
        }
    }

    fn cup_packet(x: f32) -> FramePacket {
        FramePacket::new(640, 480).with_detector_output(DetectorOutput {
            result: vec![LabeledDetection::new(
                "cup",
                DetectionBox::new(x - 0.05, 0.45, x + 0.05, 0.55),
            )],
            result_custom: Vec::new(),
        })
    }

    fn marker_packet(id: u32) -> FramePacket {
        FramePacket::new(640, 480).with_markers(vec![MarkerDetection::new(
            id,
            vec![[288.0, 192.0], [352.0, 192.0], [352.0, 240.0], [288.0, 240.0]],
        )])
    }

    #[test]
    fn test_refresh_publishes_snapshot() {
        let frame = SharedFrame::new();
        let service = TrackingService::new(&VisionConfig::default());
        assert!(service.snapshot().is_empty());

        frame.publish(marker_packet(3));
        let snapshot = service.refresh(&frame);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "door_3");
        assert!(Arc::ptr_eq(&snapshot, &service.snapshot()));
    }

    #[test]
    fn test_same_generation_is_noop() {
        let frame = SharedFrame::new();
        let service = TrackingService::new(&VisionConfig::default());
        let t0 = Instant::now();

        frame.publish(marker_packet(3));
        let first = service.refresh_at(&frame, t0);
        let second = service.refresh_at(&frame, t0 + Duration::from_secs(10));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.cycle_count(), 1);
    }

    #[test]
    fn test_empty_generation_ages_out_objects() {
        let frame = SharedFrame::new();
        let service = TrackingService::new(&VisionConfig::default());
        let t0 = Instant::now();

        frame.publish(marker_packet(3));
        service.refresh_at(&frame, t0);

        frame.publish(FramePacket::new(640, 480));
        let snapshot = service.refresh_at(&frame, t0 + Duration::from_millis(400));
        assert_eq!(snapshot.len(), 1);

        frame.publish(FramePacket::new(640, 480));
        let snapshot = service.refresh_at(&frame, t0 + Duration::from_millis(900));
        assert!(snapshot.is_empty());
        assert_eq!(service.num_trackers(), 0);
    }

    #[test]
    fn test_publish_during_refresh_is_applied_once() {
        let frame = RacingFrame {
            inner: SharedFrame::new(),
            queued: Mutex::new(None),
        };
        let service = TrackingService::new(&VisionConfig::default());
        let t0 = Instant::now();

        frame.inner.publish(cup_packet(0.10));
        frame.publish_on_next_read(cup_packet(0.90));

        let first = service.refresh_at(&frame, t0);
        assert_eq!(frame.current_generation(), 2);
        // stamped with the generation of the packet it actually consumed
        assert_abs_diff_eq!(first[0].x, 0.90 * 1000.0 / 1002.0, epsilon = 1e-4);

        let second = service.refresh_at(&frame, t0 + Duration::from_millis(30));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.cycle_count(), 1);
    }

    #[test]
    fn test_reset() {
        let frame = SharedFrame::new();
        let service = TrackingService::new(&VisionConfig::default());
        frame.publish(marker_packet(1));
        service.refresh(&frame);

        service.reset();
        assert!(service.snapshot().is_empty());
        assert_eq!(service.num_trackers(), 0);
    }
}
