/// Query facade used by the skill/planning layer
///
/// Every query first refreshes the tracking service (a no-op unless the frame
/// source advanced) and then reads the current immutable object list. Names
/// match by prefix, so `door` finds `door_3`.
use crate::config::{DepthConfig, VisionConfig};
use crate::depth::DepthWindow;
use crate::error::{Result, VisionError};
use crate::frame_source::FrameSource;
use crate::service::TrackingService;
use objtrack::{render_object_list, ObjectSnapshot, Snapshot};
use std::sync::Arc;

pub struct VisionSkills<S: FrameSource> {
    source: Arc<S>,
    service: Arc<TrackingService>,
    depth: DepthWindow,
}

impl<S: FrameSource> VisionSkills<S> {
    pub fn new(source: Arc<S>, config: &VisionConfig) -> Self {
        Self::with_service(source, Arc::new(TrackingService::new(config)), config.depth.clone())
    }

    /// Share a service with another reader (e.g. a background operator)
    pub fn with_service(source: Arc<S>, service: Arc<TrackingService>, depth: DepthConfig) -> Self {
        Self {
            source,
            service,
            depth: DepthWindow::new(depth),
        }
    }

    pub fn service(&self) -> &Arc<TrackingService> {
        &self.service
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Current object list, refreshed if a new frame generation arrived
    pub fn objects(&self) -> Snapshot {
        self.service.refresh(self.source.as_ref())
    }

    /// First object whose name starts with `name`
    pub fn object_info(&self, name: &str) -> Option<ObjectSnapshot> {
        self.objects()
            .iter()
            .find(|object| object.name.starts_with(name))
            .cloned()
    }

    fn require(&self, name: &str, operation: &'static str) -> Result<ObjectSnapshot> {
        self.object_info(name)
            .ok_or_else(|| VisionError::not_visible(name, operation))
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.object_info(name).is_some()
    }

    /// Center x in `(0, 1)`
    pub fn x(&self, name: &str) -> Result<f32> {
        Ok(self.require(name, "object_x")?.x)
    }

    /// Center y in `(0, 1)`
    pub fn y(&self, name: &str) -> Result<f32> {
        Ok(self.require(name, "object_y")?.y)
    }

    pub fn width(&self, name: &str) -> Result<f32> {
        Ok(self.require(name, "object_width")?.width)
    }

    pub fn height(&self, name: &str) -> Result<f32> {
        Ok(self.require(name, "object_height")?.height)
    }

    /// Estimated distance from the depth map.
    ///
    /// Objects outside the trusted depth window, or seen while no depth map
    /// is available, report the configured fallback distance.
    pub fn distance(&self, name: &str) -> Result<i32> {
        let object = self.require(name, "object_distance")?;
        let depth = self.source.latest_depth_map();
        Ok(self.depth.distance(object.x, object.y, depth.as_deref()))
    }

    /// `[name x:.. y:.. width:.. height:.., ...]` for prompt construction
    pub fn object_list_as_text(&self) -> String {
        render_object_list(&self.objects())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_source::{FramePacket, SharedFrame};
    use crate::types::{DepthMap, DetectionBox, DetectorOutput, LabeledDetection, MarkerDetection};
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn learned(name: &str, cx: f32, cy: f32, w: f32, h: f32) -> LabeledDetection {
        LabeledDetection::new(
            name,
            DetectionBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
        )
    }

    fn packet(objects: Vec<LabeledDetection>) -> FramePacket {
        FramePacket::new(640, 480).with_detector_output(DetectorOutput {
            result: objects,
            result_custom: Vec::new(),
        })
    }

    fn skills() -> (Arc<SharedFrame>, VisionSkills<SharedFrame>) {
        let frame = Arc::new(SharedFrame::new());
        let skills = VisionSkills::new(Arc::clone(&frame), &VisionConfig::default());
        (frame, skills)
    }

    #[test]
    fn test_unseen_object_not_visible() {
        let (_frame, skills) = skills();

        assert!(!skills.is_visible("cup"));
        for result in [skills.x("cup"), skills.y("cup"), skills.width("cup"), skills.height("cup")] {
            assert!(result.unwrap_err().is_not_visible());
        }
        let err = skills.distance("cup").unwrap_err();
        assert!(err.is_not_visible());
        assert_eq!(err.to_string(), "object_distance: cup is not in sight");
        assert_eq!(skills.object_list_as_text(), "[]");
    }

    #[test]
    fn test_single_measurement_visible() {
        let (frame, skills) = skills();
        frame.publish(packet(vec![learned("cup", 0.5, 0.5, 0.1, 0.1)]));

        assert!(skills.is_visible("cup"));
        assert_abs_diff_eq!(skills.x("cup").unwrap(), 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(skills.y("cup").unwrap(), 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(skills.width("cup").unwrap(), 0.1, epsilon = 1e-5);
        assert_abs_diff_eq!(skills.height("cup").unwrap(), 0.1, epsilon = 1e-5);
        assert_eq!(
            skills.object_list_as_text(),
            "[cup x:0.50 y:0.50 width:0.10 height:0.10]"
        );
    }

    #[test]
    fn test_marker_prefix_query() {
        let (frame, skills) = skills();
        frame.publish(FramePacket::new(640, 480).with_markers(vec![MarkerDetection::new(
            3,
            vec![[288.0, 192.0], [352.0, 192.0], [352.0, 240.0], [288.0, 240.0]],
        )]));

        assert!(skills.is_visible("door"));
        assert!(skills.is_visible("door_3"));
        assert!(!skills.is_visible("door_4"));
        assert_eq!(skills.object_info("door").unwrap().name, "door_3");
    }

    #[test]
    fn test_distance_fallback_outside_window() {
        let (frame, skills) = skills();
        let depth = DepthMap::new(Array2::from_elem((48, 64), 800));
        frame.publish(packet(vec![learned("cup", 0.05, 0.5, 0.04, 0.1)]).with_depth(depth));

        assert_eq!(skills.distance("cup").unwrap(), 30);
    }

    #[test]
    fn test_distance_sampled_inside_window() {
        let (frame, skills) = skills();
        let depth = DepthMap::new(Array2::from_elem((48, 64), 800));
        frame.publish(packet(vec![learned("cup", 0.5, 0.5, 0.1, 0.1)]).with_depth(depth));

        assert_eq!(skills.distance("cup").unwrap(), 80);
    }

    #[test]
    fn test_distance_without_depth_map() {
        let (frame, skills) = skills();
        frame.publish(packet(vec![learned("cup", 0.5, 0.5, 0.1, 0.1)]));

        assert_eq!(skills.distance("cup").unwrap(), 30);
    }

    #[test]
    fn test_queries_idempotent_within_generation() {
        let (frame, skills) = skills();
        frame.publish(packet(vec![
            learned("cup", 0.4, 0.6, 0.1, 0.1),
            learned("bottle", 0.7, 0.3, 0.05, 0.2),
        ]));

        let first = (skills.x("cup").unwrap(), skills.y("bottle").unwrap(), skills.object_list_as_text());
        let second = (skills.x("cup").unwrap(), skills.y("bottle").unwrap(), skills.object_list_as_text());
        assert_eq!(first, second);
        assert_eq!(skills.service().cycle_count(), 1);
    }

    #[test]
    fn test_both_sources_in_one_list() {
        let (frame, skills) = skills();
        frame.publish(
            packet(vec![learned("cup", 0.5, 0.5, 0.1, 0.1)]).with_markers(vec![
                MarkerDetection::new(
                    7,
                    vec![[288.0, 192.0], [352.0, 192.0], [352.0, 240.0], [288.0, 240.0]],
                ),
            ]),
        );

        let objects = skills.objects();
        let mut names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["cup", "door_7"]);
    }
}
