use ndarray::Array2;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vision_skill::{
    DepthMap, DetectorOutput, FramePacket, MarkerDetection, SharedFrame, TrackingOperator,
    VisionConfig, VisionSkills,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => VisionConfig::from_json_file(path)?,
        None => VisionConfig::default(),
    };

    let frame = Arc::new(SharedFrame::new());
    let skills = VisionSkills::new(Arc::clone(&frame), &config);
    let mut operator =
        TrackingOperator::spawn(Arc::clone(&frame), Arc::clone(skills.service()), &config.operator)?;

    // depth sensor reports 1.2m everywhere
    let depth = DepthMap::new(Array2::from_elem((48, 64), 1200));

    println!("Publishing 10 frames: a cup drifting right and marker #3...");
    for step in 0..10 {
        let x = 0.40 + 0.01 * step as f32;
        let payload = format!(
            r#"{{"result": [{{"name": "cup", "box": {{"x1": {:.3}, "y1": 0.45, "x2": {:.3}, "y2": 0.55}}}}]}}"#,
            x - 0.05,
            x + 0.05
        );
        let output = DetectorOutput::from_json(&payload)?;
        let marker = MarkerDetection::new(
            3,
            vec![[100.0, 100.0], [160.0, 100.0], [160.0, 150.0], [100.0, 150.0]],
        );

        frame.publish(
            FramePacket::new(640, 480)
                .with_detector_output(output)
                .with_markers(vec![marker])
                .with_depth(depth.clone()),
        );
        thread::sleep(Duration::from_millis(33));
        println!("  frame {}: {}", step, skills.object_list_as_text());
    }

    println!("\nQueries:");
    println!("  is_visible(cup)  = {}", skills.is_visible("cup"));
    println!("  x(cup)           = {:.3}", skills.x("cup")?);
    println!("  distance(cup)    = {}", skills.distance("cup")?);
    println!("  is_visible(door) = {}", skills.is_visible("door"));
    println!("  distance(door)   = {}", skills.distance("door")?);
    match skills.x("bottle") {
        Ok(x) => println!("  x(bottle)        = {:.3}", x),
        Err(e) => println!("  x(bottle)        -> {}", e),
    }

    println!("\nNo more detections; waiting for staleness eviction...");
    for _ in 0..10 {
        frame.publish(FramePacket::new(640, 480));
        thread::sleep(Duration::from_millis(100));
    }
    println!("  objects: {}", skills.object_list_as_text());

    operator.shutdown();
    Ok(())
}
