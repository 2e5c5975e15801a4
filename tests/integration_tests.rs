//! End-to-end tests: sessions, background builds and brush behaviour.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chisel::prelude::*;
use chisel::bvh::coordinator::DEFAULT_QUEUE_CAPACITY;
use chisel::mesh::{primitives, MeshPayload};
use chisel::session::{NoopProbe, SculptProbe};
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;

const WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Applied(String),
    Installed(String, String),
    Failed(String),
    Stale(String),
}

#[derive(Clone, Default)]
struct RecordingProbe {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingProbe {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl SculptProbe for RecordingProbe {
    fn stroke_applied(&self, model: &ModelId, _mesh: &MeshId, _pointer: PointerId) {
        self.events.lock().unwrap().push(Event::Applied(model.to_string()));
    }

    fn index_installed(&self, model: &ModelId, mesh: &MeshId) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Installed(model.to_string(), mesh.to_string()));
    }

    fn build_failed(&self, model: &ModelId, _message: &str) {
        self.events.lock().unwrap().push(Event::Failed(model.to_string()));
    }

    fn stale_response(&self, model: &ModelId) {
        self.events.lock().unwrap().push(Event::Stale(model.to_string()));
    }
}

fn session_with(config: SculptConfig) -> (SculptSession, RecordingProbe) {
    let probe = RecordingProbe::default();
    let session = SculptSession::new(config, Box::new(probe.clone())).unwrap();
    (session, probe)
}

fn overhead_camera() -> CameraView {
    CameraView::from_degrees(Point3::new(0.0, 5.0, 0.0), 50.0, 600.0)
}

// =============================================================================
// Background builds
// =============================================================================

#[test]
fn test_index_is_installed_and_used() {
    let (mut session, probe) = session_with(SculptConfig::default());
    session
        .load_model("scene", vec![primitives::grid("floor", 20, 0.1), primitives::uv_sphere("ball", 12, 16, 0.5)])
        .unwrap();
    session.wait_for_builds(WAIT);

    let scene = ModelId::new("scene");
    assert!(session.has_index(&scene));
    let events = probe.events();
    assert!(events.contains(&Event::Installed("scene".into(), "floor".into())));
    assert!(events.contains(&Event::Installed("scene".into(), "ball".into())));

    let floor = MeshId::new("floor");
    let index = session.spatial_index(&scene, &floor).unwrap();
    let center = Point3::new(0.3, 0.0, -0.2);
    let mut expected = index.query_sphere(&center, 0.25);
    expected.sort_unstable();
    let mut got = session.select_region(&scene, &floor, &center, 0.25).unwrap();
    got.sort_unstable();
    assert_eq!(got, expected);
}

#[test]
fn test_reloaded_model_discards_stale_response() {
    let (mut session, probe) = session_with(SculptConfig::default());
    session.load_model("m", vec![primitives::grid("a", 30, 0.1)]).unwrap();
    session.load_model("m", vec![primitives::grid("b", 10, 0.1)]).unwrap();
    session.wait_for_builds(WAIT);

    let events = probe.events();
    assert!(events.contains(&Event::Stale("m".into())));
    assert_eq!(
        events.iter().filter(|e| matches!(e, Event::Installed(..))).count(),
        1
    );
    assert!(events.contains(&Event::Installed("m".into(), "b".into())));
    assert!(session.mesh(&"m".into(), &"a".into()).is_none());
}

#[test]
fn test_removed_model_discards_response() {
    let (mut session, probe) = session_with(SculptConfig::default());
    session.load_model("gone", vec![primitives::grid("g", 20, 0.1)]).unwrap();
    assert!(session.remove_model(&ModelId::new("gone")));
    assert!(!session.remove_model(&ModelId::new("gone")));

    let deadline = Instant::now() + WAIT;
    while !probe.events().contains(&Event::Stale("gone".into())) {
        assert!(Instant::now() < deadline, "stale response never arrived");
        session.poll_builds();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!session.has_index(&ModelId::new("gone")));
}

#[test]
fn test_failed_build_carries_model_id() {
    let coordinator = IndexBuildCoordinator::spawn(IndexOptions::default(), DEFAULT_QUEUE_CAPACITY).unwrap();
    let payload = MeshPayload {
        mesh_id: MeshId::new("torn"),
        positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        indices: vec![0, 1, 2, 2, 1, 3],
    };
    coordinator.submit(BuildRequest::new("requester", vec![payload])).unwrap();

    match coordinator.recv_timeout(WAIT) {
        Some(BuildResponse::Failed { model_id, message, .. }) => {
            assert_eq!(model_id, ModelId::new("requester"));
            assert!(message.contains("torn"), "{}", message);
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[test]
fn test_full_queue_is_deferred_not_lost() {
    let config = SculptConfig::default().with_queue_capacity(1);
    let (mut session, probe) = session_with(config);
    for i in 0..6 {
        session
            .load_model(format!("model-{}", i), vec![primitives::uv_sphere("s", 40, 60, 1.0)])
            .unwrap();
    }
    session.wait_for_builds(WAIT);
    assert_eq!(session.pending_builds(), 0);
    for i in 0..6 {
        assert!(session.has_index(&ModelId::new(format!("model-{}", i))));
    }
    assert!(!probe.events().iter().any(|e| matches!(e, Event::Failed(_))));
}

// =============================================================================
// Strokes
// =============================================================================

#[test]
fn test_stroke_smooths_before_index_arrives() {
    let (mut session, probe) = session_with(SculptConfig::default());
    let mut bumpy = primitives::grid("floor", 40, 0.05);
    bumpy.set_position(VertexId::new(20 * 41 + 20), Point3::new(0.0, 0.2, 0.0));
    session.load_model("scene", vec![bumpy]).unwrap();
    session.set_active_tool(Some(SculptTool::Smooth));

    let hit = SurfaceHit::new("scene", "floor", Point3::origin());
    let camera = overhead_camera();
    let update = session.pointer_down(PointerId(7), PointerKind::Touch, Some(&hit), &camera);
    assert!(update.applied);
    assert_eq!(update.highlight, HighlightSignal::Show);
    assert!(session.highlight().triangle_count() > 0);

    let peak = session
        .mesh(&"scene".into(), &"floor".into())
        .unwrap()
        .position(VertexId::new(20 * 41 + 20));
    assert!(peak.y < 0.2);

    let stroke = session.pointer_up(PointerId(7)).unwrap();
    assert_eq!(stroke.samples, 1);
    assert_eq!(stroke.applied, 1);
    assert_eq!(probe.events().iter().filter(|e| matches!(e, Event::Applied(_))).count(), 1);
}

#[test]
fn test_hover_only_highlights() {
    let (mut session, _) = session_with(SculptConfig::default());
    session.load_model("scene", vec![primitives::grid("floor", 16, 0.1)]).unwrap();
    session.set_active_tool(Some(SculptTool::Smooth));

    let hit = SurfaceHit::new("scene", "floor", Point3::origin());
    let update = session.pointer_move(PointerId(1), PointerKind::Mouse, Some(&hit), &overhead_camera());
    assert!(!update.applied);
    assert_eq!(update.highlight, HighlightSignal::Show);
    assert_eq!(session.mesh(&"scene".into(), &"floor".into()).unwrap().revision(), 0);

    let update = session.pointer_move(PointerId(1), PointerKind::Mouse, None, &overhead_camera());
    assert_eq!(update.highlight, HighlightSignal::Hide);
    assert!(!session.highlight().is_visible());
}

#[test]
fn test_pointers_have_independent_strokes() {
    let (mut session, _) = session_with(SculptConfig::default());
    session.load_model("scene", vec![primitives::grid("floor", 32, 0.1)]).unwrap();
    session.set_active_tool(Some(SculptTool::Smooth));
    let camera = overhead_camera();

    let left = SurfaceHit::new("scene", "floor", Point3::new(-1.0, 0.0, 0.0));
    let right = SurfaceHit::new("scene", "floor", Point3::new(1.0, 0.0, 0.0));
    session.pointer_down(PointerId(1), PointerKind::Touch, Some(&left), &camera);
    session.pointer_down(PointerId(2), PointerKind::Touch, Some(&right), &camera);
    assert_eq!(session.active_strokes(), 2);

    session.pointer_move(PointerId(2), PointerKind::Touch, Some(&right), &camera);
    assert_eq!(session.stroke(PointerId(1)).unwrap().samples, 1);
    assert_eq!(session.stroke(PointerId(2)).unwrap().samples, 2);

    assert!(session.pointer_cancel(PointerId(1)).is_some());
    assert!(session.pointer_leave(PointerId(2)).is_some());
    assert_eq!(session.active_strokes(), 0);
    assert!(!session.highlight().is_visible());
    assert!(session.pointer_up(PointerId(2)).is_none());
}

#[test]
fn test_deselecting_tool_ends_strokes() {
    let (mut session, _) = session_with(SculptConfig::default());
    session.load_model("scene", vec![primitives::grid("floor", 8, 0.2)]).unwrap();
    session.set_active_tool(Some(SculptTool::Remove));
    assert_eq!(session.active_tool().map(SculptTool::id), Some("remove"));

    let hit = SurfaceHit::new("scene", "floor", Point3::origin());
    let update = session.pointer_down(PointerId(1), PointerKind::Pen, Some(&hit), &overhead_camera());
    assert!(!update.applied);
    assert_eq!(session.active_strokes(), 1);

    session.set_active_tool(None);
    assert_eq!(session.active_strokes(), 0);
    assert!(!session.highlight().is_visible());
    assert_eq!(session.active_tool(), None);
}

#[test]
fn test_rebuild_policies() {
    let camera = overhead_camera();
    let hit = SurfaceHit::new("scene", "floor", Point3::origin());

    for (policy, rebuilds) in [(RebuildPolicy::Never, false), (RebuildPolicy::OnStrokeEnd, true)] {
        let (mut session, probe) = session_with(SculptConfig::default().with_rebuild(policy));
        session.load_model("scene", vec![primitives::grid("floor", 16, 0.1)]).unwrap();
        session.wait_for_builds(WAIT);
        session.set_active_tool(Some(SculptTool::Smooth));

        session.pointer_down(PointerId(1), PointerKind::Touch, Some(&hit), &camera);
        session.pointer_up(PointerId(1));
        assert_eq!(session.pending_builds() == 1, rebuilds, "{:?}", policy);

        session.wait_for_builds(WAIT);
        let installs = probe.events().iter().filter(|e| matches!(e, Event::Installed(..))).count();
        assert_eq!(installs, if rebuilds { 2 } else { 1 }, "{:?}", policy);
    }
}

#[test]
fn test_percent_highlight() {
    let config = SculptConfig::default().with_highlight(HighlightRadius::PercentOfBounds(100.0));
    let (mut session, _) = session_with(config);
    session.load_model("scene", vec![primitives::grid("floor", 4, 0.5)]).unwrap();
    session.set_active_tool(Some(SculptTool::Add));

    let hit = SurfaceHit::new("scene", "floor", Point3::origin());
    session.pointer_move(PointerId(1), PointerKind::Mouse, Some(&hit), &overhead_camera());
    // The whole grid lies within its own bounding sphere.
    assert_eq!(session.highlight().triangle_count(), 32);
}

#[test]
fn test_unknown_mesh_is_ignored() {
    let mut session = SculptSession::new(SculptConfig::default(), Box::new(NoopProbe)).unwrap();
    session.load_model("scene", vec![primitives::grid("floor", 4, 0.5)]).unwrap();
    session.set_active_tool(Some(SculptTool::Smooth));
    let hit = SurfaceHit::new("scene", "ceiling", Point3::origin());
    let update = session.pointer_down(PointerId(1), PointerKind::Mouse, Some(&hit), &overhead_camera());
    assert!(!update.applied);
    assert_eq!(session.active_strokes(), 0);
    assert!(session.select_region(&"scene".into(), &"ceiling".into(), &Point3::origin(), 1.0).is_err());
}

// =============================================================================
// Brush properties
// =============================================================================

proptest! {
    /// Doubling the pixel radius or the distance doubles the world radius.
    #[test]
    fn proptest_radius_is_linear(
        radius_px in 1.0f32..200.0,
        distance in 0.1f32..100.0,
        fov_deg in 10.0f32..120.0,
        height in 100.0f32..4000.0,
    ) {
        let fov = fov_deg.to_radians();
        let r = project_radius(radius_px, fov, height, distance);
        prop_assert!(r > 0.0);
        let tol = r * 1e-5;
        prop_assert!((project_radius(2.0 * radius_px, fov, height, distance) - 2.0 * r).abs() <= tol);
        prop_assert!((project_radius(radius_px, fov, height, 2.0 * distance) - 2.0 * r).abs() <= tol);
    }

    /// A brush that touches no vertex leaves the mesh bit-identical.
    #[test]
    fn proptest_far_brush_is_a_no_op(
        offset in prop::array::uniform3(5.0f32..50.0),
        radius in 0.01f32..2.0,
    ) {
        let mut mesh = primitives::uv_sphere("ball", 8, 12, 1.0)
            .with_transform(WorldTransform::from_scale_translation(Vector3::new(1.5, 1.5, 1.5), Vector3::zeros()));
        let before = mesh.positions().to_vec();
        let center = Point3::from(offset);
        prop_assert!(!smooth_region(&mut mesh, &center, radius, &SmoothOptions::default()));
        prop_assert_eq!(mesh.positions(), &before[..]);
    }
}
