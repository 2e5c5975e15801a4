//! The interactive sculpting session.
//!
//! [`SculptSession`] is what a viewer talks to. It owns the loaded models, the
//! background [`IndexBuildCoordinator`], the active tool and one stroke per pointer,
//! and turns pointer events into mutations and highlight updates:
//!
//! - `pointer_down` on the surface starts a stroke and applies the first sample.
//! - `pointer_move` applies another sample if that pointer has a stroke, otherwise it
//!   only refreshes the hover highlight.
//! - `pointer_up` / `pointer_cancel` / `pointer_leave` end the pointer's stroke.
//!
//! Spatial indices arrive asynchronously. Call [`SculptSession::poll_builds`] once per
//! frame; responses for models that were removed or reloaded since the request was
//! made are discarded. Until a mesh has an index, selection falls back to brute force.
//!
//! ```
//! use chisel::algo::{CameraView, PointerKind};
//! use chisel::mesh::primitives;
//! use chisel::session::{PointerId, SculptSession, SculptTool, SurfaceHit};
//! use nalgebra::Point3;
//!
//! let mut session = SculptSession::with_defaults().unwrap();
//! session.load_model("scene", vec![primitives::grid("floor", 16, 0.25)]).unwrap();
//! session.set_active_tool(Some(SculptTool::Smooth));
//!
//! let camera = CameraView::from_degrees(Point3::new(0.0, 4.0, 0.0), 50.0, 720.0);
//! let hit = SurfaceHit::new("scene", "floor", Point3::origin());
//! let update = session.pointer_down(PointerId(1), PointerKind::Mouse, Some(&hit), &camera);
//! assert!(update.highlight == chisel::algo::HighlightSignal::Show);
//! session.pointer_up(PointerId(1));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nalgebra::Point3;
use tracing::{debug, info, warn};

use crate::algo::highlight::{HighlightSignal, HighlightSynthesizer};
use crate::algo::radius::{highlight_radius_from_percent, BrushRadii, CameraView, PointerKind};
use crate::algo::select::RegionSelector;
use crate::algo::smooth::{smooth_region_with_adjacency, SmoothOptions};
use crate::bvh::coordinator::{BuildRequest, BuildResponse, IndexBuildCoordinator, DEFAULT_QUEUE_CAPACITY};
use crate::bvh::{IndexOptions, SpatialIndex};
use crate::error::{Result, SculptError};
use crate::mesh::{build_adjacency, Adjacency, MeshAsset, MeshId, ModelId, TriangleId};

/// Identifies one pointer (mouse, pen or finger) across its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

/// Sculpting tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SculptTool {
    /// Local smoothing.
    Smooth,
    /// Inflate. Selectable and highlighted, but applies no mutation yet.
    Add,
    /// Deflate. Selectable and highlighted, but applies no mutation yet.
    Remove,
}

impl SculptTool {
    /// Every tool, in menu order.
    pub const ALL: [SculptTool; 3] = [SculptTool::Smooth, SculptTool::Add, SculptTool::Remove];

    /// Stable identifier.
    pub fn id(self) -> &'static str {
        match self {
            SculptTool::Smooth => "smooth",
            SculptTool::Add => "add",
            SculptTool::Remove => "remove",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            SculptTool::Smooth => "Smooth",
            SculptTool::Add => "Add",
            SculptTool::Remove => "Remove",
        }
    }

    /// Look a tool up by [`SculptTool::id`].
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }
}

impl fmt::Display for SculptTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a pointer ray met a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceHit {
    /// Model that was hit.
    pub model_id: ModelId,
    /// Mesh within the model.
    pub mesh_id: MeshId,
    /// Hit point in world space.
    pub point: Point3<f32>,
}

impl SurfaceHit {
    /// Create a hit.
    pub fn new(model_id: impl Into<ModelId>, mesh_id: impl Into<MeshId>, point: Point3<f32>) -> Self {
        Self {
            model_id: model_id.into(),
            mesh_id: mesh_id.into(),
            point,
        }
    }
}

/// When to rebuild a model's spatial index after sculpting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebuildPolicy {
    /// Keep the index from load time. Centroids drift as the surface moves.
    #[default]
    Never,
    /// Submit a rebuild when a stroke that changed the mesh ends. If that build
    /// fails, the model's old indices are dropped rather than kept over moved vertices.
    OnStrokeEnd,
}

/// How big the hover highlight is.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HighlightRadius {
    /// The brush's projected world radius.
    #[default]
    Brush,
    /// A percentage (0 to 100) of the mesh's world bounding-sphere radius.
    PercentOfBounds(f32),
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SculptConfig {
    /// Pixel radius per pointer kind.
    pub radii: BrushRadii,
    /// Smoothing options.
    pub smooth: SmoothOptions,
    /// Spatial index build options.
    pub index: IndexOptions,
    /// Index rebuild policy (default: never).
    pub rebuild: RebuildPolicy,
    /// Highlight sizing (default: brush radius).
    pub highlight: HighlightRadius,
    /// Bound on queued index builds (default: 16).
    pub queue_capacity: usize,
}

impl Default for SculptConfig {
    fn default() -> Self {
        Self {
            radii: BrushRadii::default(),
            smooth: SmoothOptions::default(),
            index: IndexOptions::default(),
            rebuild: RebuildPolicy::default(),
            highlight: HighlightRadius::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SculptConfig {
    /// Set the brush radii.
    pub fn with_radii(mut self, radii: BrushRadii) -> Self {
        self.radii = radii;
        self
    }

    /// Set the smoothing options.
    pub fn with_smooth(mut self, smooth: SmoothOptions) -> Self {
        self.smooth = smooth;
        self
    }

    /// Set the index options.
    pub fn with_index(mut self, index: IndexOptions) -> Self {
        self.index = index;
        self
    }

    /// Set the rebuild policy.
    pub fn with_rebuild(mut self, rebuild: RebuildPolicy) -> Self {
        self.rebuild = rebuild;
        self
    }

    /// Set the highlight sizing.
    pub fn with_highlight(mut self, highlight: HighlightRadius) -> Self {
        self.highlight = highlight;
        self
    }

    /// Set the build queue bound (at least 1).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

/// Observation hooks, mainly for tests and tooling. Every method defaults to a no-op.
pub trait SculptProbe {
    /// A stroke sample moved vertices.
    fn stroke_applied(&self, _model: &ModelId, _mesh: &MeshId, _pointer: PointerId) {}

    /// A spatial index was installed for a mesh.
    fn index_installed(&self, _model: &ModelId, _mesh: &MeshId) {}

    /// An index build failed.
    fn build_failed(&self, _model: &ModelId, _message: &str) {}

    /// A build response arrived for a model that was removed or reloaded.
    fn stale_response(&self, _model: &ModelId) {}
}

/// A probe that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

impl SculptProbe for NoopProbe {}

/// An in-progress stroke for one pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    /// The pointer driving the stroke.
    pub pointer: PointerId,
    /// Its device kind.
    pub kind: PointerKind,
    /// The tool the stroke was started with.
    pub tool: SculptTool,
    /// The model under the most recent sample.
    pub model_id: ModelId,
    /// The mesh under the most recent sample.
    pub mesh_id: MeshId,
    /// World position of the most recent sample.
    pub last_point: Point3<f32>,
    /// Samples received.
    pub samples: usize,
    /// Samples that moved vertices.
    pub applied: usize,
}

/// What one pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeUpdate {
    /// Whether the mesh was mutated.
    pub applied: bool,
    /// What to do with the highlight overlay.
    pub highlight: HighlightSignal,
}

impl StrokeUpdate {
    fn hidden() -> Self {
        Self {
            applied: false,
            highlight: HighlightSignal::Hide,
        }
    }
}

struct MeshEntry {
    asset: MeshAsset,
    index: Option<Arc<SpatialIndex>>,
    adjacency: Option<Adjacency>,
}

impl MeshEntry {
    fn new(asset: MeshAsset) -> Self {
        Self {
            asset,
            index: None,
            adjacency: None,
        }
    }

    /// Smooth with local normal updates, building adjacency on first use.
    fn smooth(&mut self, center: &Point3<f32>, radius: f32, options: &SmoothOptions) -> bool {
        let asset = &mut self.asset;
        let adjacency = self
            .adjacency
            .get_or_insert_with(|| build_adjacency(asset.indices(), asset.num_vertices()));
        smooth_region_with_adjacency(asset, center, radius, options, adjacency)
    }
}

struct ModelEntry {
    meshes: Vec<MeshEntry>,
    generation: u64,
    pending: bool,
}

impl ModelEntry {
    fn mesh(&self, mesh_id: &MeshId) -> Option<&MeshEntry> {
        self.meshes.iter().find(|m| m.asset.id() == mesh_id)
    }

    fn mesh_mut(&mut self, mesh_id: &MeshId) -> Option<&mut MeshEntry> {
        self.meshes.iter_mut().find(|m| m.asset.id() == mesh_id)
    }
}

/// Models, tools, strokes and background index builds for one viewer.
pub struct SculptSession {
    config: SculptConfig,
    coordinator: IndexBuildCoordinator,
    probe: Box<dyn SculptProbe>,
    models: HashMap<ModelId, ModelEntry>,
    strokes: HashMap<PointerId, Stroke>,
    active_tool: Option<SculptTool>,
    highlight: HighlightSynthesizer,
    selector: RegionSelector,
    deferred: Vec<ModelId>,
    next_generation: u64,
}

impl SculptSession {
    /// Start a session and its build worker.
    pub fn new(config: SculptConfig, probe: Box<dyn SculptProbe>) -> Result<Self> {
        let coordinator = IndexBuildCoordinator::spawn(config.index.clone(), config.queue_capacity)?;
        Ok(Self {
            config,
            coordinator,
            probe,
            models: HashMap::new(),
            strokes: HashMap::new(),
            active_tool: None,
            highlight: HighlightSynthesizer::new(),
            selector: RegionSelector::new(),
            deferred: Vec::new(),
            next_generation: 0,
        })
    }

    /// Start a session with default configuration and no probe.
    pub fn with_defaults() -> Result<Self> {
        Self::new(SculptConfig::default(), Box::new(NoopProbe))
    }

    /// The session configuration.
    pub fn config(&self) -> &SculptConfig {
        &self.config
    }

    // ---- Models --------------------------------------------------------------

    /// Add a model (replacing any model with the same id) and queue its index build.
    ///
    /// Meshes are usable immediately; selection is brute force until the index arrives.
    pub fn load_model(&mut self, model_id: impl Into<ModelId>, meshes: Vec<MeshAsset>) -> Result<()> {
        let model_id = model_id.into();
        let triangles: usize = meshes.iter().map(|m| m.num_triangles()).sum();
        info!(model = %model_id, meshes = meshes.len(), triangles, "loading model");

        self.strokes.retain(|_, s| s.model_id != model_id);
        self.models.insert(
            model_id.clone(),
            ModelEntry {
                meshes: meshes.into_iter().map(MeshEntry::new).collect(),
                generation: 0,
                pending: false,
            },
        );
        self.submit_build(&model_id)
    }

    /// Remove a model. Pending build responses for it will be discarded.
    pub fn remove_model(&mut self, model_id: &ModelId) -> bool {
        self.strokes.retain(|_, s| &s.model_id != model_id);
        self.deferred.retain(|id| id != model_id);
        let removed = self.models.remove(model_id).is_some();
        if removed {
            debug!(model = %model_id, "model removed");
        }
        removed
    }

    /// Queue a fresh index build from the model's current positions.
    pub fn request_rebuild(&mut self, model_id: &ModelId) -> Result<()> {
        self.submit_build(model_id)
    }

    fn submit_build(&mut self, model_id: &ModelId) -> Result<()> {
        let entry = self
            .models
            .get_mut(model_id)
            .ok_or_else(|| SculptError::UnknownModel(model_id.clone()))?;

        self.next_generation += 1;
        entry.generation = self.next_generation;
        entry.pending = true;

        let request = BuildRequest::new(model_id.clone(), entry.meshes.iter().map(|m| m.asset.snapshot()).collect())
            .with_generation(entry.generation);

        match self.coordinator.submit(request) {
            Ok(()) => Ok(()),
            Err(SculptError::BuildQueueFull { .. }) => {
                debug!(model = %model_id, "build queue full, deferring");
                if !self.deferred.contains(model_id) {
                    self.deferred.push(model_id.clone());
                }
                Ok(())
            }
            Err(err) => {
                entry.pending = false;
                Err(err)
            }
        }
    }

    /// Install every finished build. Returns the number of responses handled.
    pub fn poll_builds(&mut self) -> usize {
        let mut handled = 0;
        while let Some(response) = self.coordinator.try_recv() {
            self.handle_response(response);
            handled += 1;
        }
        self.flush_deferred();
        handled
    }

    /// Block until no model has a build outstanding or `timeout` elapses.
    /// Returns the number of responses handled.
    pub fn wait_for_builds(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut handled = self.poll_builds();
        while self.pending_builds() > 0 {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let step = (deadline - now).min(Duration::from_millis(20));
            if let Some(response) = self.coordinator.recv_timeout(step) {
                self.handle_response(response);
                handled += 1;
            }
            handled += self.poll_builds();
        }
        handled
    }

    /// Models with a build submitted or deferred but not yet answered.
    pub fn pending_builds(&self) -> usize {
        self.models.values().filter(|m| m.pending).count()
    }

    fn flush_deferred(&mut self) {
        for model_id in std::mem::take(&mut self.deferred) {
            if let Err(err) = self.submit_build(&model_id) {
                warn!(model = %model_id, error = %err, "failed to resubmit deferred build");
            }
        }
    }

    fn handle_response(&mut self, response: BuildResponse) {
        let model_id = response.model_id().clone();
        let generation = response.generation();
        let Some(entry) = self.models.get_mut(&model_id).filter(|m| m.generation == generation) else {
            debug!(model = %model_id, generation, "discarding stale build response");
            self.probe.stale_response(&model_id);
            return;
        };
        entry.pending = false;

        match response {
            BuildResponse::Complete { meshes, elapsed, .. } => {
                let mut installed = 0;
                for built in meshes {
                    let Some(mesh) = entry.mesh_mut(built.mesh_id()) else {
                        continue;
                    };
                    if mesh.asset.num_triangles() != built.index.num_triangles() {
                        warn!(model = %model_id, mesh = %mesh.asset.id(), "index does not match mesh topology");
                        continue;
                    }
                    mesh.index = Some(Arc::new(built.index));
                    self.probe.index_installed(&model_id, mesh.asset.id());
                    installed += 1;
                }
                info!(
                    model = %model_id,
                    installed,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "spatial indices installed"
                );
            }
            BuildResponse::Failed { message, .. } => {
                // Any installed index predates the failed snapshot; selection falls back
                // to brute force until a later build succeeds.
                for mesh in &mut entry.meshes {
                    mesh.index = None;
                }
                warn!(model = %model_id, %message, "spatial index build failed");
                self.probe.build_failed(&model_id, &message);
            }
        }
    }

    /// Loaded model ids, in no particular order.
    pub fn model_ids(&self) -> impl Iterator<Item = &ModelId> {
        self.models.keys()
    }

    /// A mesh of a loaded model.
    pub fn mesh(&self, model_id: &ModelId, mesh_id: &MeshId) -> Option<&MeshAsset> {
        self.models.get(model_id)?.mesh(mesh_id).map(|m| &m.asset)
    }

    /// The installed spatial index of a mesh, if its build has arrived.
    pub fn spatial_index(&self, model_id: &ModelId, mesh_id: &MeshId) -> Option<Arc<SpatialIndex>> {
        self.models.get(model_id)?.mesh(mesh_id)?.index.clone()
    }

    /// Whether every mesh of a model has an index.
    pub fn has_index(&self, model_id: &ModelId) -> bool {
        self.models
            .get(model_id)
            .is_some_and(|m| m.meshes.iter().all(|mesh| mesh.index.is_some()))
    }

    /// Triangles of a mesh within `radius` of a world point (indexed when possible).
    pub fn select_region(
        &mut self,
        model_id: &ModelId,
        mesh_id: &MeshId,
        center: &Point3<f32>,
        radius: f32,
    ) -> Result<Vec<TriangleId>> {
        let mesh = self
            .models
            .get(model_id)
            .ok_or_else(|| SculptError::UnknownModel(model_id.clone()))?
            .mesh(mesh_id)
            .ok_or_else(|| SculptError::invalid_param("mesh_id", mesh_id, "not part of the model"))?;
        Ok(self
            .selector
            .select_triangles(&mesh.asset, mesh.index.as_deref(), center, radius))
    }

    // ---- Tools ---------------------------------------------------------------

    /// Select a tool, or `None` to leave sculpt mode. Leaving ends every stroke and
    /// hides the highlight.
    pub fn set_active_tool(&mut self, tool: Option<SculptTool>) {
        if tool.is_none() {
            self.strokes.clear();
            self.highlight.clear();
        }
        if tool != self.active_tool {
            debug!(tool = ?tool.map(SculptTool::id), "active tool changed");
        }
        self.active_tool = tool;
    }

    /// The selected tool.
    pub fn active_tool(&self) -> Option<SculptTool> {
        self.active_tool
    }

    // ---- Pointers ------------------------------------------------------------

    /// Start a stroke. A press that misses every mesh leaves sculpt mode.
    pub fn pointer_down(
        &mut self,
        pointer: PointerId,
        kind: PointerKind,
        hit: Option<&SurfaceHit>,
        camera: &CameraView,
    ) -> StrokeUpdate {
        let Some(tool) = self.active_tool else {
            return StrokeUpdate::hidden();
        };
        let Some(hit) = hit else {
            self.set_active_tool(None);
            return StrokeUpdate::hidden();
        };
        if self.mesh(&hit.model_id, &hit.mesh_id).is_none() {
            self.highlight.clear();
            return StrokeUpdate::hidden();
        }

        self.strokes.insert(
            pointer,
            Stroke {
                pointer,
                kind,
                tool,
                model_id: hit.model_id.clone(),
                mesh_id: hit.mesh_id.clone(),
                last_point: hit.point,
                samples: 0,
                applied: 0,
            },
        );
        self.apply_sample(pointer, kind, tool, hit, camera)
    }

    /// Continue a stroke, or hover if the pointer is not pressed.
    pub fn pointer_move(
        &mut self,
        pointer: PointerId,
        kind: PointerKind,
        hit: Option<&SurfaceHit>,
        camera: &CameraView,
    ) -> StrokeUpdate {
        if self.active_tool.is_none() {
            self.highlight.clear();
            return StrokeUpdate::hidden();
        }
        let Some(hit) = hit else {
            self.highlight.clear();
            return StrokeUpdate::hidden();
        };
        if self.mesh(&hit.model_id, &hit.mesh_id).is_none() {
            self.highlight.clear();
            return StrokeUpdate::hidden();
        }

        if let Some(stroke) = self.strokes.get_mut(&pointer) {
            stroke.model_id = hit.model_id.clone();
            stroke.mesh_id = hit.mesh_id.clone();
            stroke.last_point = hit.point;
            let tool = stroke.tool;
            return self.apply_sample(pointer, kind, tool, hit, camera);
        }

        let highlight = self.update_highlight(kind, hit, camera);
        StrokeUpdate {
            applied: false,
            highlight,
        }
    }

    /// End a stroke. Returns it if the pointer had one.
    pub fn pointer_up(&mut self, pointer: PointerId) -> Option<Stroke> {
        self.end_stroke(pointer)
    }

    /// The platform cancelled the pointer; ends its stroke like `pointer_up`.
    pub fn pointer_cancel(&mut self, pointer: PointerId) -> Option<Stroke> {
        self.end_stroke(pointer)
    }

    /// The pointer left the viewport: hide the highlight and end its stroke.
    pub fn pointer_leave(&mut self, pointer: PointerId) -> Option<Stroke> {
        self.highlight.clear();
        self.end_stroke(pointer)
    }

    /// Number of pointers with a stroke in progress.
    pub fn active_strokes(&self) -> usize {
        self.strokes.len()
    }

    /// The stroke of a pointer.
    pub fn stroke(&self, pointer: PointerId) -> Option<&Stroke> {
        self.strokes.get(&pointer)
    }

    /// The hover/stroke highlight overlay.
    pub fn highlight(&self) -> &HighlightSynthesizer {
        &self.highlight
    }

    fn end_stroke(&mut self, pointer: PointerId) -> Option<Stroke> {
        let stroke = self.strokes.remove(&pointer)?;
        debug!(
            pointer = pointer.0,
            model = %stroke.model_id,
            samples = stroke.samples,
            applied = stroke.applied,
            "stroke ended"
        );
        if stroke.applied > 0 && self.config.rebuild == RebuildPolicy::OnStrokeEnd {
            if let Err(err) = self.submit_build(&stroke.model_id) {
                warn!(model = %stroke.model_id, error = %err, "failed to queue index rebuild");
            }
        }
        Some(stroke)
    }

    fn brush_radius(&self, kind: PointerKind, hit: &SurfaceHit, camera: &CameraView) -> f32 {
        camera.world_radius_at(&hit.point, self.config.radii.for_pointer(kind))
    }

    fn update_highlight(&mut self, kind: PointerKind, hit: &SurfaceHit, camera: &CameraView) -> HighlightSignal {
        let brush = self.brush_radius(kind, hit, camera);
        let Some(entry) = self.models.get(&hit.model_id).and_then(|m| m.mesh(&hit.mesh_id)) else {
            return self.highlight.clear();
        };
        let radius = match self.config.highlight {
            HighlightRadius::Brush => brush,
            HighlightRadius::PercentOfBounds(percent) => highlight_radius_from_percent(&entry.asset, percent),
        };
        self.highlight.update(&entry.asset, &hit.point, radius)
    }

    fn apply_sample(
        &mut self,
        pointer: PointerId,
        kind: PointerKind,
        tool: SculptTool,
        hit: &SurfaceHit,
        camera: &CameraView,
    ) -> StrokeUpdate {
        let radius = self.brush_radius(kind, hit, camera);
        let applied = match tool {
            SculptTool::Smooth => self.smooth_at(hit, radius),
            SculptTool::Add | SculptTool::Remove => false,
        };

        if let Some(stroke) = self.strokes.get_mut(&pointer) {
            stroke.samples += 1;
            if applied {
                stroke.applied += 1;
            }
        }
        if applied {
            self.probe.stroke_applied(&hit.model_id, &hit.mesh_id, pointer);
        }

        let highlight = self.update_highlight(kind, hit, camera);
        StrokeUpdate { applied, highlight }
    }

    fn smooth_at(&mut self, hit: &SurfaceHit, radius: f32) -> bool {
        let options = &self.config.smooth;
        self.models
            .get_mut(&hit.model_id)
            .and_then(|m| m.mesh_mut(&hit.mesh_id))
            .is_some_and(|mesh| mesh.smooth(&hit.point, radius, options))
    }
}

impl fmt::Debug for SculptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SculptSession")
            .field("models", &self.models.len())
            .field("strokes", &self.strokes.len())
            .field("active_tool", &self.active_tool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives;

    const WAIT: Duration = Duration::from_secs(30);

    fn camera() -> CameraView {
        CameraView::from_degrees(Point3::new(0.0, 10.0, 0.0), 60.0, 600.0)
    }

    #[test]
    fn test_tool_ids_and_labels() {
        assert_eq!(SculptTool::Smooth.id(), "smooth");
        assert_eq!(SculptTool::Add.label(), "Add");
        assert_eq!(SculptTool::from_id("remove"), Some(SculptTool::Remove));
        assert_eq!(SculptTool::from_id("pinch"), None);
        assert_eq!(SculptTool::Smooth.to_string(), "Smooth");
    }

    #[test]
    fn test_config_defaults() {
        let config = SculptConfig::default();
        assert_eq!(config.rebuild, RebuildPolicy::Never);
        assert_eq!(config.highlight, HighlightRadius::Brush);
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.smooth.blend, 0.35);
        assert_eq!(config.index.leaf_size, 32);
        assert_eq!(SculptConfig::default().with_queue_capacity(0).queue_capacity, 1);
    }

    #[test]
    fn test_no_tool_means_no_stroke() {
        let mut session = SculptSession::with_defaults().unwrap();
        session.load_model("m", vec![primitives::grid("g", 8, 0.5)]).unwrap();
        let hit = SurfaceHit::new("m", "g", Point3::origin());
        let update = session.pointer_down(PointerId(1), PointerKind::Mouse, Some(&hit), &camera());
        assert_eq!(update, StrokeUpdate::hidden());
        assert_eq!(session.active_strokes(), 0);
    }

    #[test]
    fn test_miss_leaves_sculpt_mode() {
        let mut session = SculptSession::with_defaults().unwrap();
        session.set_active_tool(Some(SculptTool::Smooth));
        session.pointer_down(PointerId(1), PointerKind::Touch, None, &camera());
        assert_eq!(session.active_tool(), None);
    }

    #[test]
    fn test_add_tool_highlights_without_mutating() {
        let mut session = SculptSession::with_defaults().unwrap();
        session.load_model("m", vec![primitives::grid("g", 8, 0.5)]).unwrap();
        session.set_active_tool(Some(SculptTool::Add));
        let hit = SurfaceHit::new("m", "g", Point3::origin());
        let update = session.pointer_down(PointerId(3), PointerKind::Pen, Some(&hit), &camera());
        assert!(!update.applied);
        assert_eq!(update.highlight, HighlightSignal::Show);
        let mesh = session.mesh(&"m".into(), &"g".into()).unwrap();
        assert_eq!(mesh.revision(), 0);
    }

    #[test]
    fn test_unknown_model_rebuild() {
        let mut session = SculptSession::with_defaults().unwrap();
        assert!(matches!(
            session.request_rebuild(&ModelId::new("ghost")),
            Err(SculptError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_failed_rebuild_drops_old_index() {
        let config = SculptConfig::default().with_rebuild(RebuildPolicy::OnStrokeEnd);
        let mut session = SculptSession::new(config, Box::new(NoopProbe)).unwrap();
        let model = ModelId::new("m");
        session.load_model("m", vec![primitives::grid("g", 8, 0.5)]).unwrap();
        session.wait_for_builds(WAIT);
        assert!(session.has_index(&model));

        session.set_active_tool(Some(SculptTool::Smooth));
        let hit = SurfaceHit::new("m", "g", Point3::origin());
        assert!(session.pointer_down(PointerId(1), PointerKind::Touch, Some(&hit), &camera()).applied);
        session.pointer_up(PointerId(1));
        assert_eq!(session.pending_builds(), 1);

        let generation = session.models[&model].generation;
        session.handle_response(BuildResponse::Failed {
            model_id: model.clone(),
            generation,
            message: "worker gave up".to_string(),
        });
        assert_eq!(session.pending_builds(), 0);
        assert!(session.spatial_index(&model, &"g".into()).is_none());

        // Selection still works, brute force.
        let hits = session.select_region(&model, &"g".into(), &Point3::origin(), 0.3).unwrap();
        assert!(!hits.is_empty());
    }

    #[test]
    fn test_index_arrives() {
        let mut session = SculptSession::with_defaults().unwrap();
        session.load_model("m", vec![primitives::grid("g", 8, 0.5)]).unwrap();
        assert_eq!(session.pending_builds(), 1);
        session.wait_for_builds(WAIT);
        assert_eq!(session.pending_builds(), 0);
        assert!(session.has_index(&"m".into()));
    }
}
