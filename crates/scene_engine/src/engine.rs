//! Scene Engine
//!
//! One engine is bound to one mount surface. It owns the scene graph and its
//! registry, the camera controller, picking state, the animation clock and a
//! subscription to the camera sync bus. Every operation is a synchronous
//! method; the host drives rendering by calling [`SceneEngine::frame`] once
//! per display refresh while the render loop is running.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver};

use bitflags::bitflags;
use chrono::Utc;
use serde_json::Value;

use crate::animation::{AnimationClock, AnimationMode};
use crate::config::{ConfigError, SceneSettings};
use crate::events::{Event, EventArg, EventHandler, EventSystem, EventType};
use crate::export::collada::{self, Tessellation};
use crate::export::{encode_base64, png_data_url, ExportError, ExportFormat, ExportResponse};
use crate::foundation::collections::ComponentId;
use crate::foundation::time::Timer;
use crate::picking::{CastParams, PickResult, PickingSystem};
use crate::render::{
    create_backend, BackendResult, CameraController, CameraPose, Frame, InsetRenderer, MountSurface,
    RasterBackend, RenderBackend, RenderError, RenderView,
};
use crate::scene::{parse_document, BuildStats, DocumentError, ObjectRegistry, SceneAssembler, SceneGraph, SceneNode};
use crate::sync::{should_apply, CameraState, CameraStateError, CameraSyncBus, Subscription, SyncOutcome};

/// Room used when the caller does not name one
pub const DEFAULT_ROOM: &str = "default";

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine was torn down
    #[error("Scene engine has been destroyed")]
    Destroyed,

    /// `start_render_loop` while a loop is active
    #[error("Render loop is already running")]
    RenderLoopAlreadyRunning,

    /// `stop_render_loop` or `frame` without an active loop
    #[error("Render loop is not running")]
    RenderLoopNotRunning,

    /// Context loss or allocation failure; the engine has been destroyed
    #[error("Fatal rendering failure: {0}")]
    Fatal(String),

    /// Document rejected
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Rendering failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Export failed
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Settings rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Camera state rejected
    #[error("Camera error: {0}")]
    Camera(#[from] CameraStateError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Construction options
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Instance identity; a UUID is generated when absent
    pub id: Option<ComponentId>,
    /// Engine settings
    pub settings: SceneSettings,
    /// Camera sync room
    pub room: String,
    /// Initial document
    pub document: Option<Value>,
    /// Camera state applied once after the first build and re-published
    pub custom_camera_state: Option<CameraState>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            id: None,
            settings: SceneSettings::default(),
            room: DEFAULT_ROOM.to_string(),
            document: None,
            custom_camera_state: None,
        }
    }
}

/// What `rebuild_graph` did
#[derive(Debug)]
pub enum RebuildOutcome {
    /// A new graph replaced the old one
    Built(BuildStats),
    /// The document was unusable; the previous graph stays displayed
    Skipped(DocumentError),
}

/// What one `frame` call did
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// A frame was rendered and presented
    pub rendered: bool,
    /// Result of polling the camera sync bus
    pub sync: SyncOutcome,
    /// Queued exports completed during this frame
    pub exports: usize,
}

/// Pointer drag interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// Orbit around the target
    Rotate,
    /// Translate the view
    Pan,
}

bitflags! {
    /// Reasons the next frame must be drawn
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Dirty: u8 {
        const GRAPH = 1;
        const CAMERA = 1 << 1;
        const HIGHLIGHT = 1 << 2;
        const VISIBILITY = 1 << 3;
        const ANIMATION = 1 << 4;
        const SIZE = 1 << 5;
    }
}

struct Live {
    settings: SceneSettings,
    surface: Box<dyn MountSurface>,
    backend: Box<dyn RenderBackend>,
    controller: CameraController,
    camera_changes: Receiver<CameraPose>,
    subscription: Subscription,
    following: bool,
    assembler: SceneAssembler,
    graph: SceneGraph,
    registry: ObjectRegistry,
    inset: InsetRenderer,
    picking: PickingSystem,
    clock: AnimationClock,
    timer: Timer,
    hidden_names: HashSet<String>,
    events: EventSystem,
    pending_exports: Vec<ExportFormat>,
    custom_camera_state: Option<CameraState>,
    has_built: bool,
    running: bool,
    dirty: Dirty,
}

/// One mounted scene viewer
pub struct SceneEngine {
    id: ComponentId,
    live: Option<Live>,
}

impl std::fmt::Debug for SceneEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneEngine")
            .field("id", &self.id)
            .field("destroyed", &self.live.is_none())
            .finish_non_exhaustive()
    }
}

fn live_ratio(surface: &dyn MountSurface, settings: &SceneSettings) -> f32 {
    (surface.pixel_ratio() * settings.pixel_ratio).max(f32::EPSILON)
}

fn draw(
    backend: &mut dyn RenderBackend,
    graph: &SceneGraph,
    controller: &CameraController,
    settings: &SceneSettings,
    picking: &PickingSystem,
    inset: &InsetRenderer,
) -> BackendResult<Frame> {
    let highlights = picking.highlights(graph);
    let pixel_ratio = controller.pixel_ratio();
    let view = RenderView {
        graph,
        camera: controller.camera(),
        size: controller.device_size(pixel_ratio),
        pixel_ratio,
        settings,
        highlights: &highlights,
        inset: settings.inset.enabled.then_some(inset),
    };
    backend.render(&view)
}

impl Live {
    fn cast_params(&self) -> CastParams {
        CastParams {
            pixel_world_size: self.controller.pixel_world_size(),
            cylinder_segments: self.settings.cylinder_segments,
        }
    }

    /// Adopt the surface's current size and density
    fn sync_viewport(&mut self) {
        let (width, height) = self.surface.size();
        let ratio = live_ratio(self.surface.as_ref(), &self.settings);
        if self.controller.resize_renderer_to_display_size(width, height, ratio) {
            self.dirty |= Dirty::SIZE;
        }
    }

    fn pick(&mut self, x: f32, y: f32) -> Option<PickResult> {
        self.sync_viewport();
        let ray = self.controller.ray_at(x, y);
        PickingSystem::pick(&self.graph, &self.registry, &ray, self.cast_params())
    }

    /// Publish the latest user-driven camera change, if any
    fn flush_camera_changes(&mut self, id: &ComponentId) {
        let Some(pose) = self.camera_changes.try_iter().last() else { return };
        let state = CameraState::from_pose(&pose, Some(id.clone()));
        self.subscription.publish(state.clone());
        self.events.send(Event::new(EventType::CameraStateChanged).with_arg("camera", EventArg::Camera(state)));
        self.dirty |= Dirty::CAMERA;
    }

    fn poll_bus(&mut self, id: &ComponentId) -> SyncOutcome {
        let Some(state) = self.subscription.poll() else {
            return SyncOutcome::NoUpdate;
        };
        let outcome = should_apply(&state, id, self.following);
        if outcome != SyncOutcome::Applied {
            log::trace!("Camera update from bus ignored: {:?}", outcome);
            return outcome;
        }
        match state.to_pose() {
            Ok(pose) => {
                self.controller.update_camera(&pose);
                self.dirty |= Dirty::CAMERA;
                SyncOutcome::Applied
            }
            Err(e) => {
                log::warn!("Ignoring invalid camera state from bus: {}", e);
                SyncOutcome::Invalid(e.to_string())
            }
        }
    }

    /// Recompute toggle visibility from the hidden-name set
    fn apply_visibility(&mut self) {
        for (_, renderable) in self.graph.renderables_mut() {
            renderable.toggled_off = false;
        }
        for name in &self.hidden_names {
            for key in self.registry.keys_for_name(name) {
                if let Some(renderable) = self.graph.renderable_mut(key) {
                    renderable.toggled_off = true;
                }
            }
        }
        self.dirty |= Dirty::VISIBILITY;
    }

    fn refresh_timeline(&mut self) {
        let times = self
            .graph
            .renderables()
            .filter_map(|(_, r)| r.track.as_ref())
            .flat_map(|track| track.times().iter().copied())
            .collect();
        self.clock.set_timeline(times);
    }

    fn apply_animation(&mut self) {
        let Some(time) = self.clock.sample_time() else { return };
        for (_, renderable) in self.graph.renderables_mut() {
            if let Some(track) = &renderable.track {
                renderable.animated = track.sample(time);
            }
        }
    }

    /// Bookkeeping after the graph changed in place
    fn graph_changed(&mut self) {
        self.picking.retain_live(&self.graph);
        self.apply_visibility();
        self.refresh_timeline();
        if self.clock.mode() != AnimationMode::None {
            self.apply_animation();
        }
        if let Err(e) = self.registry.validate() {
            log::warn!("Object registry inconsistent after update: {}", e);
        }
        self.dirty |= Dirty::GRAPH;
    }

    fn fit_camera(&mut self) {
        if let Some(bounds) = self.graph.bounds(self.settings.zoom_to_fit_2d) {
            self.controller.fit_to_bounds(&bounds, self.settings.zoom_to_fit_2d, self.settings.default_zoom);
            self.dirty |= Dirty::CAMERA;
        }
    }

    fn export(&mut self, format: ExportFormat) -> Result<ExportResponse, ExportError> {
        let format = format.ensure_supported()?;
        let data = match format {
            ExportFormat::RasterImage => {
                let live_ratio = self.controller.pixel_ratio();
                self.controller.set_pixel_ratio(self.settings.export_pixel_ratio.max(f32::EPSILON));
                let mut raster = RasterBackend::new();
                let frame = draw(
                    &mut raster,
                    &self.graph,
                    &self.controller,
                    &self.settings,
                    &self.picking,
                    &self.inset,
                );
                self.controller.set_pixel_ratio(live_ratio);
                let frame = frame.map_err(ExportError::from_export_frame)?;
                png_data_url(frame.as_raster().ok_or(ExportError::NotRaster)?)?
            }
            ExportFormat::ColladaDocument => {
                let tessellation = Tessellation {
                    sphere_segments: self.settings.sphere_segments,
                    cylinder_segments: self.settings.cylinder_segments,
                };
                encode_base64(collada::write_document(&self.graph, tessellation, Utc::now()).as_bytes())
            }
            ExportFormat::GltfDocument | ExportFormat::UsdzDocument => {
                return Err(ExportError::NotImplemented(format.as_str()));
            }
        };
        log::info!("Exported {} ({} bytes encoded)", format, data.len());
        Ok(ExportResponse { format, data, timestamp: Utc::now() })
    }
}

impl SceneEngine {
    /// Create an engine bound to `surface` and subscribed to `bus`
    ///
    /// An initial document in `options` is built right away; a missing or
    /// malformed one leaves the scene empty and is logged.
    pub fn create(options: EngineOptions, surface: Box<dyn MountSurface>, bus: &CameraSyncBus) -> EngineResult<Self> {
        let EngineOptions { id, settings, room, document, custom_camera_state } = options;
        settings.validate()?;
        let id = id.unwrap_or_else(ComponentId::generate);

        let (width, height) = surface.size();
        let mut controller = CameraController::new(width, height, live_ratio(surface.as_ref(), &settings));
        let (sender, camera_changes) = mpsc::channel();
        controller.set_dispatch(Box::new(move |pose| {
            let _ = sender.send(pose);
        }));

        let live = Live {
            backend: create_backend(settings.renderer),
            inset: InsetRenderer::new(&settings, None),
            picking: PickingSystem::new(settings.multi_select),
            following: settings.following,
            subscription: bus.subscribe(&room, id.clone()),
            settings,
            surface,
            controller,
            camera_changes,
            assembler: SceneAssembler::new(),
            graph: SceneGraph::new(None),
            registry: ObjectRegistry::new(),
            clock: AnimationClock::new(),
            timer: Timer::new(),
            hidden_names: HashSet::new(),
            events: EventSystem::new(),
            pending_exports: Vec::new(),
            custom_camera_state,
            has_built: false,
            running: false,
            dirty: Dirty::all(),
        };
        log::info!("Scene engine {} created ({} back end, room '{}')", id, live.backend.name(), room);

        let mut engine = Self { id, live: Some(live) };
        if document.is_some() {
            engine.rebuild_graph(document.as_ref())?;
        }
        Ok(engine)
    }

    /// Instance identity stamped on published camera states
    pub const fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Whether `destroy` has run
    pub const fn is_destroyed(&self) -> bool {
        self.live.is_none()
    }

    /// Whether the render loop is active
    pub fn is_running(&self) -> bool {
        self.live.as_ref().is_some_and(|live| live.running)
    }

    /// Live scene graph
    pub fn graph(&self) -> Option<&SceneGraph> {
        self.live.as_ref().map(|live| &live.graph)
    }

    /// Live object registry
    pub fn registry(&self) -> Option<&ObjectRegistry> {
        self.live.as_ref().map(|live| &live.registry)
    }

    /// Current camera pose
    pub fn camera_pose(&self) -> Option<CameraPose> {
        self.live.as_ref().map(|live| live.controller.pose())
    }

    /// Camera controller (read-only)
    pub fn controller(&self) -> Option<&CameraController> {
        self.live.as_ref().map(|live| &live.controller)
    }

    /// Current animation mode
    pub fn animation_mode(&self) -> Option<AnimationMode> {
        self.live.as_ref().map(|live| live.clock.mode())
    }

    /// Names of the currently selected logical objects
    pub fn selected_names(&self) -> Vec<String> {
        let Some(live) = self.live.as_ref() else { return Vec::new() };
        let mut names: Vec<String> = live
            .picking
            .selected()
            .iter()
            .filter_map(|key| live.registry.logical(*key)?.name.clone())
            .collect();
        names.sort();
        names
    }

    fn live_mut(&mut self) -> EngineResult<&mut Live> {
        self.live.as_mut().ok_or(EngineError::Destroyed)
    }

    /// Register an event listener
    pub fn on(&mut self, event_type: EventType, handler: impl EventHandler + 'static) -> EngineResult<()> {
        self.live_mut()?.events.register_handler(event_type, Box::new(handler));
        Ok(())
    }

    /// Replace the scene with a freshly built graph
    ///
    /// A missing or malformed document is not an error: the previous graph
    /// stays in place and the outcome says why the rebuild was skipped.
    pub fn rebuild_graph(&mut self, document: Option<&Value>) -> EngineResult<RebuildOutcome> {
        let id = self.id.clone();
        let live = self.live_mut()?;
        let node = match parse_document(document) {
            Ok(node) => node,
            Err(e) => {
                log::warn!("Scene rebuild skipped: {}", e);
                return Ok(RebuildOutcome::Skipped(e));
            }
        };

        let built = live.assembler.build(&node, &live.settings);
        live.graph.clear();
        live.registry.clear();
        live.picking.clear();
        live.graph = built.graph;
        live.registry = built.registry;
        live.inset = InsetRenderer::new(&live.settings, built.axis.as_ref());
        live.graph_changed();

        if !live.has_built {
            live.has_built = true;
            live.fit_camera();
            if let Some(state) = live.custom_camera_state.take() {
                let pose = state.to_pose()?;
                live.controller.update_camera(&pose);
                live.subscription.publish(CameraState::from_pose(&pose, Some(id.clone())));
            }
        }
        log::info!(
            "Scene engine {} rebuilt graph: {} renderables ({} leaves skipped)",
            id, built.stats.renderables, built.stats.skipped
        );
        Ok(RebuildOutcome::Built(built.stats))
    }

    /// Append a subtree under the root without rebuilding
    pub fn add_nodes(&mut self, node: &SceneNode) -> EngineResult<BuildStats> {
        let live = self.live_mut()?;
        let stats = live.assembler.add_nodes(&mut live.graph, &mut live.registry, node, &live.settings);
        live.graph_changed();
        Ok(stats)
    }

    /// Replace everything named `name` with `node`
    pub fn replace_object(&mut self, name: &str, node: &SceneNode) -> EngineResult<BuildStats> {
        let live = self.live_mut()?;
        let stats = live.assembler.replace_object(&mut live.graph, &mut live.registry, name, node, &live.settings);
        live.graph_changed();
        Ok(stats)
    }

    /// Remove everything named `name`; unknown names are a no-op
    pub fn remove_object_by_name(&mut self, name: &str) -> EngineResult<usize> {
        let live = self.live_mut()?;
        let removed = SceneAssembler::remove_object_by_name(&mut live.graph, &mut live.registry, name);
        if removed > 0 {
            live.graph_changed();
        }
        Ok(removed)
    }

    /// Apply a visibility toggle map (`0` hides a name, anything else shows it)
    ///
    /// Hidden names persist across rebuilds.
    pub fn toggle_visibility(&mut self, toggles: &HashMap<String, u8>) -> EngineResult<()> {
        let live = self.live_mut()?;
        for (name, shown) in toggles {
            if !live.registry.contains_name(name) {
                log::debug!("Visibility toggle for unknown name {:?}", name);
            }
            if *shown == 0 {
                live.hidden_names.insert(name.clone());
            } else {
                live.hidden_names.remove(name);
            }
        }
        live.apply_visibility();
        Ok(())
    }

    /// Programmatic camera update; never published to the bus
    ///
    /// A `following` flag in the state switches whether this engine adopts
    /// bus updates from now on.
    pub fn update_camera(&mut self, state: &CameraState) -> EngineResult<()> {
        let live = self.live_mut()?;
        let pose = state.to_pose()?;
        live.controller.update_camera(&pose);
        if let Some(following) = state.following {
            live.following = following;
        }
        live.dirty |= Dirty::CAMERA;
        Ok(())
    }

    /// Apply a one-shot camera state and publish it as this engine's own
    pub fn apply_custom_camera_state(&mut self, state: &CameraState) -> EngineResult<()> {
        let id = self.id.clone();
        let live = self.live_mut()?;
        let pose = state.to_pose()?;
        live.controller.update_camera(&pose);
        live.subscription.publish(CameraState::from_pose(&pose, Some(id)));
        live.dirty |= Dirty::CAMERA;
        Ok(())
    }

    /// Fit the camera to the visible scene
    pub fn fit_to_scene(&mut self) -> EngineResult<()> {
        self.live_mut()?.fit_camera();
        Ok(())
    }

    /// Change the animation mode; takes effect on the next frame
    pub fn set_animation_mode(&mut self, mode: AnimationMode) -> EngineResult<()> {
        let live = self.live_mut()?;
        live.clock.set_mode(mode);
        live.dirty |= Dirty::ANIMATION;
        Ok(())
    }

    /// Set the slider position in `[0, 1]` (used in SLIDER mode)
    pub fn set_slider(&mut self, value: f32) -> EngineResult<()> {
        let live = self.live_mut()?;
        live.clock.set_slider(value);
        live.dirty |= Dirty::ANIMATION;
        Ok(())
    }

    /// Ray cast at a CSS-pixel position without touching selection state
    pub fn pick(&mut self, x: f32, y: f32) -> EngineResult<Option<PickResult>> {
        Ok(self.live_mut()?.pick(x, y))
    }

    /// Pointer moved: update hover and report the tooltip
    pub fn pointer_move(&mut self, x: f32, y: f32) -> EngineResult<Option<PickResult>> {
        let live = self.live_mut()?;
        let hit = live.pick(x, y);
        if live.picking.hover(hit.as_ref()) {
            let mut event = Event::new(EventType::ObjectHovered);
            if let Some(hit) = &hit {
                event = event
                    .with_arg("object", EventArg::Object(hit.object.clone()))
                    .with_arg("point", EventArg::Point(hit.point));
                if let Some(tooltip) = live.registry.tooltip(hit.renderable) {
                    event = event.with_arg("tooltip", EventArg::Tooltip(tooltip.to_string()));
                }
            }
            live.events.send(event);
            live.dirty |= Dirty::HIGHLIGHT;
        }
        live.events.dispatch();
        Ok(hit)
    }

    /// Pointer clicked with modifier state
    pub fn pointer_click(&mut self, x: f32, y: f32, ctrl: bool, shift: bool) -> EngineResult<Option<PickResult>> {
        let live = self.live_mut()?;
        live.picking.update_modifiers(ctrl, shift);
        let hit = live.pick(x, y);
        if live.picking.click(hit.as_ref()) {
            live.dirty |= Dirty::HIGHLIGHT;
        }
        if let Some(hit) = &hit {
            log::debug!("Clicked {:?} at {:?}", hit.object.name, hit.point);
            live.events.send(
                Event::new(EventType::ObjectClicked)
                    .with_arg("object", EventArg::Object(hit.object.clone()))
                    .with_arg("point", EventArg::Point(hit.point)),
            );
        }
        live.events.dispatch();
        Ok(hit)
    }

    /// Pointer dragged by `(dx, dy)` CSS pixels (user-driven camera change)
    pub fn pointer_drag(&mut self, dx: f32, dy: f32, mode: DragMode) -> EngineResult<()> {
        let id = self.id.clone();
        let live = self.live_mut()?;
        live.sync_viewport();
        match mode {
            DragMode::Rotate => live.controller.rotate(dx, dy),
            DragMode::Pan => live.controller.pan(dx, dy),
        }
        live.flush_camera_changes(&id);
        live.events.dispatch();
        Ok(())
    }

    /// Wheel zoom (user-driven camera change)
    pub fn wheel(&mut self, delta: f32) -> EngineResult<()> {
        let id = self.id.clone();
        let live = self.live_mut()?;
        live.sync_viewport();
        live.controller.wheel(delta);
        live.flush_camera_changes(&id);
        live.events.dispatch();
        Ok(())
    }

    /// Export immediately
    ///
    /// Raster export renders at the export pixel ratio and restores the live
    /// ratio afterwards. Unknown formats fail without touching the viewport.
    pub fn request_export(&mut self, format: &str) -> EngineResult<ExportResponse> {
        let format: ExportFormat = format.parse()?;
        let result = self.live_mut()?.export(format);
        match result {
            Err(ExportError::Render(e)) if e.is_fatal() => Err(self.fail(&e.to_string())),
            other => Ok(other?),
        }
    }

    /// Export on the next frame and deliver the result as an `ExportReady` event
    pub fn queue_export(&mut self, format: &str) -> EngineResult<()> {
        let format = format.parse::<ExportFormat>()?.ensure_supported()?;
        self.live_mut()?.pending_exports.push(format);
        Ok(())
    }

    /// Start the render loop
    pub fn start_render_loop(&mut self) -> EngineResult<()> {
        let live = self.live_mut()?;
        if live.running {
            return Err(EngineError::RenderLoopAlreadyRunning);
        }
        live.running = true;
        live.dirty = Dirty::all();
        live.timer = Timer::new();
        log::info!("Render loop started");
        Ok(())
    }

    /// Stop the render loop
    pub fn stop_render_loop(&mut self) -> EngineResult<()> {
        let live = self.live_mut()?;
        if !live.running {
            return Err(EngineError::RenderLoopNotRunning);
        }
        live.running = false;
        log::info!("Render loop stopped");
        Ok(())
    }

    /// Advance one display refresh
    ///
    /// Order: resize check, bus sync, animation, render, present, queued
    /// exports. A static scene without animation only renders when
    /// something changed.
    pub fn frame(&mut self, delta_seconds: f32) -> EngineResult<FrameOutcome> {
        let id = self.id.clone();
        let live = self.live_mut()?;
        if !live.running {
            return Err(EngineError::RenderLoopNotRunning);
        }
        if live.surface.is_context_lost() {
            return Err(self.fail("rendering context lost"));
        }
        let delta = live.timer.advance(delta_seconds);
        live.sync_viewport();

        live.flush_camera_changes(&id);
        let sync = live.poll_bus(&id);

        let playing = live.clock.mode() == AnimationMode::Play && live.clock.has_timeline();
        if playing {
            live.clock.advance(delta, live.settings.animation.playback_speed);
        }
        if playing || live.dirty.contains(Dirty::ANIMATION) {
            live.apply_animation();
        }

        let needs_render = !live.dirty.is_empty() || !live.settings.static_scene || playing;
        let mut rendered = false;
        if needs_render {
            let frame = draw(
                live.backend.as_mut(),
                &live.graph,
                &live.controller,
                &live.settings,
                &live.picking,
                &live.inset,
            );
            let presented = frame.and_then(|frame| live.surface.present(frame));
            match presented {
                Ok(()) => rendered = true,
                Err(RenderError::EmptyViewport) => log::trace!("Skipping frame for empty viewport"),
                Err(e) if e.is_fatal() => return Err(self.fail(&e.to_string())),
                Err(e) => return Err(e.into()),
            }
            live.dirty = Dirty::empty();
        }

        let pending = std::mem::take(&mut live.pending_exports);
        let mut exports = 0;
        for format in pending {
            match live.export(format) {
                Ok(response) => {
                    exports += 1;
                    live.events.send(Event::new(EventType::ExportReady).with_arg("export", EventArg::Export(response)));
                }
                Err(ExportError::Render(e)) if e.is_fatal() => return Err(self.fail(&e.to_string())),
                Err(e) => log::warn!("Queued {} export failed: {}", format, e),
            }
        }
        live.events.dispatch();

        Ok(FrameOutcome { rendered, sync, exports })
    }

    /// Surface a fatal condition, then tear down
    fn fail(&mut self, reason: &str) -> EngineError {
        log::error!("Scene engine {} fatal: {}", self.id, reason);
        if let Some(live) = self.live.as_mut() {
            live.events.send(Event::new(EventType::Fatal).with_arg("message", EventArg::Message(reason.to_string())));
            live.events.dispatch();
        }
        self.destroy();
        EngineError::Fatal(reason.to_string())
    }

    /// Tear down: stop the loop, leave the bus, drop listeners and pending
    /// exports, release the surface. Calling it again does nothing.
    pub fn destroy(&mut self) {
        let Some(mut live) = self.live.take() else { return };
        live.running = false;
        live.pending_exports.clear();
        live.events.clear();
        live.controller.clear_dispatch();
        live.graph.clear();
        live.registry.clear();
        live.surface.release();
        drop(live);
        log::info!("Scene engine {} destroyed", self.id);
    }
}

impl Drop for SceneEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}
