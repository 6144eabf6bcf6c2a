use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::cube::{
    Camera3D, HostError, Lighting, RenderSurfaceHost, SurfaceState, Viewport, DEFAULT_FRAME_MARGIN,
};

use super::input::{ActionStates, KeyEdge};
use super::metrics::MetricsAccumulator;
use super::perf_stats::PerfStats;
use super::rendering::{next_capture_path, write_frame_png, CaptureError};
use super::{InputAction, InputSnapshot, MetricsHandle, Renderer, Scene, SceneCommand};

pub const SLOW_FRAME_ENV_VAR: &str = "CUBE_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    /// Initial camera; its distance is replaced when the lattice is framed.
    pub camera: Camera3D,
    pub lighting: Lighting,
    pub frame_margin: f32,
    pub orbit_speed_radians_per_second: f32,
    /// Distance multiplier per zoom step, `> 1.0`.
    pub zoom_step_factor: f32,
    pub capture_dir: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Cube Lattice".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: Some(60),
            camera: Camera3D::default(),
            lighting: Lighting::default(),
            frame_margin: DEFAULT_FRAME_MARGIN,
            orbit_speed_radians_per_second: 1.8,
            zoom_step_factor: 1.12,
            capture_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    run_app_with_metrics(config, scene, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let camera_controls = CameraControls::from_config(&config);

    let viewport = renderer.viewport();
    let mut input_collector = InputCollector::new(viewport.width, viewport.height);
    let mut host = RenderSurfaceHost::new(viewport)
        .with_lighting(config.lighting.clone())
        .with_frame_margin(config.frame_margin);
    *host.camera_mut() = config.camera;
    let mut tick_state = TickState::default();

    scene.load(&mut host);
    host.frame_camera_to_lattice();
    tick_state.sync_scene(&*scene, &mut host);
    info!(state = ?host.state(), "scene_loaded");

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    host.set_viewport(Viewport::new(new_size.width, new_size.height));
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    host.set_viewport(Viewport::new(size.width, size.height));
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor_position_px(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => {
                    input_collector.clear_cursor_position();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    input_collector.handle_mouse_wheel(delta);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        // Debug perturbation only; not the FPS cap.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = tick_state.run_tick(
                            &mut *scene,
                            &mut host,
                            &input_snapshot,
                            fixed_dt_seconds,
                            camera_controls,
                        );
                        metrics_accumulator.record_tick();
                        if command == SceneCommand::Quit {
                            info!(reason = "scene_command", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    if renderer.upload_instances(&mut host) {
                        metrics_accumulator.record_upload();
                    }
                    let render_started = Instant::now();
                    if let Err(error) = renderer.render(&host) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    tick_state.perf.record_render(render_started.elapsed());
                    last_present_instant = Instant::now();

                    if input_collector.take_capture_pressed() {
                        match capture_frame(&renderer, config.capture_dir.as_ref()) {
                            Ok(path) => info!(path = %path.display(), "frame_captured"),
                            Err(error) => warn!(error = %error, "frame_capture_failed"),
                        }
                    }

                    let next_title = scene.debug_title(&host);
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) =
                        metrics_accumulator.maybe_snapshot(now, tick_state.perf.snapshot())
                    {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            sync_ms = snapshot.sync_ms,
                            pick_ms = snapshot.pick_ms,
                            render_ms = snapshot.render_ms,
                            uploads = snapshot.uploads,
                            state = ?host.state(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload(&mut host);
                host.unmount();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn capture_frame(
    renderer: &Renderer,
    capture_dir: Option<&PathBuf>,
) -> Result<PathBuf, CaptureError> {
    let dir = capture_dir.cloned().unwrap_or_else(|| PathBuf::from("."));
    let path = next_capture_path(&dir)?;
    let viewport = renderer.viewport();
    write_frame_png(&path, viewport.width, viewport.height, renderer.frame_rgba())?;
    Ok(path)
}

#[derive(Debug, Clone, Copy)]
struct CameraControls {
    orbit_speed_radians_per_second: f32,
    zoom_step_factor: f32,
}

impl CameraControls {
    fn from_config(config: &LoopConfig) -> Self {
        let zoom_step_factor = if config.zoom_step_factor.is_finite() && config.zoom_step_factor > 1.0
        {
            config.zoom_step_factor
        } else {
            LoopConfig::default().zoom_step_factor
        };
        Self {
            orbit_speed_radians_per_second: config.orbit_speed_radians_per_second.max(0.0),
            zoom_step_factor,
        }
    }
}

fn apply_camera_input(
    camera: &mut Camera3D,
    input: &InputSnapshot,
    fixed_dt_seconds: f32,
    controls: CameraControls,
) {
    let axis = |negative: InputAction, positive: InputAction| -> f32 {
        (input.is_down(positive) as i8 - input.is_down(negative) as i8) as f32
    };
    let step = controls.orbit_speed_radians_per_second * fixed_dt_seconds;
    let yaw = axis(InputAction::OrbitLeft, InputAction::OrbitRight) * step;
    let pitch = axis(InputAction::OrbitDown, InputAction::OrbitUp) * step;
    if yaw != 0.0 || pitch != 0.0 {
        camera.orbit(yaw, pitch);
    }

    let zoom_steps = input.zoom_delta_steps();
    if zoom_steps != 0 {
        camera.zoom_by(controls.zoom_step_factor.powi(-zoom_steps));
    }
}

/// Per-loop state that outlives a single tick.
#[derive(Debug, Default)]
struct TickState {
    perf: PerfStats,
    last_sync_error: Option<HostError>,
}

impl TickState {
    /// Camera input, scene update, resync, then click and hover resolution
    /// against the freshly synced surface.
    fn run_tick(
        &mut self,
        scene: &mut dyn Scene,
        host: &mut RenderSurfaceHost,
        input: &InputSnapshot,
        fixed_dt_seconds: f32,
        controls: CameraControls,
    ) -> SceneCommand {
        apply_camera_input(host.camera_mut(), input, fixed_dt_seconds, controls);
        let command = scene.update(fixed_dt_seconds, input, host);
        self.sync_scene(scene, host);

        if input.left_click_pressed() {
            if let Some(cursor) = input.cursor_position_px() {
                let started = Instant::now();
                let result = host.handle_pointer_click(cursor, |index| scene.on_cell_click(index));
                self.perf.record_pick(started.elapsed());
                match result {
                    Ok(Some(_)) => self.sync_scene(scene, host),
                    Ok(None) => debug!(x = cursor.x, y = cursor.y, "click_missed"),
                    Err(error) => debug!(error = %error, "click_ignored"),
                }
            }
        }

        let started = Instant::now();
        host.update_hover(input.cursor_position_px());
        self.perf.record_pick(started.elapsed());

        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        command
    }

    fn sync_scene(&mut self, scene: &dyn Scene, host: &mut RenderSurfaceHost) {
        if host.state() == SurfaceState::Unmounted {
            return;
        }
        let started = Instant::now();
        match host.update_inputs(scene.cell_colors(), scene.palette()) {
            Ok(synced) => {
                if synced {
                    self.perf.record_sync(started.elapsed());
                }
                self.last_sync_error = None;
            }
            Err(error) => {
                if self.last_sync_error != Some(error) {
                    warn!(error = %error, "instance_sync_failed");
                }
                self.last_sync_error = Some(error);
            }
        }
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    cursor_position_px: Option<glam::Vec2>,
    left_click: KeyEdge,
    reset_key: KeyEdge,
    grow_key: KeyEdge,
    shrink_key: KeyEdge,
    save_key: KeyEdge,
    load_key: KeyEdge,
    capture_key: KeyEdge,
    zoom_in_key: KeyEdge,
    zoom_out_key: KeyEdge,
    pending_zoom_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &winit::event::KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.handle_physical_key(key_event.physical_key, is_pressed);
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        match code {
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.action_states.set(InputAction::OrbitUp, is_pressed);
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.action_states.set(InputAction::OrbitDown, is_pressed);
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.action_states.set(InputAction::OrbitLeft, is_pressed);
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.action_states.set(InputAction::OrbitRight, is_pressed);
            }
            KeyCode::Escape => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            KeyCode::KeyR => self.reset_key.handle(is_pressed),
            KeyCode::BracketRight => self.grow_key.handle(is_pressed),
            KeyCode::BracketLeft => self.shrink_key.handle(is_pressed),
            KeyCode::F5 => self.save_key.handle(is_pressed),
            KeyCode::F9 => self.load_key.handle(is_pressed),
            KeyCode::F12 => self.capture_key.handle(is_pressed),
            KeyCode::Equal | KeyCode::NumpadAdd => {
                self.zoom_in_key.handle(is_pressed);
                if self.zoom_in_key.take() {
                    self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(1);
                }
            }
            KeyCode::Minus | KeyCode::NumpadSubtract => {
                self.zoom_out_key.handle(is_pressed);
                if self.zoom_out_key.take() {
                    self.pending_zoom_steps = self.pending_zoom_steps.saturating_sub(1);
                }
            }
            _ => {}
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::empty()
            .with_quit_requested(self.quit_requested)
            .with_actions(self.action_states)
            .with_cursor_position_px(self.cursor_position_px)
            .with_left_click_pressed(self.left_click.take())
            .with_reset_pressed(self.reset_key.take())
            .with_grow_pressed(self.grow_key.take())
            .with_shrink_pressed(self.shrink_key.take())
            .with_save_pressed(self.save_key.take())
            .with_load_pressed(self.load_key.take())
            .with_zoom_delta_steps(self.pending_zoom_steps)
            .with_window_size((self.window_width, self.window_height));
        self.pending_zoom_steps = 0;
        snapshot
    }

    fn take_capture_pressed(&mut self) -> bool {
        self.capture_key.take()
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn set_cursor_position_px(&mut self, x: f32, y: f32) {
        self.cursor_position_px = Some(glam::Vec2::new(x, y));
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = zoom_steps_from_scroll_delta(delta);
        self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(steps);
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.left_click.handle(state == ElementState::Pressed);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

fn zoom_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(position) => {
            if position.y > 0.0 {
                1
            } else if position.y < 0.0 {
                -1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::color::{CellColor, Palette, Rgb};
    use crate::cube::CellIndex;

    const RED: Rgb = Rgb::new(255, 0, 0);

    struct RecordingScene {
        cube_size: i32,
        cell_colors: Vec<CellColor>,
        palette: Palette,
        clicks: Vec<CellIndex>,
        updates: u32,
    }

    impl RecordingScene {
        fn new(cube_size: i32) -> Self {
            Self {
                cube_size,
                cell_colors: Vec::new(),
                palette: Palette::new(vec![RED]),
                clicks: Vec::new(),
                updates: 0,
            }
        }
    }

    impl Scene for RecordingScene {
        fn load(&mut self, host: &mut RenderSurfaceHost) {
            host.mount(self.cube_size).expect("mount");
            let cell_count = host.layout().expect("layout").cell_count();
            self.cell_colors = vec![None; cell_count];
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            _host: &mut RenderSurfaceHost,
        ) -> SceneCommand {
            self.updates += 1;
            SceneCommand::None
        }

        fn on_cell_click(&mut self, index: CellIndex) {
            self.clicks.push(index);
            self.cell_colors[index] = Some(0);
        }

        fn cell_colors(&self) -> &[CellColor] {
            &self.cell_colors
        }

        fn palette(&self) -> &Palette {
            &self.palette
        }

        fn unload(&mut self, host: &mut RenderSurfaceHost) {
            host.unmount();
        }
    }

    fn loaded(cube_size: i32) -> (RecordingScene, RenderSurfaceHost, TickState) {
        let mut scene = RecordingScene::new(cube_size);
        let mut host = RenderSurfaceHost::new(Viewport::new(800, 600));
        let mut state = TickState::default();
        scene.load(&mut host);
        host.frame_camera_to_lattice();
        state.sync_scene(&scene, &mut host);
        (scene, host, state)
    }

    fn controls() -> CameraControls {
        CameraControls::from_config(&LoopConfig::default())
    }

    #[test]
    fn click_at_lattice_centre_reaches_scene_and_resyncs() {
        let (mut scene, mut host, mut state) = loaded(1);
        let _ = host.take_instance_upload();
        let input = InputSnapshot::empty()
            .with_cursor_position_px(Some(Vec2::new(400.0, 300.0)))
            .with_left_click_pressed(true);

        state.run_tick(&mut scene, &mut host, &input, 1.0 / 60.0, controls());

        assert_eq!(scene.clicks, vec![0]);
        assert_eq!(host.instances().and_then(|i| i.color(0)), Some(RED));
        let upload = host.take_instance_upload().expect("color upload");
        assert!(upload.colors.is_some());
        assert!(upload.transforms.is_none());
    }

    #[test]
    fn click_without_cursor_is_ignored() {
        let (mut scene, mut host, mut state) = loaded(1);
        let input = InputSnapshot::empty().with_left_click_pressed(true);

        state.run_tick(&mut scene, &mut host, &input, 1.0 / 60.0, controls());

        assert!(scene.clicks.is_empty());
        assert_eq!(scene.updates, 1);
    }

    #[test]
    fn idle_tick_does_not_resync() {
        let (mut scene, mut host, mut state) = loaded(2);
        let _ = host.take_instance_upload();

        state.run_tick(&mut scene, &mut host, &InputSnapshot::empty(), 1.0 / 60.0, controls());

        assert!(host.take_instance_upload().is_none());
    }

    #[test]
    fn hover_follows_cursor() {
        let (mut scene, mut host, mut state) = loaded(1);
        let input = InputSnapshot::empty().with_cursor_position_px(Some(Vec2::new(400.0, 300.0)));

        state.run_tick(&mut scene, &mut host, &input, 1.0 / 60.0, controls());

        assert_eq!(host.hovered_cell(), Some(0));
    }

    #[test]
    fn quit_request_overrides_scene_command() {
        let (mut scene, mut host, mut state) = loaded(1);
        let input = InputSnapshot::empty().with_quit_requested(true);

        let command = state.run_tick(&mut scene, &mut host, &input, 1.0 / 60.0, controls());

        assert_eq!(command, SceneCommand::Quit);
    }

    #[test]
    fn sync_failure_is_remembered_until_inputs_recover() {
        let (mut scene, mut host, mut state) = loaded(2);
        scene.cell_colors.push(None);

        state.sync_scene(&scene, &mut host);
        assert!(matches!(
            state.last_sync_error,
            Some(HostError::Sync(crate::cube::SyncError::LengthMismatch { .. }))
        ));

        scene.cell_colors.pop();
        state.sync_scene(&scene, &mut host);
        assert_eq!(state.last_sync_error, None);
    }

    #[test]
    fn orbit_keys_rotate_camera() {
        let mut camera = Camera3D::default();
        let before = camera;
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::OrbitRight, true)
            .with_action_down(InputAction::OrbitUp, true);

        apply_camera_input(&mut camera, &input, 0.1, controls());

        assert!(camera.yaw_radians > before.yaw_radians);
        assert!(camera.pitch_radians > before.pitch_radians);
        assert_eq!(camera.distance, before.distance);
    }

    #[test]
    fn opposing_orbit_keys_cancel() {
        let mut camera = Camera3D::default();
        let before = camera;
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::OrbitLeft, true)
            .with_action_down(InputAction::OrbitRight, true);

        apply_camera_input(&mut camera, &input, 0.1, controls());

        assert_eq!(camera, before);
    }

    #[test]
    fn zoom_in_steps_move_camera_closer() {
        let mut camera = Camera3D::default();
        let before = camera.distance;
        let input = InputSnapshot::empty().with_zoom_delta_steps(2);

        apply_camera_input(&mut camera, &input, 0.1, controls());

        assert!(camera.distance < before);
    }

    #[test]
    fn invalid_zoom_factor_falls_back_to_default() {
        let config = LoopConfig {
            zoom_step_factor: 0.5,
            ..LoopConfig::default()
        };
        let controls = CameraControls::from_config(&config);
        assert_eq!(
            controls.zoom_step_factor,
            LoopConfig::default().zoom_step_factor
        );
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(48), Duration::from_millis(16), 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn wasd_and_arrow_keys_map_to_orbit_actions() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyW), true);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::ArrowLeft), true);

        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::OrbitUp));
        assert!(snapshot.is_down(InputAction::OrbitLeft));
        assert!(!snapshot.is_down(InputAction::OrbitRight));
    }

    #[test]
    fn key_release_clears_action_state() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyD), true);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyD), false);

        assert!(!input.snapshot_for_tick().is_down(InputAction::OrbitRight));
    }

    #[test]
    fn escape_marks_quit() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Escape), true);

        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn left_click_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let first = input.snapshot_for_tick();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let second = input.snapshot_for_tick();

        assert!(first.left_click_pressed());
        assert!(!second.left_click_pressed());
    }

    #[test]
    fn right_click_does_not_count_as_cell_click() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);

        assert!(!input.snapshot_for_tick().left_click_pressed());
    }

    #[test]
    fn scene_keys_are_edge_triggered() {
        let mut input = InputCollector::new(1280, 720);
        for code in [
            KeyCode::KeyR,
            KeyCode::BracketLeft,
            KeyCode::BracketRight,
            KeyCode::F5,
            KeyCode::F9,
        ] {
            input.handle_physical_key(PhysicalKey::Code(code), true);
        }

        let first = input.snapshot_for_tick();
        assert!(first.reset_pressed());
        assert!(first.shrink_pressed());
        assert!(first.grow_pressed());
        assert!(first.save_pressed());
        assert!(first.load_pressed());

        input.handle_physical_key(PhysicalKey::Code(KeyCode::F5), true);
        let second = input.snapshot_for_tick();
        assert!(!second.save_pressed());
        assert!(!second.reset_pressed());
    }

    #[test]
    fn capture_key_is_taken_once_per_press() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::F12), true);
        assert!(input.take_capture_pressed());
        input.handle_physical_key(PhysicalKey::Code(KeyCode::F12), true);
        assert!(!input.take_capture_pressed());
        input.handle_physical_key(PhysicalKey::Code(KeyCode::F12), false);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::F12), true);
        assert!(input.take_capture_pressed());
    }

    #[test]
    fn zoom_keys_are_edge_triggered_only() {
        let mut input = InputCollector::new(1280, 720);

        input.handle_physical_key(PhysicalKey::Code(KeyCode::Equal), true);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), 1);

        input.handle_physical_key(PhysicalKey::Code(KeyCode::Equal), true);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), 0);

        input.handle_physical_key(PhysicalKey::Code(KeyCode::Equal), false);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::NumpadAdd), true);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), 1);

        input.handle_physical_key(PhysicalKey::Code(KeyCode::Minus), true);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), -1);
    }

    #[test]
    fn mouse_wheel_adds_zoom_steps_and_snapshot_resets_pending() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_wheel(MouseScrollDelta::LineDelta(0.0, 1.0));
        input.handle_mouse_wheel(MouseScrollDelta::LineDelta(0.0, -2.0));

        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), -1);
        assert_eq!(input.snapshot_for_tick().zoom_delta_steps(), 0);
    }

    #[test]
    fn pixel_wheel_delta_maps_to_single_discrete_step_direction() {
        let step = |y: f64| {
            zoom_steps_from_scroll_delta(MouseScrollDelta::PixelDelta(
                winit::dpi::PhysicalPosition::new(0.0, y),
            ))
        };
        assert_eq!(step(3.0), 1);
        assert_eq!(step(-5.0), -1);
        assert_eq!(step(0.0), 0);
    }

    #[test]
    fn snapshot_carries_cursor_and_window_size() {
        let mut input = InputCollector::new(1280, 720);
        input.set_cursor_position_px(100.0, 200.0);
        let snapshot = input.snapshot_for_tick();

        assert_eq!(snapshot.window_size(), (1280, 720));
        assert_eq!(snapshot.cursor_position_px(), Some(Vec2::new(100.0, 200.0)));

        input.clear_cursor_position();
        assert_eq!(input.snapshot_for_tick().cursor_position_px(), None);
    }

    #[test]
    fn render_cap_helpers() {
        assert_eq!(target_frame_duration(None), None);
        let frame = target_frame_duration(Some(60)).expect("duration");
        assert!((frame.as_secs_f64() - (1.0 / 60.0)).abs() < 0.000_001);
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(20), Some(frame)),
            Duration::ZERO
        );
        assert!(compute_cap_sleep(Duration::from_millis(5), Some(frame)) > Duration::ZERO);
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(format_render_cap(None), "off");
    }
}
