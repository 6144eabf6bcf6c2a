use glam::Vec2;

use crate::color::{CellColor, Palette};
use crate::cube::{CellIndex, RenderSurfaceHost};

use super::input::ActionStates;
use super::InputAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Per-tick input. Press flags are edges and are set for exactly one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_click_pressed: bool,
    reset_pressed: bool,
    grow_pressed: bool,
    shrink_pressed: bool,
    save_pressed: bool,
    load_pressed: bool,
    zoom_delta_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_reset_pressed(mut self, reset_pressed: bool) -> Self {
        self.reset_pressed = reset_pressed;
        self
    }

    pub fn with_grow_pressed(mut self, grow_pressed: bool) -> Self {
        self.grow_pressed = grow_pressed;
        self
    }

    pub fn with_shrink_pressed(mut self, shrink_pressed: bool) -> Self {
        self.shrink_pressed = shrink_pressed;
        self
    }

    pub fn with_save_pressed(mut self, save_pressed: bool) -> Self {
        self.save_pressed = save_pressed;
        self
    }

    pub fn with_load_pressed(mut self, load_pressed: bool) -> Self {
        self.load_pressed = load_pressed;
        self
    }

    pub fn with_zoom_delta_steps(mut self, zoom_delta_steps: i32) -> Self {
        self.zoom_delta_steps = zoom_delta_steps;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub(crate) fn with_actions(mut self, actions: ActionStates) -> Self {
        self.actions = actions;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn reset_pressed(&self) -> bool {
        self.reset_pressed
    }

    pub fn grow_pressed(&self) -> bool {
        self.grow_pressed
    }

    pub fn shrink_pressed(&self) -> bool {
        self.shrink_pressed
    }

    pub fn save_pressed(&self) -> bool {
        self.save_pressed
    }

    pub fn load_pressed(&self) -> bool {
        self.load_pressed
    }

    pub fn zoom_delta_steps(&self) -> i32 {
        self.zoom_delta_steps
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

/// Owner of the Color Assignment Array and palette.
///
/// The loop reads `cell_colors` and `palette` after every tick and hands them
/// to the host, which resynchronises the instance buffer only when they
/// changed by value. Mutation happens only in `update` and `on_cell_click`.
pub trait Scene {
    fn load(&mut self, host: &mut RenderSurfaceHost);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        host: &mut RenderSurfaceHost,
    ) -> SceneCommand;
    fn on_cell_click(&mut self, index: CellIndex);
    fn cell_colors(&self) -> &[CellColor];
    fn palette(&self) -> &Palette;
    fn unload(&mut self, host: &mut RenderSurfaceHost);
    fn debug_title(&self, _host: &RenderSurfaceHost) -> Option<String> {
        None
    }
}
