#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    OrbitLeft,
    OrbitRight,
    OrbitUp,
    OrbitDown,
    Quit,
}

const ACTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::OrbitLeft => 0,
            InputAction::OrbitRight => 1,
            InputAction::OrbitUp => 2,
            InputAction::OrbitDown => 3,
            InputAction::Quit => 4,
        }
    }
}

/// Press-edge tracker for a single key: one edge per physical press, held
/// keys do not repeat.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct KeyEdge {
    is_down: bool,
    pressed_edge: bool,
}

impl KeyEdge {
    pub(crate) fn handle(&mut self, is_pressed: bool) {
        if is_pressed {
            if !self.is_down {
                self.pressed_edge = true;
            }
            self.is_down = true;
        } else {
            self.is_down = false;
        }
    }

    pub(crate) fn take(&mut self) -> bool {
        std::mem::take(&mut self.pressed_edge)
    }
}
