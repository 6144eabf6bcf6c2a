pub(crate) mod bootstrap;
mod cube_scene;
pub(crate) mod loop_runner;
mod save;
