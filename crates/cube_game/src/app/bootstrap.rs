use lattice::{
    load_lattice_config_from_env, resolve_app_paths, AppPaths, Camera3D, ConfigError,
    LatticeConfig, LoopConfig, Scene,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::cube_scene::CubeScene;
use super::save::SAVE_FILE_NAME;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, ConfigError> {
    init_tracing();
    info!("=== Cube Lattice Startup ===");

    let lattice_config = load_lattice_config_from_env()?;
    let paths = match resolve_app_paths() {
        Ok(paths) => Some(paths),
        Err(error) => {
            warn!(error = %error, "app_paths_unavailable");
            None
        }
    };

    Ok(wire(&lattice_config, paths.as_ref()))
}

fn wire(lattice_config: &LatticeConfig, paths: Option<&AppPaths>) -> AppWiring {
    let mut camera = Camera3D::default();
    lattice_config.apply_camera(&mut camera);

    let config = LoopConfig {
        camera,
        lighting: lattice_config.lighting(),
        frame_margin: lattice_config.camera.frame_margin,
        capture_dir: paths.map(|paths| paths.capture_dir.clone()),
        ..LoopConfig::default()
    };
    let save_path = paths.map(|paths| paths.save_dir.join(SAVE_FILE_NAME));
    let scene = CubeScene::new(lattice_config, save_path);

    AppWiring {
        config,
        scene: Box::new(scene),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
