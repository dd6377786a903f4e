//! Frame demo
//!
//! Drives the frame core through the headless backend: a ship with a turret
//! under a directional light, rendered for a few frames while the camera
//! orbits and the ship moves. Pass an optional `.toml`/`.ron` config path.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use nalgebra::Vector3;
use render_core::foundation::logging;
use render_core::prelude::*;

const FRAMES: u64 = 8;

const LIT_VERTEX: &str = "
    uniform mat4 u_Model;
    uniform mat4 u_ViewProjection;
    uniform mat4 u_ShadowMatrix;
    void main() {}
";
const LIT_FRAGMENT: &str = "
    uniform vec4 u_Color;
    uniform vec3 u_CameraPosition;
    uniform sampler2D u_ShadowMap;
    void main() {}
";
const DEPTH_VERTEX: &str = "uniform mat4 u_Model; uniform mat4 u_ViewProjection; void main() {}";
const DEPTH_FRAGMENT: &str = "void main() {}";

fn load_config() -> Result<ApplicationConfig, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(ApplicationConfig::load_from_file(&path)?),
        None => Ok(ApplicationConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = load_config()?;
    logging::init_with_filter(&config.engine.log_level);
    config.validate()?;
    log::info!("Starting frame demo ({} frames)", FRAMES);

    let mut renderer = Renderer::new(HeadlessBackend::new(), config.renderer.clone())?;
    let queue = renderer.release_queue().clone();

    let lit = renderer.create_program(&ProgramSource::new("lit", LIT_VERTEX, LIT_FRAGMENT))?;
    let depth = renderer.create_program(&ProgramSource::new("depth", DEPTH_VERTEX, DEPTH_FRAGMENT))?;

    // Scene hierarchy: root → ship → turret, plus a free-standing sun
    let transforms = renderer.transforms_mut();
    let root = transforms.create_node(Transform::identity());
    let ship = transforms.create_child(root, Transform::identity())?;
    let turret = transforms.create_child(ship, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))?;
    let sun_rotation = Quat::face_towards(&Vec3::new(0.3, 1.0, 0.5), &Vec3::x());
    let sun = transforms.create_node(Transform::from_position_rotation(Vec3::new(0.0, 50.0, 0.0), sun_rotation));

    let shadow_config = config.renderer.shadow.clone();
    let (backend, shaders) = renderer.backend_and_shaders();
    let shadow = Rc::new(RefCell::new(DirectionalShadowPass::new(
        backend,
        shaders,
        &shadow_config,
        sun,
        &depth,
        &queue,
    )?));
    let geometry = Rc::new(RefCell::new(
        GeometryPass::new(renderer.shaders_mut()).with_culling(config.renderer.culling_enabled),
    ));
    renderer.register_pass(&shadow);
    renderer.register_pass(&geometry);

    let color = renderer.property_id("u_Color");
    let shadow_map = renderer.property_id("u_ShadowMap");
    let shaders = renderer.shaders_mut();
    let hull = shaders.create_material("hull", &lit);
    let barrel = shaders.create_material("barrel", &lit);
    shaders.set_uniform(hull, color, UniformValue::Vec4(Vec4::new(0.7, 0.7, 0.75, 1.0)), false);
    shaders.set_uniform(barrel, color, UniformValue::Vec4(Vec4::new(0.8, 0.2, 0.1, 1.0)), false);
    for material in [hull, barrel] {
        shaders.bind_texture(material, shadow_map, shadow.borrow().shadow_map());
    }

    let hull_mesh = Rc::new(Mesh::cuboid(renderer.backend_mut(), "hull", Vec3::new(1.5, 0.5, 3.0), &queue)?);
    let barrel_mesh = Rc::new(Mesh::cuboid(renderer.backend_mut(), "barrel", Vec3::new(0.2, 0.2, 1.0), &queue)?);
    let draws = vec![
        DrawItem::new(hull_mesh, ship, hull),
        DrawItem::new(barrel_mesh, turret, barrel),
    ];

    let target = RenderTarget::default_framebuffer(1280, 720);
    let mut camera = Camera::default();

    for frame in 0..FRAMES {
        let t = frame as f32 / FRAMES as f32;
        let orbit = Quat::from_axis_angle(&Vector3::y_axis(), t * std::f32::consts::TAU);
        camera.set_position(orbit * Vec3::new(0.0, 6.0, 14.0));
        camera.look_at(Vec3::zeros(), Vec3::y());

        let transforms = renderer.transforms_mut();
        transforms.set_position(ship, Vec3::new(0.0, 0.0, -4.0 * t))?;
        transforms.set_rotation(turret, Quat::from_axis_angle(&Vector3::y_axis(), t))?;

        let report = renderer.render_frame(&camera, &target, &draws);
        if report.is_clean() {
            log::info!(
                "Frame {}: passes {:?}, {} casters, {} draws",
                report.frame_index,
                report.executed,
                shadow.borrow().casters_drawn(),
                geometry.borrow().draws_issued()
            );
        } else {
            log::warn!("Frame {} finished with failures: {:?}", report.frame_index, report);
        }
    }

    let stats = renderer.shaders().stats();
    log::info!(
        "Uniform pushes {} (skipped {}), texture binds {} (skipped {}), program switches {}",
        stats.pushes,
        stats.skipped_pushes,
        stats.texture_binds,
        stats.skipped_texture_binds,
        stats.program_switches
    );
    log::info!("Backend recorded {} draw calls", renderer.backend().draw_count());
    Ok(())
}
