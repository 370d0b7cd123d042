//! Crate-stacking demo
//!
//! Scatters a pile of movable crates above an immovable floor slab, then
//! steps the world at a fixed rate until everything settles. Run with
//! `RUST_LOG=info` (or `debug` for per-second snapshots) to watch it happen.

use iso_physics::prelude::*;
use rand::Rng;

const CRATE_COUNT: usize = 48;
const CRATE_SIZE: f32 = 32.0;
const STEPS: usize = 600;
const DT: f32 = 1.0 / 60.0;

fn build_world() -> World {
    let mut config = WorldConfig::default();
    config.gravity.z = -500.0;
    config.bounds = Box3::new(0.0, 0.0, 0.0, 1024.0, 1024.0, 512.0);

    World::new(&config)
}

/// The floor plus a cloud of crates dropped from random heights.
fn build_bodies(rng: &mut impl Rng) -> Vec<Body> {
    let mut bodies = Vec::with_capacity(CRATE_COUNT + 1);

    let mut floor = Body::new(0.0, 0.0, 0.0, 1024.0, 1024.0, 16.0);
    floor.immovable = true;
    floor.allow_gravity = false;
    bodies.push(floor);

    for _ in 0..CRATE_COUNT {
        let x = rng.gen_range(64.0..960.0 - CRATE_SIZE);
        let y = rng.gen_range(64.0..960.0 - CRATE_SIZE);
        let z = rng.gen_range(64.0..480.0 - CRATE_SIZE);

        let mut body = Body::new(x, y, z, CRATE_SIZE, CRATE_SIZE, CRATE_SIZE);
        body.bounce.z = 0.2;
        body.collide_world_bounds = true;
        bodies.push(body);
    }

    bodies
}

fn main() {
    env_logger::init();

    let mut world = build_world();
    let mut rng = rand::thread_rng();
    let mut bodies = build_bodies(&mut rng);

    log::info!(
        "dropping {} crates into a {}x{}x{} world",
        CRATE_COUNT,
        world.bounds.width_x,
        world.bounds.width_y,
        world.bounds.height
    );

    let mut contacts = 0usize;
    for step in 0..STEPS {
        for body in &mut bodies {
            world.update_body(body, DT);
        }

        let mut on_collide = |_: &mut Body, _: &mut Body| contacts += 1;
        world.collide_within(&mut bodies, Some(&mut on_collide), None);

        if step % 60 == 0 {
            let airborne = bodies
                .iter()
                .skip(1)
                .filter(|body| !body.touching.down)
                .count();
            log::debug!(
                "t={:.1}s airborne={} contacts so far={}",
                step as f32 * DT,
                airborne,
                contacts
            );
        }
    }

    let settled = bodies
        .iter()
        .skip(1)
        .filter(|body| body.touching.down && body.velocity.z.abs() < 1.0)
        .count();

    log::info!(
        "simulated {STEPS} steps: {settled}/{CRATE_COUNT} crates settled, {contacts} contacts resolved"
    );
}
