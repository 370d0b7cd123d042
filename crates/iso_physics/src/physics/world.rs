//! Collision world: broad-phase orchestration and per-axis separation
//!
//! The [`World`] owns the global simulation settings (gravity, bounds,
//! collision masks, overlap bias) and one long-lived octree recycled across
//! queries. It never owns bodies: hosts keep them and pass them in per call,
//! either singly or as mutable slices for group operations.
//!
//! Collision runs in two phases. Group-scale queries rebuild the octree from
//! the target slice and retrieve a candidate short-list for the query body;
//! pair and self-group queries go straight to the narrow phase. The narrow
//! phase resolves penetration one axis at a time in an order chosen from the
//! dominant gravity axis: the axis where overlaps are most likely incidental
//! (stacking) is checked last so its correction is not masked by the others.

use crate::config::WorldConfig;
use crate::foundation::math::{Vec2, Vec3};
use crate::geom::Box3;
use crate::physics::body::{Body, Touching};
use crate::physics::CollisionFlags;
use crate::spatial::Octree;

/// Veto callback, run after two bodies are found to intersect and before any
/// separation. Returning false skips the pair entirely.
pub type ProcessFn<'a> = dyn FnMut(&mut Body, &mut Body) -> bool + 'a;

/// Contact callback, run after a pair has been successfully resolved.
pub type ContactFn<'a> = dyn FnMut(&mut Body, &mut Body) + 'a;

/// One operand of a collision query: a single body or a group of bodies.
///
/// Closed dispatch replaces the duck typing of scripting-engine physics
/// worlds: the caller states the shape of each operand at the call boundary.
#[derive(Debug)]
pub enum ColliderRef<'a> {
    /// One body
    Single(&'a mut Body),
    /// A group of bodies; indices within the slice identify members in
    /// octree candidate lists
    Group(&'a mut [Body]),
}

/// The isometric collision world.
///
/// All fields are plain data and the octree is owned exclusively, so a world
/// is cheap to construct and must be driven from one thread at a time.
#[derive(Debug)]
pub struct World {
    /// World gravity, applied to every gravity-enabled body
    pub gravity: Vec3,
    /// The region the physics world exists in
    pub bounds: Box3,
    /// Which world-bounds faces bodies can collide with
    pub check_collision: CollisionFlags,
    /// Octree capacity per node
    pub max_objects: usize,
    /// Octree depth cap
    pub max_levels: u32,
    /// Padding added to the maximum allowed correction distance, so
    /// fast-moving bodies are not rejected over legitimate small penetrations
    pub overlap_bias: f32,
    /// Always resolve X and Y before Z, regardless of gravity
    pub force_xy: bool,
    /// Never use the octree; group queries fall back to a linear scan
    pub skip_tree: bool,

    /// Long-lived octree, recycled via reset for every group query
    octree: Octree,
}

impl Default for World {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

impl World {
    /// Create a world from a configuration.
    pub fn new(config: &WorldConfig) -> Self {
        let bounds = config.bounds;
        let octree = Octree::new(
            bounds.x,
            bounds.y,
            bounds.z,
            bounds.width_x,
            bounds.width_y,
            bounds.height,
            config.max_objects,
            config.max_levels,
        );

        Self {
            gravity: config.gravity,
            bounds,
            check_collision: config.check_collision,
            max_objects: config.max_objects,
            max_levels: config.max_levels,
            overlap_bias: config.overlap_bias,
            force_xy: config.force_xy,
            skip_tree: config.skip_tree,
            octree,
        }
    }

    /// Update the size of the physics world.
    pub fn set_bounds(&mut self, x: f32, y: f32, z: f32, width_x: f32, width_y: f32, height: f32) {
        self.bounds.set_to(x, y, z, width_x, width_y, height);
    }

    /// Size the physics world from the host's display size, using the
    /// axonometric mapping: the projected diamond of a `w`-wide screen spans
    /// `w / 2` logical units on each ground axis, and `h / 2` vertically.
    pub fn set_bounds_to_world(&mut self, display_width: f32, display_height: f32) {
        self.bounds.set_to(
            0.0,
            0.0,
            0.0,
            display_width * 0.5,
            display_width * 0.5,
            display_height * 0.5,
        );
    }

    /// Attach a fresh default body to an empty slot. A slot that already has
    /// a body is left untouched.
    pub fn enable_body(&self, slot: &mut Option<Body>) {
        if slot.is_none() {
            *slot = Some(Body::default());
        }
    }

    /// Attach fresh bodies to every empty slot in the slice.
    pub fn enable(&self, slots: &mut [Option<Body>]) {
        for slot in slots {
            self.enable_body(slot);
        }
    }

    /// Update all motion-related values on a body for one step: the angular
    /// channel, then each velocity axis through [`World::compute_velocity`].
    pub fn update_motion(&self, body: &mut Body, dt: f32) {
        let velocity_delta = self.compute_velocity(
            0.0,
            body,
            body.angular_velocity,
            body.angular_acceleration,
            body.angular_drag,
            body.max_angular,
            dt,
        ) - body.angular_velocity;
        body.angular_velocity += velocity_delta;
        body.rotation += body.angular_velocity * dt;

        body.velocity.x = self.compute_velocity(
            self.gravity.x + body.gravity.x,
            body,
            body.velocity.x,
            body.acceleration.x,
            body.drag.x,
            body.max_velocity.x,
            dt,
        );
        body.velocity.y = self.compute_velocity(
            self.gravity.y + body.gravity.y,
            body,
            body.velocity.y,
            body.acceleration.y,
            body.drag.y,
            body.max_velocity.y,
            dt,
        );
        body.velocity.z = self.compute_velocity(
            self.gravity.z + body.gravity.z,
            body,
            body.velocity.z,
            body.acceleration.z,
            body.drag.z,
            body.max_velocity.z,
            dt,
        );
    }

    /// Compute one velocity component for this step.
    ///
    /// Gravity (already summed world + body) applies when the body allows it.
    /// Then either acceleration or drag applies, never both: acceleration
    /// wins when non-zero, otherwise drag decelerates toward zero and is
    /// clamped so it can never flip the velocity's sign. The result is capped
    /// at `max` in magnitude.
    #[allow(clippy::unused_self)]
    pub fn compute_velocity(
        &self,
        gravity: f32,
        body: &Body,
        mut velocity: f32,
        acceleration: f32,
        drag: f32,
        max: f32,
        dt: f32,
    ) -> f32 {
        if body.allow_gravity {
            velocity += gravity * dt;
        }

        if acceleration != 0.0 {
            velocity += acceleration * dt;
        } else if drag != 0.0 {
            let drag_step = drag * dt;

            if velocity - drag_step > 0.0 {
                velocity -= drag_step;
            } else if velocity + drag_step < 0.0 {
                velocity += drag_step;
            } else {
                velocity = 0.0;
            }
        }

        velocity.clamp(-max, max)
    }

    /// Advance one body by one step: snapshot the previous position, clear
    /// per-frame contact state, update motion, integrate, then optionally
    /// clamp and rebound against the world bounds.
    pub fn update_body(&self, body: &mut Body, dt: f32) {
        if !body.enable || !body.moves {
            return;
        }

        body.touching = Touching::default();
        body.embedded = false;
        body.prev = body.position;

        self.update_motion(body, dt);
        body.position += body.velocity * dt;

        if body.collide_world_bounds {
            self.check_world_bounds(body);
        }
    }

    /// Clamp a body inside the world bounds, rebounding with the body's own
    /// bounce. The world-level collision mask can open individual faces (for
    /// example `down = false` lets bodies fall out of the world).
    fn check_world_bounds(&self, body: &mut Body) {
        let bounds = &self.bounds;

        if body.position.x < bounds.x && self.check_collision.back_x {
            body.position.x = bounds.x;
            body.velocity.x *= -body.bounce.x;
        } else if body.front_x() > bounds.front_x() && self.check_collision.front_x {
            body.position.x = bounds.front_x() - body.width_x;
            body.velocity.x *= -body.bounce.x;
        }

        if body.position.y < bounds.y && self.check_collision.back_y {
            body.position.y = bounds.y;
            body.velocity.y *= -body.bounce.y;
        } else if body.front_y() > bounds.front_y() && self.check_collision.front_y {
            body.position.y = bounds.front_y() - body.width_y;
            body.velocity.y *= -body.bounce.y;
        }

        if body.position.z < bounds.z && self.check_collision.down {
            body.position.z = bounds.z;
            body.velocity.z *= -body.bounce.z;
        } else if body.top() > bounds.top() && self.check_collision.up {
            body.position.z = bounds.top() - body.height;
            body.velocity.z *= -body.bounce.z;
        }
    }

    /// Test two operands for overlap without separating anything.
    ///
    /// `on_overlap` runs for each overlapping pair; `process` can veto a pair
    /// before it is counted. Returns true if at least one pair overlapped.
    pub fn overlap(
        &mut self,
        object1: ColliderRef<'_>,
        object2: ColliderRef<'_>,
        on_overlap: Option<&mut ContactFn<'_>>,
        process: Option<&mut ProcessFn<'_>>,
    ) -> bool {
        self.collide_handler(object1, object2, on_overlap, process, true) > 0
    }

    /// Collide two operands, separating every overlapping pair.
    ///
    /// `process` runs before separation and can veto the pair; `on_collide`
    /// runs after a successful resolution. Returns true if at least one pair
    /// collided.
    pub fn collide(
        &mut self,
        object1: ColliderRef<'_>,
        object2: ColliderRef<'_>,
        on_collide: Option<&mut ContactFn<'_>>,
        process: Option<&mut ProcessFn<'_>>,
    ) -> bool {
        self.collide_handler(object1, object2, on_collide, process, false) > 0
    }

    /// Collide two individual bodies.
    pub fn collide_pair(
        &mut self,
        body1: &mut Body,
        body2: &mut Body,
        on_collide: Option<&mut ContactFn<'_>>,
        process: Option<&mut ProcessFn<'_>>,
    ) -> bool {
        self.collide_handler(
            ColliderRef::Single(body1),
            ColliderRef::Single(body2),
            on_collide,
            process,
            false,
        ) > 0
    }

    /// Collide a group against itself: every unordered pair tested once.
    pub fn collide_within(
        &mut self,
        group: &mut [Body],
        on_collide: Option<&mut ContactFn<'_>>,
        process: Option<&mut ProcessFn<'_>>,
    ) -> bool {
        self.collide_group_vs_self(group, on_collide, process, false) > 0
    }

    /// Overlap-test a group against itself without separating.
    pub fn overlap_within(
        &mut self,
        group: &mut [Body],
        on_overlap: Option<&mut ContactFn<'_>>,
        process: Option<&mut ProcessFn<'_>>,
    ) -> bool {
        self.collide_group_vs_self(group, on_overlap, process, true) > 0
    }

    /// Dispatch on the shape of the two operands. Group-vs-single flips the
    /// operands so the single body always comes first in callbacks.
    fn collide_handler(
        &mut self,
        object1: ColliderRef<'_>,
        object2: ColliderRef<'_>,
        on_contact: Option<&mut ContactFn<'_>>,
        process: Option<&mut ProcessFn<'_>>,
        overlap_only: bool,
    ) -> usize {
        match (object1, object2) {
            (ColliderRef::Single(body1), ColliderRef::Single(body2)) => {
                self.collide_body_vs_body(body1, body2, on_contact, process, overlap_only)
            }
            (ColliderRef::Single(body), ColliderRef::Group(group)) => {
                self.collide_body_vs_group(body, group, on_contact, process, overlap_only)
            }
            (ColliderRef::Group(group), ColliderRef::Single(body)) => {
                self.collide_body_vs_group(body, group, on_contact, process, overlap_only)
            }
            (ColliderRef::Group(group1), ColliderRef::Group(group2)) => {
                self.collide_group_vs_group(group1, group2, on_contact, process, overlap_only)
            }
        }
    }

    fn collide_body_vs_body(
        &mut self,
        body1: &mut Body,
        body2: &mut Body,
        mut on_contact: Option<&mut ContactFn<'_>>,
        process: Option<&mut ProcessFn<'_>>,
        overlap_only: bool,
    ) -> usize {
        if !body1.exists || !body2.exists {
            return 0;
        }

        if self.separate(body1, body2, process, overlap_only) {
            if let Some(cb) = on_contact.as_deref_mut() {
                cb(body1, body2);
            }
            return 1;
        }

        0
    }

    /// One body against a group. Uses the octree unless the body or the
    /// world opts out, in which case every group member is scanned linearly.
    ///
    /// The octree is rebuilt from scratch for every such query: correctness
    /// over incremental-update complexity. Its node allocations are recycled
    /// through `reset`.
    fn collide_body_vs_group(
        &mut self,
        body: &mut Body,
        group: &mut [Body],
        mut on_contact: Option<&mut ContactFn<'_>>,
        mut process: Option<&mut ProcessFn<'_>>,
        overlap_only: bool,
    ) -> usize {
        if group.is_empty() || !body.exists {
            return 0;
        }

        let mut total = 0;

        if body.skip_tree || self.skip_tree {
            for other in group.iter_mut() {
                if !other.exists {
                    continue;
                }

                if self.separate(body, other, process.as_deref_mut(), overlap_only) {
                    if let Some(cb) = on_contact.as_deref_mut() {
                        cb(body, other);
                    }
                    total += 1;
                }
            }
        } else {
            let bounds = self.bounds;
            self.octree.clear();
            self.octree.reset(
                bounds.x,
                bounds.y,
                bounds.z,
                bounds.width_x,
                bounds.width_y,
                bounds.height,
                self.max_objects,
                self.max_levels,
                0,
            );
            self.octree.populate(group);

            let candidates = self.octree.retrieve(&body.bounds());
            log::trace!(
                "broad phase narrowed {} bodies to {} candidates",
                group.len(),
                candidates.len()
            );

            for entry in candidates {
                let other = &mut group[entry.id];

                if self.separate(body, other, process.as_deref_mut(), overlap_only) {
                    if let Some(cb) = on_contact.as_deref_mut() {
                        cb(body, other);
                    }
                    total += 1;
                }
            }
        }

        total
    }

    /// All unordered pairs within one group, each tested once.
    fn collide_group_vs_self(
        &mut self,
        group: &mut [Body],
        mut on_contact: Option<&mut ContactFn<'_>>,
        mut process: Option<&mut ProcessFn<'_>>,
        overlap_only: bool,
    ) -> usize {
        let mut total = 0;

        for i in 0..group.len() {
            let (head, tail) = group.split_at_mut(i + 1);
            let first = &mut head[i];

            if !first.exists {
                continue;
            }

            for second in tail.iter_mut() {
                if !second.exists {
                    continue;
                }

                if self.separate(first, second, process.as_deref_mut(), overlap_only) {
                    if let Some(cb) = on_contact.as_deref_mut() {
                        cb(first, second);
                    }
                    total += 1;
                }
            }
        }

        total
    }

    /// Cartesian product: each member of the first group against the whole
    /// second group.
    fn collide_group_vs_group(
        &mut self,
        group1: &mut [Body],
        group2: &mut [Body],
        mut on_contact: Option<&mut ContactFn<'_>>,
        mut process: Option<&mut ProcessFn<'_>>,
        overlap_only: bool,
    ) -> usize {
        if group1.is_empty() || group2.is_empty() {
            return 0;
        }

        let mut total = 0;

        for body in group1.iter_mut() {
            if !body.exists {
                continue;
            }

            total += self.collide_body_vs_group(
                body,
                group2,
                on_contact.as_deref_mut(),
                process.as_deref_mut(),
                overlap_only,
            );
        }

        total
    }

    /// The core pair separation.
    ///
    /// Returns false when either body is disabled or they do not intersect,
    /// or when the process callback vetoes the pair. With `overlap_only` the
    /// intersection result is reported without moving anything. Otherwise the
    /// axes are resolved in an order chosen from the dominant gravity axis:
    /// when `force_xy` is set, or gravity on Z is weaker than on X or Y,
    /// X then Y then Z (short-circuiting on the first separated axis);
    /// otherwise Z then X then Y. The dominant axis goes last because that is
    /// where overlaps are most likely incidental stacking, and resolving it
    /// first would mask real corrections on the other axes.
    pub fn separate(
        &self,
        body1: &mut Body,
        body2: &mut Body,
        process: Option<&mut ProcessFn<'_>>,
        overlap_only: bool,
    ) -> bool {
        debug_assert!(body1.validate().is_ok(), "body1 invalid: {:?}", body1.validate());
        debug_assert!(body2.validate().is_ok(), "body2 invalid: {:?}", body2.validate());

        if !body1.enable || !body2.enable || !body1.intersects(body2) {
            return false;
        }

        if let Some(cb) = process {
            if !cb(body1, body2) {
                return false;
            }
        }

        if overlap_only {
            // The intersection check above is the whole answer.
            return true;
        }

        let gravity_z = (self.gravity.z + body1.gravity.z).abs();
        let gravity_x = (self.gravity.x + body1.gravity.x).abs();
        let gravity_y = (self.gravity.y + body1.gravity.y).abs();

        if self.force_xy || gravity_z < gravity_x || gravity_z < gravity_y {
            self.separate_x(body1, body2, overlap_only)
                || self.separate_y(body1, body2, overlap_only)
                || self.separate_z(body1, body2, overlap_only)
        } else {
            self.separate_z(body1, body2, overlap_only)
                || self.separate_x(body1, body2, overlap_only)
                || self.separate_y(body1, body2, overlap_only)
        }
    }

    /// Resolve positions and exchange momentum between two movable bodies on
    /// one axis. Returns `(v1, v2)` final velocities given the current ones
    /// and each body's mass and bounce on that axis.
    ///
    /// Each body's outgoing speed is seeded from the other's momentum
    /// (`sqrt(v² · m_other / m_self)` with the other's sign), then split into
    /// a common average plus a relative part scaled by the body's own
    /// restitution.
    fn exchange_velocity(
        velocity1: f32,
        velocity2: f32,
        body1: &Body,
        body2: &Body,
        bounce1: f32,
        bounce2: f32,
    ) -> (f32, f32) {
        let sign1 = if velocity1 > 0.0 { 1.0 } else { -1.0 };
        let sign2 = if velocity2 > 0.0 { 1.0 } else { -1.0 };

        let mut new_velocity1 =
            (velocity2 * velocity2 * body2.mass / body1.mass).sqrt() * sign2;
        let mut new_velocity2 =
            (velocity1 * velocity1 * body1.mass / body2.mass).sqrt() * sign1;
        let average = (new_velocity1 + new_velocity2) * 0.5;
        new_velocity1 -= average;
        new_velocity2 -= average;

        (
            average + new_velocity1 * bounce1,
            average + new_velocity2 * bounce2,
        )
    }

    /// Separate two bodies on the X axis.
    ///
    /// Returns true iff a non-zero overlap was found and processed, even when
    /// `overlap_only` or a custom-separation opt-out suppressed the movement.
    fn separate_x(&self, body1: &mut Body, body2: &mut Body, overlap_only: bool) -> bool {
        // Can't separate two immovable bodies
        if body1.immovable && body2.immovable {
            return false;
        }

        let mut overlap = 0.0;

        if body1.intersects(body2) {
            let max_overlap = body1.delta_abs_x() + body2.delta_abs_x() + self.overlap_bias;

            if body1.delta_x() == 0.0 && body2.delta_x() == 0.0 {
                // They overlap but neither is moving on this axis
                body1.embedded = true;
                body2.embedded = true;
            } else if body1.delta_x() > body2.delta_x() {
                // Body1 is moving forward and/or Body2 is moving back
                overlap = body1.front_x() - body2.position.x;

                if overlap > max_overlap
                    || !body1.check_collision.front_x
                    || !body2.check_collision.back_x
                {
                    overlap = 0.0;
                } else {
                    body1.touching.none = false;
                    body1.touching.front_x = true;
                    body2.touching.none = false;
                    body2.touching.back_x = true;
                }
            } else if body1.delta_x() < body2.delta_x() {
                // Body1 is moving back and/or Body2 is moving forward
                overlap = body1.position.x - body2.width_x - body2.position.x;

                if -overlap > max_overlap
                    || !body1.check_collision.back_x
                    || !body2.check_collision.front_x
                {
                    overlap = 0.0;
                } else {
                    body1.touching.none = false;
                    body1.touching.back_x = true;
                    body2.touching.none = false;
                    body2.touching.front_x = true;
                }
            }

            if overlap != 0.0 {
                body1.overlap_x = overlap;
                body2.overlap_x = overlap;

                if overlap_only || body1.custom_separate_x || body2.custom_separate_x {
                    return true;
                }

                let velocity1 = body1.velocity.x;
                let velocity2 = body2.velocity.x;

                if !body1.immovable && !body2.immovable {
                    let half = overlap * 0.5;
                    body1.position.x -= half;
                    body2.position.x += half;

                    let (v1, v2) = Self::exchange_velocity(
                        velocity1,
                        velocity2,
                        body1,
                        body2,
                        body1.bounce.x,
                        body2.bounce.x,
                    );
                    body1.velocity.x = v1;
                    body2.velocity.x = v2;
                } else if !body1.immovable {
                    body1.position.x -= overlap;
                    body1.velocity.x = velocity2 - velocity1 * body1.bounce.x;
                } else if !body2.immovable {
                    body2.position.x += overlap;
                    body2.velocity.x = velocity1 - velocity2 * body2.bounce.x;
                }

                return true;
            }
        }

        false
    }

    /// Separate two bodies on the Y axis.
    fn separate_y(&self, body1: &mut Body, body2: &mut Body, overlap_only: bool) -> bool {
        if body1.immovable && body2.immovable {
            return false;
        }

        let mut overlap = 0.0;

        if body1.intersects(body2) {
            let max_overlap = body1.delta_abs_y() + body2.delta_abs_y() + self.overlap_bias;

            if body1.delta_y() == 0.0 && body2.delta_y() == 0.0 {
                body1.embedded = true;
                body2.embedded = true;
            } else if body1.delta_y() > body2.delta_y() {
                overlap = body1.front_y() - body2.position.y;

                if overlap > max_overlap
                    || !body1.check_collision.front_y
                    || !body2.check_collision.back_y
                {
                    overlap = 0.0;
                } else {
                    body1.touching.none = false;
                    body1.touching.front_y = true;
                    body2.touching.none = false;
                    body2.touching.back_y = true;
                }
            } else if body1.delta_y() < body2.delta_y() {
                overlap = body1.position.y - body2.width_y - body2.position.y;

                if -overlap > max_overlap
                    || !body1.check_collision.back_y
                    || !body2.check_collision.front_y
                {
                    overlap = 0.0;
                } else {
                    body1.touching.none = false;
                    body1.touching.back_y = true;
                    body2.touching.none = false;
                    body2.touching.front_y = true;
                }
            }

            if overlap != 0.0 {
                body1.overlap_y = overlap;
                body2.overlap_y = overlap;

                if overlap_only || body1.custom_separate_y || body2.custom_separate_y {
                    return true;
                }

                let velocity1 = body1.velocity.y;
                let velocity2 = body2.velocity.y;

                if !body1.immovable && !body2.immovable {
                    let half = overlap * 0.5;
                    body1.position.y -= half;
                    body2.position.y += half;

                    let (v1, v2) = Self::exchange_velocity(
                        velocity1,
                        velocity2,
                        body1,
                        body2,
                        body1.bounce.y,
                        body2.bounce.y,
                    );
                    body1.velocity.y = v1;
                    body2.velocity.y = v2;
                } else if !body1.immovable {
                    body1.position.y -= overlap;
                    body1.velocity.y = velocity2 - velocity1 * body1.bounce.y;
                } else if !body2.immovable {
                    body2.position.y += overlap;
                    body2.velocity.y = velocity1 - velocity2 * body2.bounce.y;
                }

                return true;
            }
        }

        false
    }

    /// Separate two bodies on the Z axis.
    ///
    /// On top of the shared per-axis structure, a successful Z resolution
    /// against a moving supporter carries the riding body along the
    /// supporter's frame-over-frame X/Y delta (moving-platform semantics).
    fn separate_z(&self, body1: &mut Body, body2: &mut Body, overlap_only: bool) -> bool {
        if body1.immovable && body2.immovable {
            return false;
        }

        let mut overlap = 0.0;

        if body1.intersects(body2) {
            let max_overlap = body1.delta_abs_z() + body2.delta_abs_z() + self.overlap_bias;

            if body1.delta_z() == 0.0 && body2.delta_z() == 0.0 {
                body1.embedded = true;
                body2.embedded = true;
            } else if body1.delta_z() > body2.delta_z() {
                // Body1 is rising and/or Body2 is descending
                overlap = body1.top() - body2.position.z;

                if overlap > max_overlap
                    || !body1.check_collision.up
                    || !body2.check_collision.down
                {
                    overlap = 0.0;
                } else {
                    body1.touching.none = false;
                    body1.touching.up = true;
                    body2.touching.none = false;
                    body2.touching.down = true;
                }
            } else if body1.delta_z() < body2.delta_z() {
                // Body1 is descending and/or Body2 is rising
                overlap = body1.position.z - body2.top();

                if -overlap > max_overlap
                    || !body1.check_collision.down
                    || !body2.check_collision.up
                {
                    overlap = 0.0;
                } else {
                    body1.touching.none = false;
                    body1.touching.down = true;
                    body2.touching.none = false;
                    body2.touching.up = true;
                }
            }

            if overlap != 0.0 {
                body1.overlap_z = overlap;
                body2.overlap_z = overlap;

                if overlap_only || body1.custom_separate_z || body2.custom_separate_z {
                    return true;
                }

                let velocity1 = body1.velocity.z;
                let velocity2 = body2.velocity.z;

                if !body1.immovable && !body2.immovable {
                    let half = overlap * 0.5;
                    body1.position.z -= half;
                    body2.position.z += half;

                    let (v1, v2) = Self::exchange_velocity(
                        velocity1,
                        velocity2,
                        body1,
                        body2,
                        body1.bounce.z,
                        body2.bounce.z,
                    );
                    body1.velocity.z = v1;
                    body2.velocity.z = v2;
                } else if !body1.immovable {
                    body1.position.z -= overlap;
                    body1.velocity.z = velocity2 - velocity1 * body1.bounce.z;

                    // Riding a moving platform: inherit its ground motion
                    if body2.moves {
                        body1.position.x += body2.delta_x();
                        body1.position.y += body2.delta_y();
                    }
                } else if !body2.immovable {
                    body2.position.z += overlap;
                    body2.velocity.z = velocity1 - velocity2 * body2.bounce.z;

                    if body1.moves {
                        body2.position.x += body1.delta_x();
                        body2.position.y += body1.delta_y();
                    }
                }

                return true;
            }
        }

        false
    }
}

/// Kinematic and steering conveniences sharing the world's coordinate
/// conventions. These are plain trigonometry on the ground plane; none of
/// them participate in collision.
#[allow(clippy::unused_self)]
impl World {
    /// Set a body's velocity so it moves toward a target body at a steady
    /// speed. With `max_time > 0` (milliseconds) the speed is back-solved so
    /// the body arrives in that time. Returns the heading in radians.
    ///
    /// The body does not track the target and does not stop on arrival.
    pub fn move_to_object(
        &self,
        body: &mut Body,
        target: &Body,
        speed: f32,
        max_time: f32,
    ) -> f32 {
        self.move_to_xy(
            body,
            target.position.x,
            target.position.y,
            speed,
            max_time,
        )
    }

    /// Set a body's velocity so it moves toward ground coordinates at a
    /// steady speed. Returns the heading in radians.
    pub fn move_to_xy(&self, body: &mut Body, x: f32, y: f32, mut speed: f32, max_time: f32) -> f32 {
        let angle = (y - body.position.y).atan2(x - body.position.x);

        if max_time > 0.0 {
            speed = self.distance_to_xy(body, x, y) / (max_time / 1000.0);
        }

        body.velocity.x = angle.cos() * speed;
        body.velocity.y = angle.sin() * speed;

        angle
    }

    /// Set a body's acceleration toward a target body, capping the velocity
    /// it can reach. Returns the heading in radians.
    pub fn accelerate_to_object(
        &self,
        body: &mut Body,
        target: &Body,
        speed: f32,
        x_speed_max: f32,
        y_speed_max: f32,
    ) -> f32 {
        self.accelerate_to_xy(
            body,
            target.position.x,
            target.position.y,
            speed,
            x_speed_max,
            y_speed_max,
        )
    }

    /// Set a body's acceleration toward ground coordinates, capping the
    /// velocity it can reach. Returns the heading in radians.
    pub fn accelerate_to_xy(
        &self,
        body: &mut Body,
        x: f32,
        y: f32,
        speed: f32,
        x_speed_max: f32,
        y_speed_max: f32,
    ) -> f32 {
        let angle = self.angle_to_xy(body, x, y);

        body.acceleration.x = angle.cos() * speed;
        body.acceleration.y = angle.sin() * speed;
        body.max_velocity.x = x_speed_max;
        body.max_velocity.y = y_speed_max;

        angle
    }

    /// Ground-plane velocity from an angle in degrees and a speed.
    pub fn velocity_from_angle(&self, angle_degrees: f32, speed: f32) -> Vec2 {
        self.velocity_from_rotation(angle_degrees.to_radians(), speed)
    }

    /// Ground-plane velocity from a rotation in radians and a speed.
    pub fn velocity_from_rotation(&self, rotation: f32, speed: f32) -> Vec2 {
        Vec2::new(rotation.cos() * speed, rotation.sin() * speed)
    }

    /// Ground-plane acceleration from a rotation in radians and a rate.
    pub fn acceleration_from_rotation(&self, rotation: f32, speed: f32) -> Vec2 {
        Vec2::new(rotation.cos() * speed, rotation.sin() * speed)
    }

    /// 3D distance between two bodies' corners.
    pub fn distance_between(&self, source: &Body, target: &Body) -> f32 {
        (source.position - target.position).magnitude()
    }

    /// Ground-plane distance from a body to the given coordinates.
    pub fn distance_to_xy(&self, body: &Body, x: f32, y: f32) -> f32 {
        let dx = body.position.x - x;
        let dy = body.position.y - y;
        (dx * dx + dy * dy).sqrt()
    }

    /// 3D distance from a body to the given coordinates.
    pub fn distance_to_xyz(&self, body: &Body, x: f32, y: f32, z: f32) -> f32 {
        (body.position - Vec3::new(x, y, z)).magnitude()
    }

    /// Ground-plane angle in radians from one body to another.
    pub fn angle_between(&self, source: &Body, target: &Body) -> f32 {
        (target.position.y - source.position.y).atan2(target.position.x - source.position.x)
    }

    /// Ground-plane angle in radians from a body to the given coordinates.
    pub fn angle_to_xy(&self, body: &Body, x: f32, y: f32) -> f32 {
        (y - body.position.y).atan2(x - body.position.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn world() -> World {
        let mut world = World::default();
        world.set_bounds(0.0, 0.0, 0.0, 1000.0, 1000.0, 1000.0);
        world
    }

    /// A body that moved by the given delta this frame (prev rewound).
    fn moved_body(x: f32, y: f32, z: f32, size: f32, dx: f32, dy: f32, dz: f32) -> Body {
        let mut body = Body::new(x, y, z, size, size, size);
        body.prev = Vec3::new(x - dx, y - dy, z - dz);
        body
    }

    #[test]
    fn test_separate_x_end_to_end() {
        // Body1 moved +5 this frame into a stationary body2.
        let world = world();
        let mut body1 = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        body1.velocity.x = 5.0;
        let mut body2 = Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0);

        assert!(world.separate_x(&mut body1, &mut body2, false));
        assert!(!body1.intersects(&body2));
        assert!(body1.touching.front_x);
        assert!(body2.touching.back_x);
        assert!(!body1.touching.none);
        assert_relative_eq!(body1.overlap_x, 3.0);
        assert_relative_eq!(body2.overlap_x, 3.0);
        // Overlap split 50/50 between two movable bodies
        assert_relative_eq!(body1.position.x, 3.5);
        assert_relative_eq!(body2.position.x, 13.5);
    }

    #[test]
    fn test_momentum_conserved_equal_mass_elastic() {
        // Head-on, equal mass, bounce 1, no drag or gravity: total momentum
        // on the axis is preserved.
        let world = world();
        let mut body1 = moved_body(0.0, 0.0, 0.0, 10.0, 2.0, 0.0, 0.0);
        body1.velocity.x = 2.0;
        body1.bounce.x = 1.0;
        let mut body2 = moved_body(8.0, 0.0, 0.0, 10.0, -2.0, 0.0, 0.0);
        body2.velocity.x = -2.0;
        body2.bounce.x = 1.0;

        let before = body1.mass * body1.velocity.x + body2.mass * body2.velocity.x;
        assert!(world.separate_x(&mut body1, &mut body2, false));
        let after = body1.mass * body1.velocity.x + body2.mass * body2.velocity.x;

        assert_relative_eq!(before, after, epsilon = 1e-4);
        // Equal masses swap: each leaves with the other's speed
        assert_relative_eq!(body1.velocity.x, -2.0, epsilon = 1e-4);
        assert_relative_eq!(body2.velocity.x, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_immovable_body_is_never_altered() {
        let world = world();
        let mut body1 = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        body1.velocity.x = 5.0;
        let mut body2 = Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        body2.immovable = true;
        body2.velocity.x = 0.0;

        let position_before = body2.position;
        assert!(world.separate_x(&mut body1, &mut body2, false));

        assert_eq!(body2.position, position_before);
        assert_relative_eq!(body2.velocity.x, 0.0);
        // Body1 absorbs the entire overlap (3.0)
        assert_relative_eq!(body1.position.x, 2.0);
        assert!(!body1.intersects(&body2));
    }

    #[test]
    fn test_both_immovable_is_a_no_op() {
        let world = world();
        let mut body1 = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        body1.immovable = true;
        let mut body2 = Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        body2.immovable = true;

        assert!(!world.separate_x(&mut body1, &mut body2, false));
    }

    #[test]
    fn test_embedded_detection() {
        // Overlapping with zero displacement on the axis: both get flagged
        // and no overlap amount is recorded.
        let world = world();
        let mut body1 = Body::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let mut body2 = Body::new(5.0, 0.0, 0.0, 10.0, 10.0, 10.0);

        assert!(!world.separate_x(&mut body1, &mut body2, false));
        assert!(body1.embedded);
        assert!(body2.embedded);
        assert_relative_eq!(body1.overlap_x, 0.0);
        assert_relative_eq!(body2.overlap_x, 0.0);
    }

    #[test]
    fn test_overlap_reports_without_moving() {
        let mut world = world();
        let mut body1 = Body::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let mut body2 = Body::new(5.0, 5.0, 5.0, 10.0, 10.0, 10.0);
        let p1 = body1.position;
        let p2 = body2.position;

        let hit = world.overlap(
            ColliderRef::Single(&mut body1),
            ColliderRef::Single(&mut body2),
            None,
            None,
        );

        assert!(hit);
        assert_eq!(body1.position, p1);
        assert_eq!(body2.position, p2);
    }

    #[test]
    fn test_process_callback_vetoes_a_pair() {
        let mut world = world();
        let mut body1 = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        let mut body2 = Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let p1 = body1.position;

        let mut veto = |_: &mut Body, _: &mut Body| false;
        let hit = world.collide_pair(&mut body1, &mut body2, None, Some(&mut veto));

        assert!(!hit);
        assert_eq!(body1.position, p1);
    }

    #[test]
    fn test_collide_callback_runs_after_resolution() {
        let mut world = world();
        let mut body1 = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        let mut body2 = Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0);

        let mut separated_in_callback = false;
        {
            let mut on_collide = |a: &mut Body, b: &mut Body| {
                separated_in_callback = !a.intersects(b);
            };
            assert!(world.collide_pair(&mut body1, &mut body2, Some(&mut on_collide), None));
        }
        assert!(separated_in_callback);
    }

    #[test]
    fn test_disabled_bodies_never_collide() {
        let mut world = world();
        let mut body1 = Body::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        body1.enable = false;
        let mut body2 = Body::new(5.0, 5.0, 5.0, 10.0, 10.0, 10.0);

        assert!(!world.overlap(
            ColliderRef::Single(&mut body1),
            ColliderRef::Single(&mut body2),
            None,
            None,
        ));
    }

    #[test]
    fn test_collide_body_vs_group_through_octree() {
        let mut world = world();
        let mut query = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        let mut group = vec![
            Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0),
            Body::new(500.0, 500.0, 500.0, 10.0, 10.0, 10.0),
            Body::new(700.0, 100.0, 300.0, 10.0, 10.0, 10.0),
        ];

        let hit = world.collide(
            ColliderRef::Single(&mut query),
            ColliderRef::Group(&mut group),
            None,
            None,
        );

        assert!(hit);
        assert!(!query.intersects(&group[0]));
        // Far-away bodies are untouched
        assert_relative_eq!(group[1].position.x, 500.0);
    }

    #[test]
    fn test_collide_body_vs_group_skip_tree_matches() {
        let mut world = world();
        world.skip_tree = true;
        let mut query = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        let mut group = vec![
            Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0),
            Body::new(500.0, 500.0, 500.0, 10.0, 10.0, 10.0),
        ];

        assert!(world.collide(
            ColliderRef::Single(&mut query),
            ColliderRef::Group(&mut group),
            None,
            None,
        ));
        assert!(!query.intersects(&group[0]));
    }

    #[test]
    fn test_dead_group_members_are_skipped() {
        let mut world = world();
        let mut query = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        let mut group = vec![Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0)];
        group[0].exists = false;

        assert!(!world.collide(
            ColliderRef::Single(&mut query),
            ColliderRef::Group(&mut group),
            None,
            None,
        ));
    }

    #[test]
    fn test_collide_within_tests_each_pair_once() {
        let mut world = world();
        let mut group = vec![
            moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0),
            Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0),
            Body::new(400.0, 400.0, 400.0, 10.0, 10.0, 10.0),
        ];

        let mut pairs = 0;
        {
            let mut count = |_: &mut Body, _: &mut Body| pairs += 1;
            assert!(world.collide_within(&mut group, Some(&mut count), None));
        }
        assert_eq!(pairs, 1);
        assert!(!group[0].intersects(&group[1]));
    }

    #[test]
    fn test_collide_group_vs_group() {
        let mut world = world();
        let mut movers = vec![moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0)];
        movers[0].velocity.x = 5.0;
        let mut walls = vec![
            Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0),
            Body::new(300.0, 300.0, 300.0, 10.0, 10.0, 10.0),
        ];
        walls[0].immovable = true;
        walls[1].immovable = true;

        assert!(world.collide(
            ColliderRef::Group(&mut movers),
            ColliderRef::Group(&mut walls),
            None,
            None,
        ));
        assert!(!movers[0].intersects(&walls[0]));
        assert_relative_eq!(walls[0].position.x, 12.0);
    }

    #[test]
    fn test_separate_orders_axes_by_gravity() {
        // With dominant Z gravity the Z axis resolves last only when X or Y
        // carries more pull; here Z dominates, so Z resolves first.
        let mut world = world();
        world.gravity.z = -100.0;

        let mut falling = moved_body(2.0, 2.0, 8.0, 10.0, 0.0, 0.0, -2.0);
        falling.velocity.z = -2.0;
        let mut floor = Body::new(0.0, 0.0, 0.0, 20.0, 20.0, 10.0);
        floor.immovable = true;
        floor.allow_gravity = false;

        assert!(world.separate(&mut falling, &mut floor, None, false));
        // Resolved vertically: lifted on top of the floor, not pushed sideways
        assert_relative_eq!(falling.position.z, 10.0);
        assert_relative_eq!(falling.position.x, 2.0);
        assert!(falling.touching.down);
        assert!(floor.touching.up);
    }

    #[test]
    fn test_force_xy_overrides_gravity_ordering() {
        let mut world = world();
        world.gravity.z = -100.0;
        world.force_xy = true;

        let mut body1 = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        let mut body2 = Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        body2.immovable = true;

        assert!(world.separate(&mut body1, &mut body2, None, false));
        // X resolved (and short-circuited Y/Z)
        assert!(body1.touching.front_x);
        assert_relative_eq!(body1.position.z, 0.0);
    }

    #[test]
    fn test_moving_platform_carries_rider() {
        let world = world();

        // Platform moved +3 on x this frame; rider fell onto it.
        let mut rider = moved_body(2.0, 2.0, 9.0, 5.0, 0.0, 0.0, -2.0);
        rider.velocity.z = -2.0;
        let mut platform = moved_body(0.0, 0.0, 0.0, 20.0, 3.0, 0.0, 0.0);
        platform.immovable = true;
        platform.height = 10.0;

        assert!(world.separate_z(&mut rider, &mut platform, false));
        // Lifted out of the platform and carried along its x delta
        assert_relative_eq!(rider.position.z, 10.0);
        assert_relative_eq!(rider.position.x, 5.0);
        assert!(rider.touching.down);
    }

    #[test]
    fn test_face_mask_disables_direction() {
        let world = world();
        let mut body1 = moved_body(5.0, 0.0, 0.0, 10.0, 5.0, 0.0, 0.0);
        body1.check_collision.front_x = false;
        let mut body2 = Body::new(12.0, 0.0, 0.0, 10.0, 10.0, 10.0);

        assert!(!world.separate_x(&mut body1, &mut body2, false));
        assert_relative_eq!(body1.position.x, 5.0);
    }

    #[test]
    fn test_tunnel_guard_rejects_excessive_overlap() {
        let world = world();
        // Deep overlap but tiny displacement: the correction would exceed
        // |dx1| + |dx2| + bias, so it is discarded.
        let mut body1 = moved_body(5.0, 0.0, 0.0, 10.0, 0.5, 0.0, 0.0);
        let mut body2 = Body::new(7.0, 0.0, 0.0, 10.0, 10.0, 10.0);

        assert!(!world.separate_x(&mut body1, &mut body2, false));
        assert_relative_eq!(body1.position.x, 5.0);
    }

    #[test]
    fn test_compute_velocity_drag_never_flips_sign() {
        let world = world();
        let body = Body::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);

        // Strong drag over a long step stops the body instead of reversing it
        let v = world.compute_velocity(0.0, &body, 1.0, 0.0, 500.0, 10_000.0, 0.1);
        assert_relative_eq!(v, 0.0);

        let v = world.compute_velocity(0.0, &body, -1.0, 0.0, 500.0, 10_000.0, 0.1);
        assert_relative_eq!(v, 0.0);

        // Mild drag just decelerates
        let v = world.compute_velocity(0.0, &body, 10.0, 0.0, 100.0, 10_000.0, 0.016);
        assert_relative_eq!(v, 8.4, epsilon = 1e-4);
    }

    #[test]
    fn test_compute_velocity_acceleration_wins_over_drag() {
        let world = world();
        let body = Body::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);

        let v = world.compute_velocity(0.0, &body, 10.0, 50.0, 1_000.0, 10_000.0, 0.1);
        assert_relative_eq!(v, 15.0);
    }

    #[test]
    fn test_compute_velocity_clamps_to_max() {
        let world = world();
        let body = Body::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);

        let v = world.compute_velocity(0.0, &body, 99.0, 1_000.0, 0.0, 100.0, 1.0);
        assert_relative_eq!(v, 100.0);
    }

    #[test]
    fn test_update_motion_applies_gravity() {
        let mut world = world();
        world.gravity.z = -500.0;
        let mut body = Body::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);

        world.update_motion(&mut body, 0.1);
        assert_relative_eq!(body.velocity.z, -50.0);

        body.allow_gravity = false;
        world.update_motion(&mut body, 0.1);
        assert_relative_eq!(body.velocity.z, -50.0);
    }

    #[test]
    fn test_update_body_integrates_and_snapshots_prev() {
        let world = world();
        let mut body = Body::new(10.0, 10.0, 10.0, 1.0, 1.0, 1.0);
        body.allow_gravity = false;
        body.velocity = Vec3::new(60.0, 0.0, 0.0);

        world.update_body(&mut body, 0.5);
        assert_relative_eq!(body.position.x, 40.0);
        assert_relative_eq!(body.prev.x, 10.0);
        assert_relative_eq!(body.delta_x(), 30.0);
    }

    #[test]
    fn test_update_body_world_bounds_rebound() {
        let mut world = world();
        world.set_bounds(0.0, 0.0, 0.0, 100.0, 100.0, 100.0);
        let mut body = Body::new(1.0, 50.0, 50.0, 10.0, 10.0, 10.0);
        body.allow_gravity = false;
        body.collide_world_bounds = true;
        body.bounce.x = 1.0;
        body.velocity.x = -100.0;

        world.update_body(&mut body, 0.1);
        assert_relative_eq!(body.position.x, 0.0);
        assert_relative_eq!(body.velocity.x, 100.0);
    }

    #[test]
    fn test_enable_fills_only_empty_slots() {
        let world = world();
        let mut slots = vec![None, Some(Body::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0))];

        world.enable(&mut slots);
        assert!(slots[0].is_some());
        let kept = slots[1].as_ref().unwrap();
        assert_relative_eq!(kept.width_x, 4.0);
    }

    #[test]
    fn test_steering_helpers() {
        let world = world();
        let mut chaser = Body::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let target = Body::new(30.0, 40.0, 0.0, 1.0, 1.0, 1.0);

        assert_relative_eq!(world.distance_between(&chaser, &target), 50.0);
        assert_relative_eq!(world.distance_to_xy(&chaser, 30.0, 40.0), 50.0);
        assert_relative_eq!(world.distance_to_xyz(&chaser, 0.0, 0.0, 10.0), 10.0);

        let angle = world.move_to_object(&mut chaser, &target, 100.0, 0.0);
        assert_relative_eq!(angle, world.angle_between(&chaser, &target));
        assert_relative_eq!(chaser.velocity.x, 60.0, epsilon = 1e-3);
        assert_relative_eq!(chaser.velocity.y, 80.0, epsilon = 1e-3);

        // Back-solved speed: arrive in 500 ms
        world.move_to_xy(&mut chaser, 30.0, 40.0, 0.0, 500.0);
        assert_relative_eq!(chaser.velocity.norm(), 100.0, epsilon = 1e-3);

        let v = world.velocity_from_angle(0.0, 10.0);
        assert_relative_eq!(v.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-5);

        world.accelerate_to_xy(&mut chaser, 100.0, 0.0, 50.0, 200.0, 200.0);
        assert_relative_eq!(chaser.acceleration.x, 50.0, epsilon = 1e-3);
        assert_relative_eq!(chaser.max_velocity.x, 200.0);
    }
}
