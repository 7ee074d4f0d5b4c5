//! Contact casts: the sphere-cast primitive and its iterative slide/fallback wrapper

use glam::Vec3;

use super::query::{EnvironmentQuery, LayerMask, SurfaceHit};

/// Primitive cast result: where the probe ends up and what it touched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastContact {
    pub position: Vec3,
    pub hit: SurfaceHit,
}

/// Result of an iterative contact cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactResult {
    /// Resolved probe center; zero when nothing was hit
    pub position: Vec3,
    pub collided: bool,
    /// Slip factor used when a slide was attempted
    pub slip: Option<f32>,
}

impl ContactResult {
    fn miss() -> Self {
        Self {
            position: Vec3::ZERO,
            collided: false,
            slip: None,
        }
    }
}

/// Runs contact casts against one world and layer mask
pub struct ContactCaster<'w, W: EnvironmentQuery + ?Sized> {
    world: &'w W,
    mask: LayerMask,
    single_hand_slip: f32,
    dual_hand_slip: f32,
}

impl<'w, W: EnvironmentQuery + ?Sized> ContactCaster<'w, W> {
    pub fn new(world: &'w W, mask: LayerMask, single_hand_slip: f32, dual_hand_slip: f32) -> Self {
        Self {
            world,
            mask,
            single_hand_slip,
            dual_hand_slip,
        }
    }

    /// Sphere cast that keeps the probe one `radius` off the surface it hits,
    /// with inner sphere and ray checks against clipping into sharp corners.
    pub fn collision_sphere_cast(
        &self,
        start: Vec3,
        radius: f32,
        movement: Vec3,
        precision: f32,
    ) -> Option<CastContact> {
        let reach = movement.length() + radius * (1.0 - precision);
        let Some(first) = self
            .world
            .sphere_cast(start, radius * precision, movement, reach, self.mask)
        else {
            let ray_reach = movement.length() + radius * precision * 0.999;
            return self
                .world
                .raycast(start, movement, ray_reach, self.mask)
                .map(|hit| CastContact {
                    position: start,
                    hit,
                });
        };

        let target = first.point + first.normal * radius;
        let toward = target - start;
        let precision_sq = precision * precision;

        let inner_reach = toward.length() + radius * (1.0 - precision_sq);
        if let Some(inner) = self
            .world
            .sphere_cast(start, radius * precision_sq, toward, inner_reach, self.mask)
        {
            let pulled = (first.distance - radius * (1.0 - precision_sq)).max(0.0);
            return Some(CastContact {
                position: start + toward.normalize_or_zero() * pulled,
                hit: inner,
            });
        }

        let ray_reach = toward.length() + radius * precision_sq * 0.999;
        if let Some(ray_hit) = self.world.raycast(start, toward, ray_reach, self.mask) {
            return Some(CastContact {
                position: start,
                hit: ray_hit,
            });
        }

        Some(CastContact {
            position: target,
            hit: first,
        })
    }

    /// Resolve a probe moving from `start` by `movement`.
    ///
    /// A hit slides along the surface by the slip percentage; each fallback
    /// cast is more permissive than the last, so at most five primitive casts
    /// run. The result never lies farther than `|movement| + radius` from
    /// `start`.
    pub fn resolve(
        &self,
        start: Vec3,
        radius: f32,
        movement: Vec3,
        precision: f32,
        single_hand: bool,
    ) -> ContactResult {
        let mut result = self.resolve_unclamped(start, radius, movement, precision, single_hand);
        if result.collided {
            let limit = movement.length() + radius;
            let offset = result.position - start;
            if offset.length() > limit {
                result.position = start + offset.normalize_or_zero() * limit;
            }
        }
        result
    }

    fn resolve_unclamped(
        &self,
        start: Vec3,
        radius: f32,
        movement: Vec3,
        precision: f32,
        single_hand: bool,
    ) -> ContactResult {
        if let Some(first) = self.collision_sphere_cast(start, radius * precision, movement, precision) {
            let default_slip = if single_hand {
                self.single_hand_slip
            } else {
                self.dual_hand_slip
            };
            let slip = first.hit.slip.unwrap_or(default_slip);
            let goal = start + movement;
            let slide = project_on_plane(goal - first.position, first.hit.normal) * slip;

            let position = if let Some(along) =
                self.collision_sphere_cast(first.position, radius, slide, precision * precision)
            {
                along.position
            } else if let Some(back) = self.collision_sphere_cast(
                first.position + slide,
                radius,
                goal - (first.position + slide),
                precision * precision * precision,
            ) {
                back.position
            } else {
                // The slide rounded a corner; keep the first contact
                first.position
            };

            return ContactResult {
                position,
                collided: true,
                slip: Some(slip),
            };
        }

        // Smaller probe for starts already touching a surface
        let shrunk = radius * precision * 0.66;
        let probe = movement.normalize_or_zero() * (movement.length() + radius * precision * 0.34);
        if self
            .collision_sphere_cast(start, shrunk, probe, precision * 0.66)
            .is_some()
        {
            return ContactResult {
                position: start,
                collided: true,
                slip: None,
            };
        }

        ContactResult::miss()
    }
}

fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    let n = normal.normalize_or_zero();
    v - n * v.dot(n)
}
