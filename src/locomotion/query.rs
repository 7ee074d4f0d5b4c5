//! Environment query service
//!
//! The solver only ever asks the world three questions: what does a sphere
//! hit along a path, what does a ray hit, and what overlaps a sphere. Engines
//! implement [`EnvironmentQuery`]; [`StaticWorld`] is an analytic
//! implementation over planes and spheres.

use glam::Vec3;

/// Identifies a collider in the queried world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId(pub u32);

/// Bitmask of collision layers a query considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub fn layer(layer: u8) -> Self {
        Self(1u32 << (layer as u32 % 32))
    }

    pub fn contains(self, layer: u8) -> bool {
        self.0 & Self::layer(layer).0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Nearest surface found by a cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Contact point on the surface
    pub point: Vec3,
    /// Outward surface normal at the contact point
    pub normal: Vec3,
    /// Distance the probe travelled before touching
    pub distance: f32,
    pub collider: ColliderId,
    /// Per-surface slip percentage, if the surface defines one
    pub slip: Option<f32>,
}

/// Read-only geometry queries against the world.
///
/// Directions need not be normalized. Casts ignore colliders the probe already
/// overlaps at its origin.
pub trait EnvironmentQuery {
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SurfaceHit>;

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SurfaceHit>;

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<ColliderId>;
}

/// Collider geometry supported by [`StaticWorld`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Solid half-space below the plane `normal · x = offset`
    Plane { normal: Vec3, offset: f32 },
    Sphere { center: Vec3, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub id: ColliderId,
    pub shape: Shape,
    pub layer: u8,
    pub slip: Option<f32>,
}

/// Static analytic world used by the headless host and tests
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    colliders: Vec<Collider>,
}

/// Below this length a direction is treated as no movement
const MIN_DIRECTION_LENGTH: f32 = 1e-9;

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat ground at height `y`
    pub fn with_floor(y: f32) -> Self {
        let mut world = Self::new();
        world.add_plane(Vec3::Y, Vec3::new(0.0, y, 0.0));
        world
    }

    /// Add a solid half-space whose surface passes through `point`
    pub fn add_plane(&mut self, normal: Vec3, point: Vec3) -> ColliderId {
        let normal = normal.normalize_or_zero();
        self.push(Shape::Plane {
            normal,
            offset: normal.dot(point),
        })
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32) -> ColliderId {
        self.push(Shape::Sphere {
            center,
            radius: radius.max(0.0),
        })
    }

    pub fn set_slip(&mut self, id: ColliderId, slip: f32) {
        if let Some(collider) = self.colliders.iter_mut().find(|c| c.id == id) {
            collider.slip = Some(slip.clamp(0.0, 1.0));
        }
    }

    pub fn set_layer(&mut self, id: ColliderId, layer: u8) {
        if let Some(collider) = self.colliders.iter_mut().find(|c| c.id == id) {
            collider.layer = layer;
        }
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    fn push(&mut self, shape: Shape) -> ColliderId {
        let id = ColliderId(self.colliders.len() as u32);
        self.colliders.push(Collider {
            id,
            shape,
            layer: 0,
            slip: None,
        });
        id
    }

    fn nearest_hit(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SurfaceHit> {
        let length = direction.length();
        if length < MIN_DIRECTION_LENGTH || max_distance < 0.0 {
            return None;
        }
        let dir = direction / length;

        self.colliders
            .iter()
            .filter(|c| mask.contains(c.layer))
            .filter_map(|c| {
                cast_against(&c.shape, origin, radius, dir, max_distance).map(|(distance, normal, point)| {
                    SurfaceHit {
                        point,
                        normal,
                        distance,
                        collider: c.id,
                        slip: c.slip,
                    }
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Sweep a sphere of `radius` along unit `dir`; returns (distance, normal, point)
fn cast_against(
    shape: &Shape,
    origin: Vec3,
    radius: f32,
    dir: Vec3,
    max_distance: f32,
) -> Option<(f32, Vec3, Vec3)> {
    match *shape {
        Shape::Plane { normal, offset } => {
            let start_gap = normal.dot(origin) - offset;
            if start_gap < radius {
                // Already overlapping at the origin
                return None;
            }
            let approach = -normal.dot(dir);
            if approach <= 0.0 {
                return None;
            }
            let distance = (start_gap - radius) / approach;
            if distance > max_distance {
                return None;
            }
            let center = origin + dir * distance;
            Some((distance, normal, center - normal * radius))
        }
        Shape::Sphere {
            center: sphere_center,
            radius: sphere_radius,
        } => {
            let rel = origin - sphere_center;
            let reach = sphere_radius + radius;
            let c = rel.length_squared() - reach * reach;
            if c < 0.0 {
                return None;
            }
            let b = rel.dot(dir);
            if b > 0.0 {
                return None;
            }
            let discriminant = b * b - c;
            if discriminant < 0.0 {
                return None;
            }
            let distance = -b - discriminant.sqrt();
            if distance > max_distance {
                return None;
            }
            let center = origin + dir * distance;
            let normal = (center - sphere_center).normalize_or_zero();
            Some((distance, normal, sphere_center + normal * sphere_radius))
        }
    }
}

impl EnvironmentQuery for StaticWorld {
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SurfaceHit> {
        self.nearest_hit(origin, radius.max(0.0), direction, max_distance, mask)
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SurfaceHit> {
        self.nearest_hit(origin, 0.0, direction, max_distance, mask)
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<ColliderId> {
        self.colliders
            .iter()
            .filter(|c| mask.contains(c.layer))
            .filter(|c| match c.shape {
                Shape::Plane { normal, offset } => normal.dot(center) - offset < radius,
                Shape::Sphere {
                    center: sphere_center,
                    radius: sphere_radius,
                } => center.distance(sphere_center) < radius + sphere_radius,
            })
            .map(|c| c.id)
            .collect()
    }
}
