use crate::math::Transform;
use crate::proximity::Shape;

/// One collision shape attached to a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: Shape,
    /// Shape frame relative to the link frame.
    pub origin: Transform,
}

impl Collider {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            origin: Transform::IDENTITY,
        }
    }

    pub fn with_origin(mut self, origin: Transform) -> Self {
        self.origin = origin;
        self
    }

    /// Radius of a ball around the link origin enclosing this collider.
    pub fn bounding_radius(&self) -> f64 {
        self.origin.position.length() + self.shape.bounding_radius()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub name: String,
    /// Joint frame (after the joint motion) to link frame. Ignored for the
    /// root link.
    pub offset: Transform,
    pub collision: Vec<Collider>,
    pub(crate) parent_joint: Option<usize>,
}

impl Link {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: Transform::IDENTITY,
            collision: Vec::new(),
            parent_joint: None,
        }
    }

    pub fn with_offset(mut self, offset: Transform) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collision.push(collider);
        self
    }

    pub fn with_shape(self, shape: Shape) -> Self {
        self.with_collider(Collider::new(shape))
    }

    /// Index of the joint that moves this link; `None` for the root.
    pub fn parent_joint(&self) -> Option<usize> {
        self.parent_joint
    }

    pub fn has_geometry(&self) -> bool {
        !self.collision.is_empty()
    }

    pub fn bounding_radius(&self) -> f64 {
        self.collision
            .iter()
            .map(Collider::bounding_radius)
            .fold(0.0, f64::max)
    }
}
