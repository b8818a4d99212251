//! 2D affine transforms and the save/restore transform stack

/// 2D affine transformation
///
/// ```text
/// | a  c  tx |
/// | b  d  ty |
/// | 0  0   1 |
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn from_array([a, b, c, d, tx, ty]: [f32; 6]) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn to_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.tx, self.ty]
    }

    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            tx: x,
            ty: y,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Rotation by `angle` radians. Sine and cosine are evaluated in double
    /// precision so that quarter turns land on exact zeros more often.
    pub fn rotation(angle: f32) -> Self {
        let angle = angle as f64;
        let (sin, cos) = angle.sin_cos();
        Self {
            a: cos as f32,
            b: sin as f32,
            c: -sin as f32,
            d: cos as f32,
            ..Self::IDENTITY
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Concatenate `next` onto this transform (`self * next`).
    pub fn then(&self, next: &Transform) -> Transform {
        let cur = self;
        Transform {
            a: cur.a * next.a + cur.b * next.c,
            b: cur.a * next.b + cur.b * next.d,
            c: cur.c * next.a + cur.d * next.c,
            d: cur.c * next.b + cur.d * next.d,
            tx: cur.a * next.tx + cur.b * next.ty + cur.tx,
            ty: cur.c * next.tx + cur.d * next.ty + cur.ty,
        }
    }

    /// Map a local point into target space.
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }
}

/// The current transform plus the stack of saved transforms
#[derive(Clone, Debug, Default)]
pub struct TransformStack {
    current: Transform,
    saved: Vec<Transform>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Transform {
        self.current
    }

    /// Number of unmatched saves
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn set_identity(&mut self) {
        self.current = Transform::IDENTITY;
    }

    pub fn replace(&mut self, transform: Transform) {
        self.current = transform;
    }

    pub fn compose(&mut self, transform: Transform) {
        self.current = self.current.then(&transform);
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restore the last saved transform. Does nothing when nothing is saved.
    pub fn pop(&mut self) {
        if let Some(transform) = self.saved.pop() {
            self.current = transform;
        }
    }

    /// Back to identity with an empty stack.
    pub fn reset(&mut self) {
        self.current = Transform::IDENTITY;
        self.saved.clear();
    }
}
