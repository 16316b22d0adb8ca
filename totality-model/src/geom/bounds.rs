use na::Vector3;

/// Center/half-extent box.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Bounds {
    pub center: Vector3<f32>,
    pub extents: Vector3<f32>,
}

impl Bounds {
    pub fn new(center: Vector3<f32>, extents: Vector3<f32>) -> Self {
        Self { center, extents }
    }

    pub fn from_min_max(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        let mut bounds = Self::default();
        bounds.set_min_max(min, max);
        bounds
    }

    /// Tightest box around `points`. Zero sized at the origin when there are none.
    pub fn from_points(points: &[Vector3<f32>]) -> Self {
        let mut iter = points.iter();
        let first = match iter.next() {
            Some(p) => *p,
            None => return Self::default(),
        };
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.inf(p), max.sup(p)));
        Self::from_min_max(min, max)
    }

    /// Union of every box, `None` when there is nothing to enclose.
    pub fn composite<'a>(all: impl IntoIterator<Item = &'a Bounds>) -> Option<Self> {
        let mut iter = all.into_iter();
        let mut composite = *iter.next()?;
        for b in iter {
            composite.encapsulate(b);
        }
        Some(composite)
    }

    pub fn min(&self) -> Vector3<f32> {
        self.center - self.extents
    }

    pub fn max(&self) -> Vector3<f32> {
        self.center + self.extents
    }

    pub fn size(&self) -> Vector3<f32> {
        self.extents * 2.
    }

    pub fn set_min_max(&mut self, min: Vector3<f32>, max: Vector3<f32>) {
        self.extents = (max - min) * 0.5;
        self.center = min + self.extents;
    }

    pub fn encapsulate_point(&mut self, point: &Vector3<f32>) {
        self.set_min_max(self.min().inf(point), self.max().sup(point));
    }

    pub fn encapsulate(&mut self, other: &Bounds) {
        self.encapsulate_point(&other.min());
        self.encapsulate_point(&other.max());
    }

    pub fn contains(&self, point: &Vector3<f32>) -> bool {
        let d = point - self.center;
        d.iter().zip(self.extents.iter()).all(|(d, e)| d.abs() <= *e)
    }
}
