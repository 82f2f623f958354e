use std::ops;

/// One of the three axes of the world.
///
/// [`Axis::ALL`] is also the order in which collision resolution moves a body, one axis at
/// a time. Arrays, points, vectors, and [`Cube`](crate::math::Cube)s may be indexed by
/// axis.
#[expect(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, exhaust::Exhaust)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    /// The three axes in movement order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// The next axis, cyclically: X to Y, Y to Z, Z to X.
    #[inline]
    #[must_use]
    pub const fn increment(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    /// The previous axis, cyclically: X to Z, Y to X, Z to Y.
    #[inline]
    #[must_use]
    pub const fn decrement(self) -> Self {
        match self {
            Axis::X => Axis::Z,
            Axis::Y => Axis::X,
            Axis::Z => Axis::Y,
        }
    }
}

impl<T> ops::Index<Axis> for [T; 3] {
    type Output = T;

    #[inline]
    fn index(&self, axis: Axis) -> &T {
        &self[axis as usize]
    }
}
impl<T> ops::IndexMut<Axis> for [T; 3] {
    #[inline]
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        &mut self[axis as usize]
    }
}

macro_rules! index_by_axis {
    ($type:ty) => {
        impl<T, U> ops::Index<Axis> for $type {
            type Output = T;

            #[inline]
            fn index(&self, axis: Axis) -> &T {
                match axis {
                    Axis::X => &self.x,
                    Axis::Y => &self.y,
                    Axis::Z => &self.z,
                }
            }
        }
        impl<T, U> ops::IndexMut<Axis> for $type {
            #[inline]
            fn index_mut(&mut self, axis: Axis) -> &mut T {
                match axis {
                    Axis::X => &mut self.x,
                    Axis::Y => &mut self.y,
                    Axis::Z => &mut self.z,
                }
            }
        }
    };
}
index_by_axis!(euclid::Point3D<T, U>);
index_by_axis!(euclid::Vector3D<T, U>);

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;
    use exhaust::Exhaust as _;

    #[test]
    fn all_is_exhaustive_and_ordered() {
        assert_eq!(Axis::exhaust().collect::<Vec<_>>(), Axis::ALL.to_vec());
    }

    #[test]
    fn increment_and_decrement_are_inverse() {
        for axis in Axis::ALL {
            assert_ne!(axis, axis.increment());
            assert_ne!(axis.increment(), axis.decrement());
            assert_eq!(axis, axis.increment().decrement());
        }
    }

    #[test]
    fn indexing() {
        let mut p: euclid::default::Point3D<i32> = point3(1, 2, 3);
        p[Axis::Z] = 30;
        assert_eq!([p[Axis::X], p[Axis::Y], p[Axis::Z]], [1, 2, 30]);
        assert_eq!(["a", "b", "c"][Axis::Y], "b");
    }
}
