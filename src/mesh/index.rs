//! Stable element ids.
//!
//! Every vertex, half-edge and face is named by the slot it occupies in the
//! mesh arena. Slots are never reused, so an id stays valid for exactly as long
//! as its element lives and never aliases a later element.
//!
//! Ids are generic over the underlying integer width so that very small or
//! very large meshes can pick `u16` or `u64`; `u32` is the default.

use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Integer types usable as mesh ids.
pub trait MeshIndex:
    Copy + Clone + Eq + PartialEq + Ord + PartialOrd + Hash + Debug + Send + Sync + 'static
{
    /// Largest slot number that can be addressed.
    const MAX: Self;

    /// Sentinel standing for "no element".
    const INVALID: Self;

    /// Convert a slot number, or `None` when it lies past [`MeshIndex::MAX`].
    fn try_from_usize(v: usize) -> Option<Self>;

    /// Convert a slot number.
    ///
    /// # Panics
    ///
    /// When the slot lies past [`MeshIndex::MAX`]. Ids are never truncated.
    #[inline]
    fn from_usize(v: usize) -> Self {
        match Self::try_from_usize(v) {
            Some(i) => i,
            None => panic!("slot {v} does not fit in {:?}", Self::MAX),
        }
    }

    /// Slot number of this index.
    fn to_usize(self) -> usize;

    /// Whether this is a real slot rather than the sentinel.
    #[inline]
    fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

macro_rules! impl_mesh_index {
    ($($t:ty),*) => {$(
        impl MeshIndex for $t {
            const MAX: Self = <$t>::MAX - 1;
            const INVALID: Self = <$t>::MAX;

            #[inline]
            fn try_from_usize(v: usize) -> Option<Self> {
                <$t>::try_from(v).ok().filter(|&i| i <= Self::MAX)
            }

            #[inline]
            fn to_usize(self) -> usize {
                self as usize
            }
        }
    )*};
}

impl_mesh_index!(u16, u32, u64);

/// Id of a vertex.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId<I: MeshIndex = u32>(I);

/// Id of a half-edge.
///
/// An undirected edge is addressed by either of its two half-edges.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct HalfEdgeId<I: MeshIndex = u32>(I);

/// Id of a face.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId<I: MeshIndex = u32>(I);

macro_rules! impl_id {
    ($name:ident, $tag:literal) => {
        impl<I: MeshIndex> $name<I> {
            /// Id for the given slot.
            ///
            /// # Panics
            ///
            /// When the slot does not fit the index type.
            #[inline]
            pub fn new(slot: usize) -> Self {
                Self(I::from_usize(slot))
            }

            /// Id for the given slot, or `None` when it does not fit.
            #[inline]
            pub fn try_new(slot: usize) -> Option<Self> {
                I::try_from_usize(slot).map(Self)
            }

            /// The "no element" id.
            #[inline]
            pub fn invalid() -> Self {
                Self(I::INVALID)
            }

            /// Slot number.
            #[inline]
            pub fn index(self) -> usize {
                self.0.to_usize()
            }

            /// Underlying integer.
            #[inline]
            pub fn raw(self) -> I {
                self.0
            }

            /// Whether this id names a slot at all (it may still be dead).
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0.is_valid()
            }

            /// `Some(self)` for real ids, `None` for the sentinel.
            #[inline]
            pub fn valid(self) -> Option<Self> {
                self.is_valid().then_some(self)
            }
        }

        impl<I: MeshIndex> Debug for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $tag, self.index())
                } else {
                    write!(f, "{}(INVALID)", $tag)
                }
            }
        }

        impl<I: MeshIndex> Display for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Debug::fmt(self, f)
            }
        }

        impl<I: MeshIndex> Default for $name<I> {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl<I: MeshIndex> From<usize> for $name<I> {
            fn from(slot: usize) -> Self {
                Self::new(slot)
            }
        }
    };
}

impl_id!(VertexId, "V");
impl_id!(HalfEdgeId, "HE");
impl_id!(FaceId, "F");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id() {
        let v: VertexId = VertexId::new(7);
        assert_eq!(v.index(), 7);
        assert!(v.is_valid());
        assert_eq!(v.valid(), Some(v));

        let none: VertexId = VertexId::default();
        assert!(!none.is_valid());
        assert_eq!(none.valid(), None);
    }

    #[test]
    fn test_invalid_sorts_last() {
        let a: VertexId = VertexId::new(0);
        let b: VertexId = VertexId::new(1_000_000);
        assert!(a < b);
        assert!(b < VertexId::invalid());
    }

    #[test]
    fn test_narrow_and_wide_indices() {
        let v: FaceId<u16> = FaceId::new(1000);
        assert_eq!(v.index(), 1000);
        assert_eq!(<u16 as MeshIndex>::INVALID, u16::MAX);

        let h: HalfEdgeId<u64> = HalfEdgeId::new(1 << 40);
        assert_eq!(h.index(), 1 << 40);
    }

    #[test]
    fn test_narrow_slots_do_not_wrap() {
        assert_eq!(<u16 as MeshIndex>::try_from_usize(65_534), Some(65_534));
        assert_eq!(<u16 as MeshIndex>::try_from_usize(65_535), None);
        assert_eq!(<u16 as MeshIndex>::try_from_usize(70_000), None);
        assert_eq!(VertexId::<u16>::try_new(70_000), None);
        assert_eq!(VertexId::<u16>::try_new(12).map(VertexId::index), Some(12));
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_oversized_slot_panics() {
        let _ = FaceId::<u16>::new(65_536 + 3);
    }

    #[test]
    fn test_debug_format() {
        let he: HalfEdgeId = HalfEdgeId::new(3);
        assert_eq!(format!("{:?}", he), "HE(3)");
        assert_eq!(format!("{}", FaceId::<u32>::invalid()), "F(INVALID)");
    }
}
