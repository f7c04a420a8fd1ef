//! Portal traits
//!
//! A portal is the position-indexed view algorithms use to touch array values.
//! Portals are plain values: cloning one is cheap (a reference count bump and a
//! few integers) and every clone addresses the same underlying data.
//!
//! ```text
//! ArrayHandle ──read_portal()──▶ Storage ──portal_const()──▶ Portal
//!                                                              │
//!                                   get(i) / set(i, v) ◀───────┘
//!                                   (local index → inner portal index)
//! ```
//!
//! Composed portals (streaming, concatenate, zip) wrap inner portals and only
//! add an addressing rule. Neither `get` nor `set` allocates or takes a lock.
//!
//! # Index contract
//!
//! Indices outside `[0, num_values())` are a caller error. Portals do not
//! clamp them; composed portals assert the local range in debug builds and the
//! innermost buffer panics on an index beyond its allocation.

/// Read access to a logical sequence of values
pub trait ArrayPortal: Clone + Send + Sync {
    /// Value type produced by [`get`](Self::get)
    type Value;

    /// Number of values visible through this portal
    fn num_values(&self) -> usize;

    /// Value at `index`
    fn get(&self, index: usize) -> Self::Value;

    /// Iterate over every visible value in index order
    fn values(&self) -> PortalValues<'_, Self> {
        PortalValues {
            portal: self,
            index: 0,
            end: self.num_values(),
        }
    }

    /// Copy every visible value into a `Vec`
    fn to_vec(&self) -> Vec<Self::Value> {
        self.values().collect()
    }
}

/// Read and write access to a logical sequence of values
///
/// `set` takes `&self`: writes go straight through to the backing data and are
/// observed by every clone of the portal.
pub trait ArrayPortalMut: ArrayPortal {
    /// Read-only counterpart of this portal
    type Const: ArrayPortal<Value = Self::Value> + PortalFrom<Self>;

    /// Overwrite the value at `index`
    fn set(&self, index: usize, value: Self::Value);

    /// Read-only portal over the same values
    fn to_const(&self) -> Self::Const {
        Self::Const::portal_from(self.clone())
    }
}

/// Explicit construction of a portal from a related portal variant
///
/// Used to turn a writable portal into its read-only counterpart. Composed
/// portals implement it by converting their inner portal and copying their own
/// addressing state verbatim.
pub trait PortalFrom<Q>: Sized {
    /// Build `Self` from `other`
    fn portal_from(other: Q) -> Self;
}

/// Iterator over the values of a portal
pub struct PortalValues<'a, P: ArrayPortal> {
    portal: &'a P,
    index: usize,
    end: usize,
}

impl<P: ArrayPortal> Iterator for PortalValues<'_, P> {
    type Item = P::Value;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.end {
            return None;
        }
        let value = self.portal.get(self.index);
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.index;
        (remaining, Some(remaining))
    }
}

impl<P: ArrayPortal> ExactSizeIterator for PortalValues<'_, P> {}
