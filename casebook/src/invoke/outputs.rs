//! Positional outputs captured from a wrapped callable.
//!
//! A callable returning a tuple produces one output per element, `()`
//! produces none, and any other supported type produces exactly one. User
//! types opt in with [`impl_outputs!`](crate::impl_outputs).

use std::any::{Any, type_name};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// A single captured value that can be compared and printed without knowing
/// its type.
pub struct Output {
    value: Box<dyn Any>,
    type_name: &'static str,
    eq: fn(&dyn Any, &dyn Any) -> bool,
    debug: fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result,
}

fn eq_as<T: PartialEq + 'static>(lhs: &dyn Any, rhs: &dyn Any) -> bool {
    match (lhs.downcast_ref::<T>(), rhs.downcast_ref::<T>()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

fn debug_as<T: fmt::Debug + 'static>(value: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value.downcast_ref::<T>() {
        Some(typed) => fmt::Debug::fmt(typed, f),
        None => f.write_str("<unprintable>"),
    }
}

impl Output {
    /// Captures `value`.
    pub fn new<T: PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
            eq: eq_as::<T>,
            debug: debug_as::<T>,
        }
    }

    /// Name of the captured value's type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrows the captured value as `T`, if that is its type.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Structural equality. Values of different types never match, and
    /// floating-point values compare with `==`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        (self.eq)(&*self.value, &*other.value)
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.debug)(&*self.value, f)
    }
}

/// Ordered outputs of one invocation.
#[derive(Default)]
pub struct Outputs(Vec<Output>);

impl Outputs {
    /// Wraps already captured outputs.
    #[must_use]
    pub const fn new(outputs: Vec<Output>) -> Self {
        Self(outputs)
    }

    /// Captures a single value.
    pub fn single<T: PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        Self(vec![Output::new(value)])
    }

    /// Number of outputs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for callables without outputs.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Output at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Output> {
        self.0.get(index)
    }

    /// Iterates over the outputs in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Output> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Outputs {
    type Item = &'a Output;
    type IntoIter = std::slice::Iter<'a, Output>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

/// Return types whose value can be split into positional outputs.
pub trait IntoOutputs: 'static {
    /// Splits `self` into outputs.
    fn into_outputs(self) -> Outputs;
}

/// Lets the listed types be returned from wrapped callables as a single
/// output.
///
/// The types must implement `PartialEq`, `Debug` and be `'static`.
///
/// # Examples
///
/// ```
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// casebook::impl_outputs!(Point);
/// ```
#[macro_export]
macro_rules! impl_outputs {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::IntoOutputs for $ty {
                fn into_outputs(self) -> $crate::Outputs {
                    $crate::Outputs::single(self)
                }
            }
        )+
    };
}

impl_outputs!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
    std::time::Duration,
    std::path::PathBuf,
);

impl IntoOutputs for () {
    fn into_outputs(self) -> Outputs {
        Outputs::default()
    }
}

impl<T: PartialEq + fmt::Debug + 'static> IntoOutputs for Vec<T> {
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<T: PartialEq + fmt::Debug + 'static> IntoOutputs for VecDeque<T> {
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<T: PartialEq + fmt::Debug + 'static, const N: usize> IntoOutputs for [T; N] {
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<T: PartialEq + fmt::Debug + 'static> IntoOutputs for Option<T> {
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<T, E> IntoOutputs for Result<T, E>
where
    T: PartialEq + fmt::Debug + 'static,
    E: PartialEq + fmt::Debug + 'static,
{
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<T: PartialEq + fmt::Debug + 'static> IntoOutputs for Box<T> {
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<K, V> IntoOutputs for BTreeMap<K, V>
where
    K: PartialEq + fmt::Debug + 'static,
    V: PartialEq + fmt::Debug + 'static,
{
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<K, V, S> IntoOutputs for HashMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug + 'static,
    V: PartialEq + fmt::Debug + 'static,
    S: BuildHasher + 'static,
{
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<T: PartialEq + fmt::Debug + 'static> IntoOutputs for BTreeSet<T> {
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

impl<T, S> IntoOutputs for HashSet<T, S>
where
    T: Eq + Hash + fmt::Debug + 'static,
    S: BuildHasher + 'static,
{
    fn into_outputs(self) -> Outputs {
        Outputs::single(self)
    }
}

macro_rules! impl_tuple_outputs {
    ($($name:ident: $ty:ident),+) => {
        impl<$($ty: PartialEq + fmt::Debug + 'static),+> IntoOutputs for ($($ty,)+) {
            fn into_outputs(self) -> Outputs {
                let ($($name,)+) = self;
                Outputs::new(vec![$(Output::new($name)),+])
            }
        }
    };
}

impl_tuple_outputs!(o1: O1);
impl_tuple_outputs!(o1: O1, o2: O2);
impl_tuple_outputs!(o1: O1, o2: O2, o3: O3);
impl_tuple_outputs!(o1: O1, o2: O2, o3: O3, o4: O4);
impl_tuple_outputs!(o1: O1, o2: O2, o3: O3, o4: O4, o5: O5);
impl_tuple_outputs!(o1: O1, o2: O2, o3: O3, o4: O4, o5: O5, o6: O6);
impl_tuple_outputs!(o1: O1, o2: O2, o3: O3, o4: O4, o5: O5, o6: O6, o7: O7);
impl_tuple_outputs!(o1: O1, o2: O2, o3: O3, o4: O4, o5: O5, o6: O6, o7: O7, o8: O8);
