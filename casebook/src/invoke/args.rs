//! Type-erased arguments and the declared signature they are checked against.

use std::any::{Any, TypeId, type_name};
use std::fmt;

use crate::error::{HarnessError, Result};

/// One supplied value, boxed together with its concrete type.
pub struct Arg {
    value: Box<dyn Any>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Arg {
    /// Boxes `value`, remembering its type for the signature check.
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the boxed value's type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Unboxes the value if it has type `T`.
    pub(crate) fn take<T: 'static>(self) -> Option<T> {
        self.value.downcast::<T>().ok().map(|value| *value)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    type_id: TypeId,
    type_name: &'static str,
}

impl Param {
    /// Describes a parameter of type `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the parameter type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn accepts(&self, arg: &Arg) -> bool {
        self.type_id == arg.type_id
    }
}

/// Ordered parameter list of a wrapped callable.
///
/// For methods the receiver type is the first entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// Builds a signature from its parameters.
    #[must_use]
    pub const fn new(params: Vec<Param>) -> Self {
        Self { params }
    }

    /// Declared parameters, in order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Number of declared parameters.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.params.len()
    }

    /// Checks that `args` match the declared parameters one by one.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Arity`] when the counts differ and
    /// [`HarnessError::ArgumentType`] for the first value whose type differs
    /// from its parameter.
    pub fn check(&self, callable: &str, args: &[Arg]) -> Result<()> {
        if args.len() != self.params.len() {
            return Err(HarnessError::Arity {
                callable: callable.to_owned(),
                expected: self.params.len(),
                actual: args.len(),
            });
        }
        let mismatch = self
            .params
            .iter()
            .zip(args)
            .enumerate()
            .find(|(_, (param, arg))| !param.accepts(arg));
        match mismatch {
            Some((index, (param, arg))) => Err(HarnessError::ArgumentType {
                callable: callable.to_owned(),
                index,
                expected: param.type_name,
                actual: arg.type_name,
            }),
            None => Ok(()),
        }
    }
}

/// Values that can be supplied positionally to a wrapped callable.
///
/// Implemented for tuples of up to nine `'static` values: eight parameters
/// plus an optional receiver. Single arguments are written as one-element
/// tuples, `(value,)`.
pub trait IntoArgs {
    /// Boxes every element, preserving order.
    fn into_args(self) -> Vec<Arg>;
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<Arg> {
        Vec::new()
    }
}

impl IntoArgs for Vec<Arg> {
    fn into_args(self) -> Vec<Arg> {
        self
    }
}

macro_rules! impl_into_args {
    ($($name:ident: $ty:ident),+) => {
        impl<$($ty: 'static),+> IntoArgs for ($($ty,)+) {
            fn into_args(self) -> Vec<Arg> {
                let ($($name,)+) = self;
                vec![$(Arg::new($name)),+]
            }
        }
    };
}

impl_into_args!(a1: A1);
impl_into_args!(a1: A1, a2: A2);
impl_into_args!(a1: A1, a2: A2, a3: A3);
impl_into_args!(a1: A1, a2: A2, a3: A3, a4: A4);
impl_into_args!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_into_args!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
impl_into_args!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
impl_into_args!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7, a8: A8);
impl_into_args!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7, a8: A8, a9: A9);
