//! Per-arity adapters exposing a callable's signature at setup time.
//!
//! [`Invokable`] covers free functions and closures, [`MethodInvokable`]
//! covers `&self` methods such as `Counter::add`, whose receiver is supplied
//! as the first value. Both are implemented for up to eight parameters.

use std::any::type_name;

use super::args::{Arg, Param, Signature};
use super::outputs::IntoOutputs;

/// A free function or closure taking the parameters in `Args`.
pub trait Invokable<Args>: 'static {
    /// Value returned by the callable.
    type Output: IntoOutputs;

    /// Declared parameter list.
    fn signature(&self) -> Signature;

    /// Calls the function, returning `None` when an argument has the wrong
    /// type. Callers check [`Signature::check`] first.
    fn invoke(&self, args: Vec<Arg>) -> Option<Self::Output>;
}

/// A method borrowing a receiver of type `S` and taking the parameters in
/// `Args`.
pub trait MethodInvokable<S, Args>: 'static {
    /// Value returned by the method.
    type Output: IntoOutputs;

    /// Declared parameter list, receiver first.
    fn signature(&self) -> Signature;

    /// Calls the method on the first value, returning `None` when a value
    /// has the wrong type.
    fn invoke(&self, args: Vec<Arg>) -> Option<Self::Output>;
}

impl<F, R> Invokable<()> for F
where
    F: Fn() -> R + 'static,
    R: IntoOutputs,
{
    type Output = R;

    fn signature(&self) -> Signature {
        Signature::default()
    }

    fn invoke(&self, args: Vec<Arg>) -> Option<R> {
        args.is_empty().then(self)
    }
}

impl<F, S, R> MethodInvokable<S, ()> for F
where
    F: Fn(&S) -> R + 'static,
    S: 'static,
    R: IntoOutputs,
{
    type Output = R;

    fn signature(&self) -> Signature {
        Signature::new(vec![Param::of::<S>()])
    }

    fn invoke(&self, args: Vec<Arg>) -> Option<R> {
        let mut values = args.into_iter();
        let receiver = values.next()?.take::<S>()?;
        values.next().is_none().then(|| self(&receiver))
    }
}

macro_rules! impl_invokable {
    ($($name:ident: $ty:ident),+) => {
        impl<F, R, $($ty),+> Invokable<($($ty,)+)> for F
        where
            F: Fn($($ty),+) -> R + 'static,
            R: IntoOutputs,
            $($ty: 'static,)+
        {
            type Output = R;

            fn signature(&self) -> Signature {
                Signature::new(vec![$(Param::of::<$ty>()),+])
            }

            fn invoke(&self, args: Vec<Arg>) -> Option<R> {
                let mut values = args.into_iter();
                $(let $name = values.next()?.take::<$ty>()?;)+
                values.next().is_none().then(|| self($($name),+))
            }
        }

        impl<F, S, R, $($ty),+> MethodInvokable<S, ($($ty,)+)> for F
        where
            F: Fn(&S, $($ty),+) -> R + 'static,
            S: 'static,
            R: IntoOutputs,
            $($ty: 'static,)+
        {
            type Output = R;

            fn signature(&self) -> Signature {
                Signature::new(vec![Param::of::<S>(), $(Param::of::<$ty>()),+])
            }

            fn invoke(&self, args: Vec<Arg>) -> Option<R> {
                let mut values = args.into_iter();
                let receiver = values.next()?.take::<S>()?;
                $(let $name = values.next()?.take::<$ty>()?;)+
                values.next().is_none().then(|| self(&receiver, $($name),+))
            }
        }
    };
}

impl_invokable!(a1: A1);
impl_invokable!(a1: A1, a2: A2);
impl_invokable!(a1: A1, a2: A2, a3: A3);
impl_invokable!(a1: A1, a2: A2, a3: A3, a4: A4);
impl_invokable!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_invokable!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
impl_invokable!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
impl_invokable!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7, a8: A8);

/// Derives a group name from the callable's type name.
///
/// Module paths are dropped, the owning type of a method is kept
/// (`Counter::add`), and closures keep their enclosing function
/// (`adds::{{closure}}`).
pub(crate) fn callable_name<F>() -> String {
    short_name(type_name::<F>())
}

fn short_name(full: &str) -> String {
    let segments = split_path(full);
    let keep = match segments.as_slice() {
        [.., parent, last] if *last == "{{closure}}" || starts_uppercase(parent) => {
            vec![*parent, *last]
        }
        [.., last] => vec![*last],
        [] => Vec::new(),
    };
    keep.join("::")
}

fn starts_uppercase(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase)
}

/// Splits a type path on `::`, ignoring separators nested in generics.
fn split_path(full: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    let mut previous_colon = false;
    for (index, ch) in full.char_indices() {
        match ch {
            '<' => depth = depth.saturating_add(1),
            '>' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && previous_colon => {
                if let Some(segment) = full.get(start..index.saturating_sub(1)) {
                    segments.push(segment);
                }
                start = index.saturating_add(1);
                previous_colon = false;
                continue;
            }
            _ => {}
        }
        previous_colon = ch == ':' && depth == 0;
    }
    if let Some(segment) = full.get(start..) {
        segments.push(segment);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::short_name;
    use rstest::rstest;

    #[rstest]
    #[case("my_crate::math::add", "add")]
    #[case("my_crate::shapes::Counter::add", "Counter::add")]
    #[case("my_crate::tests::adds::{{closure}}", "adds::{{closure}}")]
    #[case("my_crate::convert::parse<alloc::string::String>", "parse<alloc::string::String>")]
    #[case("add", "add")]
    fn strips_module_paths(#[case] full: &str, #[case] expected: &str) {
        assert_eq!(short_name(full), expected);
    }
}
