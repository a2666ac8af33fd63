//! Parametrized sub-case testing and declarative HTTP scenarios.
//!
//! `casebook` turns repeated calls of a function into numbered,
//! independently reported sub-cases, and runs HTTP request/response
//! scenarios against a handler without opening a socket. A small mutable
//! test server and a scoped environment override helper cover the cases
//! where a real URL or process state is involved.
//!
//! ```
//! use casebook::{function, test_case};
//!
//! fn parse_pair(input: String) -> Option<(i32, i32)> {
//!     let (a, b) = input.split_once(',')?;
//!     Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
//! }
//!
//! let case = test_case!();
//! let parse = function(&case, parse_pair);
//! parse.call((String::from("1, 2"),)).returns(Some((1, 2)));
//! parse.call((String::from("nope"),)).returns(None);
//! ```

mod case;
pub mod env;
mod error;
pub mod httptest;
mod invoke;
mod namer;
pub mod outcome;
pub mod server;

pub use case::{Failure, Report, Status, SubCase, TestCase};
pub use error::{HarnessError, Result};
pub use httptest::{
    ExecutorOptions, Handler, HttpExecutor, HttpTestSpec, MultiHttpTestSpec, RecordedResponse,
    ResponseRecorder, ServiceHandler, SharedHandler, serve_endpoint, serve_http,
};
pub use invoke::{
    Arg, IntoArgs, IntoOutputs, Invocation, Invokable, Invoker, MethodInvokable, Output, Outputs,
    Param, Signature, function, method, named_function, named_method,
};
pub use namer::CallNamer;
pub use server::{ServerConfig, TestServer};

pub use bytes::Bytes;
pub use http;

/// Creates a [`TestCase`] named after the enclosing function.
///
/// ```
/// fn sums() -> casebook::TestCase {
///     casebook::test_case!()
/// }
///
/// assert!(sums().name().ends_with("sums"));
/// ```
#[macro_export]
macro_rules! test_case {
    () => {{
        fn here() {}
        let name = ::core::any::type_name_of_val(&here);
        $crate::TestCase::new(name.strip_suffix("::here").unwrap_or(name))
    }};
}
