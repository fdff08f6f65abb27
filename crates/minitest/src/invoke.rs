//! Type-erased invocation of test bodies and hooks
//!
//! Test bodies are registered as ordinary closures taking the suite instance
//! plus typed parameters. `UnitFn` records the parameter count statically and
//! binds data row values to the parameters at call time, so the registry can
//! store every body behind the same erased signature.
//!
//! Panics are caught here, inside the crate that compiled the closure. A test
//! module is a separate `cdylib` with its own copy of the standard library, so
//! the runner could not catch an unwind that crossed back into it.

use crate::value::{ConversionError, FromValue, Value};
use std::any::Any;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Boxed error raised by a test body or hook
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A suite instance, erased to `Any` so suites of different types share a registry
pub type Instance = Box<dyn Any>;

/// Error produced while invoking a body, hook, or constructor
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The body or hook ran and returned an error
    #[error("invocation raised an error: {0}")]
    Raised(#[source] BoxError),
    /// A data row value could not be bound to its parameter
    #[error("argument {index}: {source}")]
    Argument {
        index: usize,
        #[source]
        source: ConversionError,
    },
    /// Fewer values than parameters reached the binder
    #[error("expected {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },
    /// The instance handed in was not built by this suite's constructor
    #[error("instance is not a `{expected}`")]
    InstanceType { expected: &'static str },
    /// The body or hook panicked
    #[error("{0}")]
    Panicked(String),
}

impl InvocationError {
    /// The underlying message, with the invocation wrapper removed.
    ///
    /// For a raised error this is that error's own message; its sources are
    /// not consulted. Panics report their payload and binding errors describe
    /// themselves.
    pub fn reason(&self) -> String {
        match self {
            InvocationError::Raised(inner) => inner.to_string(),
            other => other.to_string(),
        }
    }
}

/// Return types accepted from test bodies and hooks
pub trait IntoTestResult {
    fn into_test_result(self) -> Result<(), BoxError>;
}

impl IntoTestResult for () {
    fn into_test_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoTestResult for Result<(), E> {
    fn into_test_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// A closure usable as a test body for suite type `S`.
///
/// Implemented for `Fn(&mut S, A1, .., An) -> R` with up to eight parameters,
/// where every `Ai: FromValue` and `R: IntoTestResult`.
pub trait UnitFn<S, Args>: 'static {
    /// Declared parameter count
    const ARITY: usize;

    /// Bind `args` and call the body
    fn call(&self, suite: &mut S, args: &[Value]) -> Result<(), InvocationError>;
}

fn bind<T: FromValue>(args: &[Value], index: usize) -> Result<T, InvocationError> {
    let value = args.get(index).ok_or(InvocationError::Arity {
        expected: index + 1,
        found: args.len(),
    })?;
    T::from_value(value).map_err(|source| InvocationError::Argument { index, source })
}

macro_rules! impl_unit_fn {
    ($arity:expr; $($ty:ident $var:ident $idx:tt),*) => {
        impl<S, F, R, $($ty,)*> UnitFn<S, ($($ty,)*)> for F
        where
            F: Fn(&mut S, $($ty),*) -> R + 'static,
            R: IntoTestResult,
            $($ty: FromValue,)*
        {
            const ARITY: usize = $arity;

            #[allow(unused_variables)]
            fn call(&self, suite: &mut S, args: &[Value]) -> Result<(), InvocationError> {
                $(let $var = bind::<$ty>(args, $idx)?;)*
                (self)(suite, $($var),*)
                    .into_test_result()
                    .map_err(InvocationError::Raised)
            }
        }
    };
}

impl_unit_fn!(0;);
impl_unit_fn!(1; A1 a1 0);
impl_unit_fn!(2; A1 a1 0, A2 a2 1);
impl_unit_fn!(3; A1 a1 0, A2 a2 1, A3 a3 2);
impl_unit_fn!(4; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3);
impl_unit_fn!(5; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3, A5 a5 4);
impl_unit_fn!(6; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3, A5 a5 4, A6 a6 5);
impl_unit_fn!(7; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3, A5 a5 4, A6 a6 5, A7 a7 6);
impl_unit_fn!(8; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3, A5 a5 4, A6 a6 5, A7 a7 6, A8 a8 7);

/// Extract the text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// Run test code, turning a panic into `InvocationError::Panicked`
fn unwind_guard<F>(invoke: F) -> Result<(), InvocationError>
where
    F: FnOnce() -> Result<(), InvocationError>,
{
    panic::catch_unwind(AssertUnwindSafe(invoke))
        .unwrap_or_else(|payload| Err(InvocationError::Panicked(panic_message(payload.as_ref()))))
}

fn downcast<S: 'static>(instance: &mut dyn Any) -> Result<&mut S, InvocationError> {
    instance
        .downcast_mut::<S>()
        .ok_or(InvocationError::InstanceType {
            expected: std::any::type_name::<S>(),
        })
}

type ErasedBody = Box<dyn Fn(&mut dyn Any, &[Value]) -> Result<(), InvocationError>>;
type ErasedHook = Box<dyn Fn(&mut dyn Any) -> Result<(), InvocationError>>;
type ErasedConstructor = Box<dyn Fn() -> Result<Instance, BoxError>>;

/// A registered test body
pub struct Body {
    arity: usize,
    call: ErasedBody,
}

impl Body {
    pub(crate) fn new<S: 'static, Args, F: UnitFn<S, Args>>(body: F) -> Self {
        Self {
            arity: <F as UnitFn<S, Args>>::ARITY,
            call: Box::new(move |instance: &mut dyn Any, args: &[Value]| {
                unwind_guard(|| body.call(downcast::<S>(instance)?, args))
            }),
        }
    }

    /// Number of parameters the body declares
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Run the body against `instance` with `args`
    pub fn invoke(&self, instance: &mut dyn Any, args: &[Value]) -> Result<(), InvocationError> {
        (self.call)(instance, args)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A registered before-each or after-each hook
pub struct Hook(ErasedHook);

impl Hook {
    pub(crate) fn new<S, F, R>(hook: F) -> Self
    where
        S: 'static,
        F: Fn(&mut S) -> R + 'static,
        R: IntoTestResult,
    {
        Hook(Box::new(move |instance: &mut dyn Any| {
            unwind_guard(|| {
                hook(downcast::<S>(instance)?)
                    .into_test_result()
                    .map_err(InvocationError::Raised)
            })
        }))
    }

    /// Run the hook against `instance`
    pub fn invoke(&self, instance: &mut dyn Any) -> Result<(), InvocationError> {
        (self.0)(instance)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

/// A registered no-argument suite constructor
pub struct Constructor(ErasedConstructor);

impl Constructor {
    pub(crate) fn new<S, F, E>(constructor: F) -> Self
    where
        S: 'static,
        F: Fn() -> Result<S, E> + 'static,
        E: Into<BoxError>,
    {
        Constructor(Box::new(move || {
            match panic::catch_unwind(AssertUnwindSafe(&constructor)) {
                Ok(result) => result
                    .map(|suite| Box::new(suite) as Instance)
                    .map_err(Into::into),
                Err(payload) => Err(panic_message(payload.as_ref()).into()),
            }
        }))
    }

    /// Create a fresh suite instance
    pub fn construct(&self) -> Result<Instance, BoxError> {
        (self.0)()
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constructor")
    }
}
