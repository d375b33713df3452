//! Callables: functions under test and reference functions.
//!
//! A [`Function`] is anything that can be invoked with a fixed number of
//! [`Value`] arguments of declared types and returns a fixed number of
//! results. Plain Rust closures of up to six arguments implement it through
//! [`IntoCallable`]; the signature is inferred from the argument and return
//! types.
//!
//! ```
//! use tabletest::{Callable, Value};
//!
//! let square = Callable::new("square", |x: f64| x * x);
//! assert_eq!(square.signature().to_string(), "fn(float) -> float");
//! assert_eq!(square.call(&[Value::Float(3.0)]).unwrap(), vec![Value::Float(9.0)]);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::convert::{FromValue, IntoOutputs};
use crate::error::CallError;
use crate::value::{Value, ValueType};

/// Declared input and output types of a callable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub inputs: Vec<ValueType>,
    pub outputs: Vec<ValueType>,
}

impl Signature {
    pub fn new(inputs: Vec<ValueType>, outputs: Vec<ValueType>) -> Self {
        Self { inputs, outputs }
    }

    /// Number of declared inputs.
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    /// Number of declared outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (i, ty) in self.inputs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str(")")?;
        match self.outputs.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " -> {single}"),
            many => {
                f.write_str(" -> (")?;
                for (i, ty) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Invoke with N arguments of declared types, returning M results.
pub trait Function: Send + Sync {
    /// Declared input and output types.
    fn signature(&self) -> &Signature;

    /// Invoke with exactly `signature().arity()` arguments.
    fn invoke(&self, args: &[Value]) -> Result<Vec<Value>, CallError>;
}

/// Conversion of a native closure into a [`Function`].
///
/// `Args` is the tuple of argument types; it only exists to keep the
/// per-arity implementations apart.
pub trait IntoCallable<Args>: Sized {
    fn into_function(self) -> Arc<dyn Function>;
}

/// A typed closure adapted to [`Function`].
pub struct TypedFunction<F, Args> {
    f: F,
    signature: Signature,
    _args: PhantomData<fn(Args)>,
}

fn extract<T: FromValue>(args: &[Value], index: usize) -> Result<T, CallError> {
    let value = &args[index];
    T::from_value(value).ok_or_else(|| CallError::ArgumentType {
        index,
        expected: T::value_type(),
        found: value.underlying().kind(),
    })
}

macro_rules! typed_function {
    ($($arg:ident $idx:tt),*) => {
        impl<F, R, $($arg,)*> Function for TypedFunction<F, ($($arg,)*)>
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutputs,
            $($arg: FromValue + 'static,)*
        {
            fn signature(&self) -> &Signature {
                &self.signature
            }

            #[allow(unused_variables)]
            fn invoke(&self, args: &[Value]) -> Result<Vec<Value>, CallError> {
                let expected = self.signature.arity();
                if args.len() != expected {
                    return Err(CallError::Arity {
                        expected,
                        found: args.len(),
                    });
                }
                let outputs = (self.f)($(extract::<$arg>(args, $idx)?),*);
                Ok(outputs.into_outputs())
            }
        }

        impl<F, R, $($arg,)*> IntoCallable<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutputs,
            $($arg: FromValue + 'static,)*
        {
            fn into_function(self) -> Arc<dyn Function> {
                let signature = Signature::new(
                    vec![$(<$arg as crate::convert::Typed>::value_type()),*],
                    R::output_types(),
                );
                Arc::new(TypedFunction {
                    f: self,
                    signature,
                    _args: PhantomData::<fn(($($arg,)*))>,
                })
            }
        }
    };
}

typed_function!();
typed_function!(A 0);
typed_function!(A 0, B 1);
typed_function!(A 0, B 1, C 2);
typed_function!(A 0, B 1, C 2, D 3);
typed_function!(A 0, B 1, C 2, D 3, E 4);
typed_function!(A 0, B 1, C 2, D 3, E 4, G 5);

struct DynamicFunction<F> {
    f: F,
    signature: Signature,
}

impl<F> Function for DynamicFunction<F>
where
    F: Fn(&[Value]) -> Result<Vec<Value>, CallError> + Send + Sync,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn invoke(&self, args: &[Value]) -> Result<Vec<Value>, CallError> {
        (self.f)(args)
    }
}

/// A named, cheaply cloneable handle to a [`Function`].
///
/// Two callables are equal only if they share the same underlying function.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    function: Arc<dyn Function>,
}

impl Callable {
    /// Wrap a typed closure.
    pub fn new<Args, F: IntoCallable<Args>>(name: &str, f: F) -> Self {
        Self {
            name: Arc::from(name),
            function: f.into_function(),
        }
    }

    /// Wrap an existing [`Function`] implementation.
    pub fn from_function(name: &str, function: impl Function + 'static) -> Self {
        Self {
            name: Arc::from(name),
            function: Arc::new(function),
        }
    }

    /// Wrap an untyped closure with an explicit signature.
    pub fn dynamic<F>(name: &str, signature: Signature, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, CallError> + Send + Sync + 'static,
    {
        Self::from_function(name, DynamicFunction { f, signature })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        self.function.signature()
    }

    /// Invoke, checking argument and result counts against the signature.
    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>, CallError> {
        let signature = self.signature();
        if args.len() != signature.arity() {
            return Err(CallError::Arity {
                expected: signature.arity(),
                found: args.len(),
            });
        }
        let outputs = self.function.invoke(args)?;
        if outputs.len() != signature.output_count() {
            return Err(CallError::OutputCount {
                expected: signature.output_count(),
                found: outputs.len(),
            });
        }
        Ok(outputs)
    }

    /// Returns true if both handles point at the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.function, &other.function)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("signature", self.signature())
            .finish()
    }
}
