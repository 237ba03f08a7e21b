#![forbid(unsafe_code)]

//! Lazy row producers callable from execution plans.
//!
//! Every procedure runs through the same lifecycle, enforced by
//! [`ProcedureCtx`]:
//!
//! ```text
//! Created --invoke ok--> Ready --step...--> Exhausted --free--> Freed
//!    |                     |
//!    +--invoke err--> Failed                  (free is legal from any state)
//! ```
//!
//! Output is single-pass: once a procedure reports the end of its rows every
//! later `step` returns `Ok(None)`.

/// `algo.CC`: connected components over a relationship matrix.
pub mod cc;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::arithmetic::{ExpressionError, GraphMatrices};
use crate::query::Value;

/// Declared type of a procedure argument or output column.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueType {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// String.
    String,
    /// Array of values.
    Array,
}

impl ValueType {
    fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueType::Bool, Value::Bool(_))
                | (ValueType::Int, Value::Int(_))
                | (ValueType::Float, Value::Float(_))
                | (ValueType::String, Value::String(_))
                | (ValueType::Array, Value::Array(_))
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Array => "array",
        };
        f.write_str(name)
    }
}

/// Declared argument.
#[derive(Clone, Debug)]
pub struct ArgSpec {
    /// Argument name.
    pub name: &'static str,
    /// Accepted type.
    pub ty: ValueType,
    /// Whether `null` is accepted.
    pub nullable: bool,
}

/// Declared output column.
#[derive(Clone, Debug)]
pub struct OutputSpec {
    /// Column name.
    pub name: &'static str,
    /// Column type.
    pub ty: ValueType,
}

/// Name, inputs, and outputs of a procedure.
#[derive(Clone, Debug)]
pub struct ProcedureSignature {
    /// Fully-qualified procedure name.
    pub name: &'static str,
    /// Positional arguments.
    pub args: Vec<ArgSpec>,
    /// Output columns, in row order.
    pub outputs: Vec<OutputSpec>,
    /// Whether the procedure only reads the graph.
    pub read_only: bool,
}

impl ProcedureSignature {
    /// Checks arity and argument types.
    pub fn validate(&self, args: &[Value]) -> Result<(), ProcedureError> {
        if args.len() != self.args.len() {
            return Err(ProcedureError::BadArity {
                procedure: self.name,
                expected: self.args.len(),
                found: args.len(),
            });
        }
        for (position, (declared, value)) in self.args.iter().zip(args).enumerate() {
            let ok = if value.is_null() {
                declared.nullable
            } else {
                declared.ty.accepts(value)
            };
            if !ok {
                return Err(ProcedureError::BadArgumentType {
                    procedure: self.name,
                    position,
                    expected: declared.ty,
                    found: value.type_name(),
                });
            }
        }
        Ok(())
    }
}

/// Output row: named columns in signature order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Builds a row from `(column, value)` pairs.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Columns in order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

/// Result of a successful invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Invocation {
    /// Rows are available.
    Ready,
    /// A referenced resource (e.g. a relationship type) does not exist. The
    /// procedure yields no rows; this is not an error.
    ResourceNotFound,
}

/// Lifecycle state of a [`ProcedureCtx`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcedureState {
    /// Constructed, not yet invoked.
    Created,
    /// Invocation rejected its arguments.
    Failed,
    /// Invoked; rows may remain.
    Ready,
    /// All rows produced.
    Exhausted,
    /// Resources released.
    Freed,
}

/// Procedure implementation driven by [`ProcedureCtx`].
///
/// Arguments have already been validated against [`signature`] when
/// [`invoke`] runs, and `step` is only called while the context is ready.
///
/// [`signature`]: Procedure::signature
/// [`invoke`]: Procedure::invoke
pub trait Procedure {
    /// Declared inputs and outputs.
    fn signature(&self) -> &ProcedureSignature;
    /// Prepares the procedure for stepping.
    fn invoke(&mut self, args: &[Value]) -> Result<Invocation, ProcedureError>;
    /// Produces the next row, or `None` when finished.
    fn step(&mut self) -> Result<Option<Row>, ProcedureError>;
    /// Releases held resources. May be called after a failed invoke.
    fn free(&mut self);
}

/// Handle enforcing the procedure lifecycle.
pub struct ProcedureCtx<'g> {
    inner: Box<dyn Procedure + 'g>,
    state: ProcedureState,
}

impl<'g> ProcedureCtx<'g> {
    /// Wraps an implementation in the `Created` state.
    pub fn new(inner: Box<dyn Procedure + 'g>) -> Self {
        Self {
            inner,
            state: ProcedureState::Created,
        }
    }

    /// Procedure name.
    pub fn name(&self) -> &'static str {
        self.inner.signature().name
    }

    /// Declared signature.
    pub fn signature(&self) -> &ProcedureSignature {
        self.inner.signature()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcedureState {
        self.state
    }

    /// Validates `args` and initializes the procedure.
    pub fn invoke(&mut self, args: &[Value]) -> Result<Invocation, ProcedureError> {
        if self.state != ProcedureState::Created {
            return Err(ProcedureError::AlreadyInvoked {
                procedure: self.name(),
            });
        }
        let outcome = self
            .inner
            .signature()
            .validate(args)
            .and_then(|()| self.inner.invoke(args));
        self.state = match &outcome {
            Ok(Invocation::Ready) => ProcedureState::Ready,
            Ok(Invocation::ResourceNotFound) => ProcedureState::Exhausted,
            Err(_) => ProcedureState::Failed,
        };
        debug!(procedure = self.name(), state = ?self.state, "procedure invoked");
        outcome
    }

    /// Produces the next row.
    ///
    /// Returns `Ok(None)` forever once the output is exhausted or the handle
    /// is freed.
    pub fn step(&mut self) -> Result<Option<Row>, ProcedureError> {
        match self.state {
            ProcedureState::Created | ProcedureState::Failed => Err(ProcedureError::NotInvoked {
                procedure: self.name(),
            }),
            ProcedureState::Exhausted | ProcedureState::Freed => Ok(None),
            ProcedureState::Ready => {
                let row = self.inner.step()?;
                if row.is_none() {
                    self.state = ProcedureState::Exhausted;
                    debug!(procedure = self.name(), "procedure exhausted");
                }
                Ok(row)
            }
        }
    }

    /// Releases resources. Safe to call repeatedly and from any state.
    pub fn free(&mut self) {
        if self.state == ProcedureState::Freed {
            return;
        }
        self.inner.free();
        self.state = ProcedureState::Freed;
        debug!(procedure = self.name(), "procedure freed");
    }
}

impl Drop for ProcedureCtx<'_> {
    fn drop(&mut self) {
        self.free();
    }
}

impl Iterator for ProcedureCtx<'_> {
    type Item = Result<Row, ProcedureError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().transpose()
    }
}

/// Constructor registered under a procedure name.
pub type ProcedureFactory = for<'g> fn(&'g dyn GraphMatrices) -> Box<dyn Procedure + 'g>;

/// Name-to-constructor table.
#[derive(Clone, Default)]
pub struct ProcedureRegistry {
    factories: BTreeMap<String, ProcedureFactory>,
}

impl ProcedureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in procedures.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(cc::PROCEDURE_NAME, cc::create);
        registry
    }

    /// Registers (or replaces) a procedure.
    pub fn register(&mut self, name: impl Into<String>, factory: ProcedureFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Creates a fresh context for `name` bound to `graph`.
    pub fn get<'g>(
        &self,
        name: &str,
        graph: &'g dyn GraphMatrices,
    ) -> Result<ProcedureCtx<'g>, ProcedureError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ProcedureError::UnknownProcedure {
                name: name.to_owned(),
            })?;
        Ok(ProcedureCtx::new(factory(graph)))
    }
}

/// Procedure protocol failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcedureError {
    /// Wrong number of arguments.
    #[error("{procedure} expects {expected} argument(s), got {found}")]
    BadArity {
        /// Procedure name.
        procedure: &'static str,
        /// Declared arity.
        expected: usize,
        /// Supplied arity.
        found: usize,
    },
    /// Argument of the wrong type.
    #[error("{procedure} argument {position} must be {expected}, got {found}")]
    BadArgumentType {
        /// Procedure name.
        procedure: &'static str,
        /// Zero-based argument position.
        position: usize,
        /// Declared type.
        expected: ValueType,
        /// Supplied type name.
        found: &'static str,
    },
    /// `step` before a successful `invoke`.
    #[error("{procedure} stepped before a successful invoke")]
    NotInvoked {
        /// Procedure name.
        procedure: &'static str,
    },
    /// `invoke` called twice on one handle.
    #[error("{procedure} already invoked")]
    AlreadyInvoked {
        /// Procedure name.
        procedure: &'static str,
    },
    /// No procedure registered under this name.
    #[error("unknown procedure '{name}'")]
    UnknownProcedure {
        /// Requested name.
        name: String,
    },
    /// Matrix kernel failure while computing rows.
    #[error(transparent)]
    Kernel(#[from] ExpressionError),
}

impl ProcedureError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ProcedureError::BadArity { .. } => "BadArity",
            ProcedureError::BadArgumentType { .. } => "BadArgumentType",
            ProcedureError::NotInvoked { .. } => "NotInvoked",
            ProcedureError::AlreadyInvoked { .. } => "AlreadyInvoked",
            ProcedureError::UnknownProcedure { .. } => "UnknownProcedure",
            ProcedureError::Kernel(err) => err.code(),
        }
    }
}
