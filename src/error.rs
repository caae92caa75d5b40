//! The two error kinds that abort an evaluation, and the breadcrumb chain
//! they accumulate on the way out.

use crate::builder::ops::SddOp;
use crate::repr::hom::HomPtr;
use crate::repr::sdd::SddPtr;
use std::fmt;

/// A structural incompatibility: two SDDs combined at levels the order
/// cannot reconcile (different variables, or a terminal against an interior
/// node). Carries both offending operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Top {
    pub lhs: SddPtr,
    pub rhs: SddPtr,
}

/// One operation an error passed through on its way up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An SDD binary operation.
    SddOp(SddOp),
    /// A homomorphism evaluated against an SDD.
    Hom { hom: HomPtr, sdd: SddPtr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKind {
    Top(Top),
    Interrupted,
}

/// An aborted evaluation. Wraps the triggering [`Top`] (or an interruption)
/// together with the chain of operations it propagated through, innermost
/// first. The chain is the primary debugging surface: read outward it is the
/// recursion path that led to the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationError {
    kind: ErrorKind,
    steps: Vec<Step>,
}

impl EvaluationError {
    pub(crate) fn top(top: Top) -> EvaluationError {
        EvaluationError {
            kind: ErrorKind::Top(top),
            steps: Vec::new(),
        }
    }

    pub(crate) fn interrupted() -> EvaluationError {
        EvaluationError {
            kind: ErrorKind::Interrupted,
            steps: Vec::new(),
        }
    }

    pub(crate) fn push_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// The incompatible operands, if this error wraps a [`Top`].
    pub fn top_operands(&self) -> Option<Top> {
        match self.kind {
            ErrorKind::Top(t) => Some(t),
            ErrorKind::Interrupted => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.kind, ErrorKind::Interrupted)
    }

    /// The operations the error passed through, innermost first.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Top(t) => write!(
                f,
                "incompatible operands {} and {} ({} steps deep)",
                t.lhs,
                t.rhs,
                self.steps.len()
            ),
            ErrorKind::Interrupted => {
                write!(f, "evaluation interrupted ({} steps deep)", self.steps.len())
            }
        }
    }
}

impl std::error::Error for EvaluationError {}
