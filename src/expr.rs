//! Linear expressions and constraints over symbolic variables.
//!
//! These are the value types `SymEval` and `ConditionLowering` produce;
//! the actual arithmetic/comparison primitives a `LinearExpression` or
//! `LinearConstraint` gets turned into are `cfg::Statement` variants, built
//! by `InstructionLowering` and `ConditionLowering` respectively.

use crate::symtab::SymbolName;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::collections::BTreeMap;
use std::fmt;

/// `Σ kᵢ·vᵢ + c` over arbitrary-precision integer coefficients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearExpression {
    terms: BTreeMap<SymbolName, BigInt>,
    constant: BigInt,
}

impl LinearExpression {
    pub fn constant<I: Into<BigInt>>(c: I) -> Self {
        LinearExpression {
            terms: BTreeMap::new(),
            constant: c.into(),
        }
    }

    pub fn var(v: SymbolName) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(v, BigInt::one());
        LinearExpression {
            terms,
            constant: BigInt::zero(),
        }
    }

    pub fn zero() -> Self {
        Self::constant(0)
    }

    pub fn as_constant(&self) -> Option<&BigInt> {
        if self.terms.is_empty() {
            Some(&self.constant)
        } else {
            None
        }
    }

    /// Is this expression a bare single variable, coefficient 1, no
    /// constant term? Used by `SymEval::is_var`.
    pub fn is_var(&self) -> Option<SymbolName> {
        if self.constant.is_zero() && self.terms.len() == 1 {
            let (v, k) = self.terms.iter().next().unwrap();
            if k.is_one() {
                return Some(*v);
            }
        }
        None
    }

    pub fn add(&self, other: &LinearExpression) -> LinearExpression {
        let mut terms = self.terms.clone();
        for (v, k) in &other.terms {
            let entry = terms.entry(*v).or_insert_with(BigInt::zero);
            *entry += k;
            if entry.is_zero() {
                terms.remove(v);
            }
        }
        LinearExpression {
            terms,
            constant: &self.constant + &other.constant,
        }
    }

    pub fn sub(&self, other: &LinearExpression) -> LinearExpression {
        self.add(&other.scale(&-BigInt::one()))
    }

    pub fn scale(&self, k: &BigInt) -> LinearExpression {
        let terms = self
            .terms
            .iter()
            .map(|(v, c)| (*v, c * k))
            .filter(|(_, c)| !c.is_zero())
            .collect();
        LinearExpression {
            terms,
            constant: &self.constant * k,
        }
    }

    pub fn add_constant<I: Into<BigInt>>(&self, k: I) -> LinearExpression {
        self.add(&LinearExpression::constant(k))
    }

    pub fn terms(&self) -> impl Iterator<Item = (SymbolName, &BigInt)> {
        self.terms.iter().map(|(v, k)| (*v, k))
    }

    pub fn constant_part(&self) -> &BigInt {
        &self.constant
    }
}

impl fmt::Display for LinearExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "{}", self.constant);
        }
        let mut first = true;
        for (v, k) in &self.terms {
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            if k.is_one() {
                write!(f, "{v}")?;
            } else {
                write!(f, "{k}*{v}")?;
            }
        }
        if !self.constant.is_zero() {
            write!(f, " + {}", self.constant)?;
        }
        Ok(())
    }
}

/// The relational operator of a `LinearConstraint`: `expr ⊙ 0`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RelOp {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl RelOp {
    fn negated(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Ne,
            RelOp::Ne => RelOp::Eq,
            RelOp::Le => RelOp::Gt,
            RelOp::Gt => RelOp::Le,
            RelOp::Ge => RelOp::Lt,
            RelOp::Lt => RelOp::Ge,
        }
    }
}

/// `expr ⊙ 0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearConstraint {
    pub expr: LinearExpression,
    pub op: RelOp,
}

impl LinearConstraint {
    pub fn new(expr: LinearExpression, op: RelOp) -> Self {
        LinearConstraint { expr, op }
    }

    /// `lhs ⊙ rhs`, expressed as `(lhs - rhs) ⊙ 0`.
    pub fn binary(lhs: &LinearExpression, op: RelOp, rhs: &LinearExpression) -> Self {
        LinearConstraint::new(lhs.sub(rhs), op)
    }

    pub fn negate(&self) -> LinearConstraint {
        LinearConstraint::new(self.expr.clone(), self.op.negated())
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self.op {
            RelOp::Eq => "=",
            RelOp::Ne => "!=",
            RelOp::Le => "<=",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Gt => ">",
        };
        write!(f, "{} {} 0", self.expr, sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::SequentialVariableFactory;
    use crate::symtab::VariableFactory;

    #[test]
    fn negate_is_involution() {
        let mut vf = SequentialVariableFactory::new();
        let a = vf.fresh();
        let e = LinearExpression::var(a).add_constant(-3);
        let c = LinearConstraint::new(e, RelOp::Le);
        assert_eq!(c.negate().negate(), c);
        assert_ne!(c.negate(), c);
    }

    #[test]
    fn is_var_detects_bare_variables() {
        let mut vf = SequentialVariableFactory::new();
        let a = vf.fresh();
        assert_eq!(LinearExpression::var(a).is_var(), Some(a));
        assert_eq!(LinearExpression::var(a).add_constant(1).is_var(), None);
        assert_eq!(LinearExpression::var(a).scale(&BigInt::from(2)).is_var(), None);
    }
}
