//! Symbolic record of how a DRV was built, used only to render it.
//!
//! Trees never influence probabilities. A DRV whose construction cannot be
//! described (for example, one produced by [`Drv::apply`]) simply has none.
//!
//! [`Drv::apply`]: crate::dice_engine::drv::Drv::apply

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Literal source text such as `d6` or `3`.
    Atom(String),
    /// Prefix operator, e.g. negation.
    Unary { operator: String, operand: Arc<Expr> },
    Binary {
        left: Arc<Expr>,
        right: Arc<Expr>,
        connective: String,
    },
    /// Method-call-like suffix (`.explode()`), binds tighter than any operator.
    Attr { operand: Arc<Expr>, postfix: String },
}

/// Binding strength of the binary connectives DRVs support.
pub fn precedence(connective: &str) -> u8 {
    match connective {
        "@" | "*" | "/" | "//" => 3,
        "+" | "-" => 2,
        _ => 1,
    }
}

impl Expr {
    pub fn atom(text: impl Into<String>) -> Self {
        Expr::Atom(text.into())
    }

    pub fn unary(operator: impl Into<String>, operand: Arc<Expr>) -> Self {
        Expr::Unary { operator: operator.into(), operand }
    }

    pub fn binary(left: Arc<Expr>, right: Arc<Expr>, connective: impl Into<String>) -> Self {
        Expr::Binary { left, right, connective: connective.into() }
    }

    pub fn attr(operand: Arc<Expr>, postfix: impl Into<String>) -> Self {
        Expr::Attr { operand, postfix: postfix.into() }
    }

    /// Render without outer brackets.
    pub fn source(&self) -> String {
        match self {
            Expr::Atom(text) => text.clone(),
            Expr::Unary { operator, operand } => format!("{}{}", operator, operand.bracketed()),
            Expr::Attr { operand, postfix } => format!("{}{}", operand.bracketed(), postfix),
            Expr::Binary { left, right, connective } => {
                let prec = precedence(connective);
                let left_text = match left.as_ref() {
                    Expr::Binary { connective: lc, .. } => {
                        let lp = precedence(lc);
                        // Same-operator chains read left to right, except
                        // comparisons. Mixed + and - chains do too.
                        let omit = lp > prec
                            || (lc == connective && prec > 1)
                            || (lp == 2 && prec == 2);
                        if omit {
                            left.source()
                        } else {
                            left.bracketed()
                        }
                    }
                    _ => left.bracketed(),
                };
                let right_text = match right.as_ref() {
                    Expr::Binary { connective: rc, .. } if precedence(rc) > prec => right.source(),
                    _ => right.bracketed(),
                };
                format!("{} {} {}", left_text, connective, right_text)
            }
        }
    }

    /// Render so the result can be an operand of any operator.
    pub fn bracketed(&self) -> String {
        match self {
            Expr::Atom(_) | Expr::Attr { .. } => self.source(),
            _ => format!("({})", self.source()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bracketed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> Arc<Expr> {
        Arc::new(Expr::atom(s))
    }

    fn bin(l: Arc<Expr>, r: Arc<Expr>, c: &str) -> Arc<Expr> {
        Arc::new(Expr::binary(l, r, c))
    }

    #[test]
    fn atoms_and_attrs_are_never_bracketed() {
        assert_eq!(atom("d6").bracketed(), "d6");
        let exploded = Expr::attr(atom("d6"), ".explode()");
        assert_eq!(exploded.bracketed(), "d6.explode()");
        let neg = Arc::new(Expr::unary("-", atom("d6")));
        assert_eq!(Expr::attr(neg, ".explode()").bracketed(), "(-d6).explode()");
    }

    #[test]
    fn additive_chains_drop_brackets_on_the_left_only() {
        let left = bin(bin(atom("d6"), atom("d6"), "-"), atom("d6"), "-");
        assert_eq!(left.bracketed(), "(d6 - d6 - d6)");
        let right = bin(atom("d6"), bin(atom("d6"), atom("d6"), "-"), "-");
        assert_eq!(right.bracketed(), "(d6 - (d6 - d6))");
        let mixed = bin(bin(atom("d6"), atom("d6"), "+"), atom("d6"), "-");
        assert_eq!(mixed.bracketed(), "(d6 + d6 - d6)");
    }

    #[test]
    fn lower_precedence_operands_keep_brackets() {
        let product = bin(bin(atom("d6"), atom("d6"), "+"), atom("d6"), "*");
        assert_eq!(product.bracketed(), "((d6 + d6) * d6)");
        let comparison = bin(bin(atom("d6"), atom("d6"), "+"), atom("d6"), "<");
        assert_eq!(comparison.bracketed(), "(d6 + d6 < d6)");
        let le = bin(atom("d6"), atom("d6"), "<=");
        let nested = bin(le.clone(), le, "<=");
        assert_eq!(nested.bracketed(), "((d6 <= d6) <= (d6 <= d6))");
    }

    #[test]
    fn mixed_expression() {
        let lhs = bin(bin(atom("2"), atom("d4"), "@"), bin(atom("d6"), atom("d10"), "+"), "*");
        let rhs = bin(bin(atom("8"), atom("d4"), "@"), atom("5"), "-");
        assert_eq!(bin(lhs, rhs, "-").bracketed(), "((2 @ d4) * (d6 + d10) - (8 @ d4 - 5))");
    }
}
