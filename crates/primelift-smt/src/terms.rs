/// Operators the oracle is asked to build terms from.
///
/// The integer family mirrors the source-formula operators plus `mod`; the `Bv*`
/// family is the unsigned bitvector ring used by the fixed-width encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtOp {
    Eq,
    Add,
    Sub,
    Mul,
    Gt,
    Lt,
    Ge,
    Le,
    /// Euclidean integer modulus (`mod`), non-negative for positive divisors.
    Mod,
    BvAdd,
    BvSub,
    BvMul,
    BvUgt,
    BvUlt,
    BvUge,
    BvUle,
    BvUrem,
}

impl SmtOp {
    /// SMT-LIB2 symbol for this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            SmtOp::Eq => "=",
            SmtOp::Add => "+",
            SmtOp::Sub => "-",
            SmtOp::Mul => "*",
            SmtOp::Gt => ">",
            SmtOp::Lt => "<",
            SmtOp::Ge => ">=",
            SmtOp::Le => "<=",
            SmtOp::Mod => "mod",
            SmtOp::BvAdd => "bvadd",
            SmtOp::BvSub => "bvsub",
            SmtOp::BvMul => "bvmul",
            SmtOp::BvUgt => "bvugt",
            SmtOp::BvUlt => "bvult",
            SmtOp::BvUge => "bvuge",
            SmtOp::BvUle => "bvule",
            SmtOp::BvUrem => "bvurem",
        }
    }

    /// True for operators whose application is a Bool (assertable) term.
    pub fn is_predicate(self) -> bool {
        matches!(
            self,
            SmtOp::Eq
                | SmtOp::Gt
                | SmtOp::Lt
                | SmtOp::Ge
                | SmtOp::Le
                | SmtOp::BvUgt
                | SmtOp::BvUlt
                | SmtOp::BvUge
                | SmtOp::BvUle
        )
    }
}

/// Abstract term representation, solver-agnostic.
///
/// Operator applications keep their full operand list: the source formulas
/// use n-ary `+`, `*` and chained comparisons, and the bitvector encoder
/// needs to see a whole multiplication fan-in at once.
#[derive(Debug, Clone, PartialEq)]
pub enum SmtTerm {
    /// Constant reference by name.
    Var(String),
    /// Integer literal.
    IntLit(i64),
    /// Bitvector literal of an explicit width.
    BvLit { value: u64, width: u32 },
    /// Operator application.
    App(SmtOp, Vec<SmtTerm>),
}

impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    pub fn bv(value: u64, width: u32) -> Self {
        SmtTerm::BvLit { value, width }
    }

    pub fn app(op: SmtOp, operands: Vec<SmtTerm>) -> Self {
        SmtTerm::App(op, operands)
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::App(SmtOp::Eq, vec![self, other])
    }

    pub fn lt(self, other: SmtTerm) -> Self {
        SmtTerm::App(SmtOp::Lt, vec![self, other])
    }

    pub fn ge(self, other: SmtTerm) -> Self {
        SmtTerm::App(SmtOp::Ge, vec![self, other])
    }

    pub fn bv_ult(self, other: SmtTerm) -> Self {
        SmtTerm::App(SmtOp::BvUlt, vec![self, other])
    }

    pub fn modulo(self, divisor: SmtTerm) -> Self {
        SmtTerm::App(SmtOp::Mod, vec![self, divisor])
    }

    pub fn bv_urem(self, divisor: SmtTerm) -> Self {
        SmtTerm::App(SmtOp::BvUrem, vec![self, divisor])
    }
}
