use indexmap::IndexSet;

/// Operator tags the constraint language supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpTag {
    Eq,
    Add,
    Sub,
    Mul,
    Gt,
    Lt,
    Ge,
    Le,
}

impl OpTag {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(OpTag::Eq),
            "+" => Some(OpTag::Add),
            "-" => Some(OpTag::Sub),
            "*" => Some(OpTag::Mul),
            ">" => Some(OpTag::Gt),
            "<" => Some(OpTag::Lt),
            ">=" => Some(OpTag::Ge),
            "<=" => Some(OpTag::Le),
            _ => None,
        }
    }

    /// True for operators whose application is a Bool rather than a ring
    /// value; predicates are never wrapped with a modular reduction.
    pub fn is_predicate(self) -> bool {
        matches!(self, OpTag::Eq | OpTag::Gt | OpTag::Lt | OpTag::Ge | OpTag::Le)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            OpTag::Eq => "=",
            OpTag::Add => "+",
            OpTag::Sub => "-",
            OpTag::Mul => "*",
            OpTag::Gt => ">",
            OpTag::Lt => "<",
            OpTag::Ge => ">=",
            OpTag::Le => "<=",
        }
    }
}

/// A node in a parsed constraint, immutable once built.
///
/// Leaves carry their source text: literal-to-integer conversion is the
/// encoder's job (it is where conversion overflow turns into a file abort),
/// and variables are resolved against the declared set at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Var(String),
    Lit(String),
    App(OpTag, Vec<Term>),
}

impl Term {
    /// Largest operand count of any `*` node in this (sub)term.
    pub fn max_mul_fanin(&self) -> usize {
        match self {
            Term::Var(_) | Term::Lit(_) => 0,
            Term::App(op, operands) => {
                let own = if *op == OpTag::Mul { operands.len() } else { 0 };
                operands
                    .iter()
                    .map(Term::max_mul_fanin)
                    .fold(own, usize::max)
            }
        }
    }
}

/// One input file's formula: the declared integer constants in declaration
/// order, and the asserted constraints in file order.
///
/// The variable set is fixed for the file's lifetime; its order drives the
/// candidate enumeration and the model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintModel {
    pub vars: IndexSet<String>,
    pub asserts: Vec<Term>,
}

impl ConstraintModel {
    /// Largest `*` fan-in across all assertions; bitwidth sizing input.
    pub fn max_mul_fanin(&self) -> usize {
        self.asserts
            .iter()
            .map(Term::max_mul_fanin)
            .fold(0, usize::max)
    }
}
