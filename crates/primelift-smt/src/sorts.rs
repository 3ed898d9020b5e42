/// SMT sorts the solver loop declares constants over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    Int,
    /// Unsigned bitvector of the given width.
    BitVec(u32),
}

impl std::fmt::Display for Sort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sort::Int => write!(f, "Int"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {w})"),
        }
    }
}
