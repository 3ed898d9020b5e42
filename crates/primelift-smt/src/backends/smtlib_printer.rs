use crate::sorts::Sort;
use crate::terms::SmtTerm;

/// Render a term as SMT-LIB2 text.
pub fn to_smtlib(term: &SmtTerm) -> String {
    let mut out = String::new();
    write_term(&mut out, term);
    out
}

fn write_term(out: &mut String, term: &SmtTerm) {
    match term {
        SmtTerm::Var(name) => out.push_str(name),
        SmtTerm::IntLit(n) => {
            if *n < 0 {
                out.push_str("(- ");
                out.push_str(&n.unsigned_abs().to_string());
                out.push(')');
            } else {
                out.push_str(&n.to_string());
            }
        }
        SmtTerm::BvLit { value, width } => {
            out.push_str("#b");
            for bit in (0..*width).rev() {
                out.push(if value >> bit & 1 == 1 { '1' } else { '0' });
            }
        }
        SmtTerm::App(op, operands) => {
            out.push('(');
            out.push_str(op.symbol());
            for operand in operands {
                out.push(' ');
                write_term(out, operand);
            }
            out.push(')');
        }
    }
}

pub fn sort_to_smtlib(sort: &Sort) -> String {
    sort.to_string()
}
