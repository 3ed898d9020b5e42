pub mod cvc5_backend;
pub mod smtlib_printer;

pub use cvc5_backend::{Cvc5Factory, Cvc5Session};
