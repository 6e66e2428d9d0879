//! Runtime implementation of the table-driven shift-reduce parser for `lrtab`.

pub mod definition;
pub mod parser;
