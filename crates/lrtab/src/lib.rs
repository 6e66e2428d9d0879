//! Construction of LR(0) and SLR(1) parse tables.
//!
//! ```
//! use lrtab::{grammar::Grammar, parser::parse, table::Config};
//!
//! let g = Grammar::from_str("@rule S := C C;\n@rule C := c C | d;").unwrap();
//! let table = Config::new().generate(&g);
//! assert!(table.is_deterministic());
//!
//! let outcome = parse(&g, &table, ["c", "d", "d"]).unwrap();
//! assert!(outcome.is_accepted());
//! ```

pub mod first_follow;
pub mod grammar;
pub mod item;
pub mod lr0;
pub mod parser;
pub mod report;
pub mod syntax;
pub mod table;
pub mod types;
pub mod util;
