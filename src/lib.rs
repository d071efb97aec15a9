//! # sproc-lineage
//!
//! A library for parsing Sybase T-SQL stored procedures and extracting their table-level lineage.
//!
//! # Features
//!
//! - Parse whole scripts (`GO`-separated batches holding a procedure definition or plain
//!   statements) into a syntax tree.
//! - Collect source and temporary (`#`, `##`) tables referenced by the script.
//! - Capture select lists and WHERE conditions as written in the source.
//! - List the INSERT, UPDATE, DELETE and CREATE TABLE operations, in order. An UPDATE/DELETE
//!   target written as an alias is reported as the table it stands for.
//! - Report the declared input parameters with their types.
//!
//! # Example
//!
//! ```rust,no_run
//! use sproc_lineage::{lineage::extract_lineage, parser::parse_sql};
//!
//! fn main() -> anyhow::Result<()> {
//!     env_logger::init();
//!
//!     let sql = r#"
//!         create procedure load_orders @region varchar(20) as
//!         begin
//!             select id, amount into #stage from Orders where region = @region
//!             update Totals set amount = s.amount from #stage s where Totals.id = s.id
//!         end
//!     "#;
//!     let ast = parse_sql(sql)?;
//!     println!("Syntax Tree: {:?}", ast);
//!
//!     let lineage = extract_lineage(&ast);
//!     println!("\n{}", lineage);
//!     Ok(())
//! }
//! ```
pub mod ast;
pub mod lineage;
pub mod parser;
pub mod scanner;
pub mod test_utils;
