//! Table-level operations on [`crate::db::Store`], one file per table.

mod cards;
mod greetings;
mod usage;
