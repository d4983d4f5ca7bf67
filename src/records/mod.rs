//! Student Records Module
//!
//! The record-management surface of the node: a single `Student` record type (with a
//! `StudentKind` tag for undergraduate/graduate) stored in the replicated cache under its
//! decimal id, plus score bookkeeping and the REST API over it.

pub mod handlers;
pub mod manager;
pub mod types;
