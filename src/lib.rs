//! A tiny to-do list: an ordered task list plus two preferences, kept in a
//! durable key-value store and rehydrated at startup.
//!
//! [`ops::task_store::TaskStore`] is the single owner of that state. The
//! `td` binary in `cli` is one front end for it.

pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod util;
