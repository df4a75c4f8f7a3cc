//! Device backends.
//!
//! `sim` implements the device directory, stage factory and a driver
//! thread in-process. It backs the unit tests and lets `bdacap` replay a
//! recorded transport stream through a full capture session.

pub mod sim;
