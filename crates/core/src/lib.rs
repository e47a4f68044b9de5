//! Functional core for shipledger.
//!
//! Pure types, traits and functions with no I/O. Backends, the cache
//! provisioner and the collection stitcher live in the `shipledger` crate and
//! build on the seams defined here.

pub mod cache;
pub mod order;
pub mod stitch;
pub mod storage;
