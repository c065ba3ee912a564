//! Compilation pass modules.
//!
//! Each pass is a self-contained stage of the pipeline. Passes are executed in
//! order (0-3) and each consumes the output of the previous one.

pub mod p0_discovery;
pub mod p1_assembly;
pub mod p2_polymorphism;
pub mod p3_normalize;
