//! Property-based tests for fingerprint and persistence guarantees

mod determinism;
