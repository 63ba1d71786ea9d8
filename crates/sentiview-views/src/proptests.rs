//! Property-based tests for the mappers.
