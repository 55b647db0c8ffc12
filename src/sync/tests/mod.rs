//! Unit tests for reconciliation, effect execution, and both sync paths.
