//! Integration tests for the in-memory R-tree.
//!
//! These tests drive the tree only through its public surface: the
//! tree facade, the region cursor and the nearest-neighbour query.

mod invariant_test;
mod nearest_test;
mod region_query_test;
