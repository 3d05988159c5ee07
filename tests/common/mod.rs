//! Common test utilities for trilerp.
//!
//! This module provides shared grids, query batches and assertions.

#![allow(dead_code)]

pub mod assertions;
pub mod test_data;
