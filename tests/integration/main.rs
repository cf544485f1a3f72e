//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters and the simulated MLX90640. All tests run on the
//! host (x86_64) with no real hardware required.

mod acquisition_tests;
mod distribution_tests;
mod mock_hw;
mod pipeline_tests;
