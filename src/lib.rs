//! Routing/DNS mode switcher library — shared by the CLI binary and integration tests.

pub mod routing;
