// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod filter;
pub mod grid;
pub mod model;
pub mod pagination;
pub mod timer;

pub use filter::*;
pub use grid::*;
pub use model::*;
pub use pagination::*;
pub use timer::*;
