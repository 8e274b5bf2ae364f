// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod dispatch;
pub mod editor;
pub mod gateway;
pub mod ids;
pub mod invocation;
pub mod model;
pub mod state;
pub mod status;

pub use dispatch::*;
pub use editor::*;
pub use gateway::*;
pub use ids::*;
pub use invocation::*;
pub use model::*;
pub use state::*;
pub use status::*;
