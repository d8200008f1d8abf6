//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存编排层使用的并发协调原语。

pub mod flight;

pub use flight::{FlightGroup, FlightOutcome};
