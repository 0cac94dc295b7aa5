// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod checkin;
pub mod peak;
pub mod stats;
pub mod user;

pub use checkin::Checkin;
pub use peak::{Location, Peak, PeakWithCheckin};
pub use stats::Stats;
pub use user::User;
