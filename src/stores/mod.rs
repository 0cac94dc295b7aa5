// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application state holders: the session and the peak/check-in domain.

pub mod domain;
pub mod session;
pub mod views;

pub use domain::{DomainState, DomainStore};
pub use session::{SessionState, SessionStore};
