// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - backend integrations.

pub mod auth;

pub use auth::{AuthChange, AuthEvent, AuthGateway, AuthSession, AuthUser, GoTrueAuth};
