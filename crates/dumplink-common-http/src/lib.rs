// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for dumplink.
//!
//! Every request leaving the uploader carries the same `User-Agent` so the
//! ingestion side can tell SDK builds and platforms apart.

mod client;

pub use client::{builder, user_agent};
