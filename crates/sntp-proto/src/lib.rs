// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! SNTP protocol types, packet codec, and fixed-point time arithmetic.
//!
//! This crate provides the foundational types and parsing logic for the
//! Simple Network Time Protocol: the 48-byte packet header defined by
//! RFC 5905, the 16.16 and 32.32 fixed-point time formats, and the
//! semantic packet views used to build requests and interpret responses.
//!
//! No networking lives here; see the companion client crate for the query
//! engine and multi-server manager.

#![warn(missing_docs)]

/// Custom error types for buffer-based packet parsing and serialization.
pub mod error;

/// Conversions between NTP fixed-point time values and host time.
pub mod net_time;

/// Semantic packet views over the raw wire header.
pub mod packet;

/// Wire protocol types and constants (RFC 5905).
pub mod protocol;
