//! Heap Analysis - Field-sensitive abstract heap
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ application: HeapModel                                   │
//! │   allocation / load / store / mutating methods           │
//! │                  │ uses                                  │
//! │                  ▼                                       │
//! │ domain: HeapState ── HeapValue ── HeapEffects            │
//! │   (object, field) → value, initialized/summary sets      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Objects are the pointer analysis' (allocation site, context) arena ids.
//! A write to a single non-summary object replaces the old value; any other
//! write joins into it. Merging Null with a non-Null value gives Nullable.

pub mod application;
pub mod domain;

pub use application::{check_bounds, is_known_mutating, BoundsCheck, HeapModel};
pub use domain::{Allocation, Field, HeapEffects, HeapState, HeapValue, HeapWrite, Slot};
