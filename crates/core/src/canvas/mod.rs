//! Canvas LMS REST API adapter.

pub mod client;
pub mod pagination;

pub use client::{CanvasClient, CanvasGroup, CanvasUser};
