//! Resource identities and the per-message reference allocator.
//!
//! Every resource in a composed message is addressed by a `urn:uuid:` full URL. The full URL is
//! the *only* identity mechanism inside a message: bundle entries carry it as `fullUrl`, and
//! every cross-resource reference must equal one of them.
//!
//! This crate provides:
//! - [`ResourceIdentity`], a version-4 UUID exposed both as a bare hyphenated id and as a
//!   [`FullUrl`]
//! - [`ReferenceAllocator`], which hands out one identity per logical role for a single compose
//!   call and never issues the same UUID twice
//! - [`UuidSource`], the randomness seam; [`RandomUuids`] in production and [`SequentialUuids`]
//!   where tests need stable output
//!
//! ## Forms
//! - Bare id: `550e8400-e29b-41d4-a716-446655440000` (used for `Resource.id`)
//! - Full URL: `urn:uuid:550e8400-e29b-41d4-a716-446655440000` (used for `fullUrl` and references)

mod allocator;
mod identity;

pub use allocator::{RandomUuids, ReferenceAllocator, SequentialUuids, UuidSource};
pub use identity::{FullUrl, ResourceIdentity, Uuid, URN_UUID_PREFIX};
