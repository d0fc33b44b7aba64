//! REST API client for the Loyverse API.
//!
//! This module provides a higher-level REST API client built on top of the
//! [`HttpClient`](crate::clients::HttpClient).
//!
//! # Overview
//!
//! - [`RestClient`]: `get()`, `post()`, `put()`, `delete()`, cursor
//!   pagination and typed catalogue calls
//! - [`Page`]: one decoded page of a list endpoint
//! - [`Category`], [`Item`], [`Variant`], [`VariantStore`], [`Store`]:
//!   catalogue models
//!
//! # Pagination
//!
//! List endpoints are walked with `limit` and `cursor` query parameters until
//! the API stops returning a cursor:
//!
//! ```rust,ignore
//! let items = client.paginate("items", None).await?;
//! let categories = client.paginate_collection("categories", "categories", None).await?;
//! let stores: Vec<Store> = client.paginate_as("stores", "stores", None).await?;
//! ```

mod client;
mod pagination;
mod resources;

pub use client::RestClient;
pub use pagination::{Page, CURSOR_PARAM, DEFAULT_COLLECTION_KEY, LIMIT_PARAM};
pub use resources::{Category, Item, Store, Variant, VariantStore};
