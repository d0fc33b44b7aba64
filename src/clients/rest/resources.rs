//! Typed access to the catalogue endpoints.
//!
//! The models carry the fields price management works with. Anything else
//! the API returns is kept in `extra`, so an item fetched, edited and sent
//! back with [`RestClient::upsert_item`] keeps the fields this crate does
//! not model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clients::errors::LoyverseError;
use crate::clients::rest::RestClient;

/// A catalogue category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Color tag, e.g. `GREY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A physical store of the merchant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    /// Store id.
    pub id: String,
    /// Display name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Price and availability of a variant in one store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantStore {
    pub store_id: String,
    /// `FIXED` or `VARIABLE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_type: Option<String>,
    /// Store price; `None` for variable pricing.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_true")]
    pub available_for_sale: bool,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A sellable variant of an item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Variant id; absent when creating a new item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option1_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pricing_type: Option<String>,
    #[serde(default)]
    pub default_price: Option<f64>,
    #[serde(default)]
    pub stores: Vec<VariantStore>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A catalogue item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item id; absent when creating a new item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub track_stock: bool,
    #[serde(default)]
    pub sold_by_weight: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// Returns the variant with `variant_id`, if the item has it.
    #[must_use]
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|variant| variant.variant_id.as_deref() == Some(variant_id))
    }
}

const fn default_true() -> bool {
    true
}

impl RestClient {
    /// Fetches every category.
    ///
    /// # Errors
    ///
    /// Returns any error of [`RestClient::paginate_collection`], or
    /// [`LoyverseError::Decode`] if a category does not match [`Category`].
    pub async fn list_categories(&self) -> Result<Vec<Category>, LoyverseError> {
        self.paginate_as("categories", "categories", None).await
    }

    /// Fetches every item, optionally filtered by `params`
    /// (e.g. `updated_at_min`, `show_deleted`).
    ///
    /// # Errors
    ///
    /// Returns any error of [`RestClient::paginate_collection`], or
    /// [`LoyverseError::Decode`] if an item does not match [`Item`].
    pub async fn list_items(
        &self,
        params: Option<HashMap<String, String>>,
    ) -> Result<Vec<Item>, LoyverseError> {
        self.paginate_as("items", "items", params).await
    }

    /// Fetches every store.
    ///
    /// # Errors
    ///
    /// Returns any error of [`RestClient::paginate_collection`], or
    /// [`LoyverseError::Decode`] if a store does not match [`Store`].
    pub async fn list_stores(&self) -> Result<Vec<Store>, LoyverseError> {
        self.paginate_as("stores", "stores", None).await
    }

    /// Fetches one item by id.
    ///
    /// # Errors
    ///
    /// Returns [`LoyverseError::Api`] with status 404 for an unknown id, or
    /// any other error of [`RestClient::get`].
    pub async fn get_item(&self, id: &str) -> Result<Item, LoyverseError> {
        let body = self.get(&format!("items/{id}"), None).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Creates `item`, or updates it when it carries an `id`.
    ///
    /// Returns the item as stored by Loyverse.
    ///
    /// # Errors
    ///
    /// Returns [`LoyverseError::Api`] if Loyverse rejects the item, or any
    /// other error of [`RestClient::post`].
    pub async fn upsert_item(&self, item: &Item) -> Result<Item, LoyverseError> {
        let body = self.post("items", item).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Deletes one item by id.
    ///
    /// # Errors
    ///
    /// Returns any error of [`RestClient::delete`].
    pub async fn delete_item(&self, id: &str) -> Result<(), LoyverseError> {
        self.delete(&format!("items/{id}")).await?;
        Ok(())
    }
}
