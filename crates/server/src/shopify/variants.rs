//! Variant catalog scan for report assembly.
//!
//! Assembling a report needs every variant's SKU, title, and inventory in
//! memory at once, so the scan is bounded by a hard cap rather than paged
//! through the job machinery.

use serde::Deserialize;
use stockpilot_core::VariantId;
use tracing::instrument;

use crate::config::VARIANT_PAGE_SIZE;

use super::{ShopifyClient, ShopifyError};

/// The full variant catalog, up to the scan cap.
#[derive(Debug, Clone)]
pub struct VariantScan {
    /// Variants fetched.
    pub items: Vec<VariantRecord>,
    /// True when the cap was hit before the catalog was exhausted.
    pub truncated: bool,
}

/// A product variant as seen by report assembly.
#[derive(Debug, Clone)]
pub struct VariantRecord {
    /// Shopify variant GID.
    pub id: VariantId,
    /// SKU, used to join against purchase-order receipts.
    pub sku: Option<String>,
    /// Variant display title.
    pub title: String,
    /// Parent product title.
    pub product_title: String,
    /// Current inventory across locations.
    pub inventory_quantity: i64,
}

const VARIANTS_QUERY: &str = r"
query VariantsPage($first: Int!, $after: String) {
  productVariants(first: $first, after: $after) {
    edges {
      node {
        id
        sku
        title
        inventoryQuantity
        product {
          title
        }
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
";

#[derive(Debug, Deserialize)]
struct VariantsData {
    #[serde(rename = "productVariants")]
    product_variants: VariantConnection,
}

#[derive(Debug, Deserialize)]
struct VariantConnection {
    edges: Vec<VariantEdge>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct VariantEdge {
    node: VariantNode,
}

#[derive(Debug, Deserialize)]
struct VariantNode {
    id: String,
    sku: Option<String>,
    title: String,
    #[serde(rename = "inventoryQuantity")]
    inventory_quantity: Option<i64>,
    product: ProductRef,
}

#[derive(Debug, Deserialize)]
struct ProductRef {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

impl ShopifyClient {
    /// Fetch the variant catalog, stopping at `cap` variants.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self))]
    pub async fn fetch_all_variants(&self, cap: usize) -> Result<VariantScan, ShopifyError> {
        let mut items: Vec<VariantRecord> = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let variables = serde_json::json!({
                "first": VARIANT_PAGE_SIZE,
                "after": after,
            });

            let data: VariantsData = self.execute(VARIANTS_QUERY, variables).await?;

            for edge in data.product_variants.edges {
                items.push(VariantRecord {
                    id: VariantId::new(edge.node.id),
                    sku: edge.node.sku.filter(|s| !s.is_empty()),
                    title: edge.node.title,
                    product_title: edge.node.product.title,
                    inventory_quantity: edge.node.inventory_quantity.unwrap_or(0),
                });
                if items.len() >= cap {
                    return Ok(VariantScan {
                        items,
                        truncated: true,
                    });
                }
            }

            if !data.product_variants.page_info.has_next_page {
                break;
            }
            after = data.product_variants.page_info.end_cursor;
        }

        Ok(VariantScan {
            items,
            truncated: false,
        })
    }
}
