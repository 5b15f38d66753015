//! Order pagination for the report scan.
//!
//! The scan walks orders newest-first inside a creation-time window, one
//! cursor-addressed page at a time. Line items carry only what the sales
//! accumulator needs: quantity and variant ID.

use serde::Deserialize;
use stockpilot_core::VariantId;
use tracing::instrument;

use super::{ShopifyClient, ShopifyError};

/// One page of orders from the Admin API.
#[derive(Debug, Clone)]
pub struct OrderPage {
    /// Orders on this page.
    pub records: Vec<OrderRecord>,
    /// Whether more pages follow.
    pub has_more: bool,
    /// Cursor addressing the position after this page.
    pub next_cursor: Option<String>,
}

/// An order as seen by the report scan.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    /// Shopify order GID.
    pub id: String,
    /// Order creation time, RFC 3339.
    pub created_at: String,
    /// Line items with a resolvable variant.
    pub line_items: Vec<OrderLineItem>,
}

/// A line item contributing to variant sales.
#[derive(Debug, Clone)]
pub struct OrderLineItem {
    /// Shopify variant GID.
    pub variant_id: VariantId,
    /// Units sold on this line.
    pub quantity: i64,
}

const ORDERS_QUERY: &str = r"
query OrdersPage($first: Int!, $after: String, $query: String) {
  orders(first: $first, after: $after, query: $query, sortKey: CREATED_AT) {
    edges {
      node {
        id
        createdAt
        lineItems(first: 50) {
          edges {
            node {
              quantity
              variant {
                id
              }
            }
          }
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
struct OrdersData {
    orders: OrdersConnection,
}

#[derive(Debug, Deserialize)]
struct OrdersConnection {
    edges: Vec<OrderEdge>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct OrderEdge {
    node: OrderNode,
}

#[derive(Debug, Deserialize)]
struct OrderNode {
    id: String,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(rename = "lineItems")]
    line_items: LineItemConnection,
}

#[derive(Debug, Deserialize)]
struct LineItemConnection {
    edges: Vec<LineItemEdge>,
}

#[derive(Debug, Deserialize)]
struct LineItemEdge {
    node: LineItemNode,
}

#[derive(Debug, Deserialize)]
struct LineItemNode {
    quantity: i64,
    variant: Option<VariantRef>,
}

#[derive(Debug, Deserialize)]
struct VariantRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

impl ShopifyClient {
    /// Fetch one page of orders created at or after `window_start`.
    ///
    /// Line items whose variant has been deleted are skipped; they can no
    /// longer be joined to a variant row in the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self, after))]
    pub async fn fetch_orders_page(
        &self,
        first: i64,
        after: Option<&str>,
        window_start: &str,
    ) -> Result<OrderPage, ShopifyError> {
        let variables = serde_json::json!({
            "first": first,
            "after": after,
            "query": format!("created_at:>='{window_start}'"),
        });

        let data: OrdersData = self.execute(ORDERS_QUERY, variables).await?;

        let records = data
            .orders
            .edges
            .into_iter()
            .map(|edge| OrderRecord {
                id: edge.node.id,
                created_at: edge.node.created_at,
                line_items: edge
                    .node
                    .line_items
                    .edges
                    .into_iter()
                    .filter_map(|li| {
                        li.node.variant.map(|v| OrderLineItem {
                            variant_id: VariantId::new(v.id),
                            quantity: li.node.quantity,
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(OrderPage {
            records,
            has_more: data.orders.page_info.has_next_page,
            next_cursor: data.orders.page_info.end_cursor,
        })
    }
}
