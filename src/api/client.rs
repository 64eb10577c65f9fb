use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::api_types::{
  ApiCartSummary, ApiEnvelope, ApiListingResponse, ApiLoginRequest, ApiSearchResponse,
  ApiWishlistData, ApiWishlistItemRequest,
};
use super::types::{
  CartSummary, Credentials, ListingParams, Page, Product, ProductId, SearchResults, SessionGrant,
};
use super::{Principal, StorefrontApi};
use crate::config::ApiConfig;
use crate::error::{StoreError, StoreResult};

/// reqwest-backed storefront client
#[derive(Clone)]
pub struct HttpStorefront {
  http: reqwest::Client,
  base: Url,
}

impl HttpStorefront {
  pub fn new(config: &ApiConfig) -> color_eyre::Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("shelf/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base: config.base_url()?,
    })
  }

  fn url(&self, path: &str) -> StoreResult<Url> {
    self
      .base
      .join(path)
      .map_err(|e| StoreError::Validation(format!("bad request path {}: {}", path, e)))
  }

  fn authorized(&self, builder: RequestBuilder, who: &Principal) -> RequestBuilder {
    builder.bearer_auth(&who.token)
  }

  async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> StoreResult<T> {
    let response = builder.send().await?;
    read_json(response).await
  }

  async fn wishlist_mutation(&self, builder: RequestBuilder) -> StoreResult<Option<Vec<Product>>> {
    let envelope: ApiEnvelope<ApiWishlistData> = self.send(builder).await?;
    Ok(envelope.into_result()?.map(|data| data.products))
  }
}

/// Map the response status onto the error taxonomy, then decode the body.
async fn read_json<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
  let status = response.status();
  debug!(url = %response.url(), status = status.as_u16(), "storefront response");

  match status {
    StatusCode::UNAUTHORIZED => Err(StoreError::Unauthenticated),
    StatusCode::CONFLICT => {
      let body = response.text().await.unwrap_or_default();
      Err(StoreError::Conflict(if body.is_empty() {
        "conflict".to_string()
      } else {
        body
      }))
    }
    s if !s.is_success() => Err(StoreError::http(
      s.as_u16(),
      s.canonical_reason().unwrap_or("request failed"),
    )),
    _ => Ok(response.json::<T>().await?),
  }
}

#[async_trait]
impl StorefrontApi for HttpStorefront {
  async fn search(&self, query: &str, page: u32, page_size: u32) -> StoreResult<SearchResults> {
    let url = self.url("search")?;
    let builder = self.http.get(url).query(&[
      ("q", query.to_string()),
      ("page", page.to_string()),
      ("limit", page_size.to_string()),
    ]);
    let response: ApiSearchResponse = self.send(builder).await?;
    Ok(response.into())
  }

  async fn wishlist_add(
    &self,
    who: &Principal,
    product: &ProductId,
  ) -> StoreResult<Option<Vec<Product>>> {
    let url = self.url(&format!("wishlist/{}/items", who.customer_id))?;
    let builder = self
      .authorized(self.http.post(url), who)
      .json(&ApiWishlistItemRequest { product_id: product });
    self.wishlist_mutation(builder).await
  }

  async fn wishlist_remove(
    &self,
    who: &Principal,
    product: &ProductId,
  ) -> StoreResult<Option<Vec<Product>>> {
    let url = self.url(&format!("wishlist/{}/items/{}", who.customer_id, product))?;
    let builder = self.authorized(self.http.delete(url), who);
    self.wishlist_mutation(builder).await
  }

  async fn wishlist_list(&self, who: &Principal) -> StoreResult<Vec<Product>> {
    let url = self.url(&format!("wishlist/{}", who.customer_id))?;
    let envelope: ApiEnvelope<ApiWishlistData> =
      self.send(self.authorized(self.http.get(url), who)).await?;
    Ok(envelope.into_result()?.unwrap_or_default().products)
  }

  async fn cart_summary(&self, who: &Principal) -> StoreResult<CartSummary> {
    let url = self.url(&format!("cart/{}/summary", who.customer_id))?;
    let summary: ApiCartSummary = self.send(self.authorized(self.http.get(url), who)).await?;
    Ok(summary.into())
  }

  async fn login(&self, credentials: &Credentials) -> StoreResult<SessionGrant> {
    let url = self.url("auth/login")?;
    let builder = self.http.post(url).json(&ApiLoginRequest {
      email: &credentials.email,
      password: &credentials.password,
    });
    self.send(builder).await
  }

  async fn product_listing(&self, params: &ListingParams) -> StoreResult<Page<Product>> {
    let url = self.url("products")?;
    let mut query = vec![
      ("page", params.page.max(1).to_string()),
      ("limit", params.limit.to_string()),
    ];
    if let Some(category) = &params.category {
      query.push(("category", category.clone()));
    }
    if let Some(sort) = &params.sort {
      query.push(("sort", sort.clone()));
    }
    let response: ApiListingResponse = self.send(self.http.get(url).query(&query)).await?;
    Ok(response.into())
  }

  async fn product_detail(&self, id: &ProductId) -> StoreResult<Product> {
    let url = self.url(&format!("products/{}", id))?;
    self.send(self.http.get(url)).await
  }
}
