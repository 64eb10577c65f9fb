pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use tracing::warn;

use crate::api::types::ProductId;
use crate::app::App;
use crate::error::SIGN_IN_PATH;
use crate::event::{UiEvent, UiSender};
use crate::store::Storefront;
use ratatui::prelude::*;
use renderfns::header::HeaderInfo;
use renderfns::{draw_footer, draw_header};

/// What every view needs: the storefront and a way back to the app loop
#[derive(Clone)]
pub struct ViewContext {
  pub store: Storefront,
  pub ui: UiSender,
}

impl ViewContext {
  pub fn new(store: Storefront, ui: UiSender) -> Self {
    Self { store, ui }
  }

  /// Flip wishlist membership in the background.
  ///
  /// Guests are sent to sign-in without a request; a rejected session does
  /// the same once the server answers.
  pub fn toggle_wishlist(&self, product: &ProductId) {
    if !self.store.auth.is_authenticated() {
      self.ui.send(UiEvent::Redirect(SIGN_IN_PATH));
      return;
    }
    let wishlist = self.store.wishlist.clone();
    let ui = self.ui.clone();
    let product = product.clone();
    tokio::spawn(async move {
      if let Err(e) = wishlist.toggle(&product).await {
        warn!(product = %product, error = %e, "wishlist toggle failed");
        if let Some(path) = e.redirect() {
          ui.send(UiEvent::Redirect(path));
        }
      }
    });
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let session = app.store().auth.session();
  let cart = app.cart_entry();
  let shortcuts = app
    .current_view()
    .map(|view| view.shortcuts())
    .unwrap_or_default();
  draw_header(
    frame,
    chunks[0],
    &HeaderInfo {
      title: app.title(),
      customer: session.customer().map(|c| c.name.as_str()),
      cart: cart.as_ref(),
      shortcuts: &shortcuts,
    },
  );

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  draw_footer(frame, chunks[2], &app.breadcrumb(), app.notice());
  app.palette().render_overlay(frame, chunks[1]);
}
