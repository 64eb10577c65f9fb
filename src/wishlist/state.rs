use std::collections::BTreeSet;

use crate::api::types::{CustomerId, Product, ProductId};

/// Wishlist membership for the signed-in customer.
///
/// Products with a toggle in flight are listed in `pending` and hold their
/// optimistic membership until the toggle commits or rolls back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistState {
  customer: Option<CustomerId>,
  members: BTreeSet<ProductId>,
  pending: BTreeSet<ProductId>,
  /// Last non-fatal failure, shown until dismissed
  pub notice: Option<String>,
}

impl WishlistState {
  pub fn for_customer(customer: Option<CustomerId>) -> Self {
    Self {
      customer,
      ..Self::default()
    }
  }

  pub fn customer(&self) -> Option<&CustomerId> {
    self.customer.as_ref()
  }

  pub fn contains(&self, product: &ProductId) -> bool {
    self.members.contains(product)
  }

  pub fn is_pending(&self, product: &ProductId) -> bool {
    self.pending.contains(product)
  }

  pub fn members(&self) -> impl Iterator<Item = &ProductId> {
    self.members.iter()
  }

  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }

  fn set(&mut self, product: &ProductId, member: bool) {
    if member {
      self.members.insert(product.clone());
    } else {
      self.members.remove(product);
    }
  }

  /// Replace membership with the server's list, keeping optimistic values
  /// for products that still have a toggle in flight.
  pub fn reconcile(&mut self, authoritative: &[Product]) {
    let mut members: BTreeSet<ProductId> = authoritative.iter().map(|p| p.id.clone()).collect();
    for product in &self.pending {
      if self.members.contains(product) {
        members.insert(product.clone());
      } else {
        members.remove(product);
      }
    }
    self.members = members;
  }
}

/// One optimistic toggle: `apply` locally, then `commit` or `rollback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleTransaction {
  customer: CustomerId,
  product: ProductId,
  before: bool,
}

impl ToggleTransaction {
  /// Flip membership of `product` in `state` and mark it pending.
  pub fn apply(state: &mut WishlistState, customer: &CustomerId, product: &ProductId) -> Self {
    let before = state.contains(product);
    state.set(product, !before);
    state.pending.insert(product.clone());
    state.notice = None;
    Self {
      customer: customer.clone(),
      product: product.clone(),
      before,
    }
  }

  /// Membership this toggle is driving towards.
  pub fn target(&self) -> bool {
    !self.before
  }

  /// The server accepted the change. `authoritative` is its post-mutation list, if it sent one.
  pub fn commit(self, state: &mut WishlistState, authoritative: Option<&[Product]>) {
    if !self.owns(state) {
      return;
    }
    state.pending.remove(&self.product);
    state.set(&self.product, self.target());
    if let Some(list) = authoritative {
      state.reconcile(list);
    }
  }

  /// Restore the pre-toggle membership.
  pub fn rollback(self, state: &mut WishlistState, notice: Option<String>) {
    if !self.owns(state) {
      return;
    }
    state.pending.remove(&self.product);
    state.set(&self.product, self.before);
    state.notice = notice;
  }

  /// A transaction only touches the state of the customer it started for.
  fn owns(&self, state: &WishlistState) -> bool {
    state.customer.as_ref() == Some(&self.customer)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::product;

  fn state_with(members: &[&str]) -> WishlistState {
    let mut state = WishlistState::for_customer(Some(CustomerId::new("ada")));
    let list: Vec<Product> = members.iter().map(|id| product(id)).collect();
    state.reconcile(&list);
    state
  }

  #[test]
  fn test_apply_is_visible_immediately() {
    let mut state = state_with(&[]);
    let p1 = ProductId::new("P1");
    let txn = ToggleTransaction::apply(&mut state, &CustomerId::new("ada"), &p1);
    assert!(txn.target());
    assert!(state.contains(&p1));
    assert!(state.is_pending(&p1));
  }

  #[test]
  fn test_rollback_restores_and_sets_notice() {
    let mut state = state_with(&["P1"]);
    let p1 = ProductId::new("P1");
    let txn = ToggleTransaction::apply(&mut state, &CustomerId::new("ada"), &p1);
    assert!(!state.contains(&p1));

    txn.rollback(&mut state, Some("rejected".into()));
    assert!(state.contains(&p1));
    assert!(!state.is_pending(&p1));
    assert_eq!(state.notice.as_deref(), Some("rejected"));
  }

  #[test]
  fn test_commit_takes_server_list() {
    let mut state = state_with(&["P2"]);
    let p1 = ProductId::new("P1");
    let txn = ToggleTransaction::apply(&mut state, &CustomerId::new("ada"), &p1);
    txn.commit(&mut state, Some(&[product("P1"), product("P3")]));
    let members: Vec<_> = state.members().map(|p| p.as_str().to_string()).collect();
    assert_eq!(members, vec!["P1", "P3"]);
  }

  #[test]
  fn test_reconcile_keeps_pending_optimistic_value() {
    let mut state = state_with(&[]);
    let p1 = ProductId::new("P1");
    let _txn = ToggleTransaction::apply(&mut state, &CustomerId::new("ada"), &p1);

    // server list predates the add
    state.reconcile(&[product("P2")]);
    assert!(state.contains(&p1));
    assert!(state.contains(&ProductId::new("P2")));
  }

  #[test]
  fn test_transaction_ignores_other_customer_state() {
    let mut state = state_with(&[]);
    let p1 = ProductId::new("P1");
    let txn = ToggleTransaction::apply(&mut state, &CustomerId::new("ada"), &p1);

    let mut signed_out = WishlistState::for_customer(None);
    txn.rollback(&mut signed_out, Some("x".into()));
    assert_eq!(signed_out, WishlistState::default());
  }
}
