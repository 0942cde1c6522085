use std::collections::HashSet;

use crate::catalog::CatalogStore;

/// Ids marked for batch download. Keyed by id, so filtering and paging never
/// disturb it; every member exists in the catalog.
#[derive(Debug, Default)]
pub struct SelectionModel {
  ids: HashSet<String>,
}

impl SelectionModel {
  pub fn new() -> Self {
    Self::default()
  }

  /// Flip membership of `id`. Ids outside the catalog are ignored.
  /// Returns whether `id` is selected afterwards.
  pub fn toggle(&mut self, id: &str, catalog: &CatalogStore) -> bool {
    if !catalog.contains(id) {
      return false;
    }
    if !self.ids.remove(id) {
      self.ids.insert(id.to_string());
      return true;
    }
    false
  }

  /// Select every catalog entry not already downloaded.
  pub fn select_all(&mut self, catalog: &CatalogStore) -> usize {
    self.ids = catalog.videos().iter().filter(|v| !v.downloaded).map(|v| v.id.clone()).collect();
    self.ids.len()
  }

  pub fn clear(&mut self) {
    self.ids.clear();
  }

  /// Drop ids that no longer exist in `catalog`.
  pub fn prune(&mut self, catalog: &CatalogStore) {
    self.ids.retain(|id| catalog.contains(id));
  }

  pub fn contains(&self, id: &str) -> bool {
    self.ids.contains(id)
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  /// Selected ids in catalog order.
  pub fn ordered<'a>(&self, catalog: &'a CatalogStore) -> Vec<&'a str> {
    catalog.ids().filter(|id| self.ids.contains(*id)).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::make_video;

  fn store() -> CatalogStore {
    let mut downloaded = make_video("c", "C", "X");
    downloaded.downloaded = true;
    let mut store = CatalogStore::new();
    store.replace(vec![make_video("a", "A", "X"), make_video("b", "B", "Y"), downloaded], "X");
    store
  }

  #[test]
  fn toggle_flips_membership() {
    let catalog = store();
    let mut sel = SelectionModel::new();
    assert!(sel.toggle("a", &catalog));
    assert!(sel.contains("a"));
    assert!(!sel.toggle("a", &catalog));
    assert!(sel.is_empty());
  }

  #[test]
  fn toggle_unknown_id_is_noop() {
    let catalog = store();
    let mut sel = SelectionModel::new();
    assert!(!sel.toggle("zzz", &catalog));
    assert!(sel.is_empty());
  }

  #[test]
  fn select_all_skips_downloaded() {
    let catalog = store();
    let mut sel = SelectionModel::new();
    assert_eq!(sel.select_all(&catalog), 2);
    assert!(!sel.contains("c"));
    for video in catalog.videos().iter().filter(|v| v.downloaded) {
      assert!(!sel.contains(&video.id));
    }
  }

  #[test]
  fn prune_drops_stale_ids() {
    let mut catalog = store();
    let mut sel = SelectionModel::new();
    sel.toggle("a", &catalog);
    sel.toggle("b", &catalog);
    catalog.replace(vec![make_video("b", "B", "Y")], "Y");
    sel.prune(&catalog);
    assert_eq!(sel.ordered(&catalog), vec!["b"]);
  }

  #[test]
  fn ordered_follows_catalog_order() {
    let catalog = store();
    let mut sel = SelectionModel::new();
    sel.toggle("b", &catalog);
    sel.toggle("a", &catalog);
    assert_eq!(sel.ordered(&catalog), vec!["a", "b"]);
  }
}
