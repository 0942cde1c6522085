//! Pure derivation of the visible page from the catalog and the view state.
//!
//! Nothing here owns data: every function borrows the catalog and returns a
//! fresh view, so the whole pipeline is testable without a terminal.

use std::ops::RangeInclusive;
use thiserror::Error;

use crate::catalog::Video;

/// Pseudo-category that disables channel filtering.
pub const ALL_CATEGORY: &str = "All Videos";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
  pub name: String,
  pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("page {page} is outside 1..={total_pages}")]
pub struct PageOutOfRange {
  pub page: usize,
  pub total_pages: usize,
}

/// Search, category and pagination inputs.
///
/// Every setter other than `set_page` resets the page to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
  search: String,
  category: String,
  page_size: usize,
  page: usize,
}

impl ViewState {
  pub fn new(page_size: usize) -> Self {
    Self { search: String::new(), category: ALL_CATEGORY.to_string(), page_size: page_size.max(1), page: 1 }
  }

  pub fn search(&self) -> &str {
    &self.search
  }

  pub fn category(&self) -> &str {
    &self.category
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  pub fn page(&self) -> usize {
    self.page
  }

  pub fn set_search(&mut self, query: impl Into<String>) {
    self.search = query.into();
    self.page = 1;
  }

  pub fn set_category(&mut self, category: impl Into<String>) {
    self.category = category.into();
    self.page = 1;
  }

  /// Page sizes below 1 are raised to 1.
  pub fn set_page_size(&mut self, page_size: usize) {
    self.page_size = page_size.max(1);
    self.page = 1;
  }

  /// Set the page without any bounds check. Callers validate against
  /// [`total_pages`] first.
  pub fn set_page(&mut self, page: usize) {
    self.page = page;
  }

  /// The catalog changed underneath the view.
  pub fn catalog_replaced(&mut self) {
    self.page = 1;
  }

  /// Back to an unfiltered first page, keeping the page size.
  pub fn reset(&mut self) {
    self.search.clear();
    self.category = ALL_CATEGORY.to_string();
    self.page = 1;
  }
}

/// The slice of the filtered catalog currently on screen.
#[derive(Debug)]
pub struct PageView<'a> {
  pub videos: Vec<&'a Video>,
  pub page: usize,
  pub total_pages: usize,
  pub filtered_len: usize,
}

/// `"All Videos"` followed by each distinct channel name in first-seen order,
/// with entry counts.
pub fn categories(videos: &[Video]) -> Vec<Category> {
  let mut out = vec![Category { name: ALL_CATEGORY.to_string(), count: videos.len() }];
  for video in videos {
    match out.iter_mut().skip(1).find(|c| c.name == video.channel_name) {
      Some(c) => c.count += 1,
      None => out.push(Category { name: video.channel_name.clone(), count: 1 }),
    }
  }
  out
}

/// Case-insensitive match of `query` against title or channel name.
pub fn matches_search(video: &Video, query: &str) -> bool {
  if query.is_empty() {
    return true;
  }
  let needle = query.to_lowercase();
  video.title.to_lowercase().contains(&needle) || video.channel_name.to_lowercase().contains(&needle)
}

pub fn matches_category(video: &Video, category: &str) -> bool {
  category == ALL_CATEGORY || video.channel_name == category
}

/// Order-preserving subsequence of `videos` matching both search and category.
pub fn filter<'a>(videos: &'a [Video], search: &str, category: &str) -> Vec<&'a Video> {
  videos.iter().filter(|v| matches_search(v, search) && matches_category(v, category)).collect()
}

/// `ceil(len / page_size)`, never less than 1.
pub fn total_pages(len: usize, page_size: usize) -> usize {
  len.div_ceil(page_size.max(1)).max(1)
}

/// Derive the visible page. Out-of-range pages are an error, not clamped.
pub fn paginate<'a>(videos: &'a [Video], view: &ViewState) -> Result<PageView<'a>, PageOutOfRange> {
  let filtered = filter(videos, view.search(), view.category());
  let filtered_len = filtered.len();
  let total_pages = total_pages(filtered_len, view.page_size());
  let page = view.page();
  if page < 1 || page > total_pages {
    return Err(PageOutOfRange { page, total_pages });
  }
  let start = (page - 1) * view.page_size();
  let visible = filtered.into_iter().skip(start).take(view.page_size()).collect();
  Ok(PageView { videos: visible, page, total_pages, filtered_len })
}

/// Page-number buttons around `current`: the first `width` pages until the
/// cursor passes the middle, then a window centered on it.
pub fn page_window(current: usize, total_pages: usize, width: usize) -> RangeInclusive<usize> {
  let width = width.max(1);
  let half = width / 2;
  let start = if current <= half + 1 { 1 } else { current - half };
  let end = (start + width - 1).min(total_pages.max(1));
  start..=end
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::make_video;

  fn catalog(n: usize) -> Vec<Video> {
    (0..n).map(|i| make_video(&format!("v{i}"), &format!("Video {i}"), "Chan")).collect()
  }

  fn mixed() -> Vec<Video> {
    vec![
      make_video("1", "Rust in Production", "Alpha"),
      make_video("2", "Cooking Pasta", "Beta"),
      make_video("3", "More Rust Tips", "Beta"),
      make_video("4", "Gardening", "Alpha"),
      make_video("5", "Alpha Picks", "Gamma"),
    ]
  }

  #[test]
  fn categories_first_seen_order_with_counts() {
    let cats = categories(&mixed());
    let names: Vec<&str> = cats.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec![ALL_CATEGORY, "Alpha", "Beta", "Gamma"]);
    let counts: Vec<usize> = cats.iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![5, 2, 2, 1]);
  }

  #[test]
  fn search_matches_title_or_channel_case_insensitively() {
    let videos = mixed();
    let ids: Vec<&str> = filter(&videos, "RUST", ALL_CATEGORY).iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    let ids: Vec<&str> = filter(&videos, "alpha", ALL_CATEGORY).iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "4", "5"]);
  }

  #[test]
  fn category_restricts_channel() {
    let videos = mixed();
    for cat in ["Alpha", "Beta", "Gamma"] {
      for query in ["", "rust", "a", "zzz"] {
        let out = filter(&videos, query, cat);
        assert!(out.iter().all(|v| v.channel_name == cat));
      }
    }
  }

  #[test]
  fn filtered_is_order_preserving_subsequence() {
    let videos = mixed();
    for query in ["", "r", "rust", "ALPHA", "in"] {
      for cat in categories(&videos) {
        let out = filter(&videos, query, &cat.name);
        let positions: Vec<usize> =
          out.iter().map(|v| videos.iter().position(|c| c.id == v.id).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
      }
    }
  }

  #[test]
  fn total_pages_minimum_one() {
    assert_eq!(total_pages(0, 12), 1);
    assert_eq!(total_pages(12, 12), 1);
    assert_eq!(total_pages(13, 12), 2);
  }

  #[test]
  fn twenty_five_videos_page_size_twelve() {
    let videos = catalog(25);
    let mut view = ViewState::new(12);
    let mut sizes = Vec::new();
    for page in 1..=3 {
      view.set_page(page);
      let pv = paginate(&videos, &view).unwrap();
      assert_eq!(pv.total_pages, 3);
      sizes.push(pv.videos.len());
    }
    assert_eq!(sizes, vec![12, 12, 1]);
    view.set_page(3);
    assert_eq!(paginate(&videos, &view).unwrap().videos[0].id, "v24");
  }

  #[test]
  fn page_sizes_partition_catalog() {
    for n in [1usize, 7, 12, 24, 25, 48, 101] {
      for p in [1usize, 5, 12, 24, 48, 100] {
        let videos = catalog(n);
        let mut view = ViewState::new(p);
        let pages = total_pages(n, p);
        assert_eq!(pages, n.div_ceil(p));
        for page in 1..=pages {
          view.set_page(page);
          let len = paginate(&videos, &view).unwrap().videos.len();
          if page == pages {
            assert_eq!(len, n - p * (pages - 1));
          } else {
            assert_eq!(len, p);
          }
        }
      }
    }
  }

  #[test]
  fn out_of_range_page_is_an_error() {
    let videos = catalog(5);
    let mut view = ViewState::new(12);
    view.set_page(2);
    assert_eq!(paginate(&videos, &view).unwrap_err(), PageOutOfRange { page: 2, total_pages: 1 });
    view.set_page(0);
    assert!(paginate(&videos, &view).is_err());
  }

  #[test]
  fn setters_reset_page() {
    let mut view = ViewState::new(12);
    view.set_page(3);
    view.set_search("x");
    assert_eq!(view.page(), 1);
    view.set_page(3);
    view.set_category("Alpha");
    assert_eq!(view.page(), 1);
    view.set_page(3);
    view.set_page_size(24);
    assert_eq!(view.page(), 1);
    view.set_page(3);
    view.catalog_replaced();
    assert_eq!(view.page(), 1);
  }

  #[test]
  fn empty_catalog_has_one_empty_page() {
    let view = ViewState::new(12);
    let pv = paginate(&[], &view).unwrap();
    assert_eq!(pv.total_pages, 1);
    assert!(pv.videos.is_empty());
  }

  #[test]
  fn page_window_follows_cursor() {
    assert_eq!(page_window(1, 10, 5), 1..=5);
    assert_eq!(page_window(3, 10, 5), 1..=5);
    assert_eq!(page_window(4, 10, 5), 2..=6);
    assert_eq!(page_window(10, 10, 5), 8..=10);
    assert_eq!(page_window(1, 2, 5), 1..=2);
    assert_eq!(page_window(1, 1, 5), 1..=1);
    assert_eq!(page_window(3, 3, 5), 1..=3);
  }
}
