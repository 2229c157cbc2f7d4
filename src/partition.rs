//! Size-bounded grouping of pages into volumes.
//!
//! A single greedy left-to-right pass: pages are appended to the current volume
//! until the next one would push it over the ceiling, then a new volume starts.
//! There is no lookahead or rebalancing, and a page larger than the ceiling is
//! accepted alone in its own volume so the pass always terminates.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::Page;

/// Markup cost assumed for every page on top of its image bytes.
pub const PAGE_OVERHEAD: u64 = 1024;
/// Fixed cost of the descriptors and front matter of one volume.
pub const DESCRIPTOR_OVERHEAD: u64 = 16 * 1024;

const MIB: u64 = 1024 * 1024;

/// A contiguous run of pages written to one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub cover: Arc<Page>,
    pub pages: Vec<Page>,
}

impl Volume {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Greedy volume packer.
#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    ceiling: u64,
    page_overhead: u64,
    base_overhead: u64,
    has_cover: bool,
    title_page: bool,
}

impl Partitioner {
    /// A packer for `ceiling` bytes per volume, 0 meaning unlimited.
    pub fn new(ceiling: u64) -> Self {
        Self::with_overheads(ceiling, PAGE_OVERHEAD, DESCRIPTOR_OVERHEAD)
    }

    /// A packer for a ceiling given in MiB.
    pub fn from_limit_mb(limit_mb: u32) -> Self {
        Self::new(u64::from(limit_mb) * MIB)
    }

    pub fn with_overheads(ceiling: u64, page_overhead: u64, base_overhead: u64) -> Self {
        Self {
            ceiling,
            page_overhead,
            base_overhead,
            has_cover: false,
            title_page: false,
        }
    }

    /// The cover is front matter of every volume rather than a page of the first.
    pub fn has_cover(mut self, has_cover: bool) -> Self {
        self.has_cover = has_cover;
        self
    }

    /// Every volume carries a title image built from the cover.
    pub fn title_page(mut self, title_page: bool) -> Self {
        self.title_page = title_page;
        self
    }

    /// Splits `pages` into volumes, looking sizes up with `size_of`.
    ///
    /// Concatenating the returned volumes yields `pages` unchanged. An empty input
    /// is an [`Error::NoPages`].
    pub fn partition<F>(&self, cover: &Page, pages: &[Page], size_of: F) -> Result<Vec<Volume>>
    where
        F: Fn(&Page) -> Result<u64>,
    {
        if pages.is_empty() {
            return Err(Error::NoPages);
        }

        let cover_size = size_of(cover)?;
        let mut base = self.base_overhead;
        if self.title_page {
            base += cover_size;
        }
        if self.has_cover {
            base += cover_size;
        }
        // later volumes show the cover as their first page when it is not front matter
        let restart = if self.has_cover { base } else { base + cover_size };

        let cover = Arc::new(cover.clone());
        let mut volumes = Vec::new();
        let mut current: Vec<Page> = Vec::new();
        let mut current_size = base;

        for page in pages {
            let cost = size_of(page)? + self.page_overhead;
            if self.ceiling > 0 && !current.is_empty() && current_size + cost > self.ceiling {
                log::debug!(
                    "volume {} closed at {} bytes with {} pages",
                    volumes.len() + 1,
                    current_size,
                    current.len()
                );
                volumes.push(Volume {
                    cover: Arc::clone(&cover),
                    pages: std::mem::take(&mut current),
                });
                current_size = restart;
            }
            current_size += cost;
            current.push(page.clone());
        }
        if !current.is_empty() {
            volumes.push(Volume {
                cover: Arc::clone(&cover),
                pages: current,
            });
        }

        log::info!(
            "{} pages packed into {} volume(s)",
            pages.len(),
            volumes.len()
        );
        Ok(volumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1_000_000;

    fn pages(sizes: &[u64]) -> Vec<Page> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| Page {
                id: i + 1,
                part: 0,
                path: String::new(),
                name: format!("p{}", i + 1),
                size,
                width: 1,
                height: 1,
                double_page: false,
                is_cover: false,
            })
            .collect()
    }

    fn cover(size: u64) -> Page {
        Page {
            id: 0,
            name: "cover".to_string(),
            size,
            is_cover: true,
            ..pages(&[0])[0].clone()
        }
    }

    fn by_size(page: &Page) -> Result<u64> {
        Ok(page.size)
    }

    fn names(volumes: &[Volume]) -> Vec<Vec<String>> {
        volumes
            .iter()
            .map(|v| v.pages.iter().map(|p| p.name.clone()).collect())
            .collect()
    }

    #[test]
    fn test_greedy_fill() {
        let input = pages(&[2 * MB; 5]);
        let volumes = Partitioner::with_overheads(5 * MB, 0, 0)
            .partition(&cover(0), &input, by_size)
            .unwrap();
        assert_eq!(
            names(&volumes),
            vec![vec!["p1", "p2"], vec!["p3", "p4"], vec!["p5"]]
        );
    }

    #[test]
    fn test_unlimited_ceiling_is_one_volume() {
        let input = pages(&[50 * MB, 70 * MB, 1]);
        let volumes = Partitioner::new(0)
            .partition(&cover(MB), &input, by_size)
            .unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].pages, input);
    }

    #[test]
    fn test_oversized_page_stands_alone() {
        let input = pages(&[MB, 9 * MB, MB, MB]);
        let volumes = Partitioner::with_overheads(3 * MB, 0, 0)
            .partition(&cover(0), &input, by_size)
            .unwrap();
        assert_eq!(
            names(&volumes),
            vec![vec!["p1"], vec!["p2"], vec!["p3", "p4"]]
        );
    }

    #[test]
    fn test_empty_input_is_distinct_error() {
        let result = Partitioner::new(0).partition(&cover(0), &[], by_size);
        assert!(matches!(result, Err(Error::NoPages)));
    }

    #[test]
    fn test_sizing_failure_propagates() {
        let input = pages(&[1, 2, 3]);
        let result = Partitioner::new(0).partition(&cover(0), &input, |p| {
            if p.id == 2 {
                Err(Error::MissingPage(p.key()))
            } else {
                Ok(p.size)
            }
        });
        assert!(matches!(result, Err(Error::MissingPage(_))));
    }

    #[test]
    fn test_cover_counts_again_in_later_volumes() {
        // without a cover in the front matter, volumes after the first restart at base + cover
        let input = pages(&[4, 4, 4, 4]);
        let volumes = Partitioner::with_overheads(10, 0, 0)
            .partition(&cover(2), &input, by_size)
            .unwrap();
        assert_eq!(names(&volumes), vec![vec!["p1", "p2"], vec!["p3", "p4"]]);

        let volumes = Partitioner::with_overheads(10, 0, 0)
            .partition(&cover(3), &input, by_size)
            .unwrap();
        assert_eq!(
            names(&volumes),
            vec![vec!["p1", "p2"], vec!["p3"], vec!["p4"]]
        );

        // front-matter cover is already in the base of every volume
        let volumes = Partitioner::with_overheads(12, 0, 0)
            .has_cover(true)
            .partition(&cover(3), &input, by_size)
            .unwrap();
        assert_eq!(names(&volumes), vec![vec!["p1", "p2"], vec!["p3", "p4"]]);
    }

    #[test]
    fn test_title_image_counts_against_every_volume() {
        let input = pages(&[4, 4, 4, 4]);
        let partitioner = Partitioner::with_overheads(12, 0, 0).has_cover(true);

        let volumes = partitioner
            .partition(&cover(3), &input, by_size)
            .unwrap();
        assert_eq!(names(&volumes), vec![vec!["p1", "p2"], vec!["p3", "p4"]]);

        // the title image repeats the cover bytes, so the second page no longer fits
        let volumes = partitioner
            .title_page(true)
            .partition(&cover(3), &input, by_size)
            .unwrap();
        assert_eq!(
            names(&volumes),
            vec![vec!["p1"], vec!["p2"], vec!["p3"], vec!["p4"]]
        );
    }

    #[test]
    fn test_partition_invariants() {
        let sizes: Vec<u64> = (0..200).map(|i| (i * 7919 % 1013) as u64 * 1000).collect();
        let input = pages(&sizes);
        for ceiling in [0, 400_000, 1_000_000, 5_000_000] {
            let partitioner = Partitioner::with_overheads(ceiling, 1024, 16 * 1024);
            let volumes = partitioner.partition(&cover(0), &input, by_size).unwrap();

            let flattened: Vec<Page> = volumes.iter().flat_map(|v| v.pages.clone()).collect();
            assert_eq!(flattened, input);
            assert!(volumes.iter().all(|v| !v.is_empty()));

            if ceiling == 0 {
                assert_eq!(volumes.len(), 1);
                continue;
            }
            for volume in &volumes {
                let cost: u64 = 16 * 1024
                    + volume.pages.iter().map(|p| p.size + 1024).sum::<u64>();
                assert!(cost <= ceiling || volume.len() == 1);
            }
        }
    }
}
