//! Temporary storage of processed pages.
//!
//! Workers filter source images in parallel and insert the encoded results into a
//! [`PageStore`], one file per `(id, part)` in a private temporary directory. Once
//! every worker has finished the store is sealed into a [`SealedPageStore`], whose
//! catalogue is immutable and readable without locking. Dropping either store
//! removes the directory, on success and failure alike.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use memmap2::{Mmap, MmapOptions};
use rayon::prelude::*;
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::splitter::DoublePageSplitter;
use crate::types::{ImageOptions, Page, PageKey, SourceImage};

/// Page storage during the parallel filter stage.
#[derive(Debug)]
pub struct PageStore {
    dir: TempDir,
    pages: Mutex<BTreeMap<PageKey, Page>>,
}

impl PageStore {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("shiori-").tempdir()?;
        log::debug!("page store at {:?}", dir.path());
        Ok(Self {
            dir,
            pages: Mutex::new(BTreeMap::new()),
        })
    }

    /// Stores the bytes of one page. The page's `size` is set from `bytes`.
    ///
    /// Inserting the same `(id, part)` twice fails with [`Error::DuplicatePage`].
    pub fn insert(&self, mut page: Page, bytes: &[u8]) -> Result<()> {
        let key = page.key();
        let path = page_file(&self.dir, key);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => Error::DuplicatePage(key),
                _ => Error::Io(e),
            })?;
        file.write_all(bytes)?;

        page.size = bytes.len() as u64;
        self.pages
            .lock()
            .map_err(|_| Error::Other("Page store lock poisoned".to_string()))?
            .insert(key, page);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pages.lock().map(|pages| pages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ends the insert phase.
    pub fn seal(self) -> Result<SealedPageStore> {
        let pages = self
            .pages
            .into_inner()
            .map_err(|_| Error::Other("Page store lock poisoned".to_string()))?;
        Ok(SealedPageStore {
            dir: self.dir,
            pages,
        })
    }
}

/// Immutable page catalogue with byte access, ordered by `(id, part)`.
#[derive(Debug)]
pub struct SealedPageStore {
    dir: TempDir,
    pages: BTreeMap<PageKey, Page>,
}

impl SealedPageStore {
    /// All pages in canonical order.
    pub fn catalogue(&self) -> Vec<Page> {
        self.pages.values().cloned().collect()
    }

    pub fn page(&self, key: PageKey) -> Option<&Page> {
        self.pages.get(&key)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn size(&self, key: PageKey) -> Result<u64> {
        self.pages
            .get(&key)
            .map(|page| page.size)
            .ok_or(Error::MissingPage(key))
    }

    pub fn total_size(&self) -> u64 {
        self.pages.values().map(|page| page.size).sum()
    }

    /// Memory-maps the stored bytes of a page.
    pub fn get(&self, key: PageKey) -> Result<Mmap> {
        if !self.pages.contains_key(&key) {
            return Err(Error::MissingPage(key));
        }
        let file = File::open(page_file(&self.dir, key))?;
        // SAFETY: files in the private store directory are never modified after sealing.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(mmap)
    }

    /// Removes the temporary directory, reporting any error instead of ignoring it on drop.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

fn page_file(dir: &TempDir, key: PageKey) -> PathBuf {
    dir.path().join(format!("{:06}_{}.jpg", key.id, key.part))
}

/// Encodes a processed page as JPEG.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => {
            img.write_with_encoder(encoder)?
        }
        _ => DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?,
    }
    Ok(out)
}

/// Filters every source image on a pool of `workers` threads and fills `store`.
///
/// Ids follow the source order. The first failing page stops the pool: pages not
/// yet started are dropped and the error is returned. Returns the number of source
/// images processed.
pub fn process_sources<I>(
    store: &PageStore,
    sources: I,
    options: &ImageOptions,
    workers: usize,
    progress: &dyn Progress,
) -> Result<usize>
where
    I: IntoIterator<Item = Result<SourceImage>>,
    I::IntoIter: Send,
{
    let splitter = DoublePageSplitter::new(options);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("shiori-worker-{}", i))
        .build()?;

    let sources = sources.into_iter();
    let total = sources.size_hint().1.unwrap_or(0);
    let done = AtomicUsize::new(0);

    pool.install(|| {
        sources
            .enumerate()
            .par_bridge()
            .try_for_each(|(id, source)| -> Result<()> {
                process_one(store, &splitter, options.quality, id, source?)?;
                let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                progress.update(current, total, "Processing");
                Ok(())
            })
    })?;

    let processed = done.into_inner();
    log::info!(
        "processed {} source images into {} pages",
        processed,
        store.len()
    );
    Ok(processed)
}

fn process_one(
    store: &PageStore,
    splitter: &DoublePageSplitter,
    quality: u8,
    id: usize,
    source: SourceImage,
) -> Result<()> {
    let SourceImage { path, name, data } = source;
    let label = if path.is_empty() {
        name.clone()
    } else {
        format!("{}/{}", path, name)
    };
    let transform = |e: image::ImageError| Error::Transform {
        page: label.clone(),
        source: e,
    };

    let decoded = image::load_from_memory(&data).map_err(transform)?;
    drop(data);

    // encode every part before storing any, so a failing source leaves nothing behind
    let encoded = splitter
        .process(decoded)?
        .into_iter()
        .map(|processed| {
            let bytes = encode_jpeg(&processed.image, quality).map_err(transform)?;
            Ok((processed, bytes))
        })
        .collect::<Result<Vec<_>>>()?;

    for (processed, bytes) in encoded {
        let page = Page {
            id,
            part: processed.part,
            path: path.clone(),
            name: name.clone(),
            size: 0,
            width: processed.image.width(),
            height: processed.image.height(),
            double_page: processed.double_page,
            is_cover: false,
        };
        log::debug!(
            "page {} ({}) {}x{}, {} bytes",
            page.key(),
            label,
            page.width,
            page.height,
            bytes.len()
        );
        store.insert(page, &bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::types::{ColorMode, ViewPort};
    use image::{Rgb, RgbImage};

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
        encode_jpeg(&img, 90).unwrap()
    }

    fn page(id: usize, part: u8) -> Page {
        Page {
            id,
            part,
            path: "ch".to_string(),
            name: format!("{}.jpg", id),
            size: 0,
            width: 10,
            height: 10,
            double_page: false,
            is_cover: false,
        }
    }

    fn options() -> ImageOptions {
        ImageOptions {
            view: ViewPort::new(60, 80),
            auto_split: true,
            color_mode: ColorMode::Luminance,
            quality: 80,
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = PageStore::new().unwrap();
        store.insert(page(1, 0), b"second").unwrap();
        store.insert(page(0, 0), b"first!!").unwrap();
        let sealed = store.seal().unwrap();

        let keys: Vec<PageKey> = sealed.catalogue().iter().map(Page::key).collect();
        assert_eq!(keys, vec![PageKey::new(0, 0), PageKey::new(1, 0)]);
        assert_eq!(sealed.size(PageKey::new(0, 0)).unwrap(), 7);
        assert_eq!(sealed.total_size(), 13);
        assert_eq!(&sealed.get(PageKey::new(1, 0)).unwrap()[..], b"second");
    }

    #[test]
    fn test_duplicate_and_missing_keys() {
        let store = PageStore::new().unwrap();
        store.insert(page(3, 1), b"a").unwrap();
        assert!(matches!(
            store.insert(page(3, 1), b"b"),
            Err(Error::DuplicatePage(key)) if key == PageKey::new(3, 1)
        ));
        let sealed = store.seal().unwrap();
        assert!(matches!(
            sealed.size(PageKey::new(9, 0)),
            Err(Error::MissingPage(_))
        ));
        assert!(sealed.get(PageKey::new(9, 0)).is_err());
    }

    #[test]
    fn test_store_directory_removed_on_drop() {
        let store = PageStore::new().unwrap();
        let dir = store.dir.path().to_path_buf();
        store.insert(page(0, 0), b"x").unwrap();
        assert!(dir.exists());
        drop(store);
        assert!(!dir.exists());
    }

    #[test]
    fn test_process_sources_orders_and_splits() {
        let sources = vec![
            Ok(SourceImage::new("vol", "001.jpg", jpeg(40, 60))),
            Ok(SourceImage::new("vol", "002.jpg", jpeg(120, 60))),
            Ok(SourceImage::new("vol", "003.jpg", jpeg(40, 60))),
        ];
        let store = PageStore::new().unwrap();
        let processed = process_sources(&store, sources, &options(), 3, &NoProgress).unwrap();
        assert_eq!(processed, 3);

        let sealed = store.seal().unwrap();
        let keys: Vec<(usize, u8)> = sealed
            .catalogue()
            .iter()
            .map(|p| (p.id, p.part))
            .collect();
        assert_eq!(keys, vec![(0, 0), (1, 1), (1, 2), (2, 0)]);

        let halves: Vec<Page> = sealed.catalogue().into_iter().filter(|p| p.id == 1).collect();
        assert!(halves.iter().all(|p| p.double_page && p.name == "002.jpg"));
        // the cover is picked later, after the catalogue is complete
        assert!(sealed.catalogue().iter().all(|p| !p.is_cover));
        assert!(sealed.catalogue().iter().all(|p| p.size > 0));
    }

    #[test]
    fn test_process_sources_fails_on_corrupt_page() {
        let sources = vec![
            Ok(SourceImage::new("", "001.jpg", jpeg(40, 60))),
            Ok(SourceImage::new("", "broken.jpg", b"not an image".to_vec())),
        ];
        let store = PageStore::new().unwrap();
        let result = process_sources(&store, sources, &options(), 2, &NoProgress);
        match result {
            Err(Error::Transform { page, .. }) => assert_eq!(page, "broken.jpg"),
            other => panic!("expected a transform error, got {:?}", other),
        }
        assert!(store.seal().unwrap().page(PageKey::new(1, 0)).is_none());
    }
}
