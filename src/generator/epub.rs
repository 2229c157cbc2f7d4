use std::path::PathBuf;

use chrono::Utc;

use crate::error::Result;
use crate::generator::templates::{self, escape_xml, render};
use crate::generator::{ContainerWriter, EpubZip};
use crate::partition::Volume;
use crate::progress::Progress;
use crate::shiori::ShioriConfig;
use crate::store::SealedPageStore;
use crate::toc::{NavEntry, TocTree};
use crate::types::{Direction, Page, TitlePage};

const MIMETYPE: &[u8] = b"application/epub+zip";
const TITLE_HREF: &str = "Text/title.xhtml";
const TITLE_SPACER_HREF: &str = "Text/space_title.xhtml";
const TITLE_IMAGE_HREF: &str = "Images/title.jpg";
const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// One entry of a volume's reading order.
#[derive(Debug, Clone, PartialEq)]
pub enum SpineItem {
    /// Generated title page showing the cover.
    Title,
    /// Blank page following the title page.
    TitleSpacer,
    /// A stored page, markup plus image.
    Page(Page),
    /// Blank page following the given page.
    Spacer(Page),
}

impl SpineItem {
    pub fn id(&self) -> String {
        match self {
            SpineItem::Title => "title".to_string(),
            SpineItem::TitleSpacer => "space_title".to_string(),
            SpineItem::Page(page) => format!("page_{}_p{}", page.id, page.part),
            SpineItem::Spacer(page) => format!("space_{}_p{}", page.id, page.part),
        }
    }

    pub fn href(&self) -> String {
        match self {
            SpineItem::Title => TITLE_HREF.to_string(),
            SpineItem::TitleSpacer => TITLE_SPACER_HREF.to_string(),
            SpineItem::Page(page) => page.page_href(),
            SpineItem::Spacer(page) => page.spacer_href(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, SpineItem::TitleSpacer | SpineItem::Spacer(_))
    }
}

fn image_id(page: &Page) -> String {
    format!("img_{}_p{}", page.id, page.part)
}

/// Everything written into one volume, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeLayout {
    pub title: String,
    pub cover: Page,
    pub items: Vec<SpineItem>,
}

impl VolumeLayout {
    pub fn has_title_page(&self) -> bool {
        self.items.first() == Some(&SpineItem::Title)
    }

    /// Stored pages of the volume, including the cover when it is shown as a page.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.items.iter().filter_map(|item| match item {
            SpineItem::Page(page) => Some(page),
            _ => None,
        })
    }

    pub fn spacer_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_blank()).count()
    }
}

/// Writes partitioned volumes as fixed-layout EPUB 3 files.
///
/// All volumes of a run share one package identifier and modification time.
#[derive(Debug)]
pub struct Assembler<'a> {
    config: &'a ShioriConfig,
    uid: String,
    modified: String,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a ShioriConfig, uid: impl Into<String>) -> Self {
        Self {
            config,
            uid: uid.into(),
            modified: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }

    /// Output file of volume `index` (0-based) out of `total`.
    ///
    /// A single volume is written to the configured output path; otherwise the
    /// file stem gains ` Part X of N`, zero-padded to the width of `N`.
    pub fn volume_path(&self, index: usize, total: usize) -> PathBuf {
        let output = &self.config.output_path;
        if total <= 1 {
            return output.clone();
        }
        let width = total.to_string().len();
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut name = format!(
            "{} Part {:0width$} of {:0width$}",
            stem,
            index + 1,
            total,
            width = width
        );
        if let Some(ext) = output.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        output.with_file_name(name)
    }

    /// Book title of volume `index`, with ` [X/N]` when the book is split.
    pub fn volume_title(&self, index: usize, total: usize) -> String {
        if total > 1 {
            format!("{} [{}/{}]", self.config.metadata.title, index + 1, total)
        } else {
            self.config.metadata.title.clone()
        }
    }

    pub fn writes_title_page(&self, total: usize) -> bool {
        match self.config.title_page {
            TitlePage::Never => false,
            TitlePage::Always => true,
            TitlePage::WhenSplit => total > 1,
        }
    }

    /// Reading order of volume `index`.
    ///
    /// The cover is shown as a page when it is front matter or the volume is not
    /// the first. A blank spacer follows every double page, and the final page
    /// when the book is a single volume.
    pub fn layout(&self, volume: &Volume, index: usize, total: usize) -> VolumeLayout {
        let mut items = Vec::with_capacity(volume.len() + 4);
        if self.writes_title_page(total) {
            items.push(SpineItem::Title);
            items.push(SpineItem::TitleSpacer);
        }
        if self.config.has_cover || index > 0 {
            items.push(SpineItem::Page(volume.cover.as_ref().clone()));
        }

        let count = volume.len();
        for (i, page) in volume.pages.iter().enumerate() {
            items.push(SpineItem::Page(page.clone()));
            let is_last = i + 1 == count;
            if page.double_page || (total == 1 && is_last) {
                items.push(SpineItem::Spacer(page.clone()));
            }
        }

        VolumeLayout {
            title: self.volume_title(index, total),
            cover: volume.cover.as_ref().clone(),
            items,
        }
    }

    /// Writes every volume in order and returns the written files.
    ///
    /// A failing volume stops the run; volumes closed before it stay on disk.
    pub async fn write_all(
        &self,
        store: &SealedPageStore,
        volumes: &[Volume],
        progress: &dyn Progress,
    ) -> Result<Vec<PathBuf>> {
        let total = volumes.len();
        let mut written = Vec::with_capacity(total);
        for (index, volume) in volumes.iter().enumerate() {
            let path = self.volume_path(index, total);
            log::debug!("writing volume {}/{} to {:?}", index + 1, total, path);

            let mut writer = EpubZip::create(&path)?;
            self.write_volume(&mut writer, store, volume, index, total)
                .await?;
            written.push(writer.close().await?);
            progress.update(index + 1, total, "Writing");
        }
        Ok(written)
    }

    /// Writes one volume through `writer` without closing it.
    pub async fn write_volume<W: ContainerWriter>(
        &self,
        writer: &mut W,
        store: &SealedPageStore,
        volume: &Volume,
        index: usize,
        total: usize,
    ) -> Result<()> {
        let layout = self.layout(volume, index, total);

        writer.write_raw("mimetype", MIMETYPE).await?;
        writer
            .write_content("META-INF/container.xml", templates::CONTAINER.as_bytes())
            .await?;
        writer
            .write_content(
                "META-INF/com.apple.ibooks.display-options.xml",
                templates::DISPLAY_OPTIONS.as_bytes(),
            )
            .await?;
        writer
            .write_content(
                "OEBPS/content.opf",
                self.package(&layout, index, total).as_bytes(),
            )
            .await?;
        writer
            .write_content("OEBPS/toc.xhtml", self.navigation(&layout, volume).as_bytes())
            .await?;
        writer
            .write_content("OEBPS/Text/style.css", self.stylesheet().as_bytes())
            .await?;

        for item in &layout.items {
            let name = format!("OEBPS/{}", item.href());
            match item {
                SpineItem::Title => {
                    writer
                        .write_content(&name, self.title_page(&layout).as_bytes())
                        .await?;
                    let cover = store.get(layout.cover.key())?;
                    writer
                        .write_raw(&format!("OEBPS/{}", TITLE_IMAGE_HREF), &cover)
                        .await?;
                }
                SpineItem::TitleSpacer => {
                    writer
                        .write_content(&name, self.blank("Blank Page Title").as_bytes())
                        .await?;
                }
                SpineItem::Page(page) => {
                    writer
                        .write_content(&name, self.page(page).as_bytes())
                        .await?;
                    let bytes = store.get(page.key())?;
                    writer
                        .write_raw(&format!("OEBPS/{}", page.image_href()), &bytes)
                        .await?;
                }
                SpineItem::Spacer(page) => {
                    let title = format!("Blank Page {}", page.key());
                    writer
                        .write_content(&name, self.blank(&title).as_bytes())
                        .await?;
                }
            }
        }

        log::info!(
            "volume {}/{}: {} pages, {} spacers",
            index + 1,
            total,
            layout.pages().count(),
            layout.spacer_count()
        );
        Ok(())
    }

    fn viewport(&self) -> String {
        self.config.view.to_string()
    }

    fn language(&self) -> &str {
        match self.config.metadata.language.as_str() {
            "" => "en",
            language => language,
        }
    }

    fn page(&self, page: &Page) -> String {
        let title = format!("Page {}", page.key());
        let viewport = self.viewport();
        let image = format!("../{}", page.image_href());
        let style = page.img_style(self.config.view, None);
        render(
            templates::PAGE,
            &[
                ("title", title.as_str()),
                ("viewport", viewport.as_str()),
                ("image", image.as_str()),
                ("style", style.as_str()),
            ],
        )
    }

    fn title_page(&self, layout: &VolumeLayout) -> String {
        let align = match self.config.reading_direction {
            Direction::Rtl => "right:0px",
            Direction::Ltr => "left:0px",
        };
        let title = escape_xml(&layout.title);
        let viewport = self.viewport();
        let image = format!("../{}", TITLE_IMAGE_HREF);
        let style = layout.cover.img_style(self.config.view, Some(align));
        render(
            templates::PAGE,
            &[
                ("title", title.as_str()),
                ("viewport", viewport.as_str()),
                ("image", image.as_str()),
                ("style", style.as_str()),
            ],
        )
    }

    fn blank(&self, title: &str) -> String {
        let viewport = self.viewport();
        render(
            templates::BLANK,
            &[("title", title), ("viewport", viewport.as_str())],
        )
    }

    fn stylesheet(&self) -> String {
        let width = self.config.view.width.to_string();
        let height = self.config.view.height.to_string();
        render(
            templates::STYLE,
            &[("width", width.as_str()), ("height", height.as_str())],
        )
    }

    fn navigation(&self, layout: &VolumeLayout, volume: &Volume) -> String {
        let tree = TocTree::from_pages(&volume.pages);
        let entries = tree.nav_entries(self.config.strip_first_directory_from_toc);
        let title = escape_xml(&layout.title);
        let start = layout
            .items
            .first()
            .map(SpineItem::href)
            .unwrap_or_default();
        let list = if entries.is_empty() {
            String::new()
        } else {
            format!("\n{}      ", nav_list(&entries, 8))
        };
        render(
            templates::NAV,
            &[
                ("title", title.as_str()),
                ("language", self.language()),
                ("start", start.as_str()),
                ("entries", list.as_str()),
            ],
        )
    }

    fn package(&self, layout: &VolumeLayout, index: usize, total: usize) -> String {
        let metadata = &self.config.metadata;
        let title = escape_xml(&layout.title);
        let creators = metadata
            .authors
            .iter()
            .map(|author| {
                let name = escape_xml(author);
                render(templates::CREATOR, &[("name", name.as_str())])
            })
            .collect::<Vec<_>>()
            .join("\n");
        let description = metadata
            .description
            .as_deref()
            .map(|d| {
                let text = escape_xml(d);
                render(templates::DESCRIPTION, &[("text", text.as_str())])
            })
            .unwrap_or_default();
        let publisher = escape_xml(metadata.publisher.as_deref().unwrap_or("Shiori"));
        let collection = if total > 1 {
            self.collection(index, total)
        } else {
            String::new()
        };
        let cover_id = if layout.has_title_page() {
            "img_title".to_string()
        } else {
            image_id(&layout.cover)
        };
        let writing_mode = match self.config.reading_direction {
            Direction::Rtl => "horizontal-rl",
            Direction::Ltr => "horizontal-lr",
        };
        let resolution = format!("{}x{}", self.config.view.width, self.config.view.height);
        let manifest = manifest(layout, &cover_id);
        let direction = self.config.reading_direction.to_string();
        let spine = self.spine(layout);

        render(
            templates::CONTENT,
            &[
                ("title", title.as_str()),
                ("uid", self.uid.as_str()),
                ("language", self.language()),
                ("creators", creators.as_str()),
                ("publisher", publisher.as_str()),
                ("description", description.as_str()),
                ("modified", self.modified.as_str()),
                ("resolution", resolution.as_str()),
                ("writing_mode", writing_mode),
                ("cover", cover_id.as_str()),
                ("collection", collection.as_str()),
                ("manifest", manifest.as_str()),
                ("direction", direction.as_str()),
                ("spine", spine.as_str()),
            ],
        )
    }

    /// Series membership of a split book, volume `index` of `total`.
    fn collection(&self, index: usize, total: usize) -> String {
        let title = escape_xml(&self.config.metadata.title);
        let position = (index + 1).to_string();
        let total = total.to_string();
        render(
            templates::COLLECTION,
            &[
                ("title", title.as_str()),
                ("position", position.as_str()),
                ("total", total.as_str()),
            ],
        )
    }

    fn spine(&self, layout: &VolumeLayout) -> String {
        let mut spread = SpreadTracker::new(self.config.reading_direction);
        layout
            .items
            .iter()
            .map(|item| {
                let centered = matches!(item, SpineItem::Page(page) if page.double_page && page.part == 0);
                let id = item.id();
                render(
                    templates::ITEMREF,
                    &[("id", id.as_str()), ("properties", spread.next(centered))],
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Alternates page sides along the spine; a full spread is centered and the
/// following page starts a new spread.
struct SpreadTracker {
    first_side_right: bool,
    next_right: bool,
}

impl SpreadTracker {
    fn new(direction: Direction) -> Self {
        // western books open on a right-hand page, manga on a left-hand one
        let first_side_right = direction == Direction::Ltr;
        Self {
            first_side_right,
            next_right: first_side_right,
        }
    }

    fn next(&mut self, centered: bool) -> &'static str {
        if centered {
            self.next_right = self.first_side_right;
            return "rendition:page-spread-center";
        }
        let right = self.next_right;
        self.next_right = !right;
        if right {
            "rendition:page-spread-right"
        } else {
            "rendition:page-spread-left"
        }
    }
}

fn manifest(layout: &VolumeLayout, cover_id: &str) -> String {
    let item = |id: &str, href: &str, media_type: &str| {
        let template = if id == cover_id {
            templates::COVER_ITEM
        } else {
            templates::ITEM
        };
        render(
            template,
            &[("id", id), ("href", href), ("media_type", media_type)],
        )
    };

    let mut lines = Vec::with_capacity(layout.items.len() * 2);
    for spine_item in &layout.items {
        lines.push(item(&spine_item.id(), &spine_item.href(), XHTML_MEDIA_TYPE));
        match spine_item {
            SpineItem::Title => lines.push(item("img_title", TITLE_IMAGE_HREF, JPEG_MEDIA_TYPE)),
            SpineItem::Page(page) => {
                lines.push(item(&image_id(page), &page.image_href(), JPEG_MEDIA_TYPE))
            }
            _ => {}
        }
    }
    lines.join("\n")
}

fn nav_list(entries: &[NavEntry], indent: usize) -> String {
    let pad = " ".repeat(indent);
    let items: String = entries
        .iter()
        .map(|entry| {
            let title = escape_xml(&entry.title);
            let children = if entry.children.is_empty() {
                String::new()
            } else {
                format!("\n{}{}  ", nav_list(&entry.children, indent + 4), pad)
            };
            render(
                templates::NAV_ENTRY,
                &[
                    ("indent", pad.as_str()),
                    ("href", entry.href.as_str()),
                    ("title", title.as_str()),
                    ("children", children.as_str()),
                ],
            )
        })
        .collect();
    render(
        templates::NAV_LIST,
        &[("indent", pad.as_str()), ("entries", items.as_str())],
    )
}
