//! Table of contents as a trie of source path segments.
//!
//! Every page's relative directory is inserted segment by segment; the resulting
//! tree mirrors the source folder hierarchy and drives both the navigation
//! document of each volume and the dry-run listing.

use crate::types::Page;

/// One path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocNode {
    pub name: String,
    /// Children in insertion order.
    pub children: Vec<TocNode>,
    /// Set for file segments.
    pub terminal: bool,
    /// First page inserted below this node.
    pub target: Option<String>,
}

impl TocNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&TocNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_mut(&mut self, name: &str) -> &mut TocNode {
        match self.children.iter().position(|c| c.name == name) {
            Some(index) => &mut self.children[index],
            None => {
                self.children.push(TocNode::new(name));
                let last = self.children.len() - 1;
                &mut self.children[last]
            }
        }
    }

    /// Children shown in a listing.
    pub fn visible_children(&self, skip_files: bool) -> impl Iterator<Item = &TocNode> {
        self.children
            .iter()
            .filter(move |c| !(skip_files && c.terminal))
    }

    /// Indented `- name` listing of this node's subtree, excluding the node itself
    /// when `indent` is empty.
    pub fn write_string(&self, indent: &str, skip_files: bool) -> String {
        let mut out = String::new();
        if !indent.is_empty() {
            out.push_str(indent);
            out.push_str("- ");
            out.push_str(&self.name);
            out.push('\n');
        }
        let indent = format!("{}  ", indent);
        for child in self.visible_children(skip_files) {
            out.push_str(&child.write_string(&indent, skip_files));
        }
        out
    }
}

/// A navigation entry derived from a directory node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub title: String,
    pub href: String,
    pub children: Vec<NavEntry>,
}

/// Path trie rooted at an unnamed node.
#[derive(Debug, Clone, Default)]
pub struct TocTree {
    root: TocNode,
}

impl TocTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the directory tree of `pages`, each directory linking to its first page.
    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Self {
        let mut tree = Self::new();
        for page in pages {
            tree.add_page(page);
        }
        tree
    }

    /// Inserts every segment of `path`. Inserting the same path again changes nothing.
    pub fn add(&mut self, path: &str) {
        self.insert(path, false, None);
    }

    /// Inserts `path` with its last segment marked as a file.
    pub fn add_file(&mut self, path: &str) {
        self.insert(path, true, None);
    }

    /// Inserts the directory of `page` with the page as link target.
    pub fn add_page(&mut self, page: &Page) {
        self.insert(&page.path, false, Some(page.page_href()));
    }

    /// Inserts the directory and file name of `page`.
    pub fn add_page_file(&mut self, page: &Page) {
        self.insert(&page.source_path(), true, Some(page.page_href()));
    }

    fn insert(&mut self, path: &str, terminal: bool, target: Option<String>) {
        let segments: Vec<&str> = segments(path).collect();
        let mut node = &mut self.root;
        if node.target.is_none() {
            node.target.clone_from(&target);
        }
        let count = segments.len();
        for (i, segment) in segments.into_iter().enumerate() {
            node = node.child_mut(segment);
            if node.target.is_none() {
                node.target.clone_from(&target);
            }
            if terminal && i + 1 == count {
                node.terminal = true;
            }
        }
    }

    pub fn root(&self) -> &TocNode {
        &self.root
    }

    /// The node a listing starts from. With `strip_first`, a root holding a single
    /// visible directory is replaced by that directory in directory-only listings.
    pub fn display_root(&self, skip_files: bool, strip_first: bool) -> &TocNode {
        if skip_files && strip_first {
            let mut visible = self.root.visible_children(true);
            if let (Some(only), None) = (visible.next(), visible.next()) {
                return only;
            }
        }
        &self.root
    }

    /// Indented listing; directories only when `skip_files` is set.
    pub fn render(&self, skip_files: bool, strip_first: bool) -> String {
        self.display_root(skip_files, strip_first)
            .write_string("", skip_files)
    }

    /// Nested navigation entries for every directory that links to a page.
    pub fn nav_entries(&self, strip_first: bool) -> Vec<NavEntry> {
        nav_children(self.display_root(true, strip_first))
    }
}

fn nav_children(node: &TocNode) -> Vec<NavEntry> {
    let mut entries = Vec::new();
    for child in node.visible_children(true) {
        let children = nav_children(child);
        match &child.target {
            Some(href) => entries.push(NavEntry {
                title: child.name.clone(),
                href: href.clone(),
                children,
            }),
            // no page of its own: hoist what is below
            None => entries.extend(children),
        }
    }
    entries
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
}
