// Index page rendering.
//
// The scanned tree is flattened into open / leaf / close items which the
// askama template turns into nested `<ul role="tree">` markup. Names are
// escaped by the template engine. File links point at `{portal}{identifier}`
// on the publishing portal instead of a `sia://` URI.

use std::path::Path;

use askama::Template;

use crate::batch::IdentifierMap;
use crate::config::PortalUrl;
use crate::error::{PublishError, RenderError};
use crate::tree::{DirTree, EntryFilter, NodeId};

enum TreeItem<'a> {
    Open(&'a str),
    Leaf(String, &'a str),
    Close,
}

/// Askama view model for the nested directory listing.
#[derive(Template)]
#[template(path = "tree.html")]
struct TreeTemplate<'a> {
    items: Vec<TreeItem<'a>>,
}

/// Askama view model for the full index page.
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    title: &'a str,
    tree: &'a str,
}

/// Render the tree as hyperlinked markup. Every file must have an entry in
/// `identifiers`.
pub fn render_tree(
    tree: &DirTree,
    portal: &PortalUrl,
    identifiers: &IdentifierMap,
) -> Result<String, RenderError> {
    let mut items = Vec::new();
    push_children(tree, tree.root(), portal, identifiers, &mut items)?;
    Ok(TreeTemplate { items }.render()?)
}

fn push_children<'t>(
    tree: &'t DirTree,
    id: NodeId,
    portal: &PortalUrl,
    identifiers: &IdentifierMap,
    items: &mut Vec<TreeItem<'t>>,
) -> Result<(), RenderError> {
    for &child in &tree.node(id).children {
        let node = tree.node(child);
        if node.is_dir() {
            items.push(TreeItem::Open(&node.name));
            push_children(tree, child, portal, identifiers, items)?;
            items.push(TreeItem::Close);
            continue;
        }
        let identifier = identifiers
            .get(&node.path)
            .ok_or_else(|| RenderError::MissingIdentifier(node.path.clone()))?;
        items.push(TreeItem::Leaf(portal.address_of(identifier), &node.name));
    }
    Ok(())
}

/// Wrap rendered tree markup in the standalone index page.
pub fn render_page(title: &str, tree_markup: &str) -> Result<String, RenderError> {
    Ok(IndexTemplate {
        title,
        tree: tree_markup,
    }
    .render()?)
}

/// Scan `root` with `filter` and render the result.
pub fn render(
    root: &Path,
    filter: &impl EntryFilter,
    portal: &PortalUrl,
    identifiers: &IdentifierMap,
) -> Result<String, PublishError> {
    let tree = DirTree::scan(root, filter)?;
    Ok(render_tree(&tree, portal, identifiers)?)
}
