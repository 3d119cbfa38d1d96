//! Action catalog and navigation.
//!
//! A fixed tree of categories and leaf actions, built once at startup and
//! immutable thereafter. Categories descend, unavailable leaves are
//! selectable but never dispatched, and out-of-range selections are a
//! typed error the menu loop reports and shrugs off.

use rt_common::{ActionName, Error, Result};
use serde::Serialize;

/// One node of the catalog tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionNode {
    /// Leaf action; `available == false` entries render but never dispatch.
    Action { name: ActionName, available: bool },
    /// Ordered sub-menu.
    Category {
        name: String,
        children: Vec<ActionNode>,
    },
}

impl ActionNode {
    pub fn action(name: &str) -> Self {
        ActionNode::Action {
            name: ActionName::new(name),
            available: true,
        }
    }

    pub fn unavailable(name: &str) -> Self {
        ActionNode::Action {
            name: ActionName::new(name),
            available: false,
        }
    }

    pub fn category(name: &str, children: Vec<ActionNode>) -> Self {
        ActionNode::Category {
            name: name.to_string(),
            children,
        }
    }

    /// Display label for menu rendering.
    pub fn label(&self) -> &str {
        match self {
            ActionNode::Action { name, .. } => name.as_str(),
            ActionNode::Category { name, .. } => name,
        }
    }

    /// Children, if this node is a category.
    pub fn children(&self) -> Option<&[ActionNode]> {
        match self {
            ActionNode::Category { children, .. } => Some(children),
            ActionNode::Action { .. } => None,
        }
    }
}

/// Result of resolving a selection path against the tree.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    /// Path ends on a category: descend and re-render.
    Category(&'a ActionNode),
    /// Path ends on a dispatchable action.
    Action(&'a ActionName),
    /// Path ends on a leaf that is marked unavailable.
    Unavailable(&'a ActionName),
}

/// The fixed catalog, rooted at the main menu.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    root: ActionNode,
}

impl Catalog {
    /// Build a catalog from a root category.
    pub fn new(root: ActionNode) -> Self {
        debug_assert!(root.children().is_some(), "catalog root must be a category");
        Catalog { root }
    }

    pub fn root(&self) -> &ActionNode {
        &self.root
    }

    /// Resolve a path of zero-based child indices from the root.
    ///
    /// An empty path resolves to the root category. Never panics: an index
    /// past the end of a menu, or a path that tries to descend through a
    /// leaf, is `Error::OutOfRange`.
    pub fn resolve(&self, path: &[usize]) -> Result<Resolved<'_>> {
        let mut node = &self.root;

        for (depth, &index) in path.iter().enumerate() {
            let children = node.children().ok_or(Error::OutOfRange {
                index,
                len: 0,
            })?;
            node = children.get(index).ok_or(Error::OutOfRange {
                index,
                len: children.len(),
            })?;

            let last = depth + 1 == path.len();
            if last {
                return Ok(match node {
                    ActionNode::Category { .. } => Resolved::Category(node),
                    ActionNode::Action {
                        name,
                        available: true,
                    } => Resolved::Action(name),
                    ActionNode::Action {
                        name,
                        available: false,
                    } => Resolved::Unavailable(name),
                });
            }
        }

        Ok(Resolved::Category(node))
    }

    /// The catalog the console ships with.
    ///
    /// Contents mirror the relay console this tool grew out of; the
    /// unavailable leaves are placeholders whose executor wiring never
    /// landed.
    pub fn builtin() -> Self {
        Catalog::new(ActionNode::category(
            "Main Menu",
            vec![
                ActionNode::category(
                    "Enumeration",
                    vec![
                        ActionNode::category(
                            "Domain info",
                            vec![
                                ActionNode::action("Domain trusts"),
                                ActionNode::action("Domain controllers"),
                                ActionNode::action("Password policy"),
                            ],
                        ),
                        ActionNode::action("List local users"),
                        ActionNode::action("List local admins"),
                        ActionNode::action("Logged on users"),
                        ActionNode::action("List shares"),
                        ActionNode::action("Logical drives"),
                        ActionNode::action("List security events"),
                    ],
                ),
                ActionNode::category(
                    "Execution",
                    vec![
                        ActionNode::action("List \"C:\\\""),
                        ActionNode::action("List alternate drive"),
                        ActionNode::action("Spider filesystem for pattern"),
                        ActionNode::unavailable("nxc GET"),
                        ActionNode::unavailable("nxc PUT"),
                        ActionNode::unavailable("nxc command (cmd.exe)"),
                        ActionNode::unavailable("nxc command (PowerShell)"),
                        ActionNode::unavailable("Disable Windows Defender"),
                        ActionNode::unavailable("Disable AppLocker"),
                        ActionNode::unavailable("AMSI Bypass"),
                    ],
                ),
                ActionNode::category(
                    "Credentials",
                    vec![
                        ActionNode::action("Secretsdump"),
                        ActionNode::unavailable("nxc SAM"),
                        ActionNode::unavailable("nxc LSA"),
                        ActionNode::unavailable("nxc LSASS"),
                        ActionNode::unavailable("nxc nanodump"),
                    ],
                ),
                ActionNode::category(
                    "Persistence",
                    vec![
                        ActionNode::category(
                            "Create local admin",
                            vec![
                                ActionNode::unavailable("Add local user"),
                                ActionNode::unavailable("Add user to Administrators"),
                            ],
                        ),
                        ActionNode::unavailable("Retrieve remote file (download)"),
                        ActionNode::unavailable("Send local file (upload)"),
                    ],
                ),
            ],
        ))
    }
}
