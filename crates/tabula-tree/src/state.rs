use tabula_model::{GridSettings, RowAccess, RowId, RowKey};

use crate::{ExpandedSet, FlatTree, TreeNode, flatten};

/// How rows encode their hierarchy.
#[derive(Debug, Clone)]
pub struct TreeConfig<R> {
    /// Field holding the parent row's id; empty or null marks a root.
    pub parent_key: String,
    /// Identity of each row, `id` field by default.
    pub key: RowKey<R>,
    /// Pixels of indentation per depth level.
    pub indent_size: u16,
    /// Expand every parent on the first load.
    pub default_expanded: bool,
}

impl<R> TreeConfig<R> {
    pub fn new(parent_key: impl Into<String>) -> Self {
        Self {
            parent_key: parent_key.into(),
            key: RowKey::default(),
            indent_size: 16,
            default_expanded: false,
        }
    }

    pub fn from_settings(parent_key: impl Into<String>, settings: &GridSettings) -> Self {
        Self {
            indent_size: settings.indent_size,
            default_expanded: settings.default_expanded,
            ..Self::new(parent_key)
        }
    }

    /// Reads ids from `id_key` instead of `id`.
    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.key = RowKey::field(id_key);
        self
    }

    pub fn with_key(mut self, key: RowKey<R>) -> Self {
        self.key = key;
        self
    }

    pub fn expanded_by_default(mut self, expanded: bool) -> Self {
        self.default_expanded = expanded;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeAction {
    Toggle(RowId),
    Expand(RowId),
    Collapse(RowId),
    ExpandAll,
    CollapseAll,
}

/// Tree mode of a grid: the derived hierarchy plus the expanded set.
///
/// The expanded set is seeded once, on the first non-empty load; afterwards
/// only [`TreeAction`]s change it, so page swaps and realtime updates never
/// collapse what the user opened.
#[derive(Debug, Clone)]
pub struct TreeState<R> {
    config: TreeConfig<R>,
    expanded: ExpandedSet,
    seeded: bool,
    flat: FlatTree,
}

impl<R: RowAccess> TreeState<R> {
    pub fn new(config: TreeConfig<R>) -> Self {
        Self {
            config,
            expanded: ExpandedSet::new(),
            seeded: false,
            flat: FlatTree::default(),
        }
    }

    pub fn config(&self) -> &TreeConfig<R> {
        &self.config
    }

    pub fn expanded(&self) -> &ExpandedSet {
        &self.expanded
    }

    pub fn flat(&self) -> &FlatTree {
        &self.flat
    }

    /// Rebuilds the hierarchy for new data.
    pub fn load(&mut self, rows: &[R]) {
        self.flat = flatten(rows, &self.config.key, &self.config.parent_key);
        if !self.seeded && !rows.is_empty() {
            self.seeded = true;
            if self.config.default_expanded {
                self.expanded = ExpandedSet::from_ids(self.flat.expandable_ids().cloned());
            }
        }
    }

    /// Forgets the seed so the next load applies `default_expanded` again.
    pub fn reseed(&mut self) {
        self.seeded = false;
        self.expanded = ExpandedSet::new();
    }

    /// Applies a user action; returns whether the expanded set changed.
    pub fn dispatch(&mut self, action: TreeAction) -> bool {
        let next = match &action {
            TreeAction::Toggle(id) => self.expanded.toggled(id),
            TreeAction::Expand(id) => self.expanded.with(id, true),
            TreeAction::Collapse(id) => self.expanded.with(id, false),
            TreeAction::ExpandAll => ExpandedSet::from_ids(self.flat.expandable_ids().cloned()),
            TreeAction::CollapseAll => ExpandedSet::new(),
        };
        if next == self.expanded {
            return false;
        }
        tracing::trace!(?action, expanded = next.len(), "tree expansion changed");
        self.expanded = next;
        true
    }

    pub fn is_expanded(&self, id: &RowId) -> bool {
        self.expanded.contains(id)
    }

    /// Nodes currently shown, in display order.
    pub fn visible(&self) -> Vec<&TreeNode> {
        self.flat.visible(&self.expanded).collect()
    }
}
