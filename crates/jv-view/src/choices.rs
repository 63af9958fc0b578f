//! Selectable filter choices, grouped by category.
//!
//! Nodes live in a flat arena and refer to each other by `NodeId`, so
//! parent links need no shared ownership. The tree is rebuilt from the
//! journal whenever the source changes.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

use jv_journal::{Field, JournalResult, JournalSource, Priority};

use crate::filter::{FilterChange, FilterSpec};

// systemd escapes unit name bytes as \xNN.
static RE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\x([0-9a-fA-F]{2})").unwrap());

/// Priority selected in a fresh tree.
pub const DEFAULT_PRIORITY: Priority = Priority::Notice;

/// Top-level grouping of filter choices, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Transport,
    Priority,
    SystemdUnit,
    Exe,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Transport,
        Category::Priority,
        Category::SystemdUnit,
        Category::Exe,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Transport => "Transport",
            Self::Priority => "Priority",
            Self::SystemdUnit => "Unit",
            Self::Exe => "Process",
        }
    }
}

/// Index of a node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceNode {
    /// Display text.
    pub text: String,
    /// Raw filter value; `None` for section nodes.
    pub data: Option<String>,
    pub category: Category,
    pub selected: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena tree of filter choices: one section per `Category`, each holding
/// the selectable values for that axis.
#[derive(Debug, Clone)]
pub struct FilterChoiceTree {
    nodes: Vec<ChoiceNode>,
}

/// Undo systemd's `\xNN` byte escaping for display.
pub fn unescape_unit(raw: &str) -> String {
    if !raw.contains("\\x") {
        return raw.to_string();
    }
    let mut bytes = Vec::with_capacity(raw.len());
    let mut last = 0;
    for caps in RE_ESCAPE.captures_iter(raw) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        bytes.extend_from_slice(raw[last..whole.start()].as_bytes());
        match u8::from_str_radix(&caps[1], 16) {
            Ok(byte) => bytes.push(byte),
            Err(_) => bytes.extend_from_slice(whole.as_str().as_bytes()),
        }
        last = whole.end();
    }
    bytes.extend_from_slice(raw[last..].as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

fn sort_case_insensitive(values: &mut [String]) {
    values.sort_by(|a, b| match a.to_lowercase().cmp(&b.to_lowercase()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    });
}

impl FilterChoiceTree {
    /// Build from the distinct unit and executable values in `source`.
    pub fn build(source: &mut dyn JournalSource) -> JournalResult<Self> {
        let units = source.query_unique(Field::SystemdUnit)?;
        let exes = source.query_unique(Field::Exe)?;
        Ok(Self::from_values(units, exes))
    }

    /// Build from explicit value lists. Only `*.service` units are offered.
    pub fn from_values(units: Vec<String>, exes: Vec<String>) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        for category in Category::ALL {
            tree.push(category.title().to_string(), None, category, false, None);
        }

        let transport = tree.section(Category::Transport);
        tree.push(
            "Kernel".to_string(),
            Some("kernel".to_string()),
            Category::Transport,
            false,
            Some(transport),
        );

        let priority = tree.section(Category::Priority);
        for level in Priority::ALL {
            let name = level.as_str();
            let mut text = name[..1].to_uppercase();
            text.push_str(&name[1..]);
            tree.push(
                text,
                Some(level.value().to_string()),
                Category::Priority,
                level == DEFAULT_PRIORITY,
                Some(priority),
            );
        }

        let mut units: Vec<String> = units
            .into_iter()
            .filter(|u| u.ends_with(".service"))
            .collect();
        sort_case_insensitive(&mut units);
        let unit_section = tree.section(Category::SystemdUnit);
        for unit in units {
            tree.push(
                unescape_unit(&unit),
                Some(unit),
                Category::SystemdUnit,
                false,
                Some(unit_section),
            );
        }

        let mut exes = exes;
        sort_case_insensitive(&mut exes);
        let exe_section = tree.section(Category::Exe);
        for exe in exes {
            tree.push(
                unescape_unit(&exe),
                Some(exe),
                Category::Exe,
                false,
                Some(exe_section),
            );
        }

        tree
    }

    fn push(
        &mut self,
        text: String,
        data: Option<String>,
        category: Category,
        selected: bool,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ChoiceNode {
            text,
            data,
            category,
            selected,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Section node for `category`. Sections are created first, in
    /// `Category::ALL` order.
    pub fn section(&self, category: Category) -> NodeId {
        let index = Category::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or_default();
        NodeId(index)
    }

    pub fn sections(&self) -> impl Iterator<Item = NodeId> + '_ {
        Category::ALL.iter().map(|c| self.section(*c))
    }

    pub fn node(&self, id: NodeId) -> Option<&ChoiceNode> {
        self.nodes.get(id.0)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Child of `category`'s section carrying `data`.
    pub fn find(&self, category: Category, data: &str) -> Option<NodeId> {
        self.children(self.section(category))
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].data.as_deref() == Some(data))
    }

    /// Select or deselect a value node, returning the filter field this
    /// affects. Priority choices are exclusive: selecting one clears the
    /// others. Section nodes follow their children and cannot be set.
    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> Option<FilterChange> {
        let node = self.nodes.get(id.0)?;
        let parent = node.parent?;
        if node.selected == selected {
            return None;
        }
        let category = node.category;

        if category == Category::Priority && selected {
            for sibling in self.nodes[parent.0].children.clone() {
                self.nodes[sibling.0].selected = false;
            }
        }
        self.nodes[id.0].selected = selected;

        match category {
            Category::Transport => Some(FilterChange::Kernel),
            Category::Priority => Some(FilterChange::Priority),
            Category::SystemdUnit | Category::Exe => {
                let any = self.nodes[parent.0]
                    .children
                    .iter()
                    .any(|c| self.nodes[c.0].selected);
                self.nodes[parent.0].selected = any;
                Some(match category {
                    Category::SystemdUnit => FilterChange::Units,
                    _ => FilterChange::Exes,
                })
            }
        }
    }

    fn selected_data(&self, category: Category) -> impl Iterator<Item = &str> + '_ {
        self.children(self.section(category))
            .iter()
            .map(|id| &self.nodes[id.0])
            .filter(|n| n.selected)
            .filter_map(|n| n.data.as_deref())
    }

    /// Selected priority threshold, if any.
    pub fn priority_filter(&self) -> Option<u8> {
        self.selected_data(Category::Priority)
            .next()
            .and_then(|d| d.parse().ok())
    }

    pub fn unit_filter(&self) -> Vec<String> {
        self.selected_data(Category::SystemdUnit)
            .map(str::to_string)
            .collect()
    }

    pub fn exe_filter(&self) -> Vec<String> {
        self.selected_data(Category::Exe).map(str::to_string).collect()
    }

    pub fn kernel_enabled(&self) -> bool {
        self.selected_data(Category::Transport).any(|d| d == "kernel")
    }

    /// Mirror `filter` in the selection state. Filter values the tree does
    /// not offer (non-service units) are not represented.
    pub fn sync_from(&mut self, filter: &FilterSpec) {
        let threshold = filter.priority().map(|p| p.value().to_string());
        for node in &mut self.nodes {
            let Some(data) = node.data.as_deref() else {
                continue;
            };
            node.selected = match node.category {
                Category::Transport => data == "kernel" && filter.kernel_enabled(),
                Category::Priority => threshold.as_deref() == Some(data),
                Category::SystemdUnit => filter.units().contains(data),
                Category::Exe => filter.exes().contains(data),
            };
        }
        for category in Category::ALL {
            let section = self.section(category);
            let any = self.nodes[section.0]
                .children
                .iter()
                .any(|c| self.nodes[c.0].selected);
            self.nodes[section.0].selected = any;
        }
    }

    /// Copy the current selections into `filter`. Boot selection is not
    /// part of the tree and is left alone.
    pub fn apply_to(&self, filter: &mut FilterSpec) -> Vec<FilterChange> {
        let mut target = filter.clone();
        target.set_units(self.unit_filter());
        target.set_exes(self.exe_filter());
        target.set_kernel(self.kernel_enabled());
        match self.priority_filter().and_then(Priority::from_value) {
            Some(level) => target.set_priority_level(level),
            None => target.reset_priority(),
        };
        filter.replace(target)
    }
}
