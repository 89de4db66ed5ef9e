use crate::layer::Layer;

/// One node of the reconstructed group-layer tree. A `Group` always
/// corresponds to a layer with the `GROUP_ITEM` property *except* when it
/// was auto-created to fill a gap in an `ITEM_PATH` (spec.md §4.4,
/// "auto-creating intermediate groups"); in that case `layer_index` is
/// `None` and the group exists only to hold its children.
#[derive(Debug, Clone)]
pub enum HierarchyNode {
    Leaf(usize),
    Group {
        layer_index: Option<usize>,
        name: String,
        children: Vec<HierarchyNode>,
    },
}

impl HierarchyNode {
    pub fn layer_index(&self) -> Option<usize> {
        match self {
            HierarchyNode::Leaf(i) => Some(*i),
            HierarchyNode::Group { layer_index, .. } => *layer_index,
        }
    }

    pub fn children(&self) -> &[HierarchyNode] {
        match self {
            HierarchyNode::Leaf(_) => &[],
            HierarchyNode::Group { children, .. } => children,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, HierarchyNode::Group { .. })
    }
}

/// The reconstructed layer tree for one image.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    roots: Vec<HierarchyNode>,
}

impl Hierarchy {
    pub fn roots(&self) -> &[HierarchyNode] {
        &self.roots
    }
}

fn placeholder_group() -> HierarchyNode {
    HierarchyNode::Group {
        layer_index: None,
        name: String::new(),
        children: Vec::new(),
    }
}

fn ensure_len(nodes: &mut Vec<HierarchyNode>, len: usize) {
    while nodes.len() < len {
        nodes.push(placeholder_group());
    }
}

fn insert_at_path(
    nodes: &mut Vec<HierarchyNode>,
    path: &[u32],
    layer_index: usize,
    is_group: bool,
    name: String,
) {
    let idx = path[0] as usize;
    ensure_len(nodes, idx + 1);

    if path.len() == 1 {
        let existing_children = match &nodes[idx] {
            HierarchyNode::Group { children, .. } => children.clone(),
            HierarchyNode::Leaf(_) => Vec::new(),
        };
        nodes[idx] = if is_group {
            HierarchyNode::Group {
                layer_index: Some(layer_index),
                name,
                children: existing_children,
            }
        } else {
            HierarchyNode::Leaf(layer_index)
        };
        return;
    }

    if matches!(nodes[idx], HierarchyNode::Leaf(_)) {
        nodes[idx] = placeholder_group();
    }

    if let HierarchyNode::Group { children, .. } = &mut nodes[idx] {
        insert_at_path(children, &path[1..], layer_index, is_group, name);
    }
}

fn join_qualified(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn assign_qualified_names(
    nodes: &[HierarchyNode],
    prefix: &str,
    layers: &[Layer],
    out: &mut [String],
) {
    for node in nodes {
        match node {
            HierarchyNode::Leaf(i) => {
                out[*i] = join_qualified(prefix, &layers[*i].canonical_name);
            }
            HierarchyNode::Group {
                layer_index,
                name,
                children,
            } => {
                let label = layer_index
                    .map(|i| layers[i].canonical_name.clone())
                    .unwrap_or_else(|| name.clone());
                let qualified = join_qualified(prefix, &label);

                if let Some(i) = layer_index {
                    out[*i] = qualified.clone();
                }
                assign_qualified_names(children, &qualified, layers, out);
            }
        }
    }
}

/// Builds the group tree from a flat, file-order layer list and writes
/// each layer's `qualified_name` back in place.
pub(crate) fn build(layers: &mut [Layer]) -> Hierarchy {
    let mut roots = Vec::new();

    for (i, layer) in layers.iter().enumerate() {
        if layer.item_path.is_empty() {
            roots.push(if layer.is_group {
                HierarchyNode::Group {
                    layer_index: Some(i),
                    name: layer.canonical_name.clone(),
                    children: Vec::new(),
                }
            } else {
                HierarchyNode::Leaf(i)
            });
        } else {
            insert_at_path(
                &mut roots,
                &layer.item_path,
                i,
                layer.is_group,
                layer.canonical_name.clone(),
            );
        }
    }

    let mut qualified = vec![String::new(); layers.len()];
    assign_qualified_names(&roots, "", layers, &mut qualified);
    for (layer, name) in layers.iter_mut().zip(qualified) {
        layer.qualified_name = name;
    }

    Hierarchy { roots }
}

#[cfg(feature = "tree")]
impl Hierarchy {
    /// Renders the tree to a `ptree`-backed, colored outline: groups bold,
    /// hidden layers dimmed. Purely a debugging aid, not part of the
    /// decode path.
    pub fn print(&self, layers: &[Layer]) -> std::io::Result<()> {
        let mut builder = ptree::TreeBuilder::new("image".to_string());
        for node in &self.roots {
            build_ptree(node, layers, &mut builder);
        }
        ptree::print_tree(&builder.build())
    }
}

#[cfg(feature = "tree")]
fn build_ptree(node: &HierarchyNode, layers: &[Layer], builder: &mut ptree::TreeBuilder) {
    use colored::Colorize;

    match node {
        HierarchyNode::Leaf(i) => {
            let layer = &layers[*i];
            let label = if layer.visible {
                layer.canonical_name.clone().normal()
            } else {
                layer.canonical_name.clone().dimmed()
            };
            builder.add_empty_child(label.to_string());
        }
        HierarchyNode::Group {
            layer_index,
            name,
            children,
        } => {
            let label = layer_index
                .map(|i| layers[i].canonical_name.clone())
                .unwrap_or_else(|| name.clone());
            builder.begin_child(label.bold().to_string());
            for child in children {
                build_ptree(child, layers, builder);
            }
            builder.end_child();
        }
    }
}
