use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::thread::{
    FrameTable, FuncTable, IndexIntoFuncTable, IndexIntoStackTable, SamplesTable, StackTable,
};

pub type IndexIntoCallNodeTable = usize;

/// Root-first function indexes identifying a call node independently of
/// the table it was built into.
pub type CallNodePath = Vec<IndexIntoFuncTable>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallTreeError {
    #[error("stack {stack_index} has a prefix that does not point to an earlier stack")]
    MalformedStackTable { stack_index: IndexIntoStackTable },
    #[error("stack {stack_index} references a frame or function that does not exist")]
    DanglingFrame { stack_index: IndexIntoStackTable },
}

/// Stacks collapsed on `(parent call node, func)`.
///
/// Like the stack table this is a forest in topological order: a call
/// node's prefix always has a smaller index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNodeTable {
    pub prefix: Vec<Option<IndexIntoCallNodeTable>>,
    pub func: Vec<IndexIntoFuncTable>,
    pub category: Vec<usize>,
    pub depth: Vec<u32>,
    pub stack_index_to_call_node_index: Vec<IndexIntoCallNodeTable>,
}

impl CallNodeTable {
    pub fn len(&self) -> usize {
        self.func.len()
    }

    pub fn is_empty(&self) -> bool {
        self.func.is_empty()
    }

    pub fn max_depth(&self) -> Option<u32> {
        self.depth.iter().copied().max()
    }

    pub fn call_node_for_stack(&self, stack: IndexIntoStackTable) -> Option<IndexIntoCallNodeTable> {
        self.stack_index_to_call_node_index.get(stack).copied()
    }
}

/// Collapse a stack table into a call node table in one forward pass.
pub fn build_call_node_table(
    stack_table: &StackTable,
    frame_table: &FrameTable,
    func_table: &FuncTable,
) -> Result<CallNodeTable, CallTreeError> {
    let mut table = CallNodeTable::default();
    table.stack_index_to_call_node_index.reserve(stack_table.len());
    let mut lookup: FxHashMap<(Option<IndexIntoCallNodeTable>, IndexIntoFuncTable), IndexIntoCallNodeTable> =
        FxHashMap::default();

    for stack_index in 0..stack_table.len() {
        let prefix_call_node = match stack_table.prefix[stack_index] {
            None => None,
            Some(prefix) if prefix < stack_index => {
                Some(table.stack_index_to_call_node_index[prefix])
            }
            Some(_) => return Err(CallTreeError::MalformedStackTable { stack_index }),
        };

        let func = frame_table
            .func
            .get(stack_table.frame[stack_index])
            .copied()
            .filter(|&func| func < func_table.len())
            .ok_or(CallTreeError::DanglingFrame { stack_index })?;
        let category = stack_table.category[stack_index];

        let call_node = match lookup.get(&(prefix_call_node, func)) {
            Some(&call_node) => {
                if table.category[call_node] != category {
                    table.category[call_node] = 0;
                }
                call_node
            }
            None => {
                let call_node = table.func.len();
                let depth = prefix_call_node.map_or(0, |p| table.depth[p] + 1);
                table.prefix.push(prefix_call_node);
                table.func.push(func);
                table.category.push(category);
                table.depth.push(depth);
                lookup.insert((prefix_call_node, func), call_node);
                call_node
            }
        };
        table.stack_index_to_call_node_index.push(call_node);
    }

    tracing::trace!(
        stacks = stack_table.len(),
        call_nodes = table.len(),
        "built call node table"
    );
    Ok(table)
}

/// Walk prefixes up to the root. `None` is "nothing selected" and yields an
/// empty path.
pub fn get_call_node_path_from_index(
    call_node: Option<IndexIntoCallNodeTable>,
    table: &CallNodeTable,
) -> CallNodePath {
    let mut path = Vec::new();
    let mut current = call_node;
    while let Some(node) = current {
        let Some(&func) = table.func.get(node) else {
            return Vec::new();
        };
        path.push(func);
        current = table.prefix[node];
    }
    path.reverse();
    path
}

/// Resolve a path against the current table. Returns `None` when the path is
/// empty or no longer exists, which is normal after the tree was rebuilt.
pub fn get_call_node_index_from_path(
    path: &[IndexIntoFuncTable],
    table: &CallNodeTable,
) -> Option<IndexIntoCallNodeTable> {
    let leaf_depth = path.len().checked_sub(1)?;
    let mut candidate = None;
    let mut matched_depth = 0;

    // Call nodes are topologically ordered, so matching each path element
    // in turn only ever has to look forward.
    for node in 0..table.len() {
        let node_depth = table.depth[node] as usize;
        if node_depth != matched_depth
            || table.prefix[node] != candidate
            || table.func[node] != path[node_depth]
        {
            continue;
        }
        if node_depth == leaf_depth {
            return Some(node);
        }
        candidate = Some(node);
        matched_depth += 1;
    }
    None
}

/// Per-call-node sample weights and the ordered child lists used by the
/// call tree and flame graph.
#[derive(Debug, Clone)]
pub struct CallTree {
    table: CallNodeTable,
    self_weight: Vec<f64>,
    total_weight: Vec<f64>,
    children: Vec<Vec<IndexIntoCallNodeTable>>,
    roots: Vec<IndexIntoCallNodeTable>,
    root_total: f64,
}

impl CallTree {
    /// Aggregate `samples` into `table`. Children and roots are ordered by
    /// descending total weight, then ascending call node index; nodes with a
    /// zero total are left out.
    pub fn from_samples(table: CallNodeTable, samples: &SamplesTable) -> Self {
        let len = table.len();
        let mut self_weight = vec![0.0; len];
        for (sample, stack) in samples.stack.iter().enumerate() {
            let Some(call_node) = stack.and_then(|s| table.call_node_for_stack(s)) else {
                continue;
            };
            self_weight[call_node] += samples.weight_at(sample);
        }

        // Children have larger indexes than their parents, so a reverse pass
        // sees every child's total before its parent needs it.
        let mut total_weight = self_weight.clone();
        for node in (0..len).rev() {
            if let Some(prefix) = table.prefix[node] {
                total_weight[prefix] += total_weight[node];
            }
        }

        let mut children = vec![Vec::new(); len];
        let mut roots = Vec::new();
        for node in 0..len {
            if total_weight[node] == 0.0 {
                continue;
            }
            match table.prefix[node] {
                Some(prefix) => children[prefix].push(node),
                None => roots.push(node),
            }
        }
        let by_weight = |a: &usize, b: &usize| {
            total_weight[*b]
                .total_cmp(&total_weight[*a])
                .then_with(|| a.cmp(b))
        };
        roots.sort_by(by_weight);
        for list in &mut children {
            list.sort_by(by_weight);
        }

        let root_total = roots.iter().map(|&root| total_weight[root]).sum();
        Self {
            table,
            self_weight,
            total_weight,
            children,
            roots,
            root_total,
        }
    }

    pub fn table(&self) -> &CallNodeTable {
        &self.table
    }

    pub fn self_weight(&self, node: IndexIntoCallNodeTable) -> f64 {
        self.self_weight[node]
    }

    pub fn total_weight(&self, node: IndexIntoCallNodeTable) -> f64 {
        self.total_weight[node]
    }

    pub fn children(&self, node: IndexIntoCallNodeTable) -> &[IndexIntoCallNodeTable] {
        &self.children[node]
    }

    pub fn roots(&self) -> &[IndexIntoCallNodeTable] {
        &self.roots
    }

    /// Sum of all root totals, i.e. the weight of every non-empty sample.
    pub fn root_total(&self) -> f64 {
        self.root_total
    }

    pub fn path(&self, node: Option<IndexIntoCallNodeTable>) -> CallNodePath {
        get_call_node_path_from_index(node, &self.table)
    }

    pub fn node_for_path(&self, path: &[IndexIntoFuncTable]) -> Option<IndexIntoCallNodeTable> {
        get_call_node_index_from_path(path, &self.table)
    }
}
