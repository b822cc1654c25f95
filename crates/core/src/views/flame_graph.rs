use proflens_protocol::{FlameGraphRow, FlameGraphTiming, StartEndRange};

use crate::model::{CallTree, CallTreeError, IndexIntoCallNodeTable, Thread, build_call_node_table};
use crate::transforms::{filter_thread_to_range, invert_call_stack};

/// Lay out a call tree as a flame graph in normalized `[0, 1]` space.
///
/// Roots share the full width in proportion to their total weight and each
/// child starts where its previous sibling ended, inside its parent. Siblings
/// keep the call tree's heaviest-first order, so every row comes out sorted
/// by `start`.
pub fn compute_flame_graph_timing(tree: &CallTree) -> FlameGraphTiming {
    let table = tree.table();
    let depth_count = table.max_depth().map_or(0, |depth| depth as usize + 1);
    let mut rows = vec![FlameGraphRow::default(); depth_count];

    let total = tree.root_total();
    if total <= 0.0 {
        return FlameGraphTiming { rows };
    }

    let mut pending = Vec::new();
    push_siblings(tree, tree.roots(), 0.0, total, &mut pending);
    while let Some((node, start)) = pending.pop() {
        let end = start + tree.total_weight(node) / total;
        if let Some(row) = rows.get_mut(table.depth[node] as usize) {
            row.push(node, start, end, tree.self_weight(node) / total);
        }
        push_siblings(tree, tree.children(node), start, total, &mut pending);
    }

    FlameGraphTiming { rows }
}

/// Queue `siblings` laid out left to right from `start`, leftmost on top.
fn push_siblings(
    tree: &CallTree,
    siblings: &[IndexIntoCallNodeTable],
    start: f64,
    total: f64,
    pending: &mut Vec<(IndexIntoCallNodeTable, f64)>,
) {
    let mut x = start;
    let mut placed = Vec::with_capacity(siblings.len());
    for &node in siblings {
        let width = tree.total_weight(node) / total;
        if width <= 0.0 {
            continue;
        }
        placed.push((node, x));
        x += width;
    }
    pending.extend(placed.into_iter().rev());
}

/// Build the flame graph for one thread, optionally restricted to a
/// committed range and inverted.
pub fn flame_graph_for_thread(
    thread: &Thread,
    range: Option<StartEndRange>,
    invert: bool,
) -> Result<FlameGraphTiming, CallTreeError> {
    let tree = call_tree_for_thread(thread, range, invert)?;
    Ok(compute_flame_graph_timing(&tree))
}

/// Range filter, optional inversion, call node table, then sample weights.
pub fn call_tree_for_thread(
    thread: &Thread,
    range: Option<StartEndRange>,
    invert: bool,
) -> Result<CallTree, CallTreeError> {
    let filtered;
    let mut thread = match range {
        Some(range) => {
            filtered = filter_thread_to_range(thread, range);
            &filtered
        }
        None => thread,
    };
    let inverted;
    if invert {
        inverted = invert_call_stack(thread)?;
        thread = &inverted;
    }
    let table = build_call_node_table(&thread.stack_table, &thread.frame_table, &thread.func_table)?;
    tracing::trace!(
        call_nodes = table.len(),
        samples = thread.samples.len(),
        invert,
        "built call tree"
    );
    Ok(CallTree::from_samples(table, &thread.samples))
}
