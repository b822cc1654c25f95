use rustc_hash::FxHashMap;

use crate::model::{CallTreeError, IndexIntoFrameTable, IndexIntoStackTable, StackTable, Thread};

/// Re-root every sampled stack at its leaf frame.
///
/// The result shares frame, func and string tables with the input; only the
/// stack table and the samples' stack column are rebuilt. Only stacks that
/// are actually sampled end up in the inverted table.
pub fn invert_call_stack(thread: &Thread) -> Result<Thread, CallTreeError> {
    let stack_table = &thread.stack_table;
    let mut inverted = StackTable::default();
    let mut lookup: FxHashMap<(Option<IndexIntoStackTable>, IndexIntoFrameTable), IndexIntoStackTable> =
        FxHashMap::default();
    let mut memo: Vec<Option<IndexIntoStackTable>> = vec![None; stack_table.len()];

    let mut new_stacks = Vec::with_capacity(thread.samples.len());
    for &stack in &thread.samples.stack {
        let Some(stack) = stack else {
            new_stacks.push(None);
            continue;
        };
        if let Some(done) = memo.get(stack).copied().flatten() {
            new_stacks.push(Some(done));
            continue;
        }

        // Walking prefixes from the leaf already yields the inverted order.
        let mut prefix = None;
        let mut current = Some(stack);
        while let Some(stack_index) = current {
            let next = stack_table.prefix[stack_index];
            if next.is_some_and(|p| p >= stack_index) {
                return Err(CallTreeError::MalformedStackTable { stack_index });
            }
            let frame = stack_table.frame[stack_index];
            let key = (prefix, frame);
            let inverted_index = match lookup.get(&key) {
                Some(&existing) => existing,
                None => {
                    let index = inverted.push(prefix, frame, stack_table.category[stack_index]);
                    lookup.insert(key, index);
                    index
                }
            };
            prefix = Some(inverted_index);
            current = next;
        }
        memo[stack] = prefix;
        new_stacks.push(prefix);
    }

    let mut samples = thread.samples.clone();
    samples.stack = new_stacks;
    Ok(Thread {
        samples,
        stack_table: inverted,
        ..thread.clone()
    })
}
