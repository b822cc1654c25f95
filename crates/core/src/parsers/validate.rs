use thiserror::Error;

use crate::model::{CounterIndex, IndexIntoStackTable, Profile, Thread, ThreadIndex};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("thread {thread_index}: {table}.{column} has {found} rows, expected {expected}")]
    ColumnLength {
        thread_index: ThreadIndex,
        table: &'static str,
        column: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("thread {thread_index}: stack {stack_index} has a prefix that does not precede it")]
    StackPrefixOrder {
        thread_index: ThreadIndex,
        stack_index: IndexIntoStackTable,
    },
    #[error("thread {thread_index}: {table} row {row} points at {index}, past the end ({len})")]
    DanglingIndex {
        thread_index: ThreadIndex,
        table: &'static str,
        row: usize,
        index: usize,
        len: usize,
    },
    #[error("counter {counter_index}: time and count columns differ in length")]
    CounterColumnLength { counter_index: CounterIndex },
    #[error("counter {counter_index} references thread {thread_index} but the profile has {thread_count} threads")]
    CounterThread {
        counter_index: CounterIndex,
        thread_index: ThreadIndex,
        thread_count: usize,
    },
    #[error("track references thread {thread_index} but the profile has {thread_count} threads")]
    TrackThread {
        thread_index: ThreadIndex,
        thread_count: usize,
    },
    #[error("track references counter {counter_index} but the profile has {counter_count} counters")]
    TrackCounter {
        counter_index: CounterIndex,
        counter_count: usize,
    },
}

/// Check that every column in every table lines up and that every index
/// stored in the profile points at something that exists.
pub fn validate_profile(profile: &Profile) -> Result<(), ValidationError> {
    for (thread_index, thread) in profile.threads.iter().enumerate() {
        validate_thread(thread_index, thread)?;
    }

    let thread_count = profile.threads.len();
    for (counter_index, counter) in profile.counters.iter().enumerate() {
        if counter.main_thread_index >= thread_count {
            return Err(ValidationError::CounterThread {
                counter_index,
                thread_index: counter.main_thread_index,
                thread_count,
            });
        }
        if counter.samples.time.len() != counter.samples.count.len() {
            return Err(ValidationError::CounterColumnLength { counter_index });
        }
    }

    if let Some(thread_index) = profile
        .tracks
        .thread_indexes()
        .find(|&index| index >= thread_count)
    {
        return Err(ValidationError::TrackThread {
            thread_index,
            thread_count,
        });
    }
    let counter_count = profile.counters.len();
    if let Some(counter_index) = profile
        .tracks
        .counter_indexes()
        .find(|&index| index >= counter_count)
    {
        return Err(ValidationError::TrackCounter {
            counter_index,
            counter_count,
        });
    }
    Ok(())
}

fn validate_thread(thread_index: ThreadIndex, thread: &Thread) -> Result<(), ValidationError> {
    let check_len = |table, column, expected, found| {
        if expected == found {
            Ok(())
        } else {
            Err(ValidationError::ColumnLength {
                thread_index,
                table,
                column,
                expected,
                found,
            })
        }
    };

    let samples = &thread.samples;
    check_len("samples", "stack", samples.len(), samples.stack.len())?;
    if let Some(responsiveness) = &samples.responsiveness {
        check_len("samples", "responsiveness", samples.len(), responsiveness.len())?;
    }
    if let Some(weight) = &samples.weight {
        check_len("samples", "weight", samples.len(), weight.len())?;
    }

    let stacks = &thread.stack_table;
    check_len("stackTable", "prefix", stacks.len(), stacks.prefix.len())?;
    check_len("stackTable", "category", stacks.len(), stacks.category.len())?;

    let frames = &thread.frame_table;
    check_len("frameTable", "category", frames.len(), frames.category.len())?;
    check_len("frameTable", "line", frames.len(), frames.line.len())?;

    let funcs = &thread.func_table;
    check_len("funcTable", "fileName", funcs.len(), funcs.file_name.len())?;
    check_len("funcTable", "isJS", funcs.len(), funcs.is_js.len())?;

    let markers = &thread.markers;
    check_len("markers", "startTime", markers.len(), markers.start_time.len())?;
    check_len("markers", "endTime", markers.len(), markers.end_time.len())?;
    check_len("markers", "category", markers.len(), markers.category.len())?;
    check_len("markers", "data", markers.len(), markers.data.len())?;

    if let Some((stack_index, _)) = stacks
        .prefix
        .iter()
        .enumerate()
        .find(|&(stack_index, prefix)| prefix.is_some_and(|p| p >= stack_index))
    {
        return Err(ValidationError::StackPrefixOrder {
            thread_index,
            stack_index,
        });
    }

    let strings = thread.string_table.len();
    let plain = |column: &[usize]| column.iter().copied().map(Some).collect::<Vec<_>>();
    check_indexes(thread_index, "samples.stack", samples.stack.iter().copied(), stacks.len())?;
    check_indexes(thread_index, "stackTable.frame", plain(&stacks.frame), frames.len())?;
    check_indexes(thread_index, "frameTable.func", plain(&frames.func), funcs.len())?;
    check_indexes(thread_index, "funcTable.name", plain(&funcs.name), strings)?;
    check_indexes(thread_index, "funcTable.fileName", funcs.file_name.iter().copied(), strings)?;
    check_indexes(thread_index, "markers.name", plain(&markers.name), strings)?;
    Ok(())
}

/// The first row whose index is `len` or more.
fn check_indexes(
    thread_index: ThreadIndex,
    table: &'static str,
    indexes: impl IntoIterator<Item = Option<usize>>,
    len: usize,
) -> Result<(), ValidationError> {
    let dangling = indexes
        .into_iter()
        .enumerate()
        .find_map(|(row, index)| index.filter(|&index| index >= len).map(|index| (row, index)));
    match dangling {
        Some((row, index)) => Err(ValidationError::DanglingIndex {
            thread_index,
            table,
            row,
            index,
            len,
        }),
        None => Ok(()),
    }
}
