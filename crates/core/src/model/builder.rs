use rustc_hash::FxHashMap;

use super::markers::MarkerPayload;
use super::thread::{
    IndexIntoFrameTable, IndexIntoFuncTable, IndexIntoStackTable, IndexIntoStringTable, Pid,
    SamplesTable, StackTable, Thread, Tid,
};
use super::{FrameTable, FuncTable, RawMarkerTable};

/// Incrementally builds a [`Thread`] from function-name stacks.
///
/// Each distinct name becomes one function with one frame, and stacks are
/// deduplicated on `(prefix, frame)` so the resulting stack table keeps its
/// backwards-pointing prefix order.
#[derive(Debug)]
pub struct ThreadBuilder {
    thread: Thread,
    strings: FxHashMap<String, IndexIntoStringTable>,
    funcs: FxHashMap<IndexIntoStringTable, IndexIntoFuncTable>,
    stacks: FxHashMap<(Option<IndexIntoStackTable>, IndexIntoFrameTable), IndexIntoStackTable>,
}

impl ThreadBuilder {
    pub fn new(name: &str, pid: impl Into<Pid>, tid: Tid) -> Self {
        Self {
            thread: Thread {
                name: name.to_string(),
                process_type: "default".to_string(),
                process_name: None,
                etld_plus_1: None,
                pid: pid.into(),
                tid,
                is_main_thread: false,
                samples: SamplesTable::default(),
                stack_table: StackTable::default(),
                frame_table: FrameTable::default(),
                func_table: FuncTable::default(),
                markers: RawMarkerTable::default(),
                string_table: Vec::new(),
            },
            strings: FxHashMap::default(),
            funcs: FxHashMap::default(),
            stacks: FxHashMap::default(),
        }
    }

    pub fn main_thread(mut self) -> Self {
        self.thread.is_main_thread = true;
        self
    }

    pub fn intern(&mut self, string: &str) -> IndexIntoStringTable {
        if let Some(&index) = self.strings.get(string) {
            return index;
        }
        let index = self.thread.string_table.len();
        self.thread.string_table.push(string.to_string());
        self.strings.insert(string.to_string(), index);
        index
    }

    fn frame_for(&mut self, name: &str) -> IndexIntoFrameTable {
        let name = self.intern(name);
        let func = match self.funcs.get(&name) {
            Some(&func) => func,
            None => {
                let func = self.thread.func_table.len();
                self.thread.func_table.name.push(name);
                self.thread.func_table.file_name.push(None);
                self.thread.func_table.is_js.push(false);
                self.thread.frame_table.func.push(func);
                self.thread.frame_table.category.push(None);
                self.thread.frame_table.line.push(None);
                self.funcs.insert(name, func);
                func
            }
        };
        // Frames and funcs are allocated together, so they share indexes.
        func
    }

    /// Intern a root-first stack of function names.
    pub fn stack(&mut self, frames: &[&str]) -> Option<IndexIntoStackTable> {
        let mut prefix = None;
        for name in frames {
            let frame = self.frame_for(name);
            let stack = match self.stacks.get(&(prefix, frame)) {
                Some(&stack) => stack,
                None => {
                    let stack = self.thread.stack_table.push(prefix, frame, 0);
                    self.stacks.insert((prefix, frame), stack);
                    stack
                }
            };
            prefix = Some(stack);
        }
        prefix
    }

    pub fn sample(self, time: f64, frames: &[&str]) -> Self {
        self.weighted_sample(time, frames, 1.0)
    }

    pub fn weighted_sample(mut self, time: f64, frames: &[&str], weight: f64) -> Self {
        let stack = self.stack(frames);
        let samples = &mut self.thread.samples;
        if weight != 1.0 && samples.weight.is_none() {
            samples.weight = Some(vec![1.0; samples.len()]);
        }
        samples.time.push(time);
        samples.stack.push(stack);
        if let Some(weights) = samples.weight.as_mut() {
            weights.push(weight);
        }
        self
    }

    pub fn marker(
        mut self,
        name: &str,
        start: Option<f64>,
        end: Option<f64>,
        data: Option<MarkerPayload>,
    ) -> Self {
        let name = self.intern(name);
        self.thread.markers.push(name, start, end, 0, data);
        self
    }

    pub fn build(self) -> Thread {
        self.thread
    }
}
