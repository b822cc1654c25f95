use serde::{Deserialize, Serialize};

use super::markers::RawMarkerTable;

pub type ThreadIndex = usize;
pub type IndexIntoStackTable = usize;
pub type IndexIntoFrameTable = usize;
pub type IndexIntoFuncTable = usize;
pub type IndexIntoStringTable = usize;
pub type Pid = String;
pub type Tid = u64;

/// Sample columns. `stack[i] == None` is a sample with an empty stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplesTable {
    pub time: Vec<f64>,
    pub stack: Vec<Option<IndexIntoStackTable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsiveness: Option<Vec<Option<f64>>>,
    /// Per-sample weight. Absent means every sample weighs 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Vec<f64>>,
}

impl SamplesTable {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn weight_at(&self, sample: usize) -> f64 {
        self.weight
            .as_ref()
            .and_then(|weights| weights.get(sample).copied())
            .unwrap_or(1.0)
    }

    /// Copy the rows for which `keep` returns true, preserving order and
    /// every optional column.
    pub fn filtered(&self, mut keep: impl FnMut(usize) -> bool) -> SamplesTable {
        let rows: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        SamplesTable {
            time: rows.iter().map(|&i| self.time[i]).collect(),
            stack: rows.iter().map(|&i| self.stack[i]).collect(),
            responsiveness: self
                .responsiveness
                .as_ref()
                .map(|column| rows.iter().map(|&i| column.get(i).copied().flatten()).collect()),
            weight: self
                .weight
                .as_ref()
                .map(|column| rows.iter().map(|&i| column.get(i).copied().unwrap_or(1.0)).collect()),
        }
    }
}

/// The raw stack forest. Stacks are topologically ordered: a prefix always
/// has a smaller index than the stacks that point at it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTable {
    pub prefix: Vec<Option<IndexIntoStackTable>>,
    pub frame: Vec<IndexIntoFrameTable>,
    pub category: Vec<usize>,
    /// Derived from `prefix`; rebuilt by [`StackTable::recompute_depth`]
    /// after loading.
    #[serde(default, skip_serializing)]
    pub depth: Vec<u32>,
}

impl StackTable {
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Append a stack, computing its depth from its prefix.
    pub fn push(
        &mut self,
        prefix: Option<IndexIntoStackTable>,
        frame: IndexIntoFrameTable,
        category: usize,
    ) -> IndexIntoStackTable {
        let depth = prefix
            .and_then(|p| self.depth.get(p))
            .map_or(0, |parent_depth| parent_depth + 1);
        let index = self.frame.len();
        self.prefix.push(prefix);
        self.frame.push(frame);
        self.category.push(category);
        self.depth.push(depth);
        index
    }

    /// Rebuild the `depth` column in one forward pass. Returns the first
    /// stack whose prefix does not point backwards.
    pub fn recompute_depth(&mut self) -> Result<(), IndexIntoStackTable> {
        let mut depth = Vec::with_capacity(self.prefix.len());
        for (stack_index, prefix) in self.prefix.iter().enumerate() {
            match *prefix {
                None => depth.push(0),
                Some(p) if p < stack_index => depth.push(depth[p] + 1),
                Some(_) => return Err(stack_index),
            }
        }
        self.depth = depth;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTable {
    pub func: Vec<IndexIntoFuncTable>,
    pub category: Vec<Option<usize>>,
    pub line: Vec<Option<u32>>,
}

impl FrameTable {
    pub fn len(&self) -> usize {
        self.func.len()
    }

    pub fn is_empty(&self) -> bool {
        self.func.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuncTable {
    pub name: Vec<IndexIntoStringTable>,
    pub file_name: Vec<Option<IndexIntoStringTable>>,
    #[serde(rename = "isJS")]
    pub is_js: Vec<bool>,
}

impl FuncTable {
    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub name: String,
    pub process_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    /// The site a content process was isolated for. Dropped with URLs.
    #[serde(default, rename = "eTLD+1", skip_serializing_if = "Option::is_none")]
    pub etld_plus_1: Option<String>,
    pub pid: Pid,
    pub tid: Tid,
    #[serde(default)]
    pub is_main_thread: bool,
    pub samples: SamplesTable,
    pub stack_table: StackTable,
    pub frame_table: FrameTable,
    pub func_table: FuncTable,
    #[serde(default)]
    pub markers: RawMarkerTable,
    pub string_table: Vec<String>,
}

impl Thread {
    pub fn string(&self, index: IndexIntoStringTable) -> Option<&str> {
        self.string_table.get(index).map(String::as_str)
    }

    pub fn func_name(&self, func: IndexIntoFuncTable) -> Option<&str> {
        self.string(*self.func_table.name.get(func)?)
    }
}
