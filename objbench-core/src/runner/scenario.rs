use crate::size::size_label;

/// Key shapes exercised by the edge-case scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum EdgeCase {
    EmptyObject,
    LongKey256,
    DeepNested,
}

impl EdgeCase {
    pub fn object_size(self) -> u64 {
        match self {
            Self::EmptyObject => 0,
            Self::LongKey256 => 100,
            Self::DeepNested => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Write,
    Read,
    Stat,
    List { objects: usize },
    Delete,
    ParallelWrite,
    ParallelRead,
    RangeRead { offset: u64, length: u64 },
    Copy,
    Mixed { read_percent: u64 },
    Multipart { part_size: u64, parts: u32 },
    EdgeCase(EdgeCase),
    FileCount { files: u64 },
}

/// One named benchmark. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub label: String,
    pub kind: ScenarioKind,
    pub object_size: Option<u64>,
    pub concurrency: Option<usize>,
}

impl Scenario {
    pub fn write(size: u64) -> Self {
        Self::sized(format!("Write/{}", size_label(size)), ScenarioKind::Write, size)
    }

    pub fn read(size: u64) -> Self {
        Self::sized(format!("Read/{}", size_label(size)), ScenarioKind::Read, size)
    }

    pub fn stat() -> Self {
        Self::plain("Stat", ScenarioKind::Stat)
    }

    pub fn list(objects: usize) -> Self {
        Self::plain(format!("List/{objects}"), ScenarioKind::List { objects })
    }

    pub fn delete() -> Self {
        Self::plain("Delete", ScenarioKind::Delete)
    }

    pub fn parallel_write(size: u64, concurrency: usize) -> Self {
        Self {
            label: format!("ParallelWrite/{}/C{concurrency}", size_label(size)),
            kind: ScenarioKind::ParallelWrite,
            object_size: Some(size),
            concurrency: Some(concurrency),
        }
    }

    pub fn parallel_read(size: u64, concurrency: usize) -> Self {
        Self {
            label: format!("ParallelRead/{}/C{concurrency}", size_label(size)),
            kind: ScenarioKind::ParallelRead,
            object_size: Some(size),
            concurrency: Some(concurrency),
        }
    }

    pub fn range_read(name: &str, offset: u64, length: u64) -> Self {
        Self::sized(
            format!("RangeRead/{name}_{}", size_label(length)),
            ScenarioKind::RangeRead { offset, length },
            length,
        )
    }

    pub fn copy(size: u64) -> Self {
        Self::sized(format!("Copy/{}", size_label(size)), ScenarioKind::Copy, size)
    }

    pub fn mixed(name: &str, read_percent: u64, size: u64, concurrency: usize) -> Self {
        Self {
            label: format!("MixedWorkload/{name}"),
            kind: ScenarioKind::Mixed { read_percent },
            object_size: Some(size),
            concurrency: Some(concurrency),
        }
    }

    pub fn multipart(part_size: u64, parts: u32) -> Self {
        let total = part_size.saturating_mul(u64::from(parts));
        Self::sized(
            format!("Multipart/{}_{parts}Parts", size_label(total)),
            ScenarioKind::Multipart { part_size, parts },
            total,
        )
    }

    pub fn edge_case(case: EdgeCase) -> Self {
        Self::sized(
            format!("EdgeCase/{case}"),
            ScenarioKind::EdgeCase(case),
            case.object_size(),
        )
    }

    pub fn file_count(files: u64) -> Self {
        Self::plain(format!("FileCount/{files}"), ScenarioKind::FileCount { files })
    }

    /// Labels of the snapshots this scenario produces.
    pub fn result_labels(&self) -> Vec<String> {
        match self.kind {
            ScenarioKind::FileCount { files } => ["Write", "List", "Delete"]
                .iter()
                .map(|phase| format!("FileCount/{phase}/{files}"))
                .collect(),
            _ => vec![self.label.clone()],
        }
    }

    pub fn size(&self) -> u64 {
        self.object_size.unwrap_or(0)
    }

    fn plain(label: impl Into<String>, kind: ScenarioKind) -> Self {
        Self {
            label: label.into(),
            kind,
            object_size: None,
            concurrency: None,
        }
    }

    fn sized(label: String, kind: ScenarioKind, size: u64) -> Self {
        Self {
            label,
            kind,
            object_size: Some(size),
            concurrency: None,
        }
    }
}
