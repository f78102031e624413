use std::fmt;

/// States of the table pipeline, in the only order they can be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportStage {
    Start,
    /// Staging area acquired and descriptor produced
    Staged,
    /// Leftover staged table from an aborted run removed
    TempDropped,
    TempCreated,
    Populated,
    /// Previous public table dropped (inside the transaction)
    TargetDropped,
    Indexed,
    Analyzed,
    /// Staged table renamed to the public name
    Published,
    Committed,
}

impl ImportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::Start => "start",
            ImportStage::Staged => "staged",
            ImportStage::TempDropped => "temp_dropped",
            ImportStage::TempCreated => "temp_created",
            ImportStage::Populated => "populated",
            ImportStage::TargetDropped => "target_dropped",
            ImportStage::Indexed => "indexed",
            ImportStage::Analyzed => "analyzed",
            ImportStage::Published => "published",
            ImportStage::Committed => "committed",
        }
    }

    /// The state reached by the next successful transition
    pub fn next(self) -> Option<ImportStage> {
        match self {
            ImportStage::Start => Some(ImportStage::Staged),
            ImportStage::Staged => Some(ImportStage::TempDropped),
            ImportStage::TempDropped => Some(ImportStage::TempCreated),
            ImportStage::TempCreated => Some(ImportStage::Populated),
            ImportStage::Populated => Some(ImportStage::TargetDropped),
            ImportStage::TargetDropped => Some(ImportStage::Indexed),
            ImportStage::Indexed => Some(ImportStage::Analyzed),
            ImportStage::Analyzed => Some(ImportStage::Published),
            ImportStage::Published => Some(ImportStage::Committed),
            ImportStage::Committed => None,
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
