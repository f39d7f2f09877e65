use flowmodel_storage::ModelKind;
use std::fmt;
use std::path::{Path, PathBuf};

/// One model-capture query execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// Position in the run, also the stage's progress slice
    pub index: u32,
    pub kind: ModelKind,
    pub query_file: &'static str,
}

/// Stages in execution order: summary, sink, source, neutral
pub const STAGES: [Stage; 4] = [
    Stage {
        index: 0,
        kind: ModelKind::Summary,
        query_file: "CaptureSummaryModels.ql",
    },
    Stage {
        index: 1,
        kind: ModelKind::Sink,
        query_file: "CaptureSinkModels.ql",
    },
    Stage {
        index: 2,
        kind: ModelKind::Source,
        query_file: "CaptureSourceModels.ql",
    },
    Stage {
        index: 3,
        kind: ModelKind::Neutral,
        query_file: "CaptureNeutralModels.ql",
    },
];

/// `<ql_dir>/<language>/ql/src/utils/modelgenerator/<query_name>`
pub fn model_generator_query(ql_dir: &Path, language: &str, query_name: &str) -> PathBuf {
    ql_dir
        .join(language)
        .join("ql/src/utils/modelgenerator")
        .join(query_name)
}

impl Stage {
    pub fn for_kind(kind: ModelKind) -> Stage {
        STAGES[kind as usize]
    }

    pub fn query_path(&self, ql_dir: &Path, language: &str) -> PathBuf {
        model_generator_query(ql_dir, language, self.query_file)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.query_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_kind_order() {
        for (i, stage) in STAGES.iter().enumerate() {
            assert_eq!(stage.index as usize, i);
            assert_eq!(stage.kind, ModelKind::ALL[i]);
            assert_eq!(Stage::for_kind(stage.kind), *stage);
        }
    }

    #[test]
    fn test_query_path() {
        let path = Stage::for_kind(ModelKind::Sink).query_path(Path::new("/src/ql"), "java");
        assert_eq!(
            path,
            PathBuf::from("/src/ql/java/ql/src/utils/modelgenerator/CaptureSinkModels.ql")
        );
    }
}
