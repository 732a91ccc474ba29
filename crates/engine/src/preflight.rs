#![forbid(unsafe_code)]

use crate::error::BatchError;
use crate::journal::{RollbackJournal, RollbackRecord};
use std::fs::File;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPaths {
    pub input: PathBuf,
    pub rollback: PathBuf,
}

impl BatchPaths {
    pub fn new(input: impl Into<PathBuf>, rollback: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            rollback: rollback.into(),
        }
    }

    pub fn check_input(&self) -> Result<(), BatchError> {
        if !self.input.is_file() {
            return Err(BatchError::InputMissing(self.input.clone()));
        }
        Ok(())
    }

    /// File checks made before any row is read. The input must be an existing file;
    /// only then is the rollback file created and given its header.
    pub fn preflight<R: RollbackRecord>(&self) -> Result<RollbackJournal<File, R>, BatchError> {
        self.check_input()?;
        RollbackJournal::create(&self.rollback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MetadataRollback;

    #[test]
    fn missing_input_creates_no_rollback_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = BatchPaths::new(dir.path().join("absent.csv"), dir.path().join("rollback.csv"));
        let err = paths.preflight::<MetadataRollback>().err().expect("missing input");
        assert!(matches!(err, BatchError::InputMissing(_)));
        assert!(!paths.rollback.exists());
    }

    #[test]
    fn unwritable_rollback_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("in.csv");
        std::fs::write(&input, "metadata_value_id,text_value\n").expect("write input");
        let paths = BatchPaths::new(input, dir.path().join("no-such-dir").join("rollback.csv"));
        let err = paths.preflight::<MetadataRollback>().err().expect("unwritable");
        assert!(matches!(err, BatchError::RollbackUnwritable { .. }));
    }

    #[test]
    fn rollback_file_gets_its_header_up_front() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("in.csv");
        std::fs::write(&input, "metadata_value_id,text_value\n").expect("write input");
        let paths = BatchPaths::new(input, dir.path().join("rollback.csv"));
        let journal = paths.preflight::<MetadataRollback>().expect("preflight");
        drop(journal);
        let written = std::fs::read_to_string(&paths.rollback).expect("read rollback");
        assert_eq!(written, "metadata_value_id,text_value,item_id,metadata_field_id\n");
    }

    #[test]
    fn directory_is_not_an_input_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = BatchPaths::new(dir.path(), dir.path().join("rollback.csv"));
        assert!(matches!(paths.check_input(), Err(BatchError::InputMissing(_))));
        std::fs::write(dir.path().join("in.csv"), "").expect("write input");
        assert!(BatchPaths::new(dir.path().join("in.csv"), dir.path().join("r.csv"))
            .check_input()
            .is_ok());
    }
}
