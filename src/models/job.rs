//! Views over job documents.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::store::as_uid;

/// A reference to a file record, as embedded in a job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub uid: Option<JsonValue>,
}

/// The file references of a job: its outputs and log files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFileRefs {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub output: Option<Vec<Option<FileRef>>>,
    #[serde(default)]
    pub stdout: Option<FileRef>,
    #[serde(default)]
    pub stderr: Option<FileRef>,
}

impl JobFileRefs {
    /// Distinct uids of every file the job references, in document order.
    pub fn file_uids(&self) -> Vec<i64> {
        let outputs = self.output.iter().flatten().flatten();
        let logs = self.stdout.iter().chain(self.stderr.iter());

        let mut uids = Vec::new();
        for file in outputs.chain(logs) {
            if let Some(uid) = file.uid.as_ref().and_then(as_uid) {
                if !uids.contains(&uid) {
                    uids.push(uid);
                }
            }
        }
        uids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_uids_collects_outputs_and_logs() {
        let job: JobFileRefs = serde_json::from_value(json!({
            "id": "JOB1",
            "output": [{"uid": 11, "path": "a.vcf"}, null, {"uid": 12}, {"name": "no uid"}],
            "stdout": {"uid": 13},
            "stderr": {"uid": 11}
        }))
        .unwrap();

        assert_eq!(job.id.as_deref(), Some("JOB1"));
        assert_eq!(job.file_uids(), vec![11, 12, 13]);
    }

    #[test]
    fn test_file_uids_tolerates_missing_and_null_refs() {
        let job: JobFileRefs =
            serde_json::from_value(json!({"id": "JOB2", "output": null, "stdout": null})).unwrap();

        assert!(job.file_uids().is_empty());
    }
}
