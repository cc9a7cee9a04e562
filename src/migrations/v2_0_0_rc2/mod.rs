//! Steps of the `v2.0.0-rc2` catalog upgrade.
//!
//! Null-normalization of `file.jobId` comes before its backfill, and the
//! member id backfill comes before references are trimmed.

mod m001_file_job_id_defaults;
mod m002_file_job_id_backfill;
mod m003_clinical_member_ids;
mod m004_sample_individual_uid;
mod m005_clinical_reference_trim;

pub use m001_file_job_id_defaults::M001FileJobIdDefaults;
pub use m002_file_job_id_backfill::M002FileJobIdBackfill;
pub use m003_clinical_member_ids::M003ClinicalMemberIds;
pub use m004_sample_individual_uid::M004SampleIndividualUid;
pub use m005_clinical_reference_trim::M005ClinicalReferenceTrim;

use crate::migrations::traits::Register;

/// Create the register of `v2.0.0-rc2` steps.
pub fn create_register() -> Register {
    Register::new()
        .register(M001FileJobIdDefaults)
        .register(M002FileJobIdBackfill)
        .register(M003ClinicalMemberIds)
        .register(M004SampleIndividualUid)
        .register(M005ClinicalReferenceTrim)
}
