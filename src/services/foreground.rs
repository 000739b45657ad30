use crate::instances::types::InstanceRecord;
use crate::traits::ServiceManager;

/// No init system: instances are started by hand and nothing is installed
pub struct ForegroundManager;

impl ServiceManager for ForegroundManager {
    fn backend_name(&self) -> &'static str {
        "foreground"
    }

    fn unit_name(&self, _id: &str) -> Option<String> {
        None
    }

    fn unit_exists(&self, _id: &str) -> bool {
        false
    }

    fn create_unit(&self, record: &InstanceRecord) -> bool {
        tracing::debug!(id = %record.id, "foreground mode, no unit created");
        true
    }

    fn remove_unit(&self, _id: &str) -> bool {
        true
    }
}
