use rollcall_core::{AttendanceTracker, IdentityTable, Readiness};
use std::sync::Arc;
use tokio::sync::watch;
use zbus::interface;

pub const BUS_NAME: &str = "org.rollcall.Attendance1";
pub const OBJECT_PATH: &str = "/org/rollcall/Attendance1";

/// Read-only D-Bus view of the attendance session.
///
/// Bus name: org.rollcall.Attendance1
/// Object path: /org/rollcall/Attendance1
pub struct AttendanceService {
    tracker: Arc<AttendanceTracker>,
    identities: Arc<IdentityTable>,
    readiness: watch::Receiver<Readiness>,
    camera: Option<String>,
}

impl AttendanceService {
    pub fn new(
        tracker: Arc<AttendanceTracker>,
        identities: Arc<IdentityTable>,
        readiness: watch::Receiver<Readiness>,
        camera: Option<String>,
    ) -> Self {
        Self {
            tracker,
            identities,
            readiness,
            camera,
        }
    }

    fn status_json(&self) -> serde_json::Value {
        let readiness = *self.readiness.borrow();
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "state": readiness,
            "ready": readiness == Readiness::Ready,
            "camera": self.camera.as_deref().unwrap_or("unavailable"),
            "identities": self.identities.len(),
            "present": self.tracker.len(),
        })
    }
}

#[interface(name = "org.rollcall.Attendance1")]
impl AttendanceService {
    /// Session status: readiness, camera, identity and roster counts.
    async fn status(&self) -> zbus::fdo::Result<String> {
        Ok(self.status_json().to_string())
    }

    /// Attendance roster in admission order.
    async fn roster(&self) -> zbus::fdo::Result<String> {
        serde_json::to_string(&self.tracker.snapshot()).map_err(to_fdo)
    }

    /// The configured identity table.
    async fn identities(&self) -> zbus::fdo::Result<String> {
        serde_json::to_string(self.identities.as_ref()).map_err(to_fdo)
    }
}

fn to_fdo(err: serde_json::Error) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{Descriptor, Label, MatchResult};

    fn service(readiness: Readiness) -> AttendanceService {
        let identities = IdentityTable::from_toml(
            "[[identity]]\nname = \"John\"\nid = \"123\"\n\n[[identity]]\nname = \"Jane\"\nid = \"124\"\n",
        )
        .unwrap();
        let tracker = Arc::new(AttendanceTracker::new());
        tracker.admit(&MatchResult {
            descriptor: Descriptor::new(vec![0.0]),
            label: Label::Known("Jane".into()),
            distance: 0.1,
        });
        let (_tx, rx) = watch::channel(readiness);
        AttendanceService::new(tracker, Arc::new(identities), rx, Some("/dev/video0".into()))
    }

    #[test]
    fn test_status_json() {
        let status = service(Readiness::Ready).status_json();
        assert_eq!(status["state"], "ready");
        assert_eq!(status["ready"], true);
        assert_eq!(status["camera"], "/dev/video0");
        assert_eq!(status["identities"], 2);
        assert_eq!(status["present"], 1);
    }

    #[test]
    fn test_status_json_loading() {
        let status = service(Readiness::Loading).status_json();
        assert_eq!(status["state"], "loading");
        assert_eq!(status["ready"], false);
    }

    #[tokio::test]
    async fn test_roster_and_identities_json() {
        let svc = service(Readiness::Ready);

        let roster: serde_json::Value = serde_json::from_str(&svc.roster().await.unwrap()).unwrap();
        assert_eq!(roster.as_array().unwrap().len(), 1);
        assert_eq!(roster[0]["identity"], "Jane");

        let identities: serde_json::Value =
            serde_json::from_str(&svc.identities().await.unwrap()).unwrap();
        assert_eq!(identities[0]["name"], "John");
        assert_eq!(identities[1]["id"], "124");
    }
}
