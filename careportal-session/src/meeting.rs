//! Video consultation hand-off
//!
//! Consultations run in an embeddable meeting client (Zoom or Jitsi). The
//! portal only parses the meeting link, asks the backend for a join
//! signature when the provider needs one, and drives the SDK through the
//! [`MeetingProvider`] adapter.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::backend::{PortalBackend, SignatureRequest};
use crate::error::{PortalError, Result};
use crate::identity::Identity;

/// A parsed meeting URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingLink {
    Zoom {
        meeting_number: String,
        password: Option<String>,
    },
    Jitsi {
        domain: String,
        room: String,
    },
}

impl MeetingLink {
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PortalError::Meeting(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| PortalError::Meeting("meeting URL has no host".into()))?
            .to_ascii_lowercase();
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        if host == "zoom.us" || host.ends_with(".zoom.us") {
            let meeting_number = zoom_meeting_number(&segments).ok_or_else(|| {
                PortalError::Meeting(format!("no meeting number in '{}'", input))
            })?;
            let password = url
                .query_pairs()
                .find(|(key, _)| key == "pwd")
                .map(|(_, value)| value.into_owned());
            return Ok(MeetingLink::Zoom {
                meeting_number,
                password,
            });
        }

        let room = segments
            .last()
            .ok_or_else(|| PortalError::Meeting(format!("no room name in '{}'", input)))?;
        Ok(MeetingLink::Jitsi {
            domain: host,
            room: (*room).to_string(),
        })
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            MeetingLink::Zoom { .. } => "zoom",
            MeetingLink::Jitsi { .. } => "jitsi",
        }
    }

    /// Whether joining needs a backend-issued signature
    pub fn requires_signature(&self) -> bool {
        matches!(self, MeetingLink::Zoom { .. })
    }
}

/// `/j/<n>`, `/s/<n>`, `/wc/<n>/join` and `/wc/join/<n>`
fn zoom_meeting_number(segments: &[&str]) -> Option<String> {
    let is_number = |s: &&str| s.len() >= 9 && s.chars().all(|c| c.is_ascii_digit());

    match segments.first() {
        Some(&"j") | Some(&"s") | Some(&"wc") => {
            segments[1..].iter().copied().find(is_number).map(|s| s.to_string())
        }
        _ => None,
    }
}

/// Everything the SDK needs to join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub link: MeetingLink,
    pub display_name: String,
    pub email: Option<String>,
    pub signature: Option<String>,
}

/// Adapter over an embeddable meeting SDK
#[async_trait]
pub trait MeetingProvider: Send + Sync {
    async fn initialize(&self) -> Result<()>;
    async fn join(&self, request: &JoinRequest) -> Result<()>;
    async fn leave(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingPhase {
    Idle,
    Initialized,
    Joined,
    Left,
}

impl fmt::Display for MeetingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingPhase::Idle => write!(f, "idle"),
            MeetingPhase::Initialized => write!(f, "initialized"),
            MeetingPhase::Joined => write!(f, "joined"),
            MeetingPhase::Left => write!(f, "left"),
        }
    }
}

/// One consultation's trip through the meeting SDK
pub struct MeetingHandoff {
    id: Uuid,
    provider: Arc<dyn MeetingProvider>,
    backend: Arc<dyn PortalBackend>,
    phase: MeetingPhase,
}

impl MeetingHandoff {
    pub fn new(provider: Arc<dyn MeetingProvider>, backend: Arc<dyn PortalBackend>) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            backend,
            phase: MeetingPhase::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> MeetingPhase {
        self.phase
    }

    pub async fn initialize(&mut self) -> Result<()> {
        self.expect_phase(MeetingPhase::Idle, "initialize")?;
        self.provider.initialize().await?;
        self.phase = MeetingPhase::Initialized;
        Ok(())
    }

    /// Request a signature if needed, then join as `identity`
    pub async fn join(&mut self, link: MeetingLink, identity: &Identity) -> Result<JoinRequest> {
        self.expect_phase(MeetingPhase::Initialized, "join")?;

        let signature = match &link {
            MeetingLink::Zoom { meeting_number, .. } => {
                let request = SignatureRequest {
                    meeting_number: meeting_number.clone(),
                    role: u8::from(identity.role.hosts_meetings()),
                };
                Some(
                    self.backend
                        .meeting_signature(&identity.token, &request)
                        .await?,
                )
            }
            MeetingLink::Jitsi { .. } => None,
        };

        let request = JoinRequest {
            link,
            display_name: identity.name.clone(),
            email: identity.email.clone(),
            signature,
        };
        self.provider.join(&request).await?;
        self.phase = MeetingPhase::Joined;

        info!(
            handoff = %self.id,
            provider = request.link.provider_name(),
            user_id = %identity.user_id,
            "Joined meeting"
        );
        Ok(request)
    }

    pub async fn leave(&mut self) -> Result<()> {
        self.expect_phase(MeetingPhase::Joined, "leave")?;
        if let Err(e) = self.provider.leave().await {
            warn!(handoff = %self.id, error = %e, "Meeting provider failed to leave cleanly");
            return Err(e);
        }
        self.phase = MeetingPhase::Left;
        Ok(())
    }

    fn expect_phase(&self, expected: MeetingPhase, action: &str) -> Result<()> {
        if self.phase != expected {
            return Err(PortalError::Meeting(format!(
                "cannot {} while {}",
                action, self.phase
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::backend::Credentials;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MeetingProvider for RecordingProvider {
        async fn initialize(&self) -> Result<()> {
            self.calls.lock().unwrap().push("initialize".into());
            Ok(())
        }

        async fn join(&self, request: &JoinRequest) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("join:{}", request.link.provider_name()));
            Ok(())
        }

        async fn leave(&self) -> Result<()> {
            self.calls.lock().unwrap().push("leave".into());
            Ok(())
        }
    }

    #[derive(Default)]
    struct SigningBackend {
        requests: Mutex<Vec<SignatureRequest>>,
    }

    #[async_trait]
    impl PortalBackend for SigningBackend {
        async fn login(&self, _credentials: &Credentials) -> Result<Identity> {
            Err(PortalError::Backend("not used".into()))
        }

        async fn meeting_signature(&self, _token: &str, request: &SignatureRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(format!("sig-{}", request.meeting_number))
        }
    }

    #[test]
    fn test_parse_zoom_links() {
        let link = MeetingLink::parse("https://us05web.zoom.us/j/81234567890?pwd=abc123").unwrap();
        assert_eq!(
            link,
            MeetingLink::Zoom {
                meeting_number: "81234567890".into(),
                password: Some("abc123".into()),
            }
        );

        let link = MeetingLink::parse("https://zoom.us/wc/912345678/join").unwrap();
        assert!(matches!(link, MeetingLink::Zoom { ref meeting_number, password: None } if meeting_number == "912345678"));

        let link = MeetingLink::parse("https://zoom.us/wc/join/912345678").unwrap();
        assert!(link.requires_signature());
    }

    #[test]
    fn test_zoom_link_without_number_rejected() {
        assert!(MeetingLink::parse("https://zoom.us/j/").is_err());
        assert!(MeetingLink::parse("https://zoom.us/profile").is_err());
        assert!(MeetingLink::parse("https://zoom.us/j/12ab").is_err());
    }

    #[test]
    fn test_parse_jitsi_links() {
        let link = MeetingLink::parse("https://meet.jit.si/CarePortal-Consult-42").unwrap();
        assert_eq!(
            link,
            MeetingLink::Jitsi {
                domain: "meet.jit.si".into(),
                room: "CarePortal-Consult-42".into(),
            }
        );
        assert!(!link.requires_signature());
        assert!(MeetingLink::parse("https://meet.jit.si/").is_err());
    }

    #[test]
    fn test_parse_rejects_non_http() {
        assert!(MeetingLink::parse("ftp://zoom.us/j/123456789").is_err());
        assert!(MeetingLink::parse("not a url").is_err());
    }

    #[tokio::test]
    async fn test_zoom_handoff_signs_as_host_for_doctor() {
        let provider = Arc::new(RecordingProvider::default());
        let backend = Arc::new(SigningBackend::default());
        let mut handoff = MeetingHandoff::new(provider.clone(), backend.clone());
        let doctor = Identity::new(Role::Doctor, "Dr. X", "1", "h.p.s");

        handoff.initialize().await.unwrap();
        let link = MeetingLink::parse("https://zoom.us/j/123456789").unwrap();
        let request = handoff.join(link, &doctor).await.unwrap();
        handoff.leave().await.unwrap();

        assert_eq!(request.signature.as_deref(), Some("sig-123456789"));
        assert_eq!(backend.requests.lock().unwrap()[0].role, 1);
        assert_eq!(
            *provider.calls.lock().unwrap(),
            vec!["initialize", "join:zoom", "leave"]
        );
        assert_eq!(handoff.phase(), MeetingPhase::Left);
    }

    #[tokio::test]
    async fn test_patient_joins_as_attendee() {
        let backend = Arc::new(SigningBackend::default());
        let mut handoff = MeetingHandoff::new(Arc::new(RecordingProvider::default()), backend.clone());
        let patient = Identity::new(Role::Patient, "Pat", "p", "h.p.s");

        handoff.initialize().await.unwrap();
        handoff
            .join(MeetingLink::parse("https://zoom.us/j/123456789").unwrap(), &patient)
            .await
            .unwrap();
        assert_eq!(backend.requests.lock().unwrap()[0].role, 0);
    }

    #[tokio::test]
    async fn test_jitsi_handoff_skips_signature() {
        let backend = Arc::new(SigningBackend::default());
        let mut handoff = MeetingHandoff::new(Arc::new(RecordingProvider::default()), backend.clone());
        let patient = Identity::new(Role::Patient, "Pat", "p", "h.p.s").with_email("pat@example.com");

        handoff.initialize().await.unwrap();
        let request = handoff
            .join(MeetingLink::parse("https://meet.jit.si/room-1").unwrap(), &patient)
            .await
            .unwrap();

        assert_eq!(request.signature, None);
        assert_eq!(request.email.as_deref(), Some("pat@example.com"));
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_calls_rejected() {
        let mut handoff = MeetingHandoff::new(
            Arc::new(RecordingProvider::default()),
            Arc::new(SigningBackend::default()),
        );
        let patient = Identity::new(Role::Patient, "Pat", "p", "h.p.s");
        let link = MeetingLink::parse("https://meet.jit.si/room-1").unwrap();

        assert!(handoff.join(link.clone(), &patient).await.is_err());
        assert!(handoff.leave().await.is_err());

        handoff.initialize().await.unwrap();
        assert!(handoff.initialize().await.is_err());
        assert_eq!(handoff.phase(), MeetingPhase::Initialized);
    }
}
