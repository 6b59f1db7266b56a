//! Subcommand handlers
//!
//! Every handler receives a context that has already been hydrated, exactly
//! like a page rendered behind the application's hydration gate.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tracing::{debug, info};

use careportal_session::backend::{Credentials, HttpBackend, PortalBackend};
use careportal_session::meeting::{JoinRequest, MeetingHandoff, MeetingLink, MeetingProvider};
use careportal_session::routing::{GuardDecision, Navigator, RouteRequirement};
use careportal_session::theme::{PortalTheme, ThemeAdapter};
use careportal_session::{Identity, PortalContext, Role, TokenInspector};

use crate::mint::{mint_identity, MintInput};

/// Navigator for a terminal: prints where the application would go
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "Navigate");
        println!("-> {}", path);
    }
}

pub fn inspect(token: &str, within: Option<u32>) -> anyhow::Result<()> {
    let inspector = TokenInspector::new();

    match inspector.decode_claims(token) {
        Ok(claims) => {
            println!("structure: ok");
            match claims.expiration_millis() {
                Some(millis) => {
                    let at = Utc
                        .timestamp_millis_opt(millis)
                        .single()
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| millis.to_string());
                    println!("expires:   {}", at);
                }
                None => println!("expires:   never"),
            }
        }
        Err(e) => println!("structure: {}", e),
    }

    let probe = Identity::new(Role::Unknown, "", "", token);
    println!("valid:     {}", inspector.is_valid(Some(&probe)));

    if let Some(minutes) = within {
        println!(
            "expires within {} min: {}",
            minutes,
            inspector.expires_within(token, minutes)
        );
    }
    Ok(())
}

pub fn status(ctx: &PortalContext) -> anyhow::Result<()> {
    let snapshot = ctx.state().snapshot();
    println!("hydrated:  {}", snapshot.hydrated);

    let Some(identity) = snapshot.identity else {
        println!("session:   none");
        return Ok(());
    };

    print_identity(&identity);
    let theme = PortalTheme::default().render_theme_provider(Some(identity.role));
    println!("theme:     {:?} {}", theme.mode, theme.primary);

    let inspector = TokenInspector::new();
    match inspector.time_remaining_at(&identity.token, Utc::now()) {
        Some(seconds) if seconds <= 0 => println!("remaining: expired"),
        Some(seconds) => {
            println!("remaining: {}m {}s", seconds / 60, seconds % 60);
            let warn_at = ctx.config().expiry_warning_minutes;
            if inspector.expires_within(&identity.token, warn_at) {
                println!("warning:   session expires within {} minutes", warn_at);
            }
        }
        None => println!("remaining: does not expire"),
    }
    Ok(())
}

pub fn import(ctx: &PortalContext, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let identity: Identity = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a complete identity record", file.display()))?;

    ctx.actions().login(identity.clone())?;
    warn_if_unavailable(ctx);
    println!("imported session for {} ({})", identity.name, identity.role);
    Ok(())
}

pub async fn login(
    ctx: &PortalContext,
    backend: &dyn PortalBackend,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let credentials = Credentials {
        email: email.to_string(),
        password: password.to_string(),
    };

    let identity = ctx.actions().login_with(backend, &credentials).await?;
    warn_if_unavailable(ctx);
    println!("logged in as {} ({})", identity.name, identity.role);
    ConsoleNavigator.navigate(ctx.guard().routes().home_for(identity.role));
    Ok(())
}

pub fn logout(ctx: &PortalContext) -> anyhow::Result<()> {
    if !ctx.state().is_authenticated() {
        println!("no active session");
    }
    ctx.actions().logout();
    Ok(())
}

pub fn guard(ctx: &PortalContext, path: &str, roles: Vec<Role>, public: bool) -> anyhow::Result<()> {
    let requirement = if public {
        RouteRequirement::public()
    } else if roles.is_empty() {
        RouteRequirement::authenticated()
    } else {
        RouteRequirement::roles(roles)
    };

    match ctx.enter(&requirement) {
        GuardDecision::Render => println!("render {}", path),
        GuardDecision::Redirect { to, reason, .. } => {
            println!("redirect {} -> {} ({:?})", path, to, reason)
        }
        GuardDecision::Loading => println!("loading"),
    }
    Ok(())
}

pub struct MintArgs {
    pub input: MintInput,
    pub secret: String,
    pub save: bool,
}

pub fn mint(ctx: &PortalContext, args: MintArgs) -> anyhow::Result<()> {
    let identity = mint_identity(&args.input, &args.secret)?;
    println!("{}", identity.token);

    if args.save {
        ctx.actions().login(identity)?;
        warn_if_unavailable(ctx);
    }
    Ok(())
}

/// Meeting SDK stand-in for a terminal: prints what the SDK would be handed
pub struct ConsoleMeetingProvider;

#[async_trait]
impl MeetingProvider for ConsoleMeetingProvider {
    async fn initialize(&self) -> careportal_session::Result<()> {
        debug!("Meeting SDK initialized");
        Ok(())
    }

    async fn join(&self, request: &JoinRequest) -> careportal_session::Result<()> {
        println!("join as:   {}", request.display_name);
        if let Some(signature) = &request.signature {
            println!("signature: {}", signature);
        }
        Ok(())
    }

    async fn leave(&self) -> careportal_session::Result<()> {
        debug!("Meeting SDK left");
        Ok(())
    }
}

pub async fn meeting(
    ctx: &PortalContext,
    backend: Arc<dyn PortalBackend>,
    url: &str,
    join: bool,
) -> anyhow::Result<()> {
    let link = MeetingLink::parse(url)?;

    match &link {
        MeetingLink::Zoom {
            meeting_number,
            password,
        } => {
            println!("provider:  zoom");
            println!("meeting:   {}", meeting_number);
            if password.is_some() {
                println!("password:  (present)");
            }
        }
        MeetingLink::Jitsi { domain, room } => {
            println!("provider:  jitsi");
            println!("domain:    {}", domain);
            println!("room:      {}", room);
        }
    }

    if !join {
        return Ok(());
    }
    let Some(identity) = ctx.state().snapshot().identity else {
        bail!("joining requires an active session; log in first");
    };

    let mut handoff = MeetingHandoff::new(Arc::new(ConsoleMeetingProvider), backend);
    handoff.initialize().await?;
    handoff.join(link, &identity).await?;
    handoff.leave().await?;
    println!("handoff:   {} ({})", handoff.id(), handoff.phase());
    Ok(())
}

pub fn backend(api_url: &str) -> Arc<dyn PortalBackend> {
    Arc::new(HttpBackend::new(api_url))
}

fn print_identity(identity: &Identity) {
    println!("user:      {} ({})", identity.name, identity.user_id);
    println!("role:      {}", identity.role);
    if let Some(email) = &identity.email {
        println!("email:     {}", email);
    }
}

fn warn_if_unavailable(ctx: &PortalContext) {
    if !ctx.store().is_available() {
        println!("note: storage disabled, session lasts for this invocation only");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careportal_session::routing::MemoryNavigator;
    use careportal_session::storage::MemoryStorage;
    use careportal_session::PortalConfig;
    use tempfile::TempDir;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters-long";

    fn context() -> PortalContext {
        let ctx = PortalContext::new(
            PortalConfig::default(),
            Some(Arc::new(MemoryStorage::new())),
            Arc::new(MemoryNavigator::new()),
        )
        .unwrap();
        ctx.start();
        ctx
    }

    fn live_identity() -> Identity {
        mint_identity(
            &MintInput {
                role: Role::Patient,
                user_id: "p-1".into(),
                name: "Pat".into(),
                ttl_seconds: Some(3600),
            },
            SECRET,
        )
        .unwrap()
    }

    #[test]
    fn test_import_adopts_identity_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("identity.json");
        let identity = live_identity();
        std::fs::write(&file, serde_json::to_string(&identity).unwrap()).unwrap();

        let ctx = context();
        import(&ctx, &file).unwrap();

        assert_eq!(ctx.state().snapshot().identity, Some(identity.clone()));
        assert_eq!(ctx.store().load(), Some(identity));
    }

    #[test]
    fn test_import_rejects_partial_record() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("identity.json");
        std::fs::write(&file, r#"{"role":"patient","token":"a.b.c"}"#).unwrap();

        let ctx = context();
        assert!(import(&ctx, &file).is_err());
        assert!(!ctx.state().is_authenticated());
    }

    #[test]
    fn test_mint_with_save_starts_session() {
        let ctx = context();
        mint(
            &ctx,
            MintArgs {
                input: MintInput {
                    role: Role::Doctor,
                    user_id: "d-1".into(),
                    name: "Dr. X".into(),
                    ttl_seconds: Some(600),
                },
                secret: SECRET.into(),
                save: true,
            },
        )
        .unwrap();

        assert_eq!(ctx.state().role(), Some(Role::Doctor));
    }

    #[test]
    fn test_mint_expired_with_save_is_refused() {
        let ctx = context();
        let result = mint(
            &ctx,
            MintArgs {
                input: MintInput {
                    role: Role::Doctor,
                    user_id: "d-1".into(),
                    name: "Dr. X".into(),
                    ttl_seconds: Some(-60),
                },
                secret: SECRET.into(),
                save: true,
            },
        );

        assert!(result.is_err());
        assert!(ctx.store().load().is_none());
    }

    #[test]
    fn test_status_reports_session() {
        let ctx = context();
        status(&ctx).unwrap();

        ctx.actions().login(live_identity()).unwrap();
        status(&ctx).unwrap();
        assert_eq!(ctx.state().role(), Some(Role::Patient));
    }

    #[tokio::test]
    async fn test_meeting_join_requires_session() {
        let ctx = context();
        let result = meeting(
            &ctx,
            backend("http://127.0.0.1:9/api"),
            "https://zoom.us/j/123456789?pwd=abc",
            true,
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_jitsi_join_runs_handoff_without_backend() {
        let ctx = context();
        ctx.actions().login(live_identity()).unwrap();

        // The backend address is unreachable: a Jitsi join must never call it
        meeting(
            &ctx,
            backend("http://127.0.0.1:9/api"),
            "https://meet.jit.si/consult-42",
            true,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_zoom_join_fails_when_signature_unavailable() {
        let ctx = context();
        ctx.actions().login(live_identity()).unwrap();

        let result = meeting(
            &ctx,
            backend("http://127.0.0.1:9/api"),
            "https://zoom.us/j/123456789",
            true,
        )
        .await;

        assert!(result.is_err());
    }
}
