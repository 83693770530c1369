/// Board invitation lifecycle
///
/// ```text
/// create_invitation ──> pending ──accept_invitation──> accepted
/// ```
///
/// There is no stored `expired` state; expiry is checked at acceptance time.
///
/// # Acceptance checks
///
/// In order:
///
/// 1. token digest unknown, or issued for another board: `NotFound`
/// 2. invitation already accepted: `AlreadyAccepted`
/// 3. `now > expires_at`: `Expired`
/// 4. caller's email differs from the invitee email (case-insensitive):
///    `Forbidden`
/// 5. caller already on the board (say, through a second invitation):
///    `Conflict`
/// 6. status flip and membership insert in one transaction. If another
///    request accepted first, nothing is written and `AlreadyAccepted` is
///    returned; if the caller joined in the meantime, `Conflict`.
///
/// No membership row is written on any failure.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::roles::{BoardRole, RoleHierarchy};
use super::token::{digest_token, generate_token, invitation_ttl};
use crate::models::board_invitation::{AcceptOutcome, BoardInvitation, CreateInvitation};
use crate::store::AccessStore;

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("invitation not found")]
    NotFound,

    #[error("invitation has already been accepted")]
    AlreadyAccepted,

    #[error("invitation has expired")]
    Expired,

    /// The authenticated caller is not the invitee
    #[error("invitation was sent to a different email address")]
    Forbidden,

    /// The invitee is already on the board
    #[error("user is already a member of this board")]
    Conflict,

    /// Only `member` and `observer` may be granted by invitation
    #[error("role {0} cannot be granted by invitation")]
    RoleNotInvitable(BoardRole),

    /// Stored role name is not a board role
    #[error("invitation carries unknown role {0:?}")]
    UnknownRole(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// A created invitation plus the raw token for the email link
#[derive(Debug, Clone)]
pub struct IssuedInvitation {
    pub invitation: BoardInvitation,
    pub raw_token: String,
}

/// The caller accepting an invitation
#[derive(Debug, Clone, Copy)]
pub struct Invitee<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
}

/// Creates a pending invitation valid for 48 hours
pub async fn create_invitation(
    store: &dyn AccessStore,
    board_id: Uuid,
    invited_by: Uuid,
    email: &str,
    role: BoardRole,
    now: DateTime<Utc>,
) -> Result<IssuedInvitation, InvitationError> {
    if !role.is_invitable() {
        return Err(InvitationError::RoleNotInvitable(role));
    }

    if store.is_board_member_email(board_id, email).await? {
        return Err(InvitationError::Conflict);
    }

    let (raw_token, token_hash) = generate_token();

    let invitation = store
        .create_invitation(CreateInvitation {
            board_id,
            email: email.to_string(),
            invited_by,
            role,
            token_hash,
            expires_at: now + invitation_ttl(),
        })
        .await?;

    tracing::info!(
        invitation_id = %invitation.id,
        board_id = %board_id,
        role = role.as_str(),
        "board invitation created"
    );

    Ok(IssuedInvitation {
        invitation,
        raw_token,
    })
}

/// Accepts an invitation to `board_id` on behalf of the authenticated caller
///
/// A token issued for another board reads as not found. Returns the
/// invitation as it was before acceptance, with the role that was granted.
pub async fn accept_invitation(
    store: &dyn AccessStore,
    raw_token: &str,
    board_id: Uuid,
    invitee: Invitee<'_>,
    now: DateTime<Utc>,
) -> Result<(BoardInvitation, BoardRole), InvitationError> {
    let invitation = store
        .find_invitation_by_token(&digest_token(raw_token))
        .await?
        .filter(|invitation| invitation.board_id == board_id)
        .ok_or(InvitationError::NotFound)?;

    if invitation.is_accepted() {
        return Err(InvitationError::AlreadyAccepted);
    }

    if invitation.is_expired_at(now) {
        return Err(InvitationError::Expired);
    }

    if !invitation.email.eq_ignore_ascii_case(invitee.email.trim()) {
        tracing::warn!(
            invitation_id = %invitation.id,
            user_id = %invitee.user_id,
            "invitation accepted by a different user"
        );
        return Err(InvitationError::Forbidden);
    }

    let role = BoardRole::parse(&invitation.role)
        .ok_or_else(|| InvitationError::UnknownRole(invitation.role.clone()))?;

    if store
        .find_board_member(invitation.board_id, invitee.user_id)
        .await?
        .is_some()
    {
        return Err(InvitationError::Conflict);
    }

    match store
        .accept_invitation(invitation.id, invitation.board_id, invitee.user_id, role)
        .await?
    {
        AcceptOutcome::Accepted => {}
        AcceptOutcome::NotPending => return Err(InvitationError::AlreadyAccepted),
        AcceptOutcome::AlreadyMember => return Err(InvitationError::Conflict),
    }

    tracing::info!(
        invitation_id = %invitation.id,
        board_id = %invitation.board_id,
        user_id = %invitee.user_id,
        "board invitation accepted"
    );

    Ok((invitation, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    struct Fixture {
        store: MemoryStore,
        board_id: Uuid,
        admin_id: Uuid,
        invitee_id: Uuid,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let admin = store.add_user("admin@x.com", Some("admin"), None);
        let invitee = store.add_user("a@x.com", Some("ada"), None);
        let board_id = store.add_board("Roadmap");
        store.add_board_member(board_id, admin.id, "admin");

        Fixture {
            store,
            board_id,
            admin_id: admin.id,
            invitee_id: invitee.id,
        }
    }

    fn invitee(f: &Fixture) -> Invitee<'static> {
        Invitee {
            user_id: f.invitee_id,
            email: "a@x.com",
        }
    }

    #[tokio::test]
    async fn test_create_sets_48h_expiry() {
        let f = fixture();
        let now = Utc::now();

        let issued = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Member, now)
            .await
            .unwrap();

        assert_eq!(issued.invitation.expires_at, now + Duration::hours(48));
        assert_eq!(issued.invitation.status, "pending");
        assert_eq!(issued.invitation.token_hash, digest_token(&issued.raw_token));
    }

    #[tokio::test]
    async fn test_create_rejects_existing_member() {
        let f = fixture();

        let err = create_invitation(
            &f.store,
            f.board_id,
            f.admin_id,
            "ADMIN@x.com",
            BoardRole::Member,
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, InvitationError::Conflict));
    }

    #[tokio::test]
    async fn test_create_rejects_admin_role() {
        let f = fixture();

        let err = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Admin, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::RoleNotInvitable(BoardRole::Admin)));
    }

    #[tokio::test]
    async fn test_accept_adds_member_once() {
        let f = fixture();
        let now = Utc::now();
        let issued = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Observer, now)
            .await
            .unwrap();

        let (_, role) = accept_invitation(&f.store, &issued.raw_token, f.board_id, invitee(&f), now)
            .await
            .unwrap();
        assert_eq!(role, BoardRole::Observer);

        let members = f.store.board_members(f.board_id);
        assert_eq!(members.len(), 2);
        assert!(members
            .iter()
            .any(|m| m.user_id == f.invitee_id && m.role == "observer"));

        let err = accept_invitation(&f.store, &issued.raw_token, f.board_id, invitee(&f), now)
            .await
            .unwrap_err();
        assert!(matches!(err, InvitationError::AlreadyAccepted));
        assert_eq!(f.store.board_members(f.board_id).len(), 2);
    }

    #[tokio::test]
    async fn test_accept_expired_writes_nothing() {
        let f = fixture();
        let now = Utc::now();
        let issued = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Member, now)
            .await
            .unwrap();
        f.store
            .set_invitation_expiry(issued.invitation.id, now - Duration::seconds(1));

        let err = accept_invitation(&f.store, &issued.raw_token, f.board_id, invitee(&f), now)
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::Expired));
        assert_eq!(f.store.board_members(f.board_id).len(), 1);
        assert_eq!(f.store.invitations()[0].status, "pending");
    }

    #[tokio::test]
    async fn test_accept_by_other_email_is_forbidden() {
        let f = fixture();
        let other = f.store.add_user("b@x.com", Some("bob"), None);
        let now = Utc::now();
        let issued = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Member, now)
            .await
            .unwrap();

        let err = accept_invitation(
            &f.store,
            &issued.raw_token,
            f.board_id,
            Invitee {
                user_id: other.id,
                email: "b@x.com",
            },
            now,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, InvitationError::Forbidden));
        assert_eq!(f.store.board_members(f.board_id).len(), 1);
    }

    #[tokio::test]
    async fn test_accept_email_match_ignores_case() {
        let f = fixture();
        let now = Utc::now();
        let issued = create_invitation(&f.store, f.board_id, f.admin_id, "A@X.com", BoardRole::Member, now)
            .await
            .unwrap();

        assert!(accept_invitation(&f.store, &issued.raw_token, f.board_id, invitee(&f), now)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_accept_unknown_token() {
        let f = fixture();

        let err = accept_invitation(&f.store, "missing", f.board_id, invitee(&f), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::NotFound));
    }

    #[tokio::test]
    async fn test_accept_on_other_board_is_not_found() {
        let f = fixture();
        let now = Utc::now();
        let issued = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Member, now)
            .await
            .unwrap();

        let err = accept_invitation(&f.store, &issued.raw_token, Uuid::new_v4(), invitee(&f), now)
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::NotFound));
        assert_eq!(f.store.invitations()[0].status, "pending");
    }

    #[tokio::test]
    async fn test_second_invitation_after_joining_is_conflict() {
        let f = fixture();
        let now = Utc::now();
        let first = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Member, now)
            .await
            .unwrap();
        let second = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Observer, now)
            .await
            .unwrap();

        accept_invitation(&f.store, &first.raw_token, f.board_id, invitee(&f), now)
            .await
            .unwrap();

        let err = accept_invitation(&f.store, &second.raw_token, f.board_id, invitee(&f), now)
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::Conflict));
        assert_eq!(f.store.board_members(f.board_id).len(), 2);
        assert!(f
            .store
            .invitations()
            .iter()
            .any(|i| i.id == second.invitation.id && i.status == "pending"));
    }

    #[tokio::test]
    async fn test_store_reports_member_who_joined_meanwhile() {
        let f = fixture();
        let now = Utc::now();
        let issued = create_invitation(&f.store, f.board_id, f.admin_id, "a@x.com", BoardRole::Member, now)
            .await
            .unwrap();
        f.store.add_board_member(f.board_id, f.invitee_id, "observer");

        let outcome = f
            .store
            .accept_invitation(issued.invitation.id, f.board_id, f.invitee_id, BoardRole::Member)
            .await
            .unwrap();

        assert_eq!(outcome, AcceptOutcome::AlreadyMember);
        assert_eq!(f.store.invitations()[0].status, "pending");
    }
}
