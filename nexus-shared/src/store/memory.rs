/// In-process [`AccessStore`] for tests and local experiments
///
/// Holds every table the access chain reads behind one `Mutex`, so each
/// trait call is atomic just like its PostgreSQL transaction. Seeding
/// helpers (`add_user`, `add_board_member`, ...) set up fixtures directly.
///
/// [`MemoryStore::set_failing`] makes every trait call return an error,
/// which exercises the internal-error path of callers.
///
/// # Example
///
/// ```
/// use nexus_shared::store::{AccessStore, MemoryStore};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let store = MemoryStore::new();
/// let user = store.add_user("a@x.com", Some("ada"), None);
///
/// assert!(store.find_user_by_id(user.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::AccessStore;
use crate::auth::roles::{BoardRole, RoleHierarchy};
use crate::auth::token::TokenScope;
use crate::models::board_invitation::{
    AcceptOutcome, BoardInvitation, CreateInvitation, InvitationStatus,
};
use crate::models::board_member::{BoardMember, BoardMembership};
use crate::models::token::Token;
use crate::models::user::{normalize_email, User};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    boards: HashMap<Uuid, String>,
    board_members: Vec<BoardMember>,
    workspace_members: Vec<(Uuid, Uuid, String)>,
    projects: HashMap<Uuid, Uuid>,
    invitations: Vec<BoardInvitation>,
    tokens: Vec<Token>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failing: AtomicBool,
}

fn unavailable() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent trait call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn checked(&self) -> Result<MutexGuard<'_, State>, sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.state())
    }

    pub fn add_user(&self, email: &str, username: Option<&str>, password_hash: Option<&str>) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.map(str::to_string),
            email: normalize_email(email),
            password_hash: password_hash.map(str::to_string),
            refresh_token_hash: None,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        };

        self.state().users.insert(user.id, user.clone());
        user
    }

    pub fn remove_user(&self, id: Uuid) {
        let mut state = self.state();
        state.users.remove(&id);
        state.board_members.retain(|m| m.user_id != id);
        state.workspace_members.retain(|(_, user_id, _)| *user_id != id);
        state.tokens.retain(|t| t.user_id != id);
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.state().users.get(&id).cloned()
    }

    pub fn add_board(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().boards.insert(id, name.to_string());
        id
    }

    /// Adds a membership row with a raw role string (unknown names allowed)
    pub fn add_board_member(&self, board_id: Uuid, user_id: Uuid, role: &str) {
        self.state().board_members.push(BoardMember {
            board_id,
            user_id,
            role: role.to_string(),
            joined_at: Utc::now(),
        });
    }

    pub fn board_members(&self, board_id: Uuid) -> Vec<BoardMember> {
        self.state()
            .board_members
            .iter()
            .filter(|m| m.board_id == board_id)
            .cloned()
            .collect()
    }

    pub fn add_workspace_member(&self, workspace_id: Uuid, user_id: Uuid, role: &str) {
        self.state()
            .workspace_members
            .push((workspace_id, user_id, role.to_string()));
    }

    /// Replaces every role the user holds in the workspace
    pub fn set_workspace_role(&self, workspace_id: Uuid, user_id: Uuid, role: &str) {
        for (ws, user, stored) in self.state().workspace_members.iter_mut() {
            if *ws == workspace_id && *user == user_id {
                *stored = role.to_string();
            }
        }
    }

    pub fn add_project(&self, workspace_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.state().projects.insert(id, workspace_id);
        id
    }

    pub fn invitations(&self) -> Vec<BoardInvitation> {
        self.state().invitations.clone()
    }

    /// Overwrites an invitation's expiry
    pub fn set_invitation_expiry(&self, invitation_id: Uuid, expires_at: DateTime<Utc>) {
        if let Some(inv) = self
            .state()
            .invitations
            .iter_mut()
            .find(|i| i.id == invitation_id)
        {
            inv.expires_at = expires_at;
        }
    }

    pub fn tokens_for(&self, user_id: Uuid) -> Vec<Token> {
        self.state()
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.checked()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let email = normalize_email(email);
        Ok(self
            .checked()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_board_member(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<BoardMembership>, sqlx::Error> {
        let state = self.checked()?;

        let Some(board_name) = state.boards.get(&board_id) else {
            return Ok(None);
        };

        Ok(state
            .board_members
            .iter()
            .find(|m| m.board_id == board_id && m.user_id == user_id)
            .map(|m| BoardMembership {
                board_id,
                board_name: board_name.clone(),
                user_id,
                role: m.role.clone(),
            }))
    }

    async fn is_board_member_email(
        &self,
        board_id: Uuid,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let state = self.checked()?;
        let email = normalize_email(email);

        Ok(state.board_members.iter().any(|m| {
            m.board_id == board_id
                && state
                    .users
                    .get(&m.user_id)
                    .is_some_and(|u| u.email == email)
        }))
    }

    async fn workspace_member_roles(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        Ok(self
            .checked()?
            .workspace_members
            .iter()
            .filter(|(ws, user, _)| *ws == workspace_id && *user == user_id)
            .map(|(_, _, role)| role.clone())
            .collect())
    }

    async fn find_project_workspace(&self, project_id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
        Ok(self.checked()?.projects.get(&project_id).copied())
    }

    async fn create_invitation(
        &self,
        data: CreateInvitation,
    ) -> Result<BoardInvitation, sqlx::Error> {
        let invitation = BoardInvitation {
            id: Uuid::new_v4(),
            board_id: data.board_id,
            email: normalize_email(&data.email),
            invited_by: data.invited_by,
            role: data.role.as_str().to_string(),
            token_hash: data.token_hash,
            status: InvitationStatus::Pending.as_str().to_string(),
            expires_at: data.expires_at,
            created_at: Utc::now(),
        };

        self.checked()?.invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn find_invitation_by_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<BoardInvitation>, sqlx::Error> {
        Ok(self
            .checked()?
            .invitations
            .iter()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn accept_invitation(
        &self,
        invitation_id: Uuid,
        board_id: Uuid,
        user_id: Uuid,
        role: BoardRole,
    ) -> Result<AcceptOutcome, sqlx::Error> {
        let mut state = self.checked()?;

        let pending = state.invitations.iter().any(|i| {
            i.id == invitation_id && i.status == InvitationStatus::Pending.as_str()
        });
        if !pending {
            return Ok(AcceptOutcome::NotPending);
        }

        if state
            .board_members
            .iter()
            .any(|m| m.board_id == board_id && m.user_id == user_id)
        {
            return Ok(AcceptOutcome::AlreadyMember);
        }

        if let Some(inv) = state.invitations.iter_mut().find(|i| i.id == invitation_id) {
            inv.status = InvitationStatus::Accepted.as_str().to_string();
        }
        state.board_members.push(BoardMember {
            board_id,
            user_id,
            role: role.as_str().to_string(),
            joined_at: Utc::now(),
        });

        Ok(AcceptOutcome::Accepted)
    }

    async fn upsert_token(
        &self,
        user_id: Uuid,
        scope: TokenScope,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Token, sqlx::Error> {
        let mut state = self.checked()?;

        state
            .tokens
            .retain(|t| !(t.user_id == user_id && t.scope == scope.as_str()));

        let token = Token {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            scope: scope.as_str().to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        state.tokens.push(token.clone());

        Ok(token)
    }

    async fn find_token(&self, token_hash: &str) -> Result<Option<Token>, sqlx::Error> {
        Ok(self
            .checked()?
            .tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn reset_password(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.checked()?;

        let before = state.tokens.len();
        state.tokens.retain(|t| t.id != token_id);
        if state.tokens.len() == before {
            return Err(sqlx::Error::RowNotFound);
        }

        if let Some(user) = state.users.get_mut(&user_id) {
            user.password_hash = Some(password_hash.to_string());
            user.refresh_token_hash = None;
            user.updated_at = Utc::now();
        }

        Ok(())
    }

    async fn verify_email(&self, token_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        let mut state = self.checked()?;

        let before = state.tokens.len();
        state.tokens.retain(|t| t.id != token_id);
        if state.tokens.len() == before {
            return Err(sqlx::Error::RowNotFound);
        }

        if let Some(user) = state.users.get_mut(&user_id) {
            user.email_verified_at.get_or_insert_with(Utc::now);
            user.updated_at = Utc::now();
        }

        Ok(())
    }
}
