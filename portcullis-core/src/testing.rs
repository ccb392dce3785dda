//! In-memory transactional store for unit tests
//!
//! `begin` snapshots the committed state into the transaction, capability
//! methods mutate the snapshot, and `commit` writes it back. Rollback and drop
//! discard it. Transactions are not isolated from each other; tests that race
//! two transactions run against SQLite instead.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::{Account, AccountId, AccountStatus},
    code::{EmailVerification, ResetCode},
    error::{AuthError, StorageError},
    repositories::*,
    session::{RefreshToken, Session, SessionId},
};

#[derive(Debug, Clone, Default)]
pub struct State {
    pub accounts: HashMap<AccountId, Account>,
    pub email_verifications: Vec<EmailVerification>,
    pub reset_codes: Vec<ResetCode>,
    pub sessions: HashMap<SessionId, Session>,
    pub refresh_tokens: HashMap<String, RefreshToken>,
}

pub struct MemoryTx {
    state: State,
}

#[derive(Default)]
pub struct MemoryStore {
    committed: Mutex<State>,
    fail_next_commit: AtomicBool,
    fail_next_rollback: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> State {
        self.committed.lock().unwrap().clone()
    }

    pub fn account_count(&self) -> usize {
        self.snapshot().accounts.len()
    }

    pub fn session_count(&self) -> usize {
        self.snapshot().sessions.len()
    }

    pub fn refresh_token_count(&self) -> usize {
        self.snapshot().refresh_tokens.len()
    }

    pub fn email_verification_count(&self) -> usize {
        self.snapshot().email_verifications.len()
    }

    pub fn reset_code_count(&self) -> usize {
        self.snapshot().reset_codes.len()
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_rollback(&self) {
        self.fail_next_rollback.store(true, Ordering::SeqCst);
    }

    /// Apply `f` to the committed state directly, outside any transaction.
    pub fn mutate(&self, f: impl FnOnce(&mut State)) {
        f(&mut self.committed.lock().unwrap());
    }
}

#[async_trait]
impl TransactionProvider for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, Error> {
        Ok(MemoryTx {
            state: self.snapshot(),
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), Error> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Transaction("injected commit failure".to_string()).into());
        }
        *self.committed.lock().unwrap() = tx.state;
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<(), Error> {
        if self.fail_next_rollback.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Transaction("injected rollback failure".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl RepositoryProvider for MemoryStore {
    fn repositories(&self) -> Repositories<MemoryTx> {
        Repositories::from_shared(Arc::new(MemoryRepositories))
    }

    async fn migrate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Capability implementations over [`MemoryTx`]; all data lives in the
/// transaction.
pub struct MemoryRepositories;

fn account_mut<'a>(tx: &'a mut MemoryTx, id: &AccountId) -> Result<&'a mut Account, Error> {
    tx.state
        .accounts
        .get_mut(id)
        .ok_or(Error::Auth(AuthError::AccountNotFound))
}

#[async_trait]
impl AccountSaver<MemoryTx> for MemoryRepositories {
    async fn save_account(&self, tx: &mut MemoryTx, account: &Account) -> Result<(), Error> {
        if tx
            .state
            .accounts
            .values()
            .any(|a| a.email == account.email || a.id == account.id)
        {
            return Err(StorageError::Constraint("accounts.email".to_string()).into());
        }
        tx.state.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }
}

#[async_trait]
impl AccountUpdater<MemoryTx> for MemoryRepositories {
    async fn update_password(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let account = account_mut(tx, account_id)?;
        account.password_hash = password_hash.to_string();
        account.updated_at = updated_at;
        Ok(())
    }

    async fn set_verified(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let account = account_mut(tx, account_id)?;
        account.is_verified = true;
        account.updated_at = updated_at;
        Ok(())
    }

    async fn update_status(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
        status: AccountStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let account = account_mut(tx, account_id)?;
        account.status = status;
        account.updated_at = updated_at;
        Ok(())
    }
}

#[async_trait]
impl AccountProvider<MemoryTx> for MemoryRepositories {
    async fn account_by_email(
        &self,
        tx: &mut MemoryTx,
        email: &str,
    ) -> Result<Option<Account>, Error> {
        Ok(tx
            .state
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn account_by_id(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
    ) -> Result<Option<Account>, Error> {
        Ok(tx.state.accounts.get(account_id).cloned())
    }
}

#[async_trait]
impl VerificationSaver<MemoryTx> for MemoryRepositories {
    async fn store_email_verification(
        &self,
        tx: &mut MemoryTx,
        verification: &EmailVerification,
    ) -> Result<(), Error> {
        tx.state.email_verifications.push(verification.clone());
        Ok(())
    }

    async fn store_reset_code(&self, tx: &mut MemoryTx, reset_code: &ResetCode) -> Result<(), Error> {
        tx.state.reset_codes.push(reset_code.clone());
        Ok(())
    }
}

#[async_trait]
impl VerificationProvider<MemoryTx> for MemoryRepositories {
    async fn email_verification(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<Option<EmailVerification>, Error> {
        Ok(tx
            .state
            .email_verifications
            .iter()
            .find(|v| &v.account_id == account_id && v.code == code)
            .cloned())
    }

    async fn reset_code(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<Option<ResetCode>, Error> {
        Ok(tx
            .state
            .reset_codes
            .iter()
            .find(|r| &r.account_id == account_id && r.code == code)
            .cloned())
    }
}

#[async_trait]
impl VerificationDeleter<MemoryTx> for MemoryRepositories {
    async fn delete_email_verifications(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
    ) -> Result<u64, Error> {
        let before = tx.state.email_verifications.len();
        tx.state
            .email_verifications
            .retain(|v| &v.account_id != account_id);
        Ok((before - tx.state.email_verifications.len()) as u64)
    }

    async fn delete_reset_codes(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
    ) -> Result<u64, Error> {
        let before = tx.state.reset_codes.len();
        tx.state.reset_codes.retain(|r| &r.account_id != account_id);
        Ok((before - tx.state.reset_codes.len()) as u64)
    }
}

#[async_trait]
impl SessionSaver<MemoryTx> for MemoryRepositories {
    async fn create_session(&self, tx: &mut MemoryTx, session: &Session) -> Result<(), Error> {
        tx.state.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        tx: &mut MemoryTx,
        token: &RefreshToken,
    ) -> Result<(), Error> {
        if tx.state.refresh_tokens.contains_key(&token.token_hash) {
            return Err(StorageError::Constraint("refresh_tokens.token_hash".to_string()).into());
        }
        tx.state
            .refresh_tokens
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }
}

#[async_trait]
impl SessionProvider<MemoryTx> for MemoryRepositories {
    async fn session_by_id(
        &self,
        tx: &mut MemoryTx,
        session_id: &SessionId,
    ) -> Result<Option<Session>, Error> {
        Ok(tx.state.sessions.get(session_id).cloned())
    }

    async fn refresh_token(
        &self,
        tx: &mut MemoryTx,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, Error> {
        Ok(tx.state.refresh_tokens.get(token_hash).cloned())
    }
}

#[async_trait]
impl SessionDeleter<MemoryTx> for MemoryRepositories {
    async fn delete_refresh_token(&self, tx: &mut MemoryTx, token_hash: &str) -> Result<bool, Error> {
        Ok(tx.state.refresh_tokens.remove(token_hash).is_some())
    }

    async fn delete_refresh_tokens_for_session(
        &self,
        tx: &mut MemoryTx,
        session_id: &SessionId,
    ) -> Result<u64, Error> {
        let before = tx.state.refresh_tokens.len();
        tx.state
            .refresh_tokens
            .retain(|_, t| &t.session_id != session_id);
        Ok((before - tx.state.refresh_tokens.len()) as u64)
    }

    async fn delete_session(&self, tx: &mut MemoryTx, session_id: &SessionId) -> Result<bool, Error> {
        Ok(tx.state.sessions.remove(session_id).is_some())
    }

    async fn delete_sessions_for_account(
        &self,
        tx: &mut MemoryTx,
        account_id: &AccountId,
    ) -> Result<u64, Error> {
        tx.state
            .refresh_tokens
            .retain(|_, t| &t.account_id != account_id);
        let before = tx.state.sessions.len();
        tx.state.sessions.retain(|_, s| &s.account_id != account_id);
        Ok((before - tx.state.sessions.len()) as u64)
    }
}

#[async_trait]
impl ExpiredRecordDeleter<MemoryTx> for MemoryRepositories {
    async fn delete_expired(
        &self,
        tx: &mut MemoryTx,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport, Error> {
        let state = &mut tx.state;
        let mut report = CleanupReport::default();

        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, t| t.expires_at > now);
        report.refresh_tokens = (before - state.refresh_tokens.len()) as u64;

        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.expires_at > now);
        report.sessions = (before - state.sessions.len()) as u64;
        let sessions = &state.sessions;
        state
            .refresh_tokens
            .retain(|_, t| sessions.contains_key(&t.session_id));

        let before = state.email_verifications.len();
        state.email_verifications.retain(|v| v.expires_at > now);
        report.email_verifications = (before - state.email_verifications.len()) as u64;

        let before = state.reset_codes.len();
        state.reset_codes.retain(|r| r.expires_at > now);
        report.reset_codes = (before - state.reset_codes.len()) as u64;

        Ok(report)
    }
}

/// A capability that always fails with a storage error.
///
/// Swap it into [`Repositories`] to fail one step of a use case.
pub struct Failing;

fn injected() -> Error {
    StorageError::Database("injected failure".to_string()).into()
}

#[async_trait]
impl<Tx: Send + 'static> AccountUpdater<Tx> for Failing {
    async fn update_password(
        &self,
        _tx: &mut Tx,
        _account_id: &AccountId,
        _password_hash: &str,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        Err(injected())
    }

    async fn set_verified(
        &self,
        _tx: &mut Tx,
        _account_id: &AccountId,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        Err(injected())
    }

    async fn update_status(
        &self,
        _tx: &mut Tx,
        _account_id: &AccountId,
        _status: AccountStatus,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        Err(injected())
    }
}

#[async_trait]
impl<Tx: Send + 'static> VerificationSaver<Tx> for Failing {
    async fn store_email_verification(
        &self,
        _tx: &mut Tx,
        _verification: &EmailVerification,
    ) -> Result<(), Error> {
        Err(injected())
    }

    async fn store_reset_code(&self, _tx: &mut Tx, _reset_code: &ResetCode) -> Result<(), Error> {
        Err(injected())
    }
}

#[async_trait]
impl<Tx: Send + 'static> VerificationDeleter<Tx> for Failing {
    async fn delete_email_verifications(
        &self,
        _tx: &mut Tx,
        _account_id: &AccountId,
    ) -> Result<u64, Error> {
        Err(injected())
    }

    async fn delete_reset_codes(&self, _tx: &mut Tx, _account_id: &AccountId) -> Result<u64, Error> {
        Err(injected())
    }
}

#[async_trait]
impl<Tx: Send + 'static> SessionSaver<Tx> for Failing {
    async fn create_session(&self, _tx: &mut Tx, _session: &Session) -> Result<(), Error> {
        Err(injected())
    }

    async fn store_refresh_token(&self, _tx: &mut Tx, _token: &RefreshToken) -> Result<(), Error> {
        Err(injected())
    }
}

#[async_trait]
impl<Tx: Send + 'static> SessionDeleter<Tx> for Failing {
    async fn delete_refresh_token(&self, _tx: &mut Tx, _token_hash: &str) -> Result<bool, Error> {
        Err(injected())
    }

    async fn delete_refresh_tokens_for_session(
        &self,
        _tx: &mut Tx,
        _session_id: &SessionId,
    ) -> Result<u64, Error> {
        Err(injected())
    }

    async fn delete_session(&self, _tx: &mut Tx, _session_id: &SessionId) -> Result<bool, Error> {
        Err(injected())
    }

    async fn delete_sessions_for_account(
        &self,
        _tx: &mut Tx,
        _account_id: &AccountId,
    ) -> Result<u64, Error> {
        Err(injected())
    }
}
