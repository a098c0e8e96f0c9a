//! Account registry: name/token bookkeeping and the lock-per-account
//! concurrency model.
//!
//! The registry's own `RwLock` is only ever held for the short span of a
//! map lookup/insert/remove; every account operation after that holds just
//! that one account's `Mutex`, so two different accounts never contend.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use btsim_feed::Feed;
use btsim_persistence::{AccountSnapshot, SnapshotStore};
use btsim_schemas::{AccountError, AccountInfo, BtsimError};

use crate::account::{Account, AccountConfig};

/// Shared configuration every account started through this registry
/// inherits, plus the collaborators (`feed`, `store`) every account needs
/// but none of them own.
pub struct Registry {
    feed: Arc<dyn Feed>,
    store: Arc<dyn SnapshotStore>,
    feed_timeout: Duration,
    suspension_blocks_all_trading: bool,
    accounts: RwLock<BTreeMap<String, Arc<Mutex<Account>>>>,
    /// account name -> token, enforcing "names are unique
    /// among currently-open accounts" rule.
    names: RwLock<BTreeMap<String, String>>,
}

/// Parameters accepted by `start_backtest`, mirroring request
/// body for that endpoint.
#[derive(Debug, Clone)]
pub struct StartBacktestParams {
    pub name: String,
    pub principal_micros: i64,
    pub commission_rate_micros: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Client-chosen token, honored if present and not already in use.
    /// `None` falls back to a server-minted token, for callers that want
    /// the registry to assign one.
    pub token: Option<String>,
}

impl Registry {
    pub fn new(
        feed: Arc<dyn Feed>,
        store: Arc<dyn SnapshotStore>,
        feed_timeout: Duration,
        suspension_blocks_all_trading: bool,
    ) -> Self {
        Self {
            feed,
            store,
            feed_timeout,
            suspension_blocks_all_trading,
            accounts: RwLock::new(BTreeMap::new()),
            names: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn feed(&self) -> &Arc<dyn Feed> {
        &self.feed
    }

    fn mint_token() -> String {
        Uuid::new_v4().to_string()
    }

    async fn reserve_name(&self, name: &str, token: &str) -> Result<(), BtsimError> {
        let mut names = self.names.write().await;
        if names.contains_key(name) {
            return Err(BtsimError::AccountError(AccountError::AccountExists));
        }
        names.insert(name.to_string(), token.to_string());
        Ok(())
    }

    /// Opens a new account and returns its token plus an initial `info`
    /// snapshot. The caller surfaces the token to the client; every
    /// subsequent call against this account authenticates with it.
    pub async fn start_backtest(&self, params: StartBacktestParams) -> Result<(String, AccountInfo), BtsimError> {
        let token = match &params.token {
            Some(t) if !t.is_empty() => t.clone(),
            _ => Self::mint_token(),
        };
        if self.accounts.read().await.contains_key(&token) {
            return Err(BtsimError::AccountError(AccountError::AccountExists));
        }
        self.reserve_name(&params.name, &token).await?;

        let config = AccountConfig {
            name: params.name,
            token: token.clone(),
            principal_micros: params.principal_micros,
            commission_rate_micros: params.commission_rate_micros,
            start_date: params.start_date,
            end_date: params.end_date,
            feed_timeout: self.feed_timeout,
            suspension_blocks_all_trading: self.suspension_blocks_all_trading,
        };
        let account = Account::new(config);
        let info = account.info();

        self.accounts
            .write()
            .await
            .insert(token.clone(), Arc::new(Mutex::new(account)));

        Ok((token, info))
    }

    /// Resolves a bearer token to its account handle. Every per-account
    /// operation (`buy`, `sell`, `info`, ...) goes through this first.
    pub async fn authorize(&self, token: &str) -> Result<Arc<Mutex<Account>>, BtsimError> {
        self.accounts
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(BtsimError::AccountError(AccountError::Unauthorized))
    }

    /// Closes one account by token, freeing its name for reuse. Does not
    /// persist it first — callers that want the state kept call
    /// `save_backtest` before `delete_account`.
    pub async fn delete_account(&self, token: &str) -> Result<(), BtsimError> {
        let removed = self.accounts.write().await.remove(token);
        let Some(account) = removed else {
            return Err(BtsimError::AccountError(AccountError::Unauthorized));
        };
        let name = account.lock().await.name().to_string();
        self.names.write().await.remove(&name);
        Ok(())
    }

    /// Closes every open account, for an admin-scoped reset. Authorizing
    /// the caller as admin is the daemon layer's job, not the registry's.
    pub async fn delete_all_accounts(&self) {
        self.accounts.write().await.clear();
        self.names.write().await.clear();
    }

    /// Closes one account by its registered name, for the admin-scoped
    /// `delete_accounts(name)` form. Authorizing the caller as admin is the
    /// daemon layer's job, not the registry's.
    pub async fn delete_account_by_name(&self, name: &str) -> Result<(), BtsimError> {
        let token = self
            .names
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or(BtsimError::AccountError(AccountError::NotFound))?;
        self.delete_account(&token).await
    }

    /// Serializes the named account's full state into the snapshot store.
    /// `name_override` lets a caller snapshot the account under a different
    /// key than its live name (a "save as"); `None` saves under the
    /// account's own name.
    pub async fn save_backtest(
        &self,
        token: &str,
        name_override: Option<String>,
        description: Option<String>,
    ) -> Result<(), BtsimError> {
        let handle = self.authorize(token).await?;
        let account = handle.lock().await;
        let snapshot = AccountSnapshot {
            name: name_override.unwrap_or_else(|| account.name().to_string()),
            token: account.token().to_string(),
            principal_micros: account.config.principal_micros,
            cash_micros: account.cash_micros,
            commission_micros: account.config.commission_rate_micros,
            start_date: account.config.start_date,
            end_date: account.config.end_date,
            xdxr_cursor: account.xdxr_cursor,
            description,
            entrusts: account.entrusts.clone(),
            trades: account.trades.clone(),
            lots: account.ledger.all_lots(),
            assets: account.assets.clone(),
        };
        self.store
            .save(&snapshot.name, &snapshot)
            .map_err(|e| BtsimError::Infra(btsim_schemas::Infra::Persistence(e.to_string())))
    }

    /// Restores a previously saved account under a freshly minted token —
    /// the persisted token is never reused, so a leaked old token can't
    /// resurrect a closed account — unless `desired_token` names one
    /// explicitly.
    pub async fn load_backtest(
        &self,
        name: &str,
        desired_token: Option<String>,
    ) -> Result<(String, AccountInfo), BtsimError> {
        let snapshot = self
            .store
            .load(name)
            .map_err(|e| BtsimError::Infra(btsim_schemas::Infra::Persistence(e.to_string())))?;

        let token = match desired_token {
            Some(t) if !t.is_empty() => t,
            _ => Self::mint_token(),
        };
        if self.accounts.read().await.contains_key(&token) {
            return Err(BtsimError::AccountError(AccountError::AccountExists));
        }
        self.reserve_name(&snapshot.name, &token).await?;

        let config = AccountConfig {
            name: snapshot.name,
            token: token.clone(),
            principal_micros: snapshot.principal_micros,
            commission_rate_micros: snapshot.commission_micros,
            start_date: snapshot.start_date,
            end_date: snapshot.end_date,
            feed_timeout: self.feed_timeout,
            suspension_blocks_all_trading: self.suspension_blocks_all_trading,
        };
        let mut account = Account::new(config);
        account.cash_micros = snapshot.cash_micros;
        account.xdxr_cursor = snapshot.xdxr_cursor;
        account.entrusts = snapshot.entrusts;
        account.trades = snapshot.trades;
        account.assets = snapshot.assets;
        account.ledger = btsim_ledger::Ledger::from_lots(snapshot.lots);
        let info = account.info();

        self.accounts
            .write()
            .await
            .insert(token.clone(), Arc::new(Mutex::new(account)));

        Ok((token, info))
    }
}
