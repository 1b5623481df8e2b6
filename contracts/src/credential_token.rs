//! # Credential Token Contract
//!
//! A soulbound "human" credential. The issuer mints tokens to addresses it
//! has verified off-chain; holders can never transfer them. The registry
//! consults this contract through [`CredentialOracle`] before accepting a
//! `link` on the home network.
//!
//! ## Security Model
//!
//! - **Mint gating**: only the issuer address can mint or revoke.
//! - **Non-transferable**: `transfer()` exists only to fail.
//! - **Revocation**: removes the token from its holder. Registry links made
//!   while the token was held stay in place; only future links are affected.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{info, warn};

use humanlink_protocol::{Address, CapabilityError, CredentialOracle};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during credential token operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The caller is not the credential issuer.
    #[error("unauthorized: {0} is not the credential issuer")]
    Unauthorized(Address),

    /// Tokens cannot be minted to the null address.
    #[error("cannot mint to the null address")]
    NullRecipient,

    /// The referenced token does not exist (never minted, or revoked).
    #[error("token not found: {0}")]
    TokenNotFound(TokenId),

    /// Credential tokens are soulbound.
    #[error("credential tokens are non-transferable")]
    NonTransferable,

    /// The token id counter is exhausted.
    #[error("token id overflow")]
    IdOverflow,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Sequential token identifier, starting at 1.
pub type TokenId = u64;

/// One issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token_id: TokenId,
    pub owner: Address,
    pub issued_at: DateTime<Utc>,
}

/// Serializable contract state, for persisting a token between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub next_token_id: TokenId,
    pub tokens: BTreeMap<TokenId, Credential>,
}

#[derive(Debug, Default)]
struct TokenState {
    next_token_id: TokenId,
    tokens: BTreeMap<TokenId, Credential>,
    balances: HashMap<Address, u64>,
}

impl TokenState {
    fn from_snapshot(snapshot: TokenSnapshot) -> Self {
        let mut balances = HashMap::new();
        for credential in snapshot.tokens.values() {
            *balances.entry(credential.owner).or_insert(0) += 1;
        }
        Self {
            next_token_id: snapshot.next_token_id.max(1),
            tokens: snapshot.tokens,
            balances,
        }
    }

    fn snapshot(&self) -> TokenSnapshot {
        TokenSnapshot {
            next_token_id: self.next_token_id,
            tokens: self.tokens.clone(),
        }
    }

    fn debit(&mut self, owner: &Address) {
        if let Some(balance) = self.balances.get_mut(owner) {
            *balance = balance.saturating_sub(1);
            if *balance == 0 {
                self.balances.remove(owner);
            }
        }
    }

    /// Reverse the most recent mint, as if it never happened.
    fn unmint(&mut self, token_id: TokenId) {
        if let Some(credential) = self.tokens.remove(&token_id) {
            self.debit(&credential.owner);
        }
        self.next_token_id = token_id;
    }
}

// ---------------------------------------------------------------------------
// CredentialToken
// ---------------------------------------------------------------------------

/// The soulbound credential contract.
///
/// All methods take `&self`; state sits behind a lock so one instance can be
/// shared between the registry (as its oracle) and the issuer's API.
#[derive(Debug)]
pub struct CredentialToken {
    contract: Address,
    issuer: Address,
    name: String,
    symbol: String,
    state: RwLock<TokenState>,
}

impl CredentialToken {
    /// Deploy an empty token at `contract`, mintable by `issuer`.
    pub fn new(
        contract: Address,
        issuer: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            contract,
            issuer,
            name: name.into(),
            symbol: symbol.into().to_uppercase(),
            state: RwLock::new(TokenState {
                next_token_id: 1,
                ..TokenState::default()
            }),
        }
    }

    /// Rebuild a token from a [`snapshot`](Self::snapshot).
    pub fn restore(
        contract: Address,
        issuer: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        snapshot: TokenSnapshot,
    ) -> Self {
        let token = Self::new(contract, issuer, name, symbol);
        *token.state.write() = TokenState::from_snapshot(snapshot);
        token
    }

    /// Issue a credential to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Unauthorized`] if `caller` is not the issuer.
    /// Returns [`TokenError::NullRecipient`] if `to` is the zero address.
    pub fn mint(&self, caller: &Address, to: Address) -> Result<TokenId, TokenError> {
        self.mint_with(caller, to, |_| Ok::<(), TokenError>(()))
    }

    /// Issue a credential and hand the resulting snapshot to `persist` while
    /// still holding the write lock.
    ///
    /// If `persist` fails the mint is undone, including the id counter, and
    /// its error is returned. Concurrent mints are serialized, so snapshots
    /// reach `persist` in mint order.
    pub fn mint_with<F, E>(&self, caller: &Address, to: Address, persist: F) -> Result<TokenId, E>
    where
        F: FnOnce(&TokenSnapshot) -> Result<(), E>,
        E: From<TokenError>,
    {
        if *caller != self.issuer {
            return Err(TokenError::Unauthorized(*caller).into());
        }
        if to.is_zero() {
            return Err(TokenError::NullRecipient.into());
        }

        let mut state = self.state.write();
        let token_id = Self::mint_locked(&mut state, to)?;

        if let Err(e) = persist(&state.snapshot()) {
            state.unmint(token_id);
            warn!(token_id, owner = %to, "credential mint rolled back: snapshot not persisted");
            return Err(e);
        }

        info!(token_id, owner = %to, symbol = %self.symbol, "credential minted");
        Ok(token_id)
    }

    fn mint_locked(state: &mut TokenState, to: Address) -> Result<TokenId, TokenError> {
        let token_id = state.next_token_id;
        state.next_token_id = token_id.checked_add(1).ok_or(TokenError::IdOverflow)?;
        state.tokens.insert(
            token_id,
            Credential {
                token_id,
                owner: to,
                issued_at: Utc::now(),
            },
        );
        *state.balances.entry(to).or_insert(0) += 1;
        Ok(token_id)
    }

    /// Revoke a credential. Only the issuer can revoke.
    pub fn revoke(&self, caller: &Address, token_id: TokenId) -> Result<(), TokenError> {
        if *caller != self.issuer {
            return Err(TokenError::Unauthorized(*caller));
        }

        let mut state = self.state.write();
        let credential = state
            .tokens
            .remove(&token_id)
            .ok_or(TokenError::TokenNotFound(token_id))?;
        state.debit(&credential.owner);

        info!(token_id, owner = %credential.owner, "credential revoked");
        Ok(())
    }

    /// Always fails: credentials are bound to the address they were minted to.
    pub fn transfer(
        &self,
        _from: &Address,
        _to: &Address,
        _token_id: TokenId,
    ) -> Result<(), TokenError> {
        Err(TokenError::NonTransferable)
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.state.read().balances.get(owner).copied().unwrap_or(0)
    }

    pub fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.state.read().tokens.get(&token_id).map(|c| c.owner)
    }

    /// Number of live (minted and not revoked) credentials.
    pub fn total_supply(&self) -> u64 {
        self.state.read().tokens.len() as u64
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        self.state.read().snapshot()
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn issuer(&self) -> Address {
        self.issuer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl CredentialOracle for CredentialToken {
    fn address(&self) -> Address {
        self.contract
    }

    fn credential_count(&self, owner: &Address) -> Result<u64, CapabilityError> {
        Ok(self.balance_of(owner))
    }
}
