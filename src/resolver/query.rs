// Ledger query service - read-only view of ledger state
// Implemented outside this crate by a mirror node client

use crate::kms::PublicKey;
use crate::types::{EntityId, EvmAddress, Network};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

// ============================================================================
// QUERY TYPES
// ============================================================================

/// Account state as reported by the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_id: EntityId,
    /// Absent for accounts controlled by complex (threshold/list) keys
    pub account_public_key: Option<PublicKey>,
    pub evm_address: Option<EvmAddress>,
}

/// Contract state as reported by the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractInfo {
    pub contract_id: EntityId,
    pub evm_address: Option<EvmAddress>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Ledger query failed: {0}")]
    Failed(String),

    #[error("Ledger query service unavailable for {0}")]
    Unavailable(Network),
}

// ============================================================================
// LEDGER QUERY SERVICE TRAIT
// ============================================================================

/// Read-only ledger lookups
///
/// `Ok(None)` means the ledger has no such entity.
#[async_trait]
pub trait LedgerQueryService: Send + Sync {
    async fn get_account(
        &self,
        network: Network,
        id_or_evm_address: &str,
    ) -> Result<Option<AccountInfo>, QueryError>;

    async fn get_contract_info(
        &self,
        network: Network,
        id_or_evm_address: &str,
    ) -> Result<Option<ContractInfo>, QueryError>;
}

// ============================================================================
// MOCK LEDGER QUERY SERVICE
// ============================================================================

/// In-memory ledger view for testing and offline use
pub struct MockLedgerQueryService {
    accounts: Vec<(Network, AccountInfo)>,
    contracts: Vec<(Network, ContractInfo)>,
    failure_message: Option<String>,
    account_calls: AtomicUsize,
    contract_calls: AtomicUsize,
}

impl MockLedgerQueryService {
    /// Create an empty ledger view
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            contracts: Vec::new(),
            failure_message: None,
            account_calls: AtomicUsize::new(0),
            contract_calls: AtomicUsize::new(0),
        }
    }

    /// Add an account on a network
    pub fn with_account(mut self, network: Network, account: AccountInfo) -> Self {
        self.accounts.push((network, account));
        self
    }

    /// Add a contract on a network
    pub fn with_contract(mut self, network: Network, contract: ContractInfo) -> Self {
        self.contracts.push((network, contract));
        self
    }

    /// Reject every query with a message
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure_message = Some(message.to_string());
        self
    }

    /// Number of account lookups served so far
    pub fn account_calls(&self) -> usize {
        self.account_calls.load(Ordering::SeqCst)
    }

    /// Number of contract lookups served so far
    pub fn contract_calls(&self) -> usize {
        self.contract_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), QueryError> {
        match &self.failure_message {
            Some(message) => Err(QueryError::Failed(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockLedgerQueryService {
    fn default() -> Self {
        Self::new()
    }
}

/// Match a query string against an entity id and its EVM addresses
fn matches_query(query: &str, id: &EntityId, evm_address: Option<&EvmAddress>) -> bool {
    if let Ok(queried) = query.parse::<EntityId>() {
        return &queried == id;
    }
    if let Ok(queried) = query.parse::<EvmAddress>() {
        return evm_address == Some(&queried) || queried == id.to_long_zero_address();
    }
    false
}

#[async_trait]
impl LedgerQueryService for MockLedgerQueryService {
    async fn get_account(
        &self,
        network: Network,
        id_or_evm_address: &str,
    ) -> Result<Option<AccountInfo>, QueryError> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        Ok(self
            .accounts
            .iter()
            .find(|(n, account)| {
                *n == network
                    && matches_query(
                        id_or_evm_address,
                        &account.account_id,
                        account.evm_address.as_ref(),
                    )
            })
            .map(|(_, account)| account.clone()))
    }

    async fn get_contract_info(
        &self,
        network: Network,
        id_or_evm_address: &str,
    ) -> Result<Option<ContractInfo>, QueryError> {
        self.contract_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        Ok(self
            .contracts
            .iter()
            .find(|(n, contract)| {
                *n == network
                    && matches_query(
                        id_or_evm_address,
                        &contract.contract_id,
                        contract.evm_address.as_ref(),
                    )
            })
            .map(|(_, contract)| contract.clone()))
    }
}
