// Resolver module - names and signer arguments to canonical identities
//
// - IdentityResolver: alias / entity id / EVM address -> ledger identity
// - KeyResolver: signer argument -> key handle ready to sign
// - OperatorStore: the per-network default signer

mod error;
mod identity;
mod key_resolver;
mod operator;
mod query;
mod reference;

pub use error::{KeyResolverError, ResolveError};
pub use identity::{IdentityResolver, ResolvedAccount, ResolvedContract};
pub use key_resolver::{KeyResolver, ResolvedSigner};
pub use operator::{Operator, OperatorStore};
pub use query::{AccountInfo, ContractInfo, LedgerQueryService, MockLedgerQueryService, QueryError};
pub use reference::{EntityOrEvmAddress, EntityReference, ReferenceKind};
