use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract call error: {0}")]
    ContractError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Timed out after {waited_secs}s waiting for {what}")]
    Timeout { what: String, waited_secs: u64 },
}

impl RepositoryError {
    /// Classifies an `alloy::contract::Error`: reverts and decode failures are
    /// contract errors, everything else is treated as transport trouble.
    pub fn from_contract(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(e) => {
                if e.as_error_resp().is_some() {
                    // JSON-RPC error payload, e.g. "execution reverted"
                    RepositoryError::ContractError(e.to_string())
                } else {
                    RepositoryError::RpcError(e.to_string())
                }
            }
            other => RepositoryError::ContractError(other.to_string()),
        }
    }
}
