//! [`Provider`] over Ethereum JSON-RPC.
//!
//! Signing is delegated to whatever sits behind the endpoint: a local dev
//! node with unlocked accounts, or a wallet bridge that exposes
//! `eth_sendTransaction`. A wallet answering EIP-1193 code 4001 surfaces as
//! [`ProviderError::UserRejected`].

use {
    crate::{
        error::ProviderError,
        provider::{ContractCall, Provider, TransactionReceipt, TxHash},
    },
    alloy_primitives::{Address, Bytes, U256, U64},
    async_trait::async_trait,
    log::*,
    reqwest::StatusCode,
    serde::{de::DeserializeOwned, Deserialize},
    serde_json::{json, Value},
    std::{
        sync::atomic::{AtomicU64, Ordering},
        time::Duration,
    },
    url::Url,
};

/// How long [`HttpProvider::wait_for_receipt`] waits before giving up.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Delay between two `eth_getTransactionReceipt` polls.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct HttpProvider {
    client: reqwest::Client,
    url: Url,
    /// Account to send from; `None` means the node's first account.
    sender: Option<Address>,
    next_id: AtomicU64,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl HttpProvider {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            sender: None,
            next_id: AtomicU64::new(1),
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    /// Act for `sender` instead of the node's first account.
    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_receipt_timing(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.receipt_poll_interval = poll_interval;
        self.receipt_timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!("rpc request {id} {method} -> {}", self.url);

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(format!("{method}: {err}")))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ProviderError::Transport(format!("{method}: {err}")))?;
        let response = decode_body(method, status, &body)?;
        parse_response(method, response)
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt, ProviderError> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(receipt) = receipt {
                return Ok(receipt.into());
            }
            trace!("transaction {tx_hash} not mined yet");
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn get_address(&self) -> Result<Option<Address>, ProviderError> {
        if let Some(sender) = self.sender {
            return Ok(Some(sender));
        }
        let accounts: Vec<Address> = self.request("eth_accounts", json!([])).await?;
        Ok(accounts.first().copied())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let chain_id: U64 = self.request("eth_chainId", json!([])).await?;
        Ok(chain_id.to::<u64>())
    }

    async fn read_contract(&self, call: ContractCall) -> Result<Bytes, ProviderError> {
        self.request(
            "eth_call",
            json!([{ "to": call.to, "data": call.data }, "latest"]),
        )
        .await
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ProviderError> {
        self.request("eth_getBalance", json!([address, "latest"]))
            .await
    }

    async fn send_transaction(
        &self,
        from: Address,
        call: ContractCall,
    ) -> Result<TxHash, ProviderError> {
        let tx_hash: TxHash = self
            .request(
                "eth_sendTransaction",
                json!([{ "from": from, "to": call.to, "data": call.data }]),
            )
            .await?;
        debug!("broadcast {tx_hash} from {from}");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt, ProviderError> {
        tokio::time::timeout(self.receipt_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| ProviderError::Timeout(self.receipt_timeout))?
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RpcErrorObject> for ProviderError {
    fn from(error: RpcErrorObject) -> Self {
        if error.code == ProviderError::USER_REJECTED_CODE {
            return ProviderError::UserRejected(error.message);
        }
        ProviderError::Rpc {
            code: error.code,
            message: error.message,
            data: error.data.as_ref().and_then(revert_data),
        }
    }
}

/// Revert payload in an error's `data`: either a hex string or, for some
/// nodes, an object wrapping one under `data`.
fn revert_data(data: &Value) -> Option<Bytes> {
    match data {
        Value::String(hex) if hex.starts_with("0x") => hex.parse().ok(),
        Value::Object(object) => object.get("data").and_then(revert_data),
        _ => None,
    }
}

/// Rate limiting and server errors are transport failures whatever the body
/// says. Other failed statuses count as transport failures unless the body is
/// a JSON-RPC reply.
fn decode_body(
    method: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<RpcResponse, ProviderError> {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(ProviderError::Transport(format!("{method}: HTTP {status}")));
    }
    serde_json::from_slice(body).map_err(|err| {
        if status.is_success() {
            ProviderError::InvalidResponse(format!("{method}: {err}"))
        } else {
            ProviderError::Transport(format!("{method}: HTTP {status}"))
        }
    })
}

fn parse_response<T: DeserializeOwned>(
    method: &str,
    response: RpcResponse,
) -> Result<T, ProviderError> {
    if let Some(error) = response.error {
        return Err(error.into());
    }
    let result = response.result.unwrap_or(Value::Null);
    serde_json::from_value(result)
        .map_err(|err| ProviderError::InvalidResponse(format!("{method}: {err}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    gas_used: Option<U64>,
}

impl From<RpcReceipt> for TransactionReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            status: receipt.status == Some(U64::from(1u64)),
            block_number: receipt.block_number.map(|n| n.to::<u64>()),
            gas_used: receipt.gas_used.map(|n| n.to::<u64>()),
        }
    }
}
