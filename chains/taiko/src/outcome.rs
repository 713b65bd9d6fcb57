use ethers::types::{Address, H256, U256};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::client::TxReceipt;

/// Where a failed transfer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Fee,
    Submission,
    Confirmation,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Fee => "fee",
            FailureStage::Submission => "submission",
            FailureStage::Confirmation => "confirmation",
        };
        f.write_str(name)
    }
}

/// Result of one attempted transfer, written into the run report as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub index: usize,
    pub success: bool,
    pub from: Address,
    pub to: Address,
    #[serde(serialize_with = "serialize_decimal")]
    pub value: U256,
    pub nonce: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<H256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_decimal"
    )]
    pub gas_used: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_stage: Option<FailureStage>,
}

impl TransferOutcome {
    /// A mined transaction. Reverted receipts still count: the nonce was consumed.
    pub fn confirmed(
        index: usize,
        from: Address,
        to: Address,
        value: U256,
        nonce: u64,
        receipt: &TxReceipt,
        latency_ms: u64,
    ) -> Self {
        Self {
            index,
            success: true,
            from,
            to,
            value,
            nonce: Some(nonce),
            hash: Some(receipt.hash),
            block_number: Some(receipt.block_number),
            gas_used: Some(receipt.gas_used),
            status: receipt.status,
            latency_ms: Some(latency_ms),
            error: None,
            failure_stage: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn failed(
        index: usize,
        from: Address,
        to: Address,
        value: U256,
        nonce: Option<u64>,
        hash: Option<H256>,
        stage: FailureStage,
        error: &anyhow::Error,
    ) -> Self {
        Self {
            index,
            success: false,
            from,
            to,
            value,
            nonce,
            hash,
            block_number: None,
            gas_used: None,
            status: None,
            latency_ms: None,
            error: Some(format!("{:#}", error)),
            failure_stage: Some(stage),
        }
    }
}

pub(crate) fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn serialize_opt_decimal<S: Serializer>(
    value: &Option<U256>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&v.to_string()),
        None => serializer.serialize_none(),
    }
}
