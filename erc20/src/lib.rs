use std::str::FromStr;

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use tracing::info;

// Function selectors for the three ERC-20 calls we make.
const BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
const DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Thin read/write client over an ERC-20 token contract. Constructed once at
/// startup and handed to whoever needs chain access; no hidden globals.
#[derive(Clone)]
pub struct Erc20Client {
    rpc_url: String,
}

impl Erc20Client {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
        }
    }

    pub async fn balance_of(&self, token: &str, holder: &str) -> anyhow::Result<U256> {
        let token = Address::from_str(token)?;
        let holder = Address::from_str(holder)?;

        let mut data = Vec::with_capacity(36);
        data.extend_from_slice(&BALANCE_OF);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(holder.as_slice());

        let raw = self.call(token, data).await?;
        Ok(U256::from_be_slice(&raw))
    }

    pub async fn decimals(&self, token: &str) -> anyhow::Result<u8> {
        let token = Address::from_str(token)?;
        let raw = self.call(token, DECIMALS.to_vec()).await?;

        let value = U256::from_be_slice(&raw);
        if value > U256::from(u8::MAX) {
            anyhow::bail!("decimals() returned out-of-range value: {}", value);
        }
        Ok(value.as_limbs()[0] as u8)
    }

    /// Single round trip pair used by the eligibility check.
    pub async fn balance_and_decimals(
        &self,
        token: &str,
        holder: &str,
    ) -> anyhow::Result<(U256, u8)> {
        let balance = self.balance_of(token, holder).await?;
        let decimals = self.decimals(token).await?;
        Ok((balance, decimals))
    }

    /// Transfer `amount` token units from the signer's account to `to`.
    /// Blocks until the transaction is included.
    pub async fn transfer(
        &self,
        private_key: &str,
        token: &str,
        to: &str,
        amount: U256,
    ) -> anyhow::Result<String> {
        let wallet = PrivateKeySigner::from_str(private_key)?;
        let from_address = wallet.address();
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .on_http(self.rpc_url.parse()?);

        let token = Address::from_str(token)?;
        let to = Address::from_str(to)?;

        let mut data = Vec::with_capacity(68);
        data.extend_from_slice(&TRANSFER);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(to.as_slice());
        data.extend_from_slice(&amount.to_be_bytes::<32>());

        let tx = TransactionRequest::default()
            .with_from(from_address)
            .with_to(token)
            .with_input(Bytes::from(data));

        let tx_hash = provider.send_transaction(tx).await?.watch().await?;
        info!("Sent token transfer: {tx_hash}");

        Ok(tx_hash.to_string())
    }

    /// Returns the first ABI word of the call result.
    async fn call(&self, to: Address, data: Vec<u8>) -> anyhow::Result<Vec<u8>> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(Bytes::from(data));
        let mut raw = provider.call(tx).await?.to_vec();
        raw.truncate(32);
        Ok(raw)
    }
}

/// Minimum raw token units a wallet must hold to count as a premium holder:
/// `threshold * 10^decimals`, in U256 so nothing goes through a float.
pub fn minimum_token_units(threshold: u64, decimals: u8) -> U256 {
    U256::from(threshold) * U256::from(10u8).pow(U256::from(decimals))
}

/// Raw token amount owed for `score` ledger points at `multiplier` tokens per
/// point, scaled to the token's decimals. Out-of-range inputs clamp (score to
/// 0, multiplier to the default of 1) instead of wrapping into huge amounts.
pub fn points_to_token_units(score: i64, multiplier: i64, decimals: u8) -> U256 {
    let score = u64::try_from(score).unwrap_or(0);
    let multiplier = u64::try_from(multiplier).unwrap_or(1);
    U256::from(score) * U256::from(multiplier) * U256::from(10u8).pow(U256::from(decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_minimum_is_exact_integer_math() {
        // 1_000_000 whole tokens with 6 decimals
        let min = minimum_token_units(1_000_000, 6);
        assert_eq!(min, U256::from(1_000_000u64) * U256::from(1_000_000u64));
        assert_eq!(min.to_string(), "1000000000000");
    }

    #[test]
    fn premium_boundary_is_inclusive() {
        let min = minimum_token_units(1_000_000, 6);
        let balance_below = min - U256::from(1u8);
        let balance_at = min;
        let balance_above = min + U256::from(1u8);
        assert!(balance_below < min);
        assert!(balance_at >= min);
        assert!(balance_above >= min);
    }

    #[test]
    fn eighteen_decimals_does_not_lose_precision() {
        let min = minimum_token_units(1_000_000, 18);
        assert_eq!(min.to_string(), "1000000000000000000000000");
    }

    #[test]
    fn payout_scales_score_by_multiplier_and_decimals() {
        let amount = points_to_token_units(10, 5, 6);
        assert_eq!(amount.to_string(), "50000000");
    }

    #[test]
    fn payout_clamps_out_of_range_inputs() {
        // A negative multiplier must not wrap into an enormous transfer.
        let amount = points_to_token_units(10, -5, 6);
        assert_eq!(amount, points_to_token_units(10, 1, 6));

        let amount = points_to_token_units(-10, 5, 6);
        assert_eq!(amount, U256::ZERO);
    }
}
