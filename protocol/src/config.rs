//! # Protocol Configuration & Constants
//!
//! Every magic number in HumanLink lives here. Sizes that cross network
//! boundaries (meta-address length, hash width, public-input count) must
//! match what off-chain provers and other registry deployments expect, so
//! treat them as wire format, not tuning knobs.

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Ethereum mainnet. The default home network for credential-gated linking.
pub const NETWORK_ID_ETHEREUM: u64 = 1;

/// Optimism mainnet.
pub const NETWORK_ID_OPTIMISM: u64 = 10;

/// Polygon PoS.
pub const NETWORK_ID_POLYGON: u64 = 137;

/// Base mainnet.
pub const NETWORK_ID_BASE: u64 = 8453;

/// Arbitrum One.
pub const NETWORK_ID_ARBITRUM: u64 = 42161;

/// Sepolia testnet: where we break things on purpose.
pub const NETWORK_ID_SEPOLIA: u64 = 11_155_111;

/// Local development network (anvil/hardhat default).
pub const NETWORK_ID_DEVNET: u64 = 31337;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The registry protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Data Sizes
// ---------------------------------------------------------------------------

/// Length of an account address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a stealth meta-address: a 33-byte compressed spending key
/// followed by a 33-byte compressed viewing key. The registry checks this
/// length and nothing else.
pub const META_ADDRESS_LENGTH: usize = 66;

/// Keccak-256 output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Number of public inputs a claim proof is verified against:
/// `[derived_address, commitment_hash]`.
pub const PUBLIC_INPUT_COUNT: usize = 2;

/// Width of a single public input word (a 256-bit big-endian integer).
pub const PUBLIC_INPUT_WORD_LENGTH: usize = 32;

/// URI scheme prefix for encoded stealth meta-addresses (`st:eth:0x...`).
pub const META_ADDRESS_URI_SCHEME: &str = "st";

/// Chain short name used when rendering meta-address URIs.
pub const META_ADDRESS_CHAIN_TAG: &str = "eth";

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default REST/WebSocket API port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Default page size for notification log queries.
pub const DEFAULT_EVENT_PAGE_SIZE: usize = 100;

/// Hard cap on notification log page size. Keeps a single request from
/// walking the entire log.
pub const MAX_EVENT_PAGE_SIZE: usize = 1_000;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns a friendly name for a network ID, mainly for logging.
/// Unknown networks are rendered as `chain-<id>`.
pub fn network_name(network_id: u64) -> String {
    match network_id {
        NETWORK_ID_ETHEREUM => "ethereum".to_string(),
        NETWORK_ID_OPTIMISM => "optimism".to_string(),
        NETWORK_ID_POLYGON => "polygon".to_string(),
        NETWORK_ID_BASE => "base".to_string(),
        NETWORK_ID_ARBITRUM => "arbitrum".to_string(),
        NETWORK_ID_SEPOLIA => "sepolia".to_string(),
        NETWORK_ID_DEVNET => "devnet".to_string(),
        other => format!("chain-{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_ids_are_distinct() {
        let ids = [
            NETWORK_ID_ETHEREUM,
            NETWORK_ID_OPTIMISM,
            NETWORK_ID_POLYGON,
            NETWORK_ID_BASE,
            NETWORK_ID_ARBITRUM,
            NETWORK_ID_SEPOLIA,
            NETWORK_ID_DEVNET,
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_meta_address_is_two_compressed_keys() {
        assert_eq!(META_ADDRESS_LENGTH, 2 * 33);
    }

    #[test]
    fn test_network_name_formatting() {
        assert_eq!(network_name(NETWORK_ID_ETHEREUM), "ethereum");
        assert_eq!(network_name(NETWORK_ID_BASE), "base");
        assert_eq!(network_name(999), "chain-999");
    }

    #[test]
    fn test_event_page_bounds() {
        assert!(DEFAULT_EVENT_PAGE_SIZE <= MAX_EVENT_PAGE_SIZE);
        assert!(DEFAULT_EVENT_PAGE_SIZE > 0);
    }
}
