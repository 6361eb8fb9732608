//! Batch Composer
//!
//! Selects a construction strategy from the `(source, destination)` chain
//! family pair, builds every order through the Order Builder and wraps them
//! into one [`Batch`]. Composition is all-or-nothing: if any order fails the
//! whole call fails and no partial batch is returned.
//!
//! ## Dispatch table
//!
//! | pair          | orders | built       |
//! |---------------|--------|-------------|
//! | evm → cosmos  | 1 or 2 | in parallel |
//! | evm → evm     | 1 or 2 | in parallel |
//! | cosmos → evm  | 1      | single      |
//! | cosmos → cosmos | 1    | single      |
//!
//! Adding a chain family means adding rows to [`DISPATCH_TABLE`] and an
//! arm to [`Route`].

use alloy::primitives::Address;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capability::ChainReader;
use crate::error::OrderError;
use crate::instruction::{Batch, FungibleAssetOrder, Instruction};
use crate::order::build_order;
use crate::types::{
    ChainAddress, ChainType, Channel, ChannelEndpoint, CosmosAddress, RawTransferIntent,
};

// ============================================================================
// Dispatch
// ============================================================================

/// Address families an order is typed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    EvmToCosmos,
    EvmToEvm,
    CosmosToEvm,
    CosmosToCosmos,
}

/// How a chain pair builds its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub route: Route,
    /// Intents beyond this count are ignored
    pub max_orders: usize,
}

/// Every supported `(source, destination)` pair
pub const DISPATCH_TABLE: &[((ChainType, ChainType), Strategy)] = &[
    (
        (ChainType::Evm, ChainType::Cosmos),
        Strategy {
            route: Route::EvmToCosmos,
            max_orders: 2,
        },
    ),
    (
        (ChainType::Evm, ChainType::Evm),
        Strategy {
            route: Route::EvmToEvm,
            max_orders: 2,
        },
    ),
    (
        (ChainType::Cosmos, ChainType::Evm),
        Strategy {
            route: Route::CosmosToEvm,
            max_orders: 1,
        },
    ),
    (
        (ChainType::Cosmos, ChainType::Cosmos),
        Strategy {
            route: Route::CosmosToCosmos,
            max_orders: 1,
        },
    ),
];

/// Look up the strategy for a chain pair
pub fn strategy_for(source: ChainType, destination: ChainType) -> Result<Strategy, OrderError> {
    DISPATCH_TABLE
        .iter()
        .find(|(pair, _)| *pair == (source, destination))
        .map(|(_, strategy)| *strategy)
        .ok_or(OrderError::UnsupportedChainPair {
            source_chain: source,
            destination_chain: destination,
        })
}

// ============================================================================
// Composition
// ============================================================================

/// Inputs gathered by the transfer form; any may still be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub source_chain: Option<ChainType>,
    pub destination_chain: Option<ChainType>,
    pub channel: Option<Channel>,
    /// zkgm contract the form has resolved for the source chain
    ///
    /// Only gates readiness: composition waits until it is set, but the
    /// contracts that are queried and later called come from the channel's
    /// port ids.
    pub bridge_address: Option<String>,
    pub intents: Vec<RawTransferIntent>,
}

/// Compose a batch for the request
///
/// Returns `Ok(None)` while the request is incomplete. Unsupported chain
/// pairs and failed orders are errors, never an empty result.
pub async fn compose_batch(
    request: &BatchRequest,
    source: &dyn ChainReader,
    destination: &dyn ChainReader,
) -> Result<Option<Batch>, OrderError> {
    let (Some(source_chain), Some(destination_chain), Some(channel), Some(_)) = (
        request.source_chain,
        request.destination_chain,
        request.channel.as_ref(),
        request.bridge_address.as_deref().filter(|b| !b.is_empty()),
    ) else {
        debug!("Batch request incomplete, nothing to compose");
        return Ok(None);
    };
    if request.intents.is_empty() {
        debug!("Batch request has no intents, nothing to compose");
        return Ok(None);
    }

    let strategy = strategy_for(source_chain, destination_chain)?;

    let endpoint = channel
        .destination_endpoint(destination_chain)
        .map_err(|e| OrderError::InvalidChannel(e.to_string()))?;

    if request.intents.len() > strategy.max_orders {
        warn!(
            intents = request.intents.len(),
            max_orders = strategy.max_orders,
            route = ?strategy.route,
            "Ignoring intents beyond the strategy limit"
        );
    }
    let intents = &request.intents[..request.intents.len().min(strategy.max_orders)];

    let orders = match strategy.route {
        Route::EvmToCosmos => {
            build_orders::<Address, CosmosAddress>(intents, source, destination, &endpoint).await?
        }
        Route::EvmToEvm => {
            build_orders::<Address, Address>(intents, source, destination, &endpoint).await?
        }
        Route::CosmosToEvm => {
            build_orders::<CosmosAddress, Address>(intents, source, destination, &endpoint).await?
        }
        Route::CosmosToCosmos => {
            build_orders::<CosmosAddress, CosmosAddress>(intents, source, destination, &endpoint)
                .await?
        }
    };

    info!(
        source = %source_chain,
        destination = %destination_chain,
        orders = orders.len(),
        "Composed batch"
    );

    Ok(Some(Batch::new(
        orders.into_iter().map(Instruction::from).collect(),
    )))
}

/// Build every intent concurrently, preserving input order
async fn build_orders<S: ChainAddress, D: ChainAddress>(
    intents: &[RawTransferIntent],
    source: &dyn ChainReader,
    destination: &dyn ChainReader,
    endpoint: &ChannelEndpoint,
) -> Result<Vec<FungibleAssetOrder>, OrderError> {
    let typed = intents
        .iter()
        .map(RawTransferIntent::typed::<S, D>)
        .collect::<Result<Vec<_>, _>>()?;

    try_join_all(
        typed
            .iter()
            .map(|intent| build_order(intent, source, destination, endpoint)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_codec::parse_evm_address;
    use crate::instruction::{decode, encode};
    use crate::testing::MockChainReader;
    use crate::types::TokenMetadata;
    use alloy::primitives::U256;
    use std::time::Duration;

    const EVM_SENDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const EVM_RECEIVER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const TOKEN_A: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const TOKEN_B: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";
    const UNION_RECEIVER: &str = "union1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc544dkgd";
    const BBN_SENDER: &str = "bbn1zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3krxndk";
    const UNION_ZKGM: &str = "union1gfpyysjzgfpyysjzgfpyysjzgfpyysjzgfpyysjzgfpyysjzgfpqef6vpf";

    fn metadata(symbol: &str, name: &str, decimals: u8) -> TokenMetadata {
        TokenMetadata {
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
        }
    }

    fn intent(sender: &str, receiver: &str, token: &str, amount: u64) -> RawTransferIntent {
        RawTransferIntent {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            base_token: token.to_string(),
            base_amount: U256::from(amount),
            quote_amount: U256::from(amount - 10),
        }
    }

    fn channel_to_cosmos() -> Channel {
        Channel {
            source_channel_id: 1,
            destination_channel_id: 2,
            source_port_id: EVM_SENDER.to_lowercase(),
            destination_port_id: format!("0x{}", hex::encode(UNION_ZKGM)),
        }
    }

    fn channel_to_evm() -> Channel {
        Channel {
            source_channel_id: 4,
            destination_channel_id: 5,
            source_port_id: format!("0x{}", hex::encode(UNION_ZKGM)),
            destination_port_id: EVM_RECEIVER.to_lowercase(),
        }
    }

    fn evm_to_cosmos(intents: Vec<RawTransferIntent>) -> BatchRequest {
        BatchRequest {
            source_chain: Some(ChainType::Evm),
            destination_chain: Some(ChainType::Cosmos),
            channel: Some(channel_to_cosmos()),
            bridge_address: Some(EVM_SENDER.to_string()),
            intents,
        }
    }

    fn evm_source() -> MockChainReader {
        MockChainReader::new(ChainType::Evm)
            .with_token(TOKEN_A, metadata("MOCK", "Mock ERC20", 18))
            .with_token(TOKEN_B, metadata("MCKT", "Mock Token", 6))
    }

    fn orders_of(batch: &Batch) -> Vec<FungibleAssetOrder> {
        Instruction::Batch(batch.clone())
            .orders()
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_dispatch_table_covers_core_pairs() {
        for source in [ChainType::Evm, ChainType::Cosmos] {
            for destination in [ChainType::Evm, ChainType::Cosmos] {
                assert!(strategy_for(source, destination).is_ok());
            }
        }
        assert_eq!(
            strategy_for(ChainType::Cosmos, ChainType::Evm)
                .unwrap()
                .max_orders,
            1
        );
        assert!(matches!(
            strategy_for(ChainType::Aptos, ChainType::Aptos),
            Err(OrderError::UnsupportedChainPair { .. })
        ));
    }

    #[tokio::test]
    async fn test_incomplete_request_short_circuits() {
        let source = evm_source();
        let destination = MockChainReader::new(ChainType::Cosmos).with_default_quote(b"q");

        let mut request = evm_to_cosmos(vec![intent(EVM_SENDER, UNION_RECEIVER, TOKEN_A, 1000)]);
        request.channel = None;
        assert!(compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .is_none());

        let mut request = evm_to_cosmos(vec![intent(EVM_SENDER, UNION_RECEIVER, TOKEN_A, 1000)]);
        request.bridge_address = Some(String::new());
        assert!(compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .is_none());

        let request = evm_to_cosmos(vec![]);
        assert!(compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .is_none());

        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bridge_address_gates_but_channel_routes() {
        let source = evm_source();
        let destination = MockChainReader::new(ChainType::Cosmos).with_default_quote(b"q");

        let mut request = evm_to_cosmos(vec![intent(EVM_SENDER, UNION_RECEIVER, TOKEN_A, 1000)]);
        request.bridge_address = None;
        assert!(compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .is_none());
        assert!(destination.prediction_log().is_empty());

        // a bridge address unrelated to the channel still composes
        request.bridge_address = Some(TOKEN_B.to_string());
        let batch = compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch.len(), 1);

        let channel = channel_to_cosmos();
        assert_eq!(
            destination.prediction_log(),
            vec![(
                channel.destination_channel_id,
                parse_evm_address(TOKEN_A).unwrap().to_vec()
            )]
        );
    }

    #[tokio::test]
    async fn test_unsupported_pair_is_fatal() {
        let source = MockChainReader::new(ChainType::Aptos);
        let destination = MockChainReader::new(ChainType::Aptos);
        let request = BatchRequest {
            source_chain: Some(ChainType::Aptos),
            destination_chain: Some(ChainType::Aptos),
            channel: Some(channel_to_cosmos()),
            bridge_address: Some("0x1".to_string()),
            intents: vec![intent("0x1", "0x2", "0x3", 1000)],
        };

        let err = compose_batch(&request, &source, &destination)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::UnsupportedChainPair {
                source_chain: ChainType::Aptos,
                destination_chain: ChainType::Aptos
            }
        ));
    }

    #[tokio::test]
    async fn test_evm_to_cosmos_single_intent() {
        let source = evm_source();
        let destination =
            MockChainReader::new(ChainType::Cosmos).with_default_quote(b"union1wrappedquote");
        let request = evm_to_cosmos(vec![intent(EVM_SENDER, UNION_RECEIVER, TOKEN_A, 1000)]);

        let batch = compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .unwrap();

        let orders = orders_of(&batch);
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.receiver.as_ref(), UNION_RECEIVER.as_bytes());
        assert_eq!(order.base_amount, U256::from(1000));
        assert_eq!(order.quote_amount, U256::from(990));
        assert_eq!(order.base_token_symbol, "MOCK");
        assert_eq!(order.base_token_name, "Mock ERC20");
        assert_eq!(order.base_token_decimals, 18);
        assert_eq!(order.source_channel_id, U256::ZERO);
        assert_eq!(order.quote_token.as_ref(), b"union1wrappedquote");

        // quote predicted on the destination channel
        assert_eq!(destination.prediction_log()[0].0, 2);

        let instruction = Instruction::Batch(batch);
        assert_eq!(decode(&encode(&instruction)).unwrap(), instruction);
    }

    #[tokio::test]
    async fn test_evm_to_cosmos_two_intents_keep_input_order() {
        // first intent resolves last; order must still follow the input
        let source = evm_source().with_metadata_delay(TOKEN_A, Duration::from_millis(50));
        let destination = MockChainReader::new(ChainType::Cosmos).with_default_quote(b"union1q");
        let request = evm_to_cosmos(vec![
            intent(EVM_SENDER, UNION_RECEIVER, TOKEN_A, 1000),
            intent(EVM_SENDER, UNION_RECEIVER, TOKEN_B, 500),
        ]);

        let batch = compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .unwrap();

        let symbols: Vec<String> = orders_of(&batch)
            .into_iter()
            .map(|o| o.base_token_symbol)
            .collect();
        assert_eq!(symbols, vec!["MOCK", "MCKT"]);
    }

    #[tokio::test]
    async fn test_extra_intents_are_ignored() {
        let source = evm_source();
        let destination = MockChainReader::new(ChainType::Cosmos).with_default_quote(b"union1q");
        let request = evm_to_cosmos(vec![
            intent(EVM_SENDER, UNION_RECEIVER, TOKEN_A, 1000),
            intent(EVM_SENDER, UNION_RECEIVER, TOKEN_B, 500),
            intent(EVM_SENDER, UNION_RECEIVER, "0x0000000000000000000000000000000000000bad", 300),
        ]);

        let batch = compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_second_branch_failure_fails_whole_batch() {
        let source = MockChainReader::new(ChainType::Evm)
            .with_token(TOKEN_A, metadata("MOCK", "Mock ERC20", 18));
        let destination = MockChainReader::new(ChainType::Cosmos).with_default_quote(b"union1q");
        let request = evm_to_cosmos(vec![
            intent(EVM_SENDER, UNION_RECEIVER, TOKEN_A, 1000),
            intent(EVM_SENDER, UNION_RECEIVER, TOKEN_B, 500),
        ]);

        let err = compose_batch(&request, &source, &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::MetadataResolution { ref token, .. } if token == TOKEN_B));
    }

    #[tokio::test]
    async fn test_zero_amount_intent_fails_batch() {
        let source = evm_source();
        let destination = MockChainReader::new(ChainType::Cosmos).with_default_quote(b"union1q");
        let mut zero = intent(EVM_SENDER, UNION_RECEIVER, TOKEN_B, 500);
        zero.base_amount = U256::ZERO;
        let request = evm_to_cosmos(vec![intent(EVM_SENDER, UNION_RECEIVER, TOKEN_A, 1000), zero]);

        let err = compose_batch(&request, &source, &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidAmount));
    }

    #[tokio::test]
    async fn test_cosmos_to_evm_builds_single_order() {
        let source = MockChainReader::new(ChainType::Cosmos).with_native_denom("ubbn");
        let quote: [u8; 20] = [0xab; 20];
        let destination = MockChainReader::new(ChainType::Evm).with_quote(b"ubbn", &quote);
        let request = BatchRequest {
            source_chain: Some(ChainType::Cosmos),
            destination_chain: Some(ChainType::Evm),
            channel: Some(channel_to_evm()),
            bridge_address: Some(UNION_ZKGM.to_string()),
            intents: vec![
                intent(BBN_SENDER, EVM_RECEIVER, "ubbn", 1000),
                intent(BBN_SENDER, EVM_RECEIVER, "ubbn", 2000),
            ],
        };

        let batch = compose_batch(&request, &source, &destination)
            .await
            .unwrap()
            .unwrap();

        let orders = orders_of(&batch);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].sender.as_ref(), BBN_SENDER.as_bytes());
        assert_eq!(orders[0].base_token.as_ref(), b"ubbn");
        assert_eq!(orders[0].base_token_symbol, "ubbn");
        assert_eq!(orders[0].base_token_decimals, 0);
        assert_eq!(orders[0].quote_token.as_ref(), &quote);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_receiver_for_destination_family() {
        let source = evm_source();
        let destination = MockChainReader::new(ChainType::Cosmos).with_default_quote(b"union1q");
        let request = evm_to_cosmos(vec![intent(EVM_SENDER, EVM_RECEIVER, TOKEN_A, 1000)]);

        let err = compose_batch(&request, &source, &destination)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InvalidAddress {
                chain: ChainType::Cosmos,
                ..
            }
        ));
        assert_eq!(source.call_count(), 0);
    }
}
