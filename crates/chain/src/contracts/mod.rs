//! VRF coordinator ABI, event topics, and the strict-mode log decoder.
//!
//! Two commitment tuple layouts are supported, selected by the `USE_VRF_V25`
//! configuration flag at startup (never re-checked per call): the legacy
//! 5-tuple and a v2.5 variant. Both are declared via `alloy::sol!` so the
//! field layout is generated from the ABI, not hand-encoded.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolEvent;

use crate::error::DecodeError;

sol! {
    /// Request commitment as required by the v2 coordinator.
    #[derive(Debug)]
    struct RequestCommitmentV2 {
        uint64 blockNum;
        uint64 subId;
        uint32 callbackGasLimit;
        uint32 numWords;
        address sender;
    }

    /// v2.5 coordinators widen `subId` to uint256; everything else keeps
    /// the same shape.
    #[derive(Debug)]
    struct RequestCommitmentV25 {
        uint64 blockNum;
        uint256 subId;
        uint32 callbackGasLimit;
        uint32 numWords;
        address sender;
    }

    interface IVrfCoordinatorV2 {
        event RandomWordsRequested(bytes32 keyHash, uint256 requestId, uint256 preSeed, uint64 indexed subId, uint16 minimumRequestConfirmations, uint32 callbackGasLimit, uint32 numWords, address indexed sender);
        event RandomWordsFulfilled(uint256 indexed requestId, uint256 outputSeed, uint96 payment, bool success);

        function fulfillRandomWords(uint256 requestId, uint256 randomness, RequestCommitmentV2 calldata rc) external;
    }

    interface IVrfCoordinatorV25 {
        event RandomWordsRequested(bytes32 keyHash, uint256 requestId, uint256 preSeed, uint256 indexed subId, uint16 minimumRequestConfirmations, uint32 callbackGasLimit, uint32 numWords, address indexed sender);
        event RandomWordsFulfilled(uint256 indexed requestId, uint256 outputSeed, uint256 indexed subId, uint96 payment, bool nativePayment, bool success, bool onlyPremium);

        function fulfillRandomWords(uint256 requestId, uint256 randomness, RequestCommitmentV25 calldata rc) external;
    }
}

/// Which coordinator ABI variant to decode/encode against. Resolved once
/// from config at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiVariant {
    V2,
    V25,
}

/// Topic-0 values for the two events this engine subscribes to, computed
/// from the canonical event signature strings rather than hard-coded.
#[derive(Debug, Clone, Copy)]
pub struct EventSignatures {
    pub requested_topic: B256,
    pub fulfilled_topic: B256,
}

impl EventSignatures {
    pub fn for_variant(variant: AbiVariant) -> Self {
        match variant {
            AbiVariant::V2 => Self {
                requested_topic: keccak256(
                    "RandomWordsRequested(bytes32,uint256,uint256,uint64,uint16,uint32,uint32,address)",
                ),
                fulfilled_topic: keccak256("RandomWordsFulfilled(uint256,uint256,uint96,bool)"),
            },
            AbiVariant::V25 => Self {
                requested_topic: keccak256(
                    "RandomWordsRequested(bytes32,uint256,uint256,uint256,uint16,uint32,uint32,address)",
                ),
                fulfilled_topic: keccak256(
                    "RandomWordsFulfilled(uint256,uint256,uint256,uint96,bool,bool,bool)",
                ),
            },
        }
    }

    pub fn all(&self) -> Vec<B256> {
        vec![self.requested_topic, self.fulfilled_topic]
    }
}

/// A decoded `RandomWordsRequested` event. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    pub request_id: U256,
    pub sub_id: U256,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    pub sender: Address,
    pub block_number: u64,
}

/// A decoded `RandomWordsFulfilled` event. Only the request id and block
/// are retained; everything else is used solely to update the dedup set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FulfilledEvent {
    pub request_id: U256,
    pub block_number: u64,
}

/// The exact 5-tuple the coordinator requires as the third argument to
/// `fulfillRandomWords`. Copied verbatim from a `RequestEvent` — never
/// reinterpreted bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCommitment {
    pub block_num: u64,
    pub sub_id: U256,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    pub sender: Address,
}

impl From<&RequestEvent> for RequestCommitment {
    fn from(event: &RequestEvent) -> Self {
        Self {
            block_num: event.block_number,
            sub_id: event.sub_id,
            callback_gas_limit: event.callback_gas_limit,
            num_words: event.num_words,
            sender: event.sender,
        }
    }
}

/// Decoded event, tagged by which of the two topics matched. Unknown
/// topics never reach this type — they're discarded at the type boundary
/// in `decode_log`.
#[derive(Debug, Clone)]
pub enum DecodedLog {
    Requested(RequestEvent),
    Fulfilled(FulfilledEvent),
}

/// Decode a raw log against the configured ABI variant. Returns `Ok(None)`
/// if `topics[0]` matches neither the requested nor fulfilled topic
/// (discarded, not an error). Returns `Err` if the topic matched but the
/// payload failed to ABI-decode — strict mode, per the decoder contract:
/// this is fatal to the offending log and must be surfaced upward.
pub fn decode_log(
    log: &alloy::rpc::types::Log,
    variant: AbiVariant,
    sigs: &EventSignatures,
) -> Result<Option<DecodedLog>, DecodeError> {
    let topic0 = match log.topics().first() {
        Some(t) => *t,
        None => return Ok(None),
    };

    let tx_hash = log.transaction_hash;
    let block_number = log.block_number.unwrap_or_default();

    if topic0 == sigs.requested_topic {
        let decoded = decode_requested(log, variant).map_err(|e| DecodeError {
            tx_hash,
            reason: format!("RandomWordsRequested decode failed: {e}"),
        })?;
        Ok(Some(DecodedLog::Requested(RequestEvent {
            block_number,
            ..decoded
        })))
    } else if topic0 == sigs.fulfilled_topic {
        let request_id = decode_fulfilled(log, variant).map_err(|e| DecodeError {
            tx_hash,
            reason: format!("RandomWordsFulfilled decode failed: {e}"),
        })?;
        Ok(Some(DecodedLog::Fulfilled(FulfilledEvent {
            request_id,
            block_number,
        })))
    } else {
        Ok(None)
    }
}

fn decode_requested(
    log: &alloy::rpc::types::Log,
    variant: AbiVariant,
) -> anyhow::Result<RequestEvent> {
    let inner = &log.inner;
    match variant {
        AbiVariant::V2 => {
            let ev = IVrfCoordinatorV2::RandomWordsRequested::decode_log(inner, true)?;
            Ok(RequestEvent {
                request_id: ev.requestId,
                sub_id: U256::from(ev.subId),
                callback_gas_limit: ev.callbackGasLimit,
                num_words: ev.numWords,
                sender: ev.sender,
                block_number: 0,
            })
        }
        AbiVariant::V25 => {
            let ev = IVrfCoordinatorV25::RandomWordsRequested::decode_log(inner, true)?;
            Ok(RequestEvent {
                request_id: ev.requestId,
                sub_id: ev.subId,
                callback_gas_limit: ev.callbackGasLimit,
                num_words: ev.numWords,
                sender: ev.sender,
                block_number: 0,
            })
        }
    }
}

fn decode_fulfilled(log: &alloy::rpc::types::Log, variant: AbiVariant) -> anyhow::Result<U256> {
    let inner = &log.inner;
    match variant {
        AbiVariant::V2 => {
            let ev = IVrfCoordinatorV2::RandomWordsFulfilled::decode_log(inner, true)?;
            Ok(ev.requestId)
        }
        AbiVariant::V25 => {
            let ev = IVrfCoordinatorV25::RandomWordsFulfilled::decode_log(inner, true)?;
            Ok(ev.requestId)
        }
    }
}

/// Encode the `fulfillRandomWords` calldata for the configured ABI variant.
pub fn encode_fulfill_call(
    variant: AbiVariant,
    request_id: U256,
    randomness: U256,
    commitment: RequestCommitment,
) -> Bytes {
    use alloy::sol_types::SolCall;

    match variant {
        AbiVariant::V2 => {
            let call = IVrfCoordinatorV2::fulfillRandomWordsCall {
                requestId: request_id,
                randomness,
                rc: RequestCommitmentV2 {
                    blockNum: commitment.block_num,
                    subId: commitment.sub_id.to::<u64>(),
                    callbackGasLimit: commitment.callback_gas_limit,
                    numWords: commitment.num_words,
                    sender: commitment.sender,
                },
            };
            Bytes::from(call.abi_encode())
        }
        AbiVariant::V25 => {
            let call = IVrfCoordinatorV25::fulfillRandomWordsCall {
                requestId: request_id,
                randomness,
                rc: RequestCommitmentV25 {
                    blockNum: commitment.block_num,
                    subId: commitment.sub_id,
                    callbackGasLimit: commitment.callback_gas_limit,
                    numWords: commitment.num_words,
                    sender: commitment.sender,
                },
            };
            Bytes::from(call.abi_encode())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic0_is_deterministic_and_distinct() {
        let sigs = EventSignatures::for_variant(AbiVariant::V2);
        assert_ne!(sigs.requested_topic, sigs.fulfilled_topic);
        let sigs_again = EventSignatures::for_variant(AbiVariant::V2);
        assert_eq!(sigs.requested_topic, sigs_again.requested_topic);
    }

    #[test]
    fn v2_and_v25_topics_differ() {
        let v2 = EventSignatures::for_variant(AbiVariant::V2);
        let v25 = EventSignatures::for_variant(AbiVariant::V25);
        assert_ne!(v2.requested_topic, v25.requested_topic);
        assert_ne!(v2.fulfilled_topic, v25.fulfilled_topic);
    }

    #[test]
    fn commitment_copies_fields_verbatim() {
        let event = RequestEvent {
            request_id: U256::from(7u64),
            sub_id: U256::from(1u64),
            callback_gas_limit: 200_000,
            num_words: 1,
            sender: Address::repeat_byte(0xAA),
            block_number: 1_000_500,
        };
        let rc = RequestCommitment::from(&event);
        assert_eq!(rc.block_num, 1_000_500);
        assert_eq!(rc.sub_id, U256::from(1u64));
        assert_eq!(rc.callback_gas_limit, 200_000);
        assert_eq!(rc.num_words, 1);
        assert_eq!(rc.sender, event.sender);
    }

    #[test]
    fn decode_log_discards_unmatched_topic() {
        let sigs = EventSignatures::for_variant(AbiVariant::V2);
        let mut log: alloy::rpc::types::Log = alloy::rpc::types::Log::default();
        log.inner.set_topics_unchecked(vec![keccak256("SomeOtherEvent()")]);
        let result = decode_log(&log, AbiVariant::V2, &sigs);
        assert!(matches!(result, Ok(None)));
    }
}
