//! Submission State Machine
//!
//! Drives one encoded instruction through the on-chain steps of its source
//! chain family and exposes every intermediate state to the caller.
//!
//! ## Submodules
//!
//! - `evm` - `Filling → SwitchChain → ApprovalSubmit → ApprovalReceipt → TransferSubmit → TransferReceipt`
//! - `cosmos` - `Filling → SwitchChain → TransferSubmit → TransferReceipt`
//!
//! Each step carries its own [`StepState`]. A failed step is resumed in
//! place: the driving loop re-enters it as `InProgress` with the context it
//! captured, and never replays earlier steps.

pub mod cosmos;
pub mod evm;

use alloy::primitives::{B256, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::{debug, warn};

use crate::capability::{ChainWriter, Funds, SendRequest};
use crate::error::StepFailure;
use crate::instruction::{encode, Instruction};
use crate::types::{ChainType, ChannelEndpoint, Receipt, TxHash};

pub use cosmos::CosmosSubmission;
pub use evm::{ApprovalCursor, EvmSubmission, SubmittedApproval};

// ============================================================================
// Step State
// ============================================================================

/// Sub-state of a single step
///
/// `context` is whatever the step captured on entry (e.g. the hash whose
/// receipt it awaits) and survives failure so a resume reuses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState<C, R> {
    NotStarted { context: C },
    InProgress { context: C },
    Complete { context: C, result: R },
    Failed { context: C, reason: StepFailure },
}

impl<C: Clone, R> StepState<C, R> {
    pub fn context(&self) -> &C {
        match self {
            StepState::NotStarted { context }
            | StepState::InProgress { context }
            | StepState::Complete { context, .. }
            | StepState::Failed { context, .. } => context,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, StepState::Complete { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepState::Failed { .. })
    }

    /// `InProgress` with the same context, if this step failed
    pub fn resumed(&self) -> Option<Self> {
        self.is_failed().then(|| StepState::InProgress {
            context: self.context().clone(),
        })
    }

    /// Settle an in-progress step from the outcome of its chain interaction
    pub(crate) fn settle(context: C, step: &'static str, outcome: Result<R>) -> Self {
        match outcome {
            Ok(result) => StepState::Complete { context, result },
            Err(e) => {
                warn!(step = step, error = %e, "Submission step failed");
                StepState::Failed {
                    context,
                    reason: StepFailure::from_report(step, &e),
                }
            }
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Allowance the zkgm contract needs before the transfer can be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequirement {
    pub token: String,
    pub amount: U256,
}

/// Fixed inputs of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionArgs {
    pub source_chain: ChainType,
    pub instruction: Instruction,
    /// Source side of the channel; `contract` is the approval spender
    pub endpoint: ChannelEndpoint,
    pub approvals: Vec<ApprovalRequirement>,
    pub funds: Vec<Funds>,
}

impl SubmissionArgs {
    /// Derive approvals and attached funds from a composed instruction
    ///
    /// EVM sources need one allowance per base token, summed across orders.
    /// Cosmos sources attach the base amount of every order whose base token
    /// is one of `native_denoms`.
    pub fn from_instruction(
        source_chain: ChainType,
        instruction: Instruction,
        endpoint: ChannelEndpoint,
        native_denoms: &[String],
    ) -> Result<Self> {
        let mut approvals: Vec<ApprovalRequirement> = Vec::new();
        let mut funds: Vec<Funds> = Vec::new();

        for order in instruction.orders() {
            match source_chain {
                ChainType::Evm => {
                    let token = alloy::primitives::Address::try_from(order.base_token.as_ref())
                        .map_err(|_| {
                            eyre!(
                                "EVM base token must be 20 bytes, got {}",
                                order.base_token.len()
                            )
                        })?
                        .to_checksum(None);
                    match approvals.iter_mut().find(|a| a.token == token) {
                        Some(existing) => {
                            existing.amount = existing
                                .amount
                                .checked_add(order.base_amount)
                                .ok_or_else(|| eyre!("Approval amount overflow for {}", token))?;
                        }
                        None => approvals.push(ApprovalRequirement {
                            token,
                            amount: order.base_amount,
                        }),
                    }
                }
                ChainType::Cosmos => {
                    let denom = String::from_utf8(order.base_token.to_vec())
                        .map_err(|e| eyre!("Cosmos base token is not UTF-8: {}", e))?;
                    if !native_denoms.contains(&denom) {
                        continue;
                    }
                    let amount = u128::try_from(order.base_amount)
                        .map_err(|_| eyre!("Native amount for {} exceeds u128", denom))?;
                    match funds.iter_mut().find(|f| f.denom == denom) {
                        Some(existing) => {
                            existing.amount = existing
                                .amount
                                .checked_add(amount)
                                .ok_or_else(|| eyre!("Funds overflow for {}", denom))?;
                        }
                        None => funds.push(Funds { denom, amount }),
                    }
                }
                ChainType::Aptos => {
                    return Err(eyre!("No submission flow for {} sources", source_chain))
                }
            }
        }

        Ok(Self {
            source_chain,
            instruction,
            endpoint,
            approvals,
            funds,
        })
    }

    /// Build a send request carrying `salt`
    ///
    /// Every attempt of one transfer must use the same salt so a retried send
    /// maps to the packet the first attempt may already have created.
    pub fn send_request(&self, salt: B256) -> SendRequest {
        let instruction = encode(&self.instruction);
        SendRequest {
            instruction,
            endpoint: self.endpoint.clone(),
            salt,
            funds: self.funds.clone(),
        }
    }
}

// ============================================================================
// Submission
// ============================================================================

/// State machine of one chain family
#[async_trait]
pub trait Submission: Sized + Clone + Send + Sync {
    const CHAIN_TYPE: ChainType;

    fn filling() -> Self;

    /// Run one transition; `None` abandons the submission
    async fn next_state(self, args: &SubmissionArgs, writer: &dyn ChainWriter) -> Option<Self>;

    /// Re-enter the failed step as `InProgress`, keeping its context
    fn resume(&self) -> Option<Self>;

    fn has_failed_exit(&self) -> bool;

    fn is_complete(&self) -> bool;
}

// Steps shared by every family

pub(crate) async fn run_switch_chain(writer: &dyn ChainWriter) -> StepState<(), ()> {
    StepState::settle((), "switch chain", writer.switch_chain().await)
}

pub(crate) async fn run_transfer_submit(
    salt: B256,
    args: &SubmissionArgs,
    writer: &dyn ChainWriter,
) -> StepState<B256, TxHash> {
    let request = args.send_request(salt);
    let outcome = writer.submit(&request).await;
    if let Ok(hash) = &outcome {
        debug!(tx_hash = %hash, channel_id = request.endpoint.channel_id, "Transfer submitted");
    }
    StepState::settle(salt, "transfer submit", outcome)
}

pub(crate) async fn run_transfer_receipt(
    hash: TxHash,
    writer: &dyn ChainWriter,
) -> StepState<TxHash, Receipt> {
    let outcome = writer.await_receipt(&hash).await;
    StepState::settle(hash, "transfer receipt", outcome)
}

// ============================================================================
// Driving Loop
// ============================================================================

/// Submission of whichever family the source chain belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransferState {
    #[default]
    Empty,
    Evm(EvmSubmission),
    Cosmos(CosmosSubmission),
}

impl TransferState {
    pub fn chain_type(&self) -> Option<ChainType> {
        match self {
            TransferState::Empty => None,
            TransferState::Evm(_) => Some(ChainType::Evm),
            TransferState::Cosmos(_) => Some(ChainType::Cosmos),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            TransferState::Empty => false,
            TransferState::Evm(s) => s.is_complete(),
            TransferState::Cosmos(s) => s.is_complete(),
        }
    }

    pub fn has_failed_exit(&self) -> bool {
        match self {
            TransferState::Empty => false,
            TransferState::Evm(s) => s.has_failed_exit(),
            TransferState::Cosmos(s) => s.has_failed_exit(),
        }
    }
}

async fn step<S: Submission>(
    state: S,
    args: &SubmissionArgs,
    writer: &dyn ChainWriter,
) -> Option<S> {
    if state.has_failed_exit() {
        state.resume()
    } else {
        state.next_state(args, writer).await
    }
}

/// Advance a submission until it completes, fails, or is abandoned
///
/// Every new state is handed to `observer` before the next transition runs.
/// A failed step is resumed in place. A state whose family differs from
/// `args.source_chain` is discarded and the matching family restarts from
/// `Filling`. Returns the last state, or `None` if the submission was
/// abandoned.
pub async fn advance<F>(
    state: TransferState,
    args: &SubmissionArgs,
    writer: &dyn ChainWriter,
    mut observer: F,
) -> Option<TransferState>
where
    F: FnMut(&TransferState),
{
    if writer.chain_type() != args.source_chain {
        warn!(
            writer = %writer.chain_type(),
            source = %args.source_chain,
            "Writer does not match the source chain, abandoning submission"
        );
        observer(&TransferState::Empty);
        return None;
    }

    let mut current = match (state, args.source_chain) {
        (state @ TransferState::Evm(_), ChainType::Evm)
        | (state @ TransferState::Cosmos(_), ChainType::Cosmos) => state,
        (previous, ChainType::Evm) => {
            if previous != TransferState::Empty {
                debug!(source = %args.source_chain, "Chain family changed, resetting submission");
            }
            TransferState::Evm(EvmSubmission::filling())
        }
        (previous, ChainType::Cosmos) => {
            if previous != TransferState::Empty {
                debug!(source = %args.source_chain, "Chain family changed, resetting submission");
            }
            TransferState::Cosmos(CosmosSubmission::filling())
        }
        (_, other) => {
            warn!(source = %other, "No submission flow for chain family");
            observer(&TransferState::Empty);
            return None;
        }
    };

    if current.is_complete() {
        return Some(current);
    }

    loop {
        let next = match current {
            TransferState::Evm(s) => step(s, args, writer).await.map(TransferState::Evm),
            TransferState::Cosmos(s) => step(s, args, writer).await.map(TransferState::Cosmos),
            TransferState::Empty => None,
        };

        let Some(next) = next else {
            observer(&TransferState::Empty);
            return None;
        };

        observer(&next);
        if next.is_complete() || next.has_failed_exit() {
            return Some(next);
        }
        current = next;
    }
}
