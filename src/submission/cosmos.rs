//! Cosmos submission flow
//!
//! `Filling → SwitchChain → TransferSubmit → TransferReceipt`
//!
//! CosmWasm sends carry native funds directly, so there is no allowance step.

use alloy::primitives::B256;
use async_trait::async_trait;
use tracing::debug;

use super::{
    run_switch_chain, run_transfer_receipt, run_transfer_submit, StepState, Submission,
    SubmissionArgs,
};
use crate::capability::ChainWriter;
use crate::hash::generate_salt;
use crate::types::{ChainType, Receipt, TxHash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CosmosSubmission {
    Filling,
    SwitchChain(StepState<(), ()>),
    TransferSubmit(StepState<B256, TxHash>),
    TransferReceipt(StepState<TxHash, Receipt>),
}

impl CosmosSubmission {
    pub fn step_name(&self) -> &'static str {
        match self {
            CosmosSubmission::Filling => "filling",
            CosmosSubmission::SwitchChain(_) => "switch chain",
            CosmosSubmission::TransferSubmit(_) => "transfer submit",
            CosmosSubmission::TransferReceipt(_) => "transfer receipt",
        }
    }
}

#[async_trait]
impl Submission for CosmosSubmission {
    const CHAIN_TYPE: ChainType = ChainType::Cosmos;

    fn filling() -> Self {
        CosmosSubmission::Filling
    }

    async fn next_state(self, args: &SubmissionArgs, writer: &dyn ChainWriter) -> Option<Self> {
        use StepState::*;

        let next = match self {
            CosmosSubmission::Filling => CosmosSubmission::SwitchChain(NotStarted { context: () }),

            CosmosSubmission::SwitchChain(NotStarted { context }) => {
                CosmosSubmission::SwitchChain(InProgress { context })
            }
            CosmosSubmission::SwitchChain(InProgress { .. }) => {
                CosmosSubmission::SwitchChain(run_switch_chain(writer).await)
            }
            CosmosSubmission::SwitchChain(Complete { .. }) => {
                CosmosSubmission::TransferSubmit(NotStarted {
                    context: generate_salt(),
                })
            }

            CosmosSubmission::TransferSubmit(NotStarted { context }) => {
                CosmosSubmission::TransferSubmit(InProgress { context })
            }
            CosmosSubmission::TransferSubmit(InProgress { context }) => {
                CosmosSubmission::TransferSubmit(run_transfer_submit(context, args, writer).await)
            }
            CosmosSubmission::TransferSubmit(Complete { result, .. }) => {
                CosmosSubmission::TransferReceipt(NotStarted { context: result })
            }

            CosmosSubmission::TransferReceipt(NotStarted { context }) => {
                CosmosSubmission::TransferReceipt(InProgress { context })
            }
            CosmosSubmission::TransferReceipt(InProgress { context }) => {
                CosmosSubmission::TransferReceipt(run_transfer_receipt(context, writer).await)
            }
            CosmosSubmission::TransferReceipt(Complete { .. }) => return None,

            failed => return failed.resume(),
        };

        debug!(step = next.step_name(), "Cosmos submission advanced");
        Some(next)
    }

    fn resume(&self) -> Option<Self> {
        match self {
            CosmosSubmission::Filling => None,
            CosmosSubmission::SwitchChain(s) => s.resumed().map(CosmosSubmission::SwitchChain),
            CosmosSubmission::TransferSubmit(s) => {
                s.resumed().map(CosmosSubmission::TransferSubmit)
            }
            CosmosSubmission::TransferReceipt(s) => {
                s.resumed().map(CosmosSubmission::TransferReceipt)
            }
        }
    }

    fn has_failed_exit(&self) -> bool {
        match self {
            CosmosSubmission::Filling => false,
            CosmosSubmission::SwitchChain(s) => s.is_failed(),
            CosmosSubmission::TransferSubmit(s) => s.is_failed(),
            CosmosSubmission::TransferReceipt(s) => s.is_failed(),
        }
    }

    fn is_complete(&self) -> bool {
        matches!(self, CosmosSubmission::TransferReceipt(s) if s.is_complete())
    }
}
