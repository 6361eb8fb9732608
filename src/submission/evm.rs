//! EVM submission flow
//!
//! `Filling → SwitchChain → ApprovalSubmit → ApprovalReceipt → TransferSubmit → TransferReceipt`
//!
//! Approvals loop: `ApprovalSubmit` checks the remaining requirements from its
//! cursor and approves the first one whose allowance is short. Once that
//! approval's receipt lands, the next `ApprovalSubmit` starts after it. When
//! nothing is short the step completes without a hash and the flow moves on
//! to the transfer.

use alloy::primitives::B256;
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tracing::debug;

use super::{
    run_switch_chain, run_transfer_receipt, run_transfer_submit, ApprovalRequirement, StepState,
    Submission, SubmissionArgs,
};
use crate::capability::ChainWriter;
use crate::hash::generate_salt;
use crate::types::{ChainType, Receipt, TxHash};

/// Index of the first approval requirement still to check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApprovalCursor {
    pub next: usize,
}

/// An approval sent for the requirement at `index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedApproval {
    pub index: usize,
    pub hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvmSubmission {
    Filling,
    SwitchChain(StepState<(), ()>),
    ApprovalSubmit(StepState<ApprovalCursor, Option<SubmittedApproval>>),
    ApprovalReceipt(StepState<SubmittedApproval, Receipt>),
    TransferSubmit(StepState<B256, TxHash>),
    TransferReceipt(StepState<TxHash, Receipt>),
}

impl EvmSubmission {
    pub fn step_name(&self) -> &'static str {
        match self {
            EvmSubmission::Filling => "filling",
            EvmSubmission::SwitchChain(_) => "switch chain",
            EvmSubmission::ApprovalSubmit(_) => "approval submit",
            EvmSubmission::ApprovalReceipt(_) => "approval receipt",
            EvmSubmission::TransferSubmit(_) => "transfer submit",
            EvmSubmission::TransferReceipt(_) => "transfer receipt",
        }
    }
}

#[async_trait]
impl Submission for EvmSubmission {
    const CHAIN_TYPE: ChainType = ChainType::Evm;

    fn filling() -> Self {
        EvmSubmission::Filling
    }

    async fn next_state(self, args: &SubmissionArgs, writer: &dyn ChainWriter) -> Option<Self> {
        use StepState::*;

        let next = match self {
            EvmSubmission::Filling => EvmSubmission::SwitchChain(NotStarted { context: () }),

            EvmSubmission::SwitchChain(NotStarted { context }) => {
                EvmSubmission::SwitchChain(InProgress { context })
            }
            EvmSubmission::SwitchChain(InProgress { .. }) => {
                EvmSubmission::SwitchChain(run_switch_chain(writer).await)
            }
            EvmSubmission::SwitchChain(Complete { .. }) => {
                EvmSubmission::ApprovalSubmit(NotStarted {
                    context: ApprovalCursor::default(),
                })
            }

            EvmSubmission::ApprovalSubmit(NotStarted { context }) => {
                EvmSubmission::ApprovalSubmit(InProgress { context })
            }
            EvmSubmission::ApprovalSubmit(InProgress { context }) => {
                let outcome = approve_first_short(context, args, writer).await;
                EvmSubmission::ApprovalSubmit(StepState::settle(context, "approval submit", outcome))
            }
            EvmSubmission::ApprovalSubmit(Complete {
                result: Some(submitted),
                ..
            }) => EvmSubmission::ApprovalReceipt(NotStarted { context: submitted }),
            EvmSubmission::ApprovalSubmit(Complete { result: None, .. }) => {
                EvmSubmission::TransferSubmit(NotStarted {
                    context: generate_salt(),
                })
            }

            EvmSubmission::ApprovalReceipt(NotStarted { context }) => {
                EvmSubmission::ApprovalReceipt(InProgress { context })
            }
            EvmSubmission::ApprovalReceipt(InProgress { context }) => {
                let outcome = writer.await_receipt(&context.hash).await;
                EvmSubmission::ApprovalReceipt(StepState::settle(
                    context,
                    "approval receipt",
                    outcome,
                ))
            }
            EvmSubmission::ApprovalReceipt(Complete { context, .. }) => {
                EvmSubmission::ApprovalSubmit(NotStarted {
                    context: ApprovalCursor {
                        next: context.index + 1,
                    },
                })
            }

            EvmSubmission::TransferSubmit(NotStarted { context }) => {
                EvmSubmission::TransferSubmit(InProgress { context })
            }
            EvmSubmission::TransferSubmit(InProgress { context }) => {
                EvmSubmission::TransferSubmit(run_transfer_submit(context, args, writer).await)
            }
            EvmSubmission::TransferSubmit(Complete { result, .. }) => {
                EvmSubmission::TransferReceipt(NotStarted { context: result })
            }

            EvmSubmission::TransferReceipt(NotStarted { context }) => {
                EvmSubmission::TransferReceipt(InProgress { context })
            }
            EvmSubmission::TransferReceipt(InProgress { context }) => {
                EvmSubmission::TransferReceipt(run_transfer_receipt(context, writer).await)
            }
            EvmSubmission::TransferReceipt(Complete { .. }) => return None,

            failed => return failed.resume(),
        };

        debug!(step = next.step_name(), "EVM submission advanced");
        Some(next)
    }

    fn resume(&self) -> Option<Self> {
        match self {
            EvmSubmission::Filling => None,
            EvmSubmission::SwitchChain(s) => s.resumed().map(EvmSubmission::SwitchChain),
            EvmSubmission::ApprovalSubmit(s) => s.resumed().map(EvmSubmission::ApprovalSubmit),
            EvmSubmission::ApprovalReceipt(s) => s.resumed().map(EvmSubmission::ApprovalReceipt),
            EvmSubmission::TransferSubmit(s) => s.resumed().map(EvmSubmission::TransferSubmit),
            EvmSubmission::TransferReceipt(s) => s.resumed().map(EvmSubmission::TransferReceipt),
        }
    }

    fn has_failed_exit(&self) -> bool {
        match self {
            EvmSubmission::Filling => false,
            EvmSubmission::SwitchChain(s) => s.is_failed(),
            EvmSubmission::ApprovalSubmit(s) => s.is_failed(),
            EvmSubmission::ApprovalReceipt(s) => s.is_failed(),
            EvmSubmission::TransferSubmit(s) => s.is_failed(),
            EvmSubmission::TransferReceipt(s) => s.is_failed(),
        }
    }

    fn is_complete(&self) -> bool {
        matches!(self, EvmSubmission::TransferReceipt(s) if s.is_complete())
    }
}

/// Approve the first requirement at or after the cursor whose allowance is short
async fn approve_first_short(
    cursor: ApprovalCursor,
    args: &SubmissionArgs,
    writer: &dyn ChainWriter,
) -> Result<Option<SubmittedApproval>> {
    let spender = &args.endpoint.contract;

    for (index, ApprovalRequirement { token, amount }) in
        args.approvals.iter().enumerate().skip(cursor.next)
    {
        let allowance = writer
            .allowance(token, spender)
            .await
            .wrap_err_with(|| format!("Failed to read allowance for {}", token))?;
        if allowance >= *amount {
            debug!(token = %token, allowance = %allowance, "Allowance sufficient");
            continue;
        }

        let hash = writer
            .approve_allowance(token, spender, *amount)
            .await
            .wrap_err_with(|| format!("Failed to approve {}", token))?;
        debug!(token = %token, amount = %amount, tx_hash = %hash, "Approval submitted");
        return Ok(Some(SubmittedApproval { index, hash }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Batch, FungibleAssetOrder, Instruction};
    use crate::submission::{advance, TransferState};
    use crate::testing::{MockChainWriter, WriterCall, WriterOp};
    use crate::types::ChannelEndpoint;
    use alloy::primitives::{Bytes, U256};

    const TOKEN_A: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const TOKEN_B: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";
    const ZKGM: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn order(token: &str, amount: u64) -> Instruction {
        Instruction::FungibleAssetOrder(FungibleAssetOrder {
            sender: Bytes::from_static(&[1; 20]),
            receiver: Bytes::copy_from_slice(b"union1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc544dkgd"),
            base_token: crate::types::ChainType::Evm.canonical_token(token).unwrap(),
            base_amount: U256::from(amount),
            base_token_symbol: "MOCK".to_string(),
            base_token_name: "Mock".to_string(),
            base_token_decimals: 18,
            source_channel_id: U256::ZERO,
            quote_token: Bytes::copy_from_slice(b"union1quote"),
            quote_amount: U256::from(amount),
        })
    }

    fn args() -> SubmissionArgs {
        let batch = Batch::new(vec![order(TOKEN_A, 1000), order(TOKEN_B, 500)]);
        SubmissionArgs::from_instruction(
            ChainType::Evm,
            batch.into(),
            ChannelEndpoint {
                channel_id: 1,
                contract: ZKGM.to_string(),
            },
            &[],
        )
        .unwrap()
    }

    fn names(states: &[TransferState]) -> Vec<String> {
        states
            .iter()
            .map(|s| match s {
                TransferState::Evm(e) => {
                    let sub = match e {
                        EvmSubmission::Filling => "",
                        EvmSubmission::SwitchChain(s) => sub_name(s),
                        EvmSubmission::ApprovalSubmit(s) => sub_name(s),
                        EvmSubmission::ApprovalReceipt(s) => sub_name(s),
                        EvmSubmission::TransferSubmit(s) => sub_name(s),
                        EvmSubmission::TransferReceipt(s) => sub_name(s),
                    };
                    format!("{}{}", e.step_name(), sub)
                }
                other => format!("{:?}", other),
            })
            .collect()
    }

    fn sub_name<C: Clone, R>(s: &StepState<C, R>) -> &'static str {
        match s {
            StepState::NotStarted { .. } => ":not-started",
            StepState::InProgress { .. } => ":in-progress",
            StepState::Complete { .. } => ":complete",
            StepState::Failed { .. } => ":failed",
        }
    }

    #[test]
    fn test_approvals_derived_per_token() {
        let batch = Batch::new(vec![
            order(TOKEN_A, 1000),
            order(TOKEN_B, 500),
            order(TOKEN_A, 24),
        ]);
        let args = SubmissionArgs::from_instruction(
            ChainType::Evm,
            batch.into(),
            ChannelEndpoint {
                channel_id: 1,
                contract: ZKGM.to_string(),
            },
            &[],
        )
        .unwrap();

        assert_eq!(args.approvals.len(), 2);
        assert_eq!(args.approvals[0].token, TOKEN_A);
        assert_eq!(args.approvals[0].amount, U256::from(1024));
        assert_eq!(args.approvals[1].token, TOKEN_B);
        assert!(args.funds.is_empty());
    }

    #[tokio::test]
    async fn test_full_flow_publishes_every_state_in_order() {
        let writer = MockChainWriter::new(ChainType::Evm);
        let mut published = Vec::new();

        let last = advance(TransferState::Empty, &args(), &writer, |s| {
            published.push(s.clone())
        })
        .await
        .unwrap();

        assert!(last.is_complete());
        assert_eq!(
            names(&published),
            vec![
                "switch chain:not-started",
                "switch chain:in-progress",
                "switch chain:complete",
                "approval submit:not-started",
                "approval submit:in-progress",
                "approval submit:complete",
                "approval receipt:not-started",
                "approval receipt:in-progress",
                "approval receipt:complete",
                "approval submit:not-started",
                "approval submit:in-progress",
                "approval submit:complete",
                "approval receipt:not-started",
                "approval receipt:in-progress",
                "approval receipt:complete",
                "approval submit:not-started",
                "approval submit:in-progress",
                "approval submit:complete",
                "transfer submit:not-started",
                "transfer submit:in-progress",
                "transfer submit:complete",
                "transfer receipt:not-started",
                "transfer receipt:in-progress",
                "transfer receipt:complete",
            ]
        );
        assert_eq!(writer.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_sufficient_allowance_skips_approval() {
        let writer = MockChainWriter::new(ChainType::Evm)
            .with_allowance(TOKEN_A, U256::from(1000))
            .with_allowance(TOKEN_B, U256::MAX);

        let last = advance(TransferState::Empty, &args(), &writer, |_| {})
            .await
            .unwrap();

        assert!(last.is_complete());
        assert!(!writer
            .calls()
            .iter()
            .any(|c| matches!(c, WriterCall::Approve { .. })));
    }

    #[tokio::test]
    async fn test_approval_receipt_failure_resumes_in_place() {
        let writer = MockChainWriter::new(ChainType::Evm).with_allowance(TOKEN_B, U256::MAX);
        writer.fail_next(WriterOp::AwaitReceipt, 1);

        let failed = advance(TransferState::Empty, &args(), &writer, |_| {})
            .await
            .unwrap();

        let TransferState::Evm(EvmSubmission::ApprovalReceipt(StepState::Failed {
            context,
            reason,
        })) = &failed
        else {
            panic!("expected failed approval receipt, got {:?}", failed);
        };
        assert_eq!(context.index, 0);
        assert_eq!(reason.step, "approval receipt");
        let approval_hash = context.hash.clone();
        let calls_before = writer.calls().len();

        let mut published = Vec::new();
        let last = advance(failed, &args(), &writer, |s| published.push(s.clone()))
            .await
            .unwrap();

        assert!(last.is_complete());
        assert_eq!(
            published[0],
            TransferState::Evm(EvmSubmission::ApprovalReceipt(StepState::InProgress {
                context: SubmittedApproval {
                    index: 0,
                    hash: approval_hash.clone(),
                },
            }))
        );

        let resumed_calls = writer.calls()[calls_before..].to_vec();
        assert_eq!(
            resumed_calls[0],
            WriterCall::AwaitReceipt {
                tx_hash: approval_hash
            }
        );
        assert!(!resumed_calls.iter().any(|c| matches!(
            c,
            WriterCall::SwitchChain | WriterCall::Approve { .. }
        )));
        assert!(!published.iter().any(|s| matches!(
            s,
            TransferState::Evm(EvmSubmission::SwitchChain(_)) | TransferState::Evm(EvmSubmission::Filling)
        )));
    }

    #[tokio::test]
    async fn test_transfer_receipt_failure_keeps_transfer_hash() {
        let writer = MockChainWriter::new(ChainType::Evm)
            .with_allowance(TOKEN_A, U256::MAX)
            .with_allowance(TOKEN_B, U256::MAX);
        writer.fail_next(WriterOp::AwaitReceipt, 1);

        let failed = advance(TransferState::Empty, &args(), &writer, |_| {})
            .await
            .unwrap();
        let TransferState::Evm(EvmSubmission::TransferReceipt(step)) = &failed else {
            panic!("expected transfer receipt, got {:?}", failed);
        };
        assert!(step.is_failed());
        let hash = step.context().clone();

        let last = advance(failed, &args(), &writer, |_| {}).await.unwrap();

        assert_eq!(
            last,
            TransferState::Evm(EvmSubmission::TransferReceipt(StepState::Complete {
                context: hash.clone(),
                result: Receipt {
                    tx_hash: hash,
                    height: Some(100),
                },
            }))
        );
        assert_eq!(writer.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_switch_chain_failure_is_visible() {
        let writer = MockChainWriter::new(ChainType::Evm);
        writer.fail_next(WriterOp::SwitchChain, 1);

        let failed = advance(TransferState::Empty, &args(), &writer, |_| {})
            .await
            .unwrap();

        assert!(failed.has_failed_exit());
        assert!(matches!(
            failed,
            TransferState::Evm(EvmSubmission::SwitchChain(StepState::Failed { .. }))
        ));
        assert!(writer.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_complete_submission_is_left_alone() {
        let writer = MockChainWriter::new(ChainType::Evm);
        let hash = TxHash::from("0x01");
        let done = TransferState::Evm(EvmSubmission::TransferReceipt(StepState::Complete {
            context: hash.clone(),
            result: Receipt {
                tx_hash: hash,
                height: None,
            },
        }));

        let mut published = 0;
        let last = advance(done.clone(), &args(), &writer, |_| published += 1).await;

        assert_eq!(last, Some(done));
        assert_eq!(published, 0);
        assert!(writer.calls().is_empty());
    }
}
