use crate::common::{expect_err, proof_calldata, TestContext};
use anyhow::{ensure, Result};
use zkcredit_sdk::core::constants::ANVIL_CHAIN_ID;
use zkcredit_sdk::{
    ConnectionError, CreditTier, DecodeError, PipelineConfig, SessionPhase, SubmissionError,
};

pub async fn run() -> Result<()> {
    println!("\n🛡️  Running Failure Scenarios...");

    println!("\n[1/4] Foreign selector is rejected before the wallet is touched...");
    let ctx = TestContext::new(PipelineConfig::default(), ANVIL_CHAIN_ID)?;
    let mut calldata = proof_calldata(1);
    calldata[..4].copy_from_slice(&[0xa9, 0x05, 0x9c, 0xbb]);
    let err = expect_err(ctx.orchestrator.submit(&calldata)).await?;
    ensure!(matches!(
        err,
        SubmissionError::InvalidCalldata(DecodeError::SelectorMismatch { .. })
    ));
    ensure!(ctx.session.phase() == SessionPhase::Disconnected);
    ensure!(ctx.ledger.block_number() == 0, "nothing should have been mined");

    println!("\n[2/4] Unfavorable proof reverts...");
    let err = expect_err(ctx.orchestrator.submit(&proof_calldata(0))).await?;
    ensure!(matches!(err, SubmissionError::TransactionReverted { .. }));
    ensure!(!err.is_retryable());
    let tier = ctx.queries.borrower_tier(ctx.wallet.address()).await?;
    ensure!(tier == CreditTier::Unknown);

    println!("\n[3/4] Wallet on another chain is switched over...");
    let ctx = TestContext::new(PipelineConfig::default(), 1)?;
    let session = ctx.session.try_connect().await?;
    ensure!(session.chain_id == ANVIL_CHAIN_ID);

    println!("\n[4/4] Chain the wallet does not know...");
    let config = PipelineConfig {
        chain_id: 424242,
        ..PipelineConfig::default()
    };
    let ctx = TestContext::new(config, ANVIL_CHAIN_ID)?;
    let err = expect_err(ctx.session.try_connect()).await?;
    ensure!(err == ConnectionError::NetworkSwitchRejected);
    let err = expect_err(ctx.orchestrator.submit(&proof_calldata(1))).await?;
    ensure!(err == SubmissionError::NotConnected);
    ensure!(err.to_string() == "Wallet not connected");

    println!("✅ Failure scenarios passed");
    Ok(())
}
