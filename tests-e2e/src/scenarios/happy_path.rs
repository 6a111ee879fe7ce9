use crate::common::{proof_calldata, TestContext};
use anyhow::{ensure, Result};
use tracing::info;
use zkcredit_sdk::core::constants::ANVIL_CHAIN_ID;
use zkcredit_sdk::utils::parse_ether;
use zkcredit_sdk::{CreditTier, PipelineConfig, SessionPhase, SubmissionProgress};

pub async fn run() -> Result<()> {
    println!("\n✅ Running Happy Path...");
    let ctx = TestContext::new(PipelineConfig::default(), ANVIL_CHAIN_ID)?;

    println!("\n[1/4] Connect and sign in...");
    let session = ctx.session.try_connect().await?;
    ensure!(session.address == ctx.wallet.address(), "session bound to wrong account");
    ensure!(session.verified, "session not verified");
    ensure!(ctx.session.phase() == SessionPhase::Connected);
    info!(address = %session.address, chain_id = session.chain_id, "connected");

    println!("\n[2/4] Tier before any proof...");
    let tier = ctx.queries.borrower_tier(session.address).await?;
    ensure!(tier == CreditTier::Unknown, "fresh borrower should be Unknown, got {}", tier);

    println!("\n[3/4] Submit a favorable proof...");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let result = ctx
        .orchestrator
        .submit_with_progress(&proof_calldata(1), tx)
        .await?;
    ensure!(result.confirmed && result.succeeded);
    ensure!(result.block_number == Some(ctx.ledger.block_number()));
    ensure!(rx.recv().await == Some(SubmissionProgress::Dispatched { hash: result.transaction_hash }));
    ensure!(
        rx.recv().await
            == Some(SubmissionProgress::Confirmed {
                hash: result.transaction_hash,
                succeeded: true
            })
    );
    println!("Transaction: {}", result.transaction_hash);

    println!("\n[4/4] Loan terms after the proof...");
    let tier = ctx.queries.borrower_tier(session.address).await?;
    ensure!(tier == CreditTier::Favorable, "expected Favorable, got {}", tier);

    let loan = parse_ether("2.5").ok_or_else(|| anyhow::anyhow!("bad amount"))?;
    let requirement = ctx.queries.collateral_requirement(session.address, loan).await?;
    println!(
        "Collateral: {} ETH ({})",
        requirement.amount_display(),
        requirement.percentage_display()
    );
    ensure!(requirement.amount_display() == "3.0");
    ensure!(requirement.percentage_display() == "120%");

    println!("✅ Happy path passed");
    Ok(())
}
