use crate::common::{proof_calldata, random_signer, wait_until, TestContext};
use anyhow::{ensure, Result};
use zkcredit_sdk::core::constants::ANVIL_CHAIN_ID;
use zkcredit_sdk::{CreditTier, PipelineConfig, ProofSigner, SessionPhase};

pub async fn run() -> Result<()> {
    println!("\n🔁 Running Session Event Scenarios...");
    let ctx = TestContext::new(PipelineConfig::default(), ANVIL_CHAIN_ID)?;
    let first = ctx.session.try_connect().await?;

    println!("\n[1/3] User wanders to mainnet; session is revalidated...");
    ctx.wallet.user_switches_chain(1);
    wait_until("revalidated session", || {
        ctx.wallet.chain_id() == ANVIL_CHAIN_ID
            && ctx.session.phase() == SessionPhase::Connected
            && ctx.session.active_session().map(|s| s.chain_id) == Some(ANVIL_CHAIN_ID)
    })
    .await?;
    ensure!(ctx.session.account() == Some(first.address));

    println!("\n[2/3] User switches account; session is rebuilt...");
    let next = random_signer()?;
    let next_address = next.address();
    ctx.wallet.user_switches_account(next);
    wait_until("session for new account", || {
        ctx.session.active_session().map(|s| s.address) == Some(next_address)
    })
    .await?;
    let (bound, signer) = ctx
        .session
        .active_binding()
        .ok_or_else(|| anyhow::anyhow!("no active binding after account switch"))?;
    ensure!(bound.address == next_address && signer.address() == next_address);

    println!("\n[3/3] Proof is credited to the new account...");
    ctx.orchestrator.submit(&proof_calldata(7)).await?;
    ensure!(ctx.queries.borrower_tier(next_address).await? == CreditTier::Favorable);
    ensure!(ctx.queries.borrower_tier(first.address).await? == CreditTier::Unknown);

    ctx.session.disconnect().await;
    ensure!(ctx.session.active_session().is_none());

    println!("✅ Session event scenarios passed");
    Ok(())
}
