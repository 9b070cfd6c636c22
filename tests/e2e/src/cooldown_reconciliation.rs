//! E2E Test: Cooldown Countdown and Chain Reconciliation
//!
//! Verifies that the local countdown and the chain agree:
//! - The countdown only goes down, across ticks and refreshes
//! - Local expiry triggers exactly one re-read per countdown
//! - Eligibility comes from `canClaim`, never from the local countdown
//! - The poller keeps ticking and refreshing on its own schedule

use {
    assert_matches::assert_matches,
    std::{sync::Arc, time::Duration},
    tap_e2e_tests::helpers::*,
    tap_faucet::{EligibilityState, Poller, PollerConfig, TickOutcome},
};

/// Puts ALICE `elapsed` seconds into her cooldown and refreshes.
async fn cooling_down(elapsed: u64) -> TestFaucet {
    let faucet = TestFaucet::new();
    faucet.chain.record_claim(ALICE);
    faucet.clock.advance(elapsed);
    faucet.engine.refresh(ALICE).await;
    let snapshot = faucet.engine.snapshot();
    assert_eq!(snapshot.state, EligibilityState::Cooldown);
    assert_eq!(
        snapshot.seconds_remaining,
        COOLDOWN_SECONDS.saturating_sub(elapsed)
    );
    faucet
}

// ─────────────────────────────────────────────────────────────────────────────
// Test: ticks and refreshes never raise the countdown
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_countdown_is_monotonic_across_refreshes() {
    init_logging();
    let faucet = cooling_down(COOLDOWN_SECONDS - 100).await;

    // Ticks run ahead of the chain clock.
    for expected in (90..100).rev() {
        assert_eq!(faucet.engine.tick(), TickOutcome::Counting(expected));
    }
    println!("✓ Ten ticks: 100s -> 90s");

    // The chain clock has not moved, so it still says 100s are left.
    faucet.engine.refresh(ALICE).await;
    assert_eq!(faucet.engine.snapshot().seconds_remaining, 90);
    println!("✓ Refresh in the same cooldown keeps the lower countdown");

    // When the chain clock passes the local countdown, the clock wins.
    faucet.clock.advance(40);
    assert_eq!(faucet.engine.tick(), TickOutcome::Counting(60));
    faucet.engine.refresh(ALICE).await;
    assert_eq!(faucet.engine.snapshot().seconds_remaining, 60);
    println!("✓ Clock ahead of the countdown pulls it down to 60s");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test: expiry reconciles once and trusts the chain
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_expiry_reconciles_exactly_once() {
    init_logging();
    let faucet = cooling_down(COOLDOWN_SECONDS - 3).await;
    let refreshes_before = faucet.engine.snapshot().refresh_count;

    // Count to zero without moving the chain clock: the local countdown
    // says "done" while the contract still says "no".
    assert_eq!(faucet.engine.tick_and_reconcile().await, TickOutcome::Counting(2));
    assert_eq!(faucet.engine.tick_and_reconcile().await, TickOutcome::Counting(1));
    assert_eq!(faucet.engine.tick_and_reconcile().await, TickOutcome::Expired);

    let snapshot = faucet.engine.snapshot();
    assert_eq!(snapshot.refresh_count, refreshes_before + 1);
    assert_eq!(snapshot.state, EligibilityState::Cooldown);
    assert_eq!(snapshot.seconds_remaining, 3);
    assert!(!snapshot.is_eligible_for(ALICE));
    println!("✓ Local expiry re-read the chain once; contract still refuses, 3s left");

    // The chain catches up; the restarted countdown expires once more and
    // that re-read flips to eligible.
    faucet.clock.advance(3);
    assert_eq!(faucet.engine.tick_and_reconcile().await, TickOutcome::Expired);
    let snapshot = faucet.engine.snapshot();
    assert_eq!(snapshot.refresh_count, refreshes_before + 2);
    assert_eq!(snapshot.state, EligibilityState::Eligible);
    println!("✓ Eligible once canClaim says so");

    for _ in 0..5 {
        assert_eq!(faucet.engine.tick_and_reconcile().await, TickOutcome::Idle);
    }
    assert_eq!(faucet.engine.snapshot().refresh_count, refreshes_before + 2);
    println!("✓ No further reconciliation once eligible");
}

#[tokio::test]
async fn test_expiry_with_chain_agreement_becomes_eligible() {
    init_logging();
    let faucet = cooling_down(COOLDOWN_SECONDS - 2).await;

    faucet.clock.advance(1);
    assert_eq!(faucet.engine.tick_and_reconcile().await, TickOutcome::Counting(1));
    faucet.clock.advance(1);
    assert_eq!(faucet.engine.tick_and_reconcile().await, TickOutcome::Expired);

    let snapshot = faucet.engine.snapshot();
    assert_eq!(snapshot.state, EligibilityState::Eligible);
    assert_eq!(snapshot.seconds_remaining, 0);
    assert!(snapshot.is_eligible_for(ALICE));
    println!("✓ Expiry in step with the chain goes straight to eligible");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test: the poller drives both loops
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_poller_ticks_and_refreshes() {
    init_logging();
    let faucet = TestFaucet::new();
    faucet.chain.record_claim(ALICE);
    faucet.clock.advance(COOLDOWN_SECONDS - 600);

    let engine = faucet.engine.clone();
    let poller = Poller::start(
        engine.clone(),
        ALICE,
        PollerConfig {
            tick_interval: Duration::from_secs(1),
            refresh_interval: Duration::from_secs(30),
        },
    );

    // First refresh is immediate.
    let mut updates = engine.subscribe();
    updates
        .wait_for(|snapshot| snapshot.refresh_count >= 1)
        .await
        .unwrap();
    assert_eq!(engine.snapshot().state, EligibilityState::Cooldown);
    println!("✓ Poller refreshed on start");

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.refresh_count, 1);
    assert!(
        (589..=591).contains(&snapshot.seconds_remaining),
        "countdown after ~10 ticks: {}",
        snapshot.seconds_remaining
    );
    println!("✓ Ten seconds of ticks: {}s left", snapshot.seconds_remaining);

    tokio::time::sleep(Duration::from_secs(20)).await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.refresh_count, 2);
    assert!(snapshot.seconds_remaining <= 571);
    println!("✓ Periodic refresh at 30s kept the countdown monotonic");

    poller.stop();
    assert!(engine.is_shut_down());
    let count = engine.snapshot().refresh_count;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(engine.snapshot().refresh_count, count);
    println!("✓ Stopped poller no longer refreshes");
}

#[tokio::test(start_paused = true)]
async fn test_poller_picks_up_chain_recovery() {
    init_logging();
    let faucet = TestFaucet::new();
    faucet.chain.set_offline(true);

    let engine = Arc::clone(&faucet.engine);
    let _poller = Poller::start(engine.clone(), ALICE, PollerConfig::default());
    let mut updates = engine.subscribe();
    updates
        .wait_for(|snapshot| snapshot.refresh_count >= 1)
        .await
        .unwrap();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, EligibilityState::Unreachable);
    assert_matches!(
        snapshot.last_error,
        Some(tap_chain::ChainError::ChainUnavailable(_))
    );
    println!("✓ Offline chain reported as unreachable");

    faucet.chain.set_offline(false);
    updates
        .wait_for(|snapshot| snapshot.state == EligibilityState::Eligible)
        .await
        .unwrap();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.refresh_count, 2);
    assert_eq!(snapshot.last_error, None);
    println!("✓ Next scheduled refresh recovered without intervention");
}
