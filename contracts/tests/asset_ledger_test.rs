//! Integration tests for the asset ledger, driven through the devnet host
//! the way an external caller would drive a deployed token.

use tinybank_contracts::config::DeploymentConfig;
use tinybank_contracts::units::parse_units;
use tinybank_contracts::{Address, Call, Devnet, Event};

/// Helper: the reference deployment (MyToken, 18 decimals, 100 minted).
fn devnet() -> (Devnet, Address) {
    let owner = Address::derive("owner");
    let net = Devnet::deploy(&DeploymentConfig::default(), owner, Address::derive("admin"))
        .unwrap();
    (net, owner)
}

fn units(text: &str) -> u128 {
    parse_units(text, 18).unwrap()
}

fn supply_matches_balances(net: &Devnet) -> bool {
    let ledger = net.ledger();
    ledger.holders().map(|(_, b)| b).sum::<u128>() == ledger.total_supply()
}

// ---------------------------------------------------------------------------
// Delegated transfers
// ---------------------------------------------------------------------------

#[test]
fn delegated_transfer_spends_the_whole_allowance() {
    let (mut net, owner) = devnet();
    let delegate = Address::derive("delegate");
    let limit = units("15.5");

    // Grant the delegate a pull limit.
    let approval = net.execute(
        owner,
        Call::Approve {
            spender: delegate,
            amount: limit,
        },
    );
    assert!(approval.is_success());
    assert_eq!(
        approval.events,
        vec![Event::Approval {
            owner,
            spender: delegate,
            value: limit,
        }]
    );

    // The delegate pulls the owner's funds to itself.
    let pull = net.execute(
        delegate,
        Call::TransferFrom {
            owner,
            to: delegate,
            amount: limit,
        },
    );
    assert!(pull.is_success());
    assert_eq!(
        pull.events,
        vec![Event::Transfer {
            from: owner,
            to: delegate,
            value: limit,
        }]
    );

    assert_eq!(net.ledger().balance_of(&owner), units("84.5"));
    assert_eq!(net.ledger().balance_of(&delegate), units("15.5"));
    assert_eq!(net.ledger().allowance(&owner, &delegate), 0);
    assert!(supply_matches_balances(&net));
}

#[test]
fn pull_beyond_allowance_reverts() {
    let (mut net, owner) = devnet();
    let delegate = Address::derive("delegate");
    net.execute(
        owner,
        Call::Approve {
            spender: delegate,
            amount: units("1"),
        },
    );

    let receipt = net.execute(
        delegate,
        Call::TransferFrom {
            owner,
            to: delegate,
            amount: units("1.000000000000000001"),
        },
    );
    assert_eq!(receipt.revert_reason(), Some("insufficient allowance"));
    assert_eq!(net.ledger().allowance(&owner, &delegate), units("1"));
    assert_eq!(net.ledger().balance_of(&delegate), 0);
}

#[test]
fn allowance_may_exceed_balance_but_pull_may_not() {
    let (mut net, owner) = devnet();
    let delegate = Address::derive("delegate");
    let approval = net.execute(
        owner,
        Call::Approve {
            spender: delegate,
            amount: units("1000"),
        },
    );
    assert!(approval.is_success());

    let receipt = net.execute(
        delegate,
        Call::TransferFrom {
            owner,
            to: delegate,
            amount: units("101"),
        },
    );
    assert_eq!(receipt.revert_reason(), Some("insufficient balance"));
    assert_eq!(net.ledger().allowance(&owner, &delegate), units("1000"));
}

// ---------------------------------------------------------------------------
// Mint authorization
// ---------------------------------------------------------------------------

#[test]
fn stranger_cannot_mint() {
    let (mut net, owner) = devnet();
    let stranger = Address::derive("stranger");
    let supply = net.ledger().total_supply();

    let receipt = net.execute(
        stranger,
        Call::Mint {
            amount: units("1"),
            to: stranger,
        },
    );
    assert_eq!(
        receipt.revert_reason(),
        Some("You are not authorized to manage this contract")
    );
    assert_eq!(net.ledger().total_supply(), supply);
    assert_eq!(net.ledger().balance_of(&stranger), 0);
    assert_eq!(net.ledger().balance_of(&owner), units("100"));
}

#[test]
fn manager_handover_moves_mint_rights() {
    let (mut net, owner) = devnet();
    let treasury = Address::derive("treasury");

    assert!(net
        .execute(owner, Call::SetManager { manager: treasury })
        .is_success());

    let denied = net.execute(
        owner,
        Call::Mint {
            amount: 1,
            to: owner,
        },
    );
    assert!(!denied.is_success());

    let minted = net.execute(
        treasury,
        Call::Mint {
            amount: 1,
            to: treasury,
        },
    );
    assert!(minted.is_success());
    assert_eq!(net.ledger().total_supply(), units("100") + 1);
    assert!(supply_matches_balances(&net));
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

#[test]
fn self_transfer_succeeds_and_emits() {
    let (mut net, owner) = devnet();
    let receipt = net.execute(
        owner,
        Call::Transfer {
            amount: units("1"),
            to: owner,
        },
    );
    assert!(receipt.is_success());
    assert_eq!(receipt.events.len(), 1);
    assert_eq!(net.ledger().balance_of(&owner), units("100"));
}

#[test]
fn supply_invariant_holds_across_mixed_traffic() {
    let (mut net, owner) = devnet();
    let alice = Address::derive("alice");
    let bob = Address::derive("bob");

    let calls = [
        (owner, Call::Transfer { amount: units("30"), to: alice }),
        (alice, Call::Transfer { amount: units("10"), to: bob }),
        (bob, Call::Approve { spender: alice, amount: units("5") }),
        (alice, Call::TransferFrom { owner: bob, to: alice, amount: units("5") }),
        (owner, Call::Mint { amount: units("7"), to: bob }),
        (bob, Call::Transfer { amount: units("50"), to: alice }),
    ];
    for (from, call) in calls {
        net.execute(from, call);
        assert!(supply_matches_balances(&net));
    }

    assert_eq!(net.ledger().balance_of(&alice), units("25"));
    assert_eq!(net.ledger().balance_of(&bob), units("12"));
    assert_eq!(net.ledger().total_supply(), units("107"));
}
