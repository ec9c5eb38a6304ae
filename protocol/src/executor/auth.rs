//! Authorization predicates.
//!
//! Three independent checks, each with its own failure:
//!
//! - input ownership: threshold of signers over an [`OutputOwners`], with
//!   multisig aliases resolved recursively,
//! - subnet control: the subnet owner set satisfied by the auth credential,
//! - node/consortium binding: the node key or its registered member signed.

use std::collections::BTreeSet;

use super::ExecError;
use crate::config::MAX_ALIAS_NESTING_DEPTH;
use crate::ids::{Address, Id, NodeId};
use crate::state::{AddressStateBit, Chain};
use crate::utxo::OutputOwners;

/// Whether `signers` satisfy `owners` at chain time `now`.
///
/// An owner address counts toward the threshold if it signed, or if it is
/// a multisig alias whose own owners are satisfied. Alias resolution stops
/// at [`MAX_ALIAS_NESTING_DEPTH`] and never revisits an alias on the
/// current path.
pub fn owners_satisfied(
    chain: &dyn Chain,
    owners: &OutputOwners,
    signers: &BTreeSet<Address>,
    now: u64,
) -> bool {
    let mut path = BTreeSet::new();
    satisfied_at(chain, owners, signers, now, 0, &mut path)
}

fn satisfied_at(
    chain: &dyn Chain,
    owners: &OutputOwners,
    signers: &BTreeSet<Address>,
    now: u64,
    depth: usize,
    path: &mut BTreeSet<Address>,
) -> bool {
    if owners.locktime > now {
        return false;
    }
    let threshold = owners.threshold as usize;
    if threshold == 0 {
        return true;
    }
    let mut count = 0usize;
    for addr in &owners.addrs {
        if signers.contains(addr) {
            count += 1;
        } else if depth < MAX_ALIAS_NESTING_DEPTH && !path.contains(addr) {
            if let Some(alias) = chain.multisig_alias(addr) {
                path.insert(*addr);
                if satisfied_at(chain, &alias.owners, signers, now, depth + 1, path) {
                    count += 1;
                }
                path.remove(addr);
            }
        }
        if count >= threshold {
            return true;
        }
    }
    false
}

/// The subnet owner set must be satisfied by the subnet auth credential.
pub fn verify_subnet_auth(
    chain: &dyn Chain,
    subnet_id: &Id,
    signers: &BTreeSet<Address>,
) -> Result<(), ExecError> {
    let owner = chain
        .subnet_owner(subnet_id)
        .ok_or(ExecError::SubnetNotFound)?;
    if owners_satisfied(chain, &owner, signers, chain.timestamp()) {
        Ok(())
    } else {
        Err(ExecError::UnauthorizedSubnetModification)
    }
}

/// `member` is a consortium member and its key (or alias owners) signed.
pub fn verify_consortium_member(
    chain: &dyn Chain,
    member: &Address,
    signers: &BTreeSet<Address>,
) -> Result<(), ExecError> {
    if member.is_empty() {
        return Err(ExecError::EmptyAddress);
    }
    if !chain
        .address_state(member)
        .has(AddressStateBit::Consortium)
    {
        return Err(ExecError::NotConsortiumMember);
    }
    if !signed_as(chain, member, signers) {
        return Err(ExecError::ConsortiumSignatureMissing);
    }
    Ok(())
}

/// The node key itself signed.
pub fn verify_node_signature(
    node_id: &NodeId,
    signers: &BTreeSet<Address>,
) -> Result<(), ExecError> {
    if signers.contains(&node_id.as_address()) {
        Ok(())
    } else {
        Err(ExecError::NodeSignatureMissing)
    }
}

/// Who may put `node_id` up for validation.
///
/// The node must be registered to a consortium member. With
/// `verify_node_signature` the node key must sign; otherwise the member
/// signs on its behalf.
pub fn verify_node_binding(
    chain: &dyn Chain,
    node_id: &NodeId,
    signers: &BTreeSet<Address>,
    verify_node_signature_enabled: bool,
) -> Result<Address, ExecError> {
    let member = chain
        .node_owner(node_id)
        .ok_or(ExecError::NodeNotRegistered)?;
    if verify_node_signature_enabled {
        verify_node_signature(node_id, signers)?;
    } else if !signed_as(chain, &member, signers) {
        return Err(ExecError::ConsortiumSignatureMissing);
    }
    Ok(member)
}

/// `address` signed directly, or is an alias whose owners signed.
pub fn signed_as(chain: &dyn Chain, address: &Address, signers: &BTreeSet<Address>) -> bool {
    owners_satisfied(
        chain,
        &OutputOwners::single(*address),
        signers,
        chain.timestamp(),
    )
}
