//! Handlers for the user-facing commands.
//!
//! Each handler turns one request into a [`Reply`]. Expected rejections
//! (bad plate text, capacity, ownership) are replies, not errors; only a
//! failed registry write is returned as `Err`.
use crate::lookup::ViolationLookup;
use crate::plate::Plate;
use crate::registry::{OwnerId, RegisterOutcome, RemoveOutcome, SharedRegistry};
use crate::reply::{self, Reply};
use anyhow::Result;

pub fn check(lookup: &dyn ViolationLookup, raw: &str) -> Reply {
    let plate = match Plate::parse(raw) {
        Ok(plate) => plate,
        Err(err) => {
            tracing::debug!(error = %err, "check rejected");
            return reply::invalid_format();
        }
    };
    reply::outcome_reply(&lookup.lookup(&plate))
}

pub fn register(registry: &SharedRegistry, owner: OwnerId, raw: &str) -> Result<Reply> {
    Ok(match registry.register(raw, owner)? {
        RegisterOutcome::Registered(plate) => reply::registered(&plate),
        RegisterOutcome::AlreadyRegistered(plate) => reply::already_registered(&plate),
        RegisterOutcome::LimitReached { max } => reply::limit_reached(max),
        RegisterOutcome::OwnedByOther(plate) => {
            tracing::info!(plate = %plate, owner = %owner, "plate already owned by another user");
            reply::owned_by_other(&plate)
        }
        RegisterOutcome::InvalidFormat(_) => reply::invalid_format(),
    })
}

pub fn list(registry: &SharedRegistry, owner: OwnerId) -> Reply {
    reply::plate_list(&registry.list(owner), registry.max_plates())
}

pub fn remove(registry: &SharedRegistry, owner: OwnerId, raw: &str) -> Result<Reply> {
    Ok(match registry.remove(raw, owner)? {
        RemoveOutcome::Removed(plate) => reply::removed(&plate),
        RemoveOutcome::NotFoundOrNotOwner => reply::not_found_or_not_owner(),
        RemoveOutcome::InvalidFormat(_) => reply::invalid_format(),
    })
}
