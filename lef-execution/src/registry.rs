//! Curated set of good-spend destinations.

use crate::capability::require;
use crate::error::{LedgerError, Result};
use lef_types::address::{Address, NULL_ADDRESS};
use lef_types::instruction::DestinationCategory;
use lef_types::state::{Capabilities, Destination, RegistryState, Role};
use tracing::info;

pub fn register(
    registry: &mut RegistryState,
    caps: &Capabilities,
    caller: &Address,
    destination: Address,
    name: String,
    category: DestinationCategory,
    now: u64,
) -> Result<()> {
    require(caps, caller, Role::RegistryAuthority)?;
    if destination == NULL_ADDRESS {
        return Err(LedgerError::ZeroAddress);
    }

    match registry.destinations.get_mut(&destination) {
        Some(existing) if existing.registered => return Err(LedgerError::AlreadyRegistered),
        // Re-activation keeps the cumulative receipts and the list position.
        Some(existing) => {
            existing.registered = true;
            existing.name = name;
            existing.category = category;
            existing.registered_at = now;
        }
        None => {
            registry.destinations.insert(
                destination,
                Destination {
                    address: destination,
                    registered: true,
                    name,
                    category,
                    total_received: 0,
                    registered_at: now,
                },
            );
            registry.order.push(destination);
        }
    }

    info!(destination = %hex::encode(destination), category = category.as_str(), "destination registered");
    Ok(())
}

pub fn remove(
    registry: &mut RegistryState,
    caps: &Capabilities,
    caller: &Address,
    destination: &Address,
) -> Result<()> {
    require(caps, caller, Role::RegistryAuthority)?;
    let entry = registry
        .destinations
        .get_mut(destination)
        .filter(|d| d.registered)
        .ok_or(LedgerError::NotRegistered)?;
    entry.registered = false;
    info!(destination = %hex::encode(destination), "destination removed");
    Ok(())
}

pub fn record_good_spend(
    registry: &mut RegistryState,
    caps: &Capabilities,
    caller: &Address,
    destination: &Address,
    amount: u128,
) -> Result<()> {
    require(caps, caller, Role::LedgerWriter)?;
    let entry = registry
        .destinations
        .get_mut(destination)
        .filter(|d| d.registered)
        .ok_or(LedgerError::NotAGoodDestination)?;
    entry.total_received = entry
        .total_received
        .checked_add(amount)
        .ok_or(LedgerError::Overflow)?;
    registry.total_good_spend = registry
        .total_good_spend
        .checked_add(amount)
        .ok_or(LedgerError::Overflow)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lef_types::LEDGER_ADDRESS;

    const AUTHORITY: Address = [1u8; 32];
    const CHARITY: Address = [5u8; 32];

    fn setup() -> (RegistryState, Capabilities) {
        let mut caps = Capabilities::default();
        caps.grant(AUTHORITY, Role::RegistryAuthority);
        caps.grant(LEDGER_ADDRESS, Role::LedgerWriter);
        (RegistryState::default(), caps)
    }

    fn add(registry: &mut RegistryState, caps: &Capabilities, now: u64) -> Result<()> {
        register(registry, caps, &AUTHORITY, CHARITY, "Food Bank".into(), DestinationCategory::Charity, now)
    }

    #[test]
    fn register_rejects_duplicates_and_zero() {
        let (mut registry, caps) = setup();
        add(&mut registry, &caps, 1).unwrap();
        assert!(registry.is_good_destination(&CHARITY));
        assert_eq!(add(&mut registry, &caps, 2), Err(LedgerError::AlreadyRegistered));
        assert_eq!(
            register(&mut registry, &caps, &AUTHORITY, NULL_ADDRESS, "x".into(), DestinationCategory::Other, 1),
            Err(LedgerError::ZeroAddress)
        );
        assert_eq!(
            register(&mut registry, &caps, &CHARITY, [6u8; 32], "x".into(), DestinationCategory::Other, 1),
            Err(LedgerError::Unauthorized(Role::RegistryAuthority))
        );
    }

    #[test]
    fn removal_is_a_flag_flip() {
        let (mut registry, caps) = setup();
        add(&mut registry, &caps, 1).unwrap();
        record_good_spend(&mut registry, &caps, &LEDGER_ADDRESS, &CHARITY, 40).unwrap();
        remove(&mut registry, &caps, &AUTHORITY, &CHARITY).unwrap();

        assert!(!registry.is_good_destination(&CHARITY));
        assert_eq!(registry.order, vec![CHARITY]);
        assert_eq!(registry.destination(&CHARITY).unwrap().total_received, 40);
        assert_eq!(registry.active_count(), 0);
        assert_eq!(remove(&mut registry, &caps, &AUTHORITY, &CHARITY), Err(LedgerError::NotRegistered));

        add(&mut registry, &caps, 9).unwrap();
        assert_eq!(registry.order.len(), 1);
        assert_eq!(registry.destination(&CHARITY).unwrap().total_received, 40);
    }

    #[test]
    fn good_spend_recording_is_ledger_only() {
        let (mut registry, caps) = setup();
        assert_eq!(
            record_good_spend(&mut registry, &caps, &LEDGER_ADDRESS, &CHARITY, 1),
            Err(LedgerError::NotAGoodDestination)
        );
        add(&mut registry, &caps, 1).unwrap();
        assert_eq!(
            record_good_spend(&mut registry, &caps, &AUTHORITY, &CHARITY, 1),
            Err(LedgerError::Unauthorized(Role::LedgerWriter))
        );
        record_good_spend(&mut registry, &caps, &LEDGER_ADDRESS, &CHARITY, 25).unwrap();
        record_good_spend(&mut registry, &caps, &LEDGER_ADDRESS, &CHARITY, 5).unwrap();
        assert_eq!(registry.total_good_spend, 30);
    }
}
