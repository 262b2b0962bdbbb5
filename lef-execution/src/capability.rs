//! Role checks and role administration.

use crate::error::{LedgerError, Result};
use lef_types::address::{Address, NULL_ADDRESS};
use lef_types::state::{Capabilities, Role};
use tracing::info;

pub fn require(caps: &Capabilities, caller: &Address, role: Role) -> Result<()> {
    if caps.has(caller, role) {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized(role))
    }
}

pub fn grant_reporter(caps: &mut Capabilities, caller: &Address, reporter: Address) -> Result<()> {
    require(caps, caller, Role::Admin)?;
    if reporter == NULL_ADDRESS {
        return Err(LedgerError::ZeroAddress);
    }
    if caps.grant(reporter, Role::Reporter) {
        info!(reporter = %hex::encode(reporter), "reporter granted");
    }
    Ok(())
}

pub fn revoke_reporter(caps: &mut Capabilities, caller: &Address, reporter: &Address) -> Result<()> {
    require(caps, caller, Role::Admin)?;
    if caps.revoke(reporter, Role::Reporter) {
        info!(reporter = %hex::encode(reporter), "reporter revoked");
    }
    Ok(())
}

pub fn transfer_admin(caps: &mut Capabilities, caller: &Address, new_admin: Address) -> Result<()> {
    require(caps, caller, Role::Admin)?;
    if new_admin == NULL_ADDRESS {
        return Err(LedgerError::ZeroAddress);
    }
    caps.revoke(caller, Role::Admin);
    caps.grant(new_admin, Role::Admin);
    info!(new_admin = %hex::encode(new_admin), "admin transferred");
    Ok(())
}

/// Moves registry write authority to a single new holder.
pub fn transfer_registry_authority(
    caps: &mut Capabilities,
    caller: &Address,
    new_authority: Address,
) -> Result<()> {
    if !caps.has(caller, Role::RegistryAuthority) && !caps.has(caller, Role::Admin) {
        return Err(LedgerError::Unauthorized(Role::RegistryAuthority));
    }
    if new_authority == NULL_ADDRESS {
        return Err(LedgerError::ZeroAddress);
    }
    for holder in caps.holders(Role::RegistryAuthority) {
        caps.revoke(&holder, Role::RegistryAuthority);
    }
    caps.grant(new_authority, Role::RegistryAuthority);
    info!(authority = %hex::encode(new_authority), "registry authority transferred");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = [1u8; 32];
    const OTHER: Address = [2u8; 32];

    fn caps() -> Capabilities {
        let mut caps = Capabilities::default();
        caps.grant(ADMIN, Role::Admin);
        caps.grant(ADMIN, Role::RegistryAuthority);
        caps
    }

    #[test]
    fn only_admin_manages_reporters() {
        let mut caps = caps();
        assert_eq!(
            grant_reporter(&mut caps, &OTHER, OTHER),
            Err(LedgerError::Unauthorized(Role::Admin))
        );
        grant_reporter(&mut caps, &ADMIN, OTHER).unwrap();
        assert!(caps.has(&OTHER, Role::Reporter));
        // Admin holds no reporter role itself.
        assert!(!caps.has(&ADMIN, Role::Reporter));
        revoke_reporter(&mut caps, &ADMIN, &OTHER).unwrap();
        assert!(!caps.has(&OTHER, Role::Reporter));
    }

    #[test]
    fn registry_authority_moves_to_single_holder() {
        let mut caps = caps();
        transfer_registry_authority(&mut caps, &ADMIN, OTHER).unwrap();
        assert_eq!(caps.holders(Role::RegistryAuthority), vec![OTHER]);
        assert_eq!(
            transfer_registry_authority(&mut caps, &OTHER, NULL_ADDRESS),
            Err(LedgerError::ZeroAddress)
        );
    }

    #[test]
    fn admin_transfer_revokes_previous_admin() {
        let mut caps = caps();
        transfer_admin(&mut caps, &ADMIN, OTHER).unwrap();
        assert!(caps.has(&OTHER, Role::Admin));
        assert!(!caps.has(&ADMIN, Role::Admin));
    }
}
