/// 32-byte account identity. External actors use their ed25519 verifying key bytes.
pub type Address = [u8; 32];

/// Mint source and burn sink.
pub const NULL_ADDRESS: Address = [0u8; 32];

/// Holds collected fees and minted reward bonuses; carries the ledger-writer capability.
pub const LEDGER_ADDRESS: Address = module_address(b"lef/ledger");

/// Identity the governance engine acts under when it mutates the destination registry.
pub const GOVERNANCE_ADDRESS: Address = module_address(b"lef/governance");

const fn module_address(tag: &[u8]) -> Address {
    let mut out = [0xffu8; 32];
    let mut i = 0;
    while i < tag.len() && i < 32 {
        out[i] = tag[i];
        i += 1;
    }
    out
}

pub fn parse_address(s: &str) -> Result<Address, hex::FromHexError> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(s.trim_start_matches("0x"), &mut out)?;
    Ok(out)
}

pub fn format_address(address: &Address) -> String {
    hex::encode(address)
}

/// True for identities that are never ordinary holders.
pub fn is_system_address(address: &Address) -> bool {
    *address == NULL_ADDRESS || *address == LEDGER_ADDRESS
}
