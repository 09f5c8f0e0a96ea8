//! Identifier generation

use bech32::Bech32m;
use uuid7::uuid7;

// time ordered uuid, bech32m encoded under the given prefix, e.g. `appt_1...`
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    Ok(bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?)
}

/// True when `id` decodes as bech32 under the expected prefix.
pub fn has_prefix(id: &str, hrp: &str) -> bool {
    match bech32::decode(id) {
        Ok((decoded, _)) => decoded.as_str() == hrp,
        Err(_) => false,
    }
}
