//! Pure helpers for vehicle identifiers.

/// Numeric id the peer derives from a vehicle name: the first four bytes of
/// the name's MD5 digest, read big-endian.
pub fn hashed_vehicle_id(name: &str) -> u32 {
    let md5::Digest(bytes) = md5::compute(name.as_bytes());
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// External id under which a named vehicle shows up in the registry.
pub fn external_id_for(name: &str) -> String {
    hashed_vehicle_id(name).to_string()
}

/// Splits a comma-separated id list, keeping order and dropping empty entries.
pub fn parse_id_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
