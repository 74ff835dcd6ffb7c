/// Key layout and encoding utilities for the fjall store partitions
///
/// Partition structure:
/// - `lists`: {name}\0{position:i64 sign-flipped, big-endian} -> value
/// - `hashes`: {name}\0{field} -> value
/// - `sets`: {name}\0{member} -> empty
/// - `counters`: {name} -> i64 (big-endian)
/// - `list_bounds`: {name} -> head position and length, see [`encode_list_bounds`]

const SEPARATOR: u8 = 0;

/// Prefix shared by every entry of one list/hash/set: {name}\0
pub fn encode_member_prefix(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 1);
    key.extend_from_slice(name.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Encode a hash field or set member key: {name}\0{member}
pub fn encode_member_key(name: &str, member: &str) -> Vec<u8> {
    let mut key = encode_member_prefix(name);
    key.extend_from_slice(member.as_bytes());
    key
}

/// Decode the member part of a {name}\0{member} key
pub fn decode_member_key(name: &str, key: &[u8]) -> Option<String> {
    let rest = key.strip_prefix(encode_member_prefix(name).as_slice())?;
    String::from_utf8(rest.to_vec()).ok()
}

/// Encode a list element key: {name}\0{position}
///
/// Positions are signed so a list can grow at both ends; flipping the sign
/// bit keeps big-endian byte order equal to numeric order.
pub fn encode_list_key(name: &str, position: i64) -> Vec<u8> {
    let mut key = encode_member_prefix(name);
    key.extend_from_slice(&((position as u64) ^ (1 << 63)).to_be_bytes());
    key
}

/// Encode the bounds of a non-empty list: head position and length
///
/// The list occupies positions `head..head + len`.
pub fn encode_list_bounds(head: i64, len: u64) -> [u8; 16] {
    let mut bytes = [0; 16];
    bytes[..8].copy_from_slice(&head.to_be_bytes());
    bytes[8..].copy_from_slice(&len.to_be_bytes());
    bytes
}

/// Decode list bounds written by [`encode_list_bounds`]
pub fn decode_list_bounds(bytes: &[u8]) -> Option<(i64, u64)> {
    let bytes: [u8; 16] = bytes.try_into().ok()?;
    let head = i64::from_be_bytes(bytes[..8].try_into().ok()?);
    let len = u64::from_be_bytes(bytes[8..].try_into().ok()?);
    Some((head, len))
}

/// Encode a counter value
pub fn encode_counter(value: i64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Decode a counter value
pub fn decode_counter(bytes: &[u8]) -> Option<i64> {
    let bytes: [u8; 8] = bytes.try_into().ok()?;
    Some(i64::from_be_bytes(bytes))
}
