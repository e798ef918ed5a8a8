//! Script templates and scriptSig helpers.

pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;

/// Shortest DER signature plus hash-type byte accepted by the shape check.
pub const MIN_SIG_PUSH: usize = 6;
/// 72-byte DER signature plus hash-type byte.
pub const MAX_SIG_PUSH: usize = 73;
pub const COMPRESSED_PUBKEY_LEN: usize = 33;
pub const UNCOMPRESSED_PUBKEY_LEN: usize = 65;

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut s = Vec::with_capacity(25);
    s.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
    s.extend_from_slice(pubkey_hash);
    s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    s
}

/// Minimal data push.
pub fn push_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut out = Vec::with_capacity(len + 5);
    if len < OP_PUSHDATA1 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
    out
}

/// `push(signature || hash_type) push(pubkey)`
pub fn build_script_sig(signature_with_hash_type: &[u8], pubkey: &[u8]) -> Vec<u8> {
    let mut s = push_data(signature_with_hash_type);
    s.extend_from_slice(&push_data(pubkey));
    s
}

/// Heuristic check that `script` is exactly two direct pushes: a signature
/// of plausible DER length, then a compressed or uncompressed public key.
///
/// Returns a short reason on failure. Not a script interpreter.
pub fn check_script_sig_shape(script: &[u8]) -> Result<(), String> {
    if script.len() < 2 {
        return Err(format!("scriptSig too short ({} bytes)", script.len()));
    }

    let sig_len = script[0] as usize;
    if !(MIN_SIG_PUSH..=MAX_SIG_PUSH).contains(&sig_len) {
        return Err(format!("signature push of {} bytes", sig_len));
    }
    let pk_at = 1 + sig_len;
    let pk_len = match script.get(pk_at) {
        Some(&b) => b as usize,
        None => return Err("missing public key push".into()),
    };
    if pk_len != COMPRESSED_PUBKEY_LEN && pk_len != UNCOMPRESSED_PUBKEY_LEN {
        return Err(format!("public key push of {} bytes", pk_len));
    }
    let end = pk_at + 1 + pk_len;
    if end != script.len() {
        return Err(format!(
            "pushes cover {} bytes of a {}-byte scriptSig",
            end,
            script.len()
        ));
    }
    Ok(())
}

pub fn script_sig_shape_ok(script: &[u8]) -> bool {
    check_script_sig_shape(script).is_ok()
}
