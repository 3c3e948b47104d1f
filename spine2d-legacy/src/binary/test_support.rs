#![allow(dead_code)]

//! Byte writers for assembling `.skel` fixtures in tests.

pub(crate) fn push_varint(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut b = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            b |= 0x80;
        }
        out.push(b);
        if value == 0 {
            break;
        }
    }
}

/// Negative values take all five bytes with the continuation bit set on the last.
pub(crate) fn push_int(out: &mut Vec<u8>, value: i32) {
    if value >= 0 {
        push_varint(out, value as u32);
        return;
    }
    let bits = value as u32;
    for i in 0..5 {
        out.push((((bits >> (7 * i)) & 0x7f) as u8) | 0x80);
    }
}

pub(crate) fn push_f32_be(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn push_u16_be(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn push_bool(out: &mut Vec<u8>, v: bool) {
    out.push(u8::from(v));
}

pub(crate) fn push_color(out: &mut Vec<u8>, rgba: [u8; 4]) {
    out.extend_from_slice(&rgba);
}

pub(crate) fn push_string(out: &mut Vec<u8>, s: Option<&str>) {
    match s {
        None => push_varint(out, 0),
        Some(s) if s.is_empty() => push_varint(out, 1),
        Some(s) => {
            let bytes = s.as_bytes();
            push_varint(out, (bytes.len() as u32) + 1);
            out.extend_from_slice(bytes);
        }
    }
}

pub(crate) fn push_floats(out: &mut Vec<u8>, values: &[f32]) {
    push_varint(out, values.len() as u32);
    for v in values {
        push_f32_be(out, *v);
    }
}

pub(crate) fn assert_approx(a: f32, b: f32, eps: f32, ctx: &str) {
    if (a - b).abs() > eps {
        panic!("{ctx}: expected {b}, got {a} (diff {})", (a - b).abs());
    }
}

pub(crate) fn assert_slice_approx(a: &[f32], b: &[f32], eps: f32, ctx: &str) {
    assert_eq!(a.len(), b.len(), "{ctx}: length");
    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        assert_approx(x, y, eps, &format!("{ctx}[{i}]"));
    }
}
