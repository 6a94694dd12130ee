use crate::packing::{
    pack_scalar_signed, pack_scalar_unsigned, pack_triple_32, unpack_scalar_signed,
    unpack_scalar_unsigned, unpack_triple_32, QUAT48_SIGN_BIT,
};

#[test]
fn unsigned_round_trip_error_is_bounded() {
    for bits in [10u32, 11, 15, 16] {
        let step = 1.0 / ((1u32 << bits) - 1) as f64;
        for sample in 0..=100 {
            let value = sample as f64 / 100.0;
            let packed = pack_scalar_unsigned(value, bits);
            let unpacked = unpack_scalar_unsigned(packed, bits) as f64;
            assert!(
                (unpacked - value).abs() <= step * 0.5 + 1.0e-6,
                "{bits} bits: {value} -> {unpacked}"
            );
        }
    }
}

#[test]
fn signed_round_trip_error_is_bounded() {
    for bits in [10u32, 11, 15, 16] {
        let step = 2.0 / ((1u32 << bits) - 1) as f64;
        for sample in -100i32..=100 {
            let value = sample as f64 / 100.0;
            let packed = pack_scalar_signed(value, bits);
            let unpacked = unpack_scalar_signed(packed, bits) as f64;
            assert!(
                (unpacked - value).abs() <= step * 0.5 + 1.0e-6,
                "{bits} bits: {value} -> {unpacked}"
            );
        }
    }
}

#[test]
fn out_of_range_inputs_are_clamped() {
    assert_eq!(pack_scalar_unsigned(-0.25, 16), 0);
    assert_eq!(pack_scalar_unsigned(1.25, 16), 65535);
    assert_eq!(pack_scalar_signed(-1.5, 15), 0);
    assert_eq!(pack_scalar_signed(1.5, 15), 32767);
}

#[test]
fn endpoints_are_exact() {
    assert_eq!(pack_scalar_unsigned(0.0, 16), 0);
    assert_eq!(pack_scalar_unsigned(1.0, 16), 65535);
    assert_eq!(unpack_scalar_unsigned(65535, 16), 1.0);
    assert_eq!(unpack_scalar_signed(0, 15), -1.0);
    assert_eq!(unpack_scalar_signed(32767, 15), 1.0);
}

#[test]
fn fifteen_bit_packing_leaves_the_sign_bit_clear() {
    let packed = pack_scalar_signed(1.0, 15);
    assert_eq!(packed, 0x7FFF);
    assert_eq!(packed as u16 & QUAT48_SIGN_BIT, 0);
}

#[test]
fn triple_32_layout_is_11_11_10_high_to_low() {
    assert_eq!(pack_triple_32(0x7FF, 0, 0), 0xFFE0_0000);
    assert_eq!(pack_triple_32(0, 0x7FF, 0), 0x001F_FC00);
    assert_eq!(pack_triple_32(0, 0, 0x3FF), 0x0000_03FF);

    let word = pack_triple_32(0x123, 0x456, 0x2AB);
    assert_eq!(unpack_triple_32(word), (0x123, 0x456, 0x2AB));
}
