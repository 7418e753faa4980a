pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Quantize a `[0, 1]` factor to a byte, rounding to nearest.
pub(crate) fn unit_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div255_identities() {
        assert_eq!(mul_div255_u8(255, 255), 255);
        assert_eq!(mul_div255_u8(0, 255), 0);
        assert_eq!(mul_div255_u8(200, 255), 200);
        assert_eq!(mul_div255_u8(255, 128), 128);
    }

    #[test]
    fn unit_to_u8_rounds_and_clamps() {
        assert_eq!(unit_to_u8(0.5), 128);
        assert_eq!(unit_to_u8(0.01), 3);
        assert_eq!(unit_to_u8(-1.0), 0);
        assert_eq!(unit_to_u8(2.0), 255);
    }
}
