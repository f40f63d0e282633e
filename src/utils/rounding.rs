/// Round `value` to `decimals` places (half away from zero)
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_two_decimals() {
        assert_relative_eq!(round_to(99.4811, 2), 99.48);
        assert_relative_eq!(round_to(0.4349, 2), 0.43);
        assert_relative_eq!(round_to(2.0, 2), 2.0);
        assert_relative_eq!(round_to(-1.236, 2), -1.24);
    }
}
