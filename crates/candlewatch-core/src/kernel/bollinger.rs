use super::sma::sma;

/// Bollinger Bands over `prices`, period `period`, `m` standard deviations.
///
/// Returns `(upper, middle, lower)`, each length `len(prices)`. `middle` is
/// the SMA; `sigma` is the sample-population standard deviation over the
/// same window; `upper = middle + m*sigma`, `lower = middle - m*sigma`.
pub fn bollinger_bands(
    prices: &[f64],
    period: usize,
    m: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let middle = sma(prices, period);
    if middle.is_empty() {
        return (Vec::new(), Vec::new(), Vec::new());
    }

    let mut upper = vec![None; prices.len()];
    let mut lower = vec![None; prices.len()];

    if period > prices.len() {
        return (upper, middle, lower);
    }

    for i in (period - 1)..prices.len() {
        let mean = middle[i].expect("sma defined past warm-up");
        let window = &prices[i - period + 1..=i];
        let variance =
            window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / period as f64;
        let sigma = variance.sqrt();
        upper[i] = Some(mean + m * sigma);
        lower[i] = Some(mean - m * sigma);
    }

    (upper, middle, lower)
}

/// The three Bollinger Band Width normalizations, aligned to the BB inputs.
pub struct BandWidth {
    pub abs: Vec<Option<f64>>,
    pub norm: Vec<Option<f64>>,
    pub pct: Vec<Option<f64>>,
}

pub fn bb_width(
    upper: &[Option<f64>],
    middle: &[Option<f64>],
    lower: &[Option<f64>],
) -> BandWidth {
    let n = upper.len();
    let mut abs = vec![None; n];
    let mut norm = vec![None; n];
    let mut pct = vec![None; n];

    for i in 0..n {
        if let (Some(u), Some(l)) = (upper[i], lower[i]) {
            let width = u - l;
            abs[i] = Some(width);
            if let Some(mid) = middle[i] {
                if mid != 0.0 {
                    let normalized = width / mid;
                    norm[i] = Some(normalized);
                    pct[i] = Some(normalized * 100.0);
                }
            }
        }
    }

    BandWidth { abs, norm, pct }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_bracket_the_middle() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0, 2.0];
        let (upper, middle, lower) = bollinger_bands(&prices, 5, 2.0);
        for i in 0..prices.len() {
            if let (Some(u), Some(mid), Some(l)) = (upper[i], middle[i], lower[i]) {
                assert!(l <= mid && mid <= u);
            }
        }
    }

    #[test]
    fn width_normalizations_agree() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0, 2.0];
        let (upper, middle, lower) = bollinger_bands(&prices, 5, 2.0);
        let width = bb_width(&upper, &middle, &lower);
        for i in 0..prices.len() {
            if let (Some(a), Some(n)) = (width.abs[i], width.norm[i]) {
                let u = upper[i].unwrap();
                let l = lower[i].unwrap();
                assert!((a - (u - l)).abs() < 1e-9);
                assert!((width.pct[i].unwrap() - n * 100.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn zero_middle_leaves_normalized_width_undefined() {
        let upper = vec![Some(1.0)];
        let middle = vec![Some(0.0)];
        let lower = vec![Some(-1.0)];
        let width = bb_width(&upper, &middle, &lower);
        assert_eq!(width.abs[0], Some(2.0));
        assert_eq!(width.norm[0], None);
        assert_eq!(width.pct[0], None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Bollinger width is never negative, and `lower <= upper` wherever
        /// both are defined, for any finite price series and non-negative
        /// multiplier (spec §8 universal invariant).
        #[test]
        fn width_is_non_negative_and_bands_ordered(
            prices in prop::collection::vec(-10_000.0f64..10_000.0, 0..60),
            period in 1usize..20,
            m in 0.0f64..5.0,
        ) {
            let (upper, middle, lower) = bollinger_bands(&prices, period, m);
            let width = bb_width(&upper, &middle, &lower);
            for i in 0..prices.len() {
                if let (Some(u), Some(l)) = (upper[i], lower[i]) {
                    prop_assert!(l <= u);
                }
                if let Some(a) = width.abs[i] {
                    prop_assert!(a >= 0.0);
                }
            }
        }
    }
}
