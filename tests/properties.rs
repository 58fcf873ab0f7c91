//! Property-based checks over random small captures: sample preservation
//! and the enhanced-mode green envelope hold for every Bayer layout,
//! iteration count and mode.

use bimba::{demosaic, CfaPattern, Channel, DcbParams, RawImage, RgbPlanes};
use proptest::prelude::*;

fn cfa_strategy() -> impl Strategy<Value = CfaPattern> {
    prop_oneof![
        Just(CfaPattern::rggb()),
        Just(CfaPattern::bggr()),
        Just(CfaPattern::grbg()),
        Just(CfaPattern::gbrg()),
    ]
}

fn capture_strategy() -> impl Strategy<Value = (usize, usize, Vec<f32>, CfaPattern)> {
    ((16usize..=40), (16usize..=40), cfa_strategy(), any::<u64>()).prop_map(
        |(w, h, cfa, seed)| {
            let mut state = seed;
            let data = (0..w * h)
                .map(|_| {
                    state = state
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    0.05 + 0.9 * ((state >> 40) as f32 / (1u64 << 24) as f32)
                })
                .collect();
            (w, h, data, cfa)
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn samples_survive_reconstruction(
        (w, h, data, cfa) in capture_strategy(),
        enhance in any::<bool>(),
        iterations in 1usize..=3,
    ) {
        let raw = RawImage::new(&data, w, h, cfa).unwrap();
        let mut planes = RgbPlanes::new(w, h);
        let params = DcbParams::default()
            .with_enhance(enhance)
            .with_iterations(iterations);
        demosaic(&raw, &params, &mut planes, None).unwrap();

        for y in 0..h {
            for x in 0..w {
                let ch = cfa.color_at(y, x) as usize;
                prop_assert_eq!(planes.pixel(y, x)[ch], data[y * w + x]);
            }
        }
    }

    #[test]
    fn enhanced_green_never_overshoots(
        (w, h, data, cfa) in capture_strategy(),
    ) {
        let raw = RawImage::new(&data, w, h, cfa).unwrap();
        let mut planes = RgbPlanes::new(w, h);
        demosaic(&raw, &DcbParams::default().with_enhance(true), &mut planes, None).unwrap();

        let margin = 8;
        for y in margin..h.saturating_sub(margin) {
            for x in margin..w.saturating_sub(margin) {
                if cfa.color_at(y, x) == Channel::Green {
                    continue;
                }
                let g = planes.pixel(y, x)[1];
                let n = [
                    planes.pixel(y - 1, x)[1],
                    planes.pixel(y + 1, x)[1],
                    planes.pixel(y, x - 1)[1],
                    planes.pixel(y, x + 1)[1],
                ];
                let lo = n.iter().cloned().fold(f32::INFINITY, f32::min);
                let hi = n.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
                prop_assert!(g >= lo - 1e-6 && g <= hi + 1e-6,
                    "green at ({}, {}) = {} outside [{}, {}]", y, x, g, lo, hi);
            }
        }
    }
}
