//! Density field and shading properties over whole frames.

use kernel::density::{INNER_COLOR, THRESHOLD};
use kernel::{density_at, shade, ChargeArrays, CpuEvaluator, DensityEvaluator, PixelBuffer};

fn charges_at(points: &[[f32; 2]]) -> ChargeArrays {
    let mut charges = ChargeArrays::zeroed(points.len());
    for (i, &p) in points.iter().enumerate() {
        charges.set(i, p, [0.0, 0.0]).unwrap();
    }
    charges
}

fn render(charges: &ChargeArrays, width: u32, height: u32) -> PixelBuffer {
    let mut out = PixelBuffer::new(width, height);
    CpuEvaluator::new().render(charges, &mut out).unwrap();
    out
}

#[test]
fn isolated_charge_follows_inverse_square() {
    // The far charge adds ~1e-6 at the sample points.
    let positions = [100.0, 100.0, 1100.0, 700.0];
    for r in [12.0_f32, 20.0, 35.0, 60.0] {
        let d = density_at(&positions, 100.0 + r, 100.0);
        let expected = 1.0 / (r * r);
        assert!(
            (d - expected).abs() / expected < 1e-2,
            "r={r}: {d} vs {expected}"
        );
    }
}

#[test]
fn charge_on_a_pixel_saturates_to_inner_color() {
    let charges = charges_at(&[[4.0, 3.0]]);
    let out = render(&charges, 8, 8);
    assert_eq!(out.pixel(4, 3), Some(INNER_COLOR));
}

#[test]
fn empty_layout_renders_black() {
    let out = render(&ChargeArrays::zeroed(0), 16, 9);
    assert!(out.as_bytes().iter().all(|&b| b == 0));
}

#[test]
fn glow_at_the_threshold_stays_below_full_brightness() {
    // 100 * 0.008 = 0.8 -> (204, 40.8, 81.6)
    assert_eq!(shade(THRESHOLD), [204, 40, 81]);
    let [r, g, b] = shade(THRESHOLD * 0.99);
    assert!(r < 204 && g <= 40 && b <= 81);
}

#[test]
fn pixels_near_a_charge_are_inner_and_far_pixels_glow() {
    let charges = charges_at(&[[32.5, 32.5]]);
    let out = render(&charges, 64, 64);

    // d = 1 / (0.5^2 + 0.5^2) = 2
    assert_eq!(out.pixel(32, 32), Some(INNER_COLOR));
    // d = 1 / (31.5^2 * 2) ~ 5e-4 -> glow, not inner
    let corner = out.pixel(1, 1).unwrap();
    assert_ne!(corner, INNER_COLOR);
    assert!(corner[0] > 0);
}

#[test]
fn frame_is_symmetric_about_a_centred_charge() {
    let charges = charges_at(&[[10.0, 10.0]]);
    let out = render(&charges, 21, 21);
    for y in 0..21 {
        for x in 0..21 {
            assert_eq!(out.pixel(x, y), out.pixel(20 - x, y), "({x}, {y})");
            assert_eq!(out.pixel(x, y), out.pixel(x, 20 - y), "({x}, {y})");
        }
    }
}

#[test]
fn glow_brightens_toward_the_charge() {
    let charges = charges_at(&[[0.0, 0.0]]);
    let out = render(&charges, 64, 1);
    let mut last = 255u8;
    for x in 12..64 {
        let [r, _, _] = out.pixel(x, 0).unwrap();
        assert!(r <= last, "x={x}: {r} > {last}");
        last = r;
    }
}

#[test]
fn rendering_is_deterministic() {
    let charges = charges_at(&[[3.25, 7.5], [40.0, 2.0], [20.0, 20.0]]);
    assert_eq!(render(&charges, 48, 32), render(&charges, 48, 32));
}
