//! Colors as packed `0xRRGGBBAA` literals.

use vek::*;


pub fn hex_color(hex: u32) -> Rgba<f32> {
    Rgba {
        r: ((hex & 0xFF000000) >> 24) as f32 / 255.0,
        g: ((hex & 0x00FF0000) >> 16) as f32 / 255.0,
        b: ((hex & 0x0000FF00) >> 8) as f32 / 255.0,
        a: (hex & 0x000000FF) as f32 / 255.0,
    }
}


#[test]
fn test_hex_color_channels() {
    let c = hex_color(0x4020C880);
    assert!((c.r - 64.0 / 255.0).abs() < 1e-6);
    assert!((c.g - 32.0 / 255.0).abs() < 1e-6);
    assert!((c.b - 200.0 / 255.0).abs() < 1e-6);
    assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
}
