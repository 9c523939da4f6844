//! Headless renderer: paints the world into an RGBA image, plus a recorder that saves
//! numbered PNG frames.
//!
//! Everything is drawn with three soft-edged primitives over an opaque canvas. The
//! letter bar runs along the top with one slot per letter, the throttle gauge hangs
//! just under it, and the rest of the canvas is the world seen through the scrolled
//! view.

use crate::{
    scene::DEFAULT_K,
    util_hex_color::hex_color,
    wheel::MAX_WHEEL_FORCE,
    world::{World, N_WHEELS},
};
use anyhow::Result;
use image::RgbaImage;
use std::{
    f64::consts::PI,
    fs,
    path::PathBuf,
};
use vek::*;


const VOID_COLOR: u32 = 0xFFFFDDFF;
const BAR_COLOR: u32 = 0xBBDD33FF;
const BAR_TEXT_COLOR: u32 = 0x445511FF;
const BAR_TEXT_HIGH_COLOR: u32 = 0xFFFFFFFF;
const LINE_COLOR: u32 = 0x60200033;
const PLATFORM_COLOR: u32 = 0x00808080;
const RIGHT_FORCE_COLOR: u32 = 0x0000FF33;
const LEFT_FORCE_COLOR: u32 = 0xFF000033;
const LETTER_COLOR: u32 = 0x4020C880;
const LETTER_CUP_COLOR: u32 = 0x4020C8BF;
const WHEEL_COLOR: u32 = 0x202020C0;
const BODY_COLOR: u32 = 0x606060A0;


/// Draw one frame of the world.
pub fn draw_world(world: &World) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(
        world.width as u32,
        world.height as u32,
        to_u8(hex_color(VOID_COLOR)),
    );
    let view = Vec2::new(world.view_x, 0.0);

    for p in &world.platforms {
        if p.right.x <= p.left.x {
            continue;
        }
        // the surface line is the underside, so lift the stroke onto the slab
        let lift = p.surface() * (p.height * 0.5);
        draw_line(
            &mut img,
            p.left - view + lift,
            p.right - view + lift,
            p.height,
            hex_color(PLATFORM_COLOR),
        );
    }

    for dot in &world.dots {
        for spring in &dot.springs {
            let stroke = world.dot_size * spring.k / (2.0 * DEFAULT_K);
            draw_line(
                &mut img,
                dot.pos - view,
                world.dots[spring.to].pos - view,
                stroke,
                hex_color(LINE_COLOR),
            );
        }
    }

    for (i, dot) in world.dots.iter().enumerate() {
        let center = dot.pos - view;
        if i < N_WHEELS {
            fill_circle(&mut img, center, dot.radius, hex_color(WHEEL_COLOR));
            let spin = dot.angle + world.wheels[i].spin;
            for quarter in 0..2 {
                let a = spin + quarter as f64 * (PI * 0.5);
                let rim = center + Vec2::new(a.cos(), a.sin()) * dot.radius;
                draw_line(&mut img, center, rim, world.dot_size * 0.1, hex_color(LINE_COLOR));
            }
        } else if i < world.i_letter_dots {
            fill_circle(&mut img, center, dot.radius, hex_color(BODY_COLOR));
            let rim = center
                + Vec2::new(dot.angle.cos(), dot.angle.sin()) * dot.radius;
            draw_line(&mut img, center, rim, world.dot_size * 0.1, hex_color(LINE_COLOR));
        } else {
            fill_circle(&mut img, center, dot.radius, hex_color(LETTER_COLOR));
            fill_half_circle(
                &mut img,
                center,
                dot.radius,
                dot.angle + PI * 0.5,
                hex_color(LETTER_CUP_COLOR),
            );
        }
    }

    let bar_h = world.dot_size;
    fill_rect(&mut img, 0.0, 0.0, world.width, bar_h, hex_color(BAR_COLOR));
    for (u, &have) in world.have_letters.iter().enumerate() {
        let x = ((u as f64 - 13.0) * 0.03 + 0.5) * world.width;
        let s = bar_h * 0.25;
        let color = if have { BAR_TEXT_HIGH_COLOR } else { BAR_TEXT_COLOR };
        fill_rect(
            &mut img,
            x - s,
            bar_h * 0.5 - s,
            x + s,
            bar_h * 0.5 + s,
            hex_color(color),
        );
    }

    let f = world.wheel_force / MAX_WHEEL_FORCE;
    let cx = world.width * 0.5;
    let (x0, x1, color) = if f >= 0.0 {
        (cx, cx + f * cx, RIGHT_FORCE_COLOR)
    } else {
        (cx + f * cx, cx, LEFT_FORCE_COLOR)
    };
    fill_rect(&mut img, x0, bar_h, x1, bar_h * 1.25, hex_color(color));

    img
}

/// Saves numbered PNG frames into a directory.
pub struct FrameRecorder {
    dir: PathBuf,
    frame: u64,
}

impl FrameRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FrameRecorder { dir, frame: 0 })
    }

    pub fn record(&mut self, img: &RgbaImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.frame));
        img.save(&path)?;
        self.frame += 1;
        Ok(())
    }
}

fn to_u8(color: Rgba<f32>) -> image::Rgba<u8> {
    image::Rgba([
        (color.r * 255.0).round() as u8,
        (color.g * 255.0).round() as u8,
        (color.b * 255.0).round() as u8,
        (color.a * 255.0).round() as u8,
    ])
}

/// Source-over blend of one pixel. Off-canvas coordinates are ignored.
fn blend_pixel(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<f32>) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    let a = color.a;
    let blend = |dst: u8, src: f32| ((src * a + (dst as f32 / 255.0) * (1.0 - a)) * 255.0).round() as u8;
    px.0 = [
        blend(px.0[0], color.r),
        blend(px.0[1], color.g),
        blend(px.0[2], color.b),
        255,
    ];
}

fn fill_rect(img: &mut RgbaImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgba<f32>) {
    let px0 = (x0.floor() as i64).max(0);
    let px1 = (x1.ceil() as i64).min(img.width() as i64);
    let py0 = (y0.floor() as i64).max(0);
    let py1 = (y1.ceil() as i64).min(img.height() as i64);
    for y in py0..py1 {
        for x in px0..px1 {
            let cx = x as f64 + 0.5;
            let cy = y as f64 + 0.5;
            if cx >= x0 && cx < x1 && cy >= y0 && cy < y1 {
                blend_pixel(img, x, y, color);
            }
        }
    }
}

fn circle_box(img: &RgbaImage, center: Vec2<f64>, radius: f64) -> (i64, i64, i64, i64) {
    let x0 = ((center.x - radius).floor() as i64).max(0);
    let x1 = ((center.x + radius).ceil() as i64).min(img.width() as i64);
    let y0 = ((center.y - radius).floor() as i64).max(0);
    let y1 = ((center.y + radius).ceil() as i64).min(img.height() as i64);
    (x0, x1, y0, y1)
}

fn fill_circle(img: &mut RgbaImage, center: Vec2<f64>, radius: f64, color: Rgba<f32>) {
    let (x0, x1, y0, y1) = circle_box(img, center, radius);
    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f64 + 0.5, y as f64 + 0.5) - center;
            if p.magnitude_squared() <= radius * radius {
                blend_pixel(img, x, y, color);
            }
        }
    }
}

/// Half disc on the side the given angle points at.
fn fill_half_circle(img: &mut RgbaImage, center: Vec2<f64>, radius: f64, angle: f64, color: Rgba<f32>) {
    let dir = Vec2::new(angle.cos(), angle.sin());
    let (x0, x1, y0, y1) = circle_box(img, center, radius);
    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f64 + 0.5, y as f64 + 0.5) - center;
            if p.magnitude_squared() <= radius * radius && p.dot(dir) >= 0.0 {
                blend_pixel(img, x, y, color);
            }
        }
    }
}

/// Stroke a segment with round caps.
fn draw_line(img: &mut RgbaImage, a: Vec2<f64>, b: Vec2<f64>, width: f64, color: Rgba<f32>) {
    let half = width * 0.5;
    let x0 = ((a.x.min(b.x) - half).floor() as i64).max(0);
    let x1 = ((a.x.max(b.x) + half).ceil() as i64).min(img.width() as i64);
    let y0 = ((a.y.min(b.y) - half).floor() as i64).max(0);
    let y1 = ((a.y.max(b.y) + half).ceil() as i64).min(img.height() as i64);
    let ab = b - a;
    let len2 = ab.magnitude_squared();
    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f64 + 0.5, y as f64 + 0.5);
            let t = if len2 == 0.0 {
                0.0
            } else {
                ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
            };
            if (p - (a + ab * t)).magnitude() <= half {
                blend_pixel(img, x, y, color);
            }
        }
    }
}


#[test]
fn test_draw_world_paints_bar_and_void() {
    let w = World::new(960.0, 540.0, 27.0, 1);
    let img = draw_world(&w);
    assert_eq!(img.width(), 960);
    assert_eq!(img.height(), 540);
    // inside the letter bar, left of the first slot
    assert_eq!(img.get_pixel(5, 5).0, [0xBB, 0xDD, 0x33, 255]);
    // open sky
    assert_eq!(img.get_pixel(900, 300).0, [0xFF, 0xFF, 0xDD, 255]);
}

#[test]
fn test_collected_letter_slot_lights_up() {
    let mut w = World::new(960.0, 540.0, 27.0, 1);
    // slot for letter A sits at x = 105.6
    let before = draw_world(&w);
    assert_eq!(before.get_pixel(105, 13).0, [0x44, 0x55, 0x11, 255]);
    w.have_letters[0] = true;
    let after = draw_world(&w);
    assert_eq!(after.get_pixel(105, 13).0, [0xFF, 0xFF, 0xFF, 255]);
}

#[test]
fn test_blend_pixel_composites_alpha() {
    let mut img = RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
    blend_pixel(&mut img, 0, 0, Rgba::new(1.0, 0.0, 0.0, 0.5));
    assert_eq!(img.get_pixel(0, 0).0, [128, 0, 0, 255]);
}

#[test]
fn test_draw_line_strokes_to_width() {
    let mut img = RgbaImage::from_pixel(20, 20, image::Rgba([0, 0, 0, 255]));
    draw_line(
        &mut img,
        Vec2::new(2.0, 10.0),
        Vec2::new(17.0, 10.0),
        2.0,
        Rgba::new(1.0, 1.0, 1.0, 1.0),
    );
    assert_eq!(img.get_pixel(10, 10).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(10, 14).0, [0, 0, 0, 255]);
}

#[test]
fn test_fill_circle_covers_center_not_corner() {
    let mut img = RgbaImage::from_pixel(20, 20, image::Rgba([0, 0, 0, 255]));
    fill_circle(&mut img, Vec2::new(10.0, 10.0), 5.0, Rgba::new(1.0, 1.0, 1.0, 1.0));
    assert_eq!(img.get_pixel(10, 10).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 255]);
}

#[test]
fn test_fill_half_circle_spares_the_far_side() {
    let mut img = RgbaImage::from_pixel(20, 20, image::Rgba([0, 0, 0, 255]));
    fill_half_circle(&mut img, Vec2::new(10.0, 10.0), 5.0, 0.0, Rgba::new(1.0, 1.0, 1.0, 1.0));
    assert_eq!(img.get_pixel(13, 10).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(7, 10).0, [0, 0, 0, 255]);
}

#[test]
fn test_frame_recorder_writes_numbered_files() {
    let dir = std::env::temp_dir().join(format!("jalopy-recorder-test-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    let mut recorder = FrameRecorder::new(&dir).unwrap();
    let img = RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
    recorder.record(&img).unwrap();
    recorder.record(&img).unwrap();
    assert!(dir.join("frame_000000.png").is_file());
    assert!(dir.join("frame_000001.png").is_file());
    fs::remove_dir_all(&dir).unwrap();
}
