//! Generated avatars for commenters
//!
//! A 10x10 grid, mirrored left to right, in a dark base color and a bright
//! highlight. Cells light up from noise plus how many of their neighbours in
//! the row above are lit, which gives blobby shapes instead of static. The
//! same seed always yields the same picture.

use md5::Md5;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::Digest;

pub const IDENTICON_CONTENT_TYPE: &str = "image/svg+xml";

const GRID: usize = 10;
const HALF: usize = GRID / 2;
const CELL_PX: usize = 8;
const HIGHLIGHT_THRESHOLD: f64 = 0.85;
const ROW_ABOVE_WEIGHT: f64 = 0.35;
/// Degrees of hue next to the base color that clash with it
const CLASH_SPAN: f64 = 160.0;
const MAX_HUE_TRIES: usize = 100;

/// Renders the identicon for `seed` as an SVG document.
pub fn identicon_svg(seed: &str) -> String {
    let mut rng = seeded_rng(seed);

    let base_hue = rng.gen_range(0.0..360.0);
    let highlight_hue = pick_highlight_hue(&mut rng, base_hue);
    let base = hsv_to_hex(
        base_hue,
        0.68 + rng.gen_range(0.0..0.31),
        0.10 + rng.gen_range(0.0..0.19),
    );
    let highlight = hsv_to_hex(
        highlight_hue,
        0.47 + rng.gen_range(0.0..0.31),
        0.60 + rng.gen_range(0.0..0.31),
    );

    let size = GRID * CELL_PX;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}" shape-rendering="crispEdges"><rect width="{size}" height="{size}" fill="{base}"/>"#
    );
    for (y, row) in cells(&mut rng).iter().enumerate() {
        for (x, _) in row.iter().enumerate().filter(|(_, lit)| **lit) {
            for column in [x, GRID - 1 - x] {
                svg.push_str(&format!(
                    r#"<rect x="{}" y="{}" width="{CELL_PX}" height="{CELL_PX}" fill="{highlight}"/>"#,
                    column * CELL_PX,
                    y * CELL_PX,
                ));
            }
        }
    }
    svg.push_str("</svg>");
    svg
}

fn seeded_rng(seed: &str) -> StdRng {
    let digest = Md5::digest(seed.as_bytes());
    let mut state = [0u8; 8];
    state.copy_from_slice(&digest[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(state))
}

fn pick_highlight_hue(rng: &mut StdRng, base_hue: f64) -> f64 {
    let (start, end) = if base_hue > 120.0 && base_hue < 240.0 {
        (base_hue, base_hue + CLASH_SPAN)
    } else {
        (base_hue - CLASH_SPAN, base_hue)
    };
    let clashes = |hue: f64| {
        [hue, hue + 360.0, hue - 360.0]
            .iter()
            .any(|h| *h > start && *h < end)
    };

    let mut hue = rng.gen_range(0.0..360.0);
    for _ in 0..MAX_HUE_TRIES {
        if !clashes(hue) {
            break;
        }
        hue = rng.gen_range(0.0..360.0);
    }
    hue
}

/// Left half of the grid; the right half mirrors it.
fn cells(rng: &mut StdRng) -> [[bool; HALF]; GRID] {
    let mut grid = [[false; HALF]; GRID];
    for y in 0..GRID {
        let above: [usize; HALF] = if y == 0 {
            [0; HALF]
        } else {
            std::array::from_fn(|x| lit_above(&grid[y - 1], x))
        };
        let average = above.iter().sum::<usize>() as f64 / HALF as f64;

        for x in 0..HALF {
            let from_above = if average > 0.0 {
                above[x] as f64 / average
            } else {
                0.2
            };
            let noise: f64 = rng.gen_range(0.0..1.0);
            grid[y][x] = from_above * ROW_ABOVE_WEIGHT + noise > HIGHLIGHT_THRESHOLD;
        }
    }
    grid
}

fn lit_above(row: &[bool; HALF], x: usize) -> usize {
    [(x + HALF - 1) % HALF, x, (x + 1) % HALF]
        .iter()
        .filter(|&&i| row[i])
        .count()
}

fn hsv_to_hex(hue: f64, saturation: f64, value: f64) -> String {
    let chroma = value * saturation;
    let sector = hue.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = value - chroma;
    let channel = |v: f64| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}
