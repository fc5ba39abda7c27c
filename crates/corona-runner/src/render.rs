//! Rasterizes snapshots into RGB frames.

use corona_core::HealthState;
use corona_world::Snapshot;
use image::{Rgb, RgbImage};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Fixed colour per health state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb<u8>; 5],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: [
                Rgb([86, 180, 233]),
                Rgb([240, 228, 66]),
                Rgb([213, 94, 0]),
                Rgb([0, 114, 178]),
                Rgb([204, 121, 167]),
            ],
        }
    }
}

impl Palette {
    pub fn color(&self, state: HealthState) -> Rgb<u8> {
        self.colors[state.index()]
    }
}

/// Paint one `tile_size` square per agent onto a white canvas
pub fn render(snapshot: &Snapshot, palette: &Palette, tile_size: u32) -> RgbImage {
    let tile = tile_size.max(1);
    let width = snapshot.width.max(0) as u32 * tile;
    let height = snapshot.height.max(0) as u32 * tile;
    let mut frame = RgbImage::from_pixel(width, height, BACKGROUND);

    for agent in &snapshot.agents {
        let color = palette.color(agent.state);
        let left = agent.x as u32 * tile;
        let top = agent.y as u32 * tile;
        for y in top..top + tile {
            for x in left..left + tile {
                frame.put_pixel(x, y, color);
            }
        }
    }

    frame
}
