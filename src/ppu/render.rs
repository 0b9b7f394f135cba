// Scanline rasterizer: backgrounds (modes 0-5) then sprites, composited by
// priority. Pixel format throughout is the native GBA RGB555-in-u16.

use super::{AffineParams, Ppu, SCREEN_WIDTH};

fn palette_color(palette: &[u8], index: usize) -> u16 {
    let off = (index & 0x1FF) * 2;
    palette[off] as u16 | ((palette[off + 1] as u16) << 8)
}

fn vram_u16(vram: &[u8], addr: usize) -> u16 {
    if addr + 1 >= vram.len() {
        return 0;
    }
    vram[addr] as u16 | ((vram[addr + 1] as u16) << 8)
}

struct ScreenSize {
    width_tiles: u32,
    height_tiles: u32,
}

fn text_screen_size(size_bits: u16) -> ScreenSize {
    match size_bits & 0b11 {
        0 => ScreenSize { width_tiles: 32, height_tiles: 32 },
        1 => ScreenSize { width_tiles: 64, height_tiles: 32 },
        2 => ScreenSize { width_tiles: 32, height_tiles: 64 },
        _ => ScreenSize { width_tiles: 64, height_tiles: 64 },
    }
}

fn text_bg_texel(
    vram: &[u8],
    palette: &[u8],
    bgcnt: u16,
    scx: u32,
    scy: u32,
) -> Option<u16> {
    let size = text_screen_size(bgcnt >> 14);
    let screen_base = ((bgcnt as usize >> 8) & 0x1F) * 0x800;
    let char_base = ((bgcnt as usize >> 2) & 0x3) * 0x4000;
    let eightbpp = bgcnt & (1 << 7) != 0;

    let tx = (scx / 8) % size.width_tiles;
    let ty = (scy / 8) % size.height_tiles;
    let block = match (size.width_tiles, size.height_tiles) {
        (64, 32) => (tx / 32) as usize,
        (32, 64) => (ty / 32) as usize,
        (64, 64) => ((ty / 32) * 2 + (tx / 32)) as usize,
        _ => 0,
    };
    let local_tx = tx % 32;
    let local_ty = ty % 32;
    let entry_addr = screen_base + block * 0x800 + ((local_ty * 32 + local_tx) as usize) * 2;
    let entry = vram_u16(vram, entry_addr);

    let tile_num = (entry & 0x3FF) as usize;
    let hflip = entry & (1 << 10) != 0;
    let vflip = entry & (1 << 11) != 0;
    let pal_bank = ((entry >> 12) & 0xF) as usize;

    let mut px = (scx % 8) as usize;
    let mut py = (scy % 8) as usize;
    if hflip {
        px = 7 - px;
    }
    if vflip {
        py = 7 - py;
    }

    if eightbpp {
        let tile_bytes = char_base + tile_num * 64;
        let idx = tile_bytes + py * 8 + px;
        let color_index = *vram.get(idx)?;
        if color_index == 0 {
            return None;
        }
        Some(palette_color(palette, color_index as usize))
    } else {
        let tile_bytes = char_base + tile_num * 32;
        let idx = tile_bytes + py * 4 + px / 2;
        let byte = *vram.get(idx)?;
        let nibble = if px % 2 == 0 { byte & 0xF } else { byte >> 4 };
        if nibble == 0 {
            return None;
        }
        Some(palette_color(palette, pal_bank * 16 + nibble as usize))
    }
}

fn render_text_bg(
    ppu: &Ppu,
    palette: &[u8],
    vram: &[u8],
    line: usize,
    bg: usize,
    buf: &mut [u16; SCREEN_WIDTH],
    priority: &mut [u8; SCREEN_WIDTH],
) {
    let bgcnt = ppu.bgcnt[bg];
    let prio = (bgcnt & 0b11) as u8;
    let scy = (line as u32).wrapping_add(ppu.bgvofs[bg] as u32);
    for x in 0..SCREEN_WIDTH {
        let scx = (x as u32).wrapping_add(ppu.bghofs[bg] as u32);
        if let Some(color) = text_bg_texel(vram, palette, bgcnt, scx, scy) {
            if prio <= priority[x] {
                buf[x] = color;
                priority[x] = prio;
            }
        }
    }
}

fn affine_bg_texel(
    vram: &[u8],
    palette: &[u8],
    bgcnt: u16,
    affine: &AffineParams,
    line: i32,
    screen_x: i32,
) -> Option<u16> {
    let size_tiles = 16i32 << ((bgcnt >> 14) & 0b11);
    let size_px = size_tiles * 8;
    let wrap = bgcnt & (1 << 13) != 0;
    let screen_base = ((bgcnt as usize >> 8) & 0x1F) * 0x800;
    let char_base = ((bgcnt as usize >> 2) & 0x3) * 0x4000;

    let row_x = affine.x + affine.pb as i32 * line;
    let row_y = affine.y + affine.pd as i32 * line;
    let tex_x_raw = (row_x + affine.pa as i32 * screen_x) >> 8;
    let tex_y_raw = (row_y + affine.pc as i32 * screen_x) >> 8;

    let (tex_x, tex_y) = if wrap {
        (tex_x_raw.rem_euclid(size_px), tex_y_raw.rem_euclid(size_px))
    } else {
        if tex_x_raw < 0 || tex_x_raw >= size_px || tex_y_raw < 0 || tex_y_raw >= size_px {
            return None;
        }
        (tex_x_raw, tex_y_raw)
    };

    let tx = (tex_x / 8) as usize;
    let ty = (tex_y / 8) as usize;
    let map_tile_count = (size_tiles) as usize;
    let entry_addr = screen_base + ty * map_tile_count + tx;
    let tile_num = *vram.get(entry_addr)? as usize;

    let px = (tex_x % 8) as usize;
    let py = (tex_y % 8) as usize;
    let idx = char_base + tile_num * 64 + py * 8 + px;
    let color_index = *vram.get(idx)?;
    if color_index == 0 {
        return None;
    }
    Some(palette_color(palette, color_index as usize))
}

fn render_affine_bg(
    ppu: &Ppu,
    palette: &[u8],
    vram: &[u8],
    line: usize,
    bg: usize,
    buf: &mut [u16; SCREEN_WIDTH],
    priority: &mut [u8; SCREEN_WIDTH],
) {
    let bgcnt = ppu.bgcnt[bg];
    let prio = (bgcnt & 0b11) as u8;
    let affine = &ppu.bg_affine[bg - 2];
    for x in 0..SCREEN_WIDTH {
        if let Some(color) = affine_bg_texel(vram, palette, bgcnt, affine, line as i32, x as i32) {
            if prio <= priority[x] {
                buf[x] = color;
                priority[x] = prio;
            }
        }
    }
}

fn render_bitmap_mode3(vram: &[u8], line: usize, buf: &mut [u16; SCREEN_WIDTH]) {
    let base = line * SCREEN_WIDTH * 2;
    for x in 0..SCREEN_WIDTH {
        buf[x] = vram_u16(vram, base + x * 2);
    }
}

fn render_bitmap_mode4(ppu: &Ppu, palette: &[u8], vram: &[u8], line: usize, buf: &mut [u16; SCREEN_WIDTH]) {
    let page = if ppu.dispcnt & (1 << 4) != 0 { 0xA000 } else { 0 };
    let base = page + line * SCREEN_WIDTH;
    for x in 0..SCREEN_WIDTH {
        let idx = *vram.get(base + x).unwrap_or(&0);
        buf[x] = palette_color(palette, idx as usize);
    }
}

fn render_bitmap_mode5(ppu: &Ppu, palette: &[u8], vram: &[u8], line: usize, buf: &mut [u16; SCREEN_WIDTH]) {
    const W: usize = 160;
    const H: usize = 128;
    let page = if ppu.dispcnt & (1 << 4) != 0 { 0xA000 } else { 0 };
    if line >= H {
        let backdrop = palette_color(palette, 0);
        buf.fill(backdrop);
        return;
    }
    let base = page + line * W * 2;
    for x in 0..W {
        buf[x] = vram_u16(vram, base + x * 2);
    }
    let backdrop = palette_color(palette, 0);
    for x in W..SCREEN_WIDTH {
        buf[x] = backdrop;
    }
}

struct SpriteShape {
    width: u32,
    height: u32,
}

fn sprite_shape(shape: u16, size: u16) -> SpriteShape {
    match (shape, size) {
        (0, 0) => SpriteShape { width: 8, height: 8 },
        (0, 1) => SpriteShape { width: 16, height: 16 },
        (0, 2) => SpriteShape { width: 32, height: 32 },
        (0, 3) => SpriteShape { width: 64, height: 64 },
        (1, 0) => SpriteShape { width: 16, height: 8 },
        (1, 1) => SpriteShape { width: 32, height: 8 },
        (1, 2) => SpriteShape { width: 32, height: 16 },
        (1, 3) => SpriteShape { width: 64, height: 32 },
        (2, 0) => SpriteShape { width: 8, height: 16 },
        (2, 1) => SpriteShape { width: 8, height: 32 },
        (2, 2) => SpriteShape { width: 16, height: 32 },
        _ => SpriteShape { width: 32, height: 64 },
    }
}

fn oam_affine_params(oam: &[u8], group: usize) -> (i32, i32, i32, i32) {
    let read_i16 = |entry: usize| -> i32 {
        let addr = entry * 8 + 6;
        if addr + 1 >= oam.len() {
            return 0x100; // identity-ish fallback
        }
        (oam[addr] as u16 | ((oam[addr + 1] as u16) << 8)) as i16 as i32
    };
    (
        read_i16(group * 4),
        read_i16(group * 4 + 1),
        read_i16(group * 4 + 2),
        read_i16(group * 4 + 3),
    )
}

fn render_sprites(
    ppu: &Ppu,
    palette: &[u8],
    vram: &[u8],
    oam: &[u8],
    line: usize,
    buf: &mut [u16; SCREEN_WIDTH],
    bg_priority: &mut [u8; SCREEN_WIDTH],
) {
    let one_d_mapping = ppu.dispcnt & (1 << 6) != 0;
    let obj_vram_base = 0x1_0000usize;

    for entry in 0..128 {
        let base = entry * 8;
        if base + 6 > oam.len() {
            break;
        }
        let attr0 = oam[base] as u16 | ((oam[base + 1] as u16) << 8);
        let attr1 = oam[base + 2] as u16 | ((oam[base + 3] as u16) << 8);
        let attr2 = oam[base + 4] as u16 | ((oam[base + 5] as u16) << 8);

        let rotation = attr0 & (1 << 8) != 0;
        if !rotation && attr0 & (1 << 9) != 0 {
            continue; // disabled
        }

        let shape = (attr0 >> 14) & 0b11;
        let size = (attr1 >> 14) & 0b11;
        let dims = sprite_shape(shape, size);
        let double_size = rotation && attr0 & (1 << 9) != 0;
        let bb_w = if double_size { dims.width * 2 } else { dims.width };
        let bb_h = if double_size { dims.height * 2 } else { dims.height };

        let y0 = (attr0 & 0xFF) as i32;
        let y = if y0 + (bb_h as i32) > 256 { y0 - 256 } else { y0 };
        if (line as i32) < y || (line as i32) >= y + bb_h as i32 {
            continue;
        }

        let x0 = (attr1 & 0x1FF) as i32;
        let x = if x0 >= 240 && x0 + (bb_w as i32) > 512 { x0 - 512 } else { x0 };

        let eightbpp = attr0 & (1 << 13) != 0;
        let tile_num = (attr2 & 0x3FF) as usize;
        let priority = ((attr2 >> 10) & 0b11) as u8;
        let pal_bank = ((attr2 >> 12) & 0xF) as usize;

        let (pa, pb, pc, pd) = if rotation {
            let group = ((attr1 >> 9) & 0x1F) as usize;
            oam_affine_params(oam, group)
        } else {
            let hflip = attr1 & (1 << 12) != 0;
            let vflip = attr1 & (1 << 13) != 0;
            (
                if hflip { -256 } else { 256 },
                0,
                0,
                if vflip { -256 } else { 256 },
            )
        };

        let half_w = bb_w as i32 / 2;
        let half_h = bb_h as i32 / 2;
        let dy = (line as i32) - y - half_h;

        for sx in 0..bb_w as i32 {
            let screen_x = x + sx;
            if !(0..SCREEN_WIDTH as i32).contains(&screen_x) {
                continue;
            }
            let dx = sx - half_w;
            let tex_x = ((pa * dx + pb * dy) >> 8) + dims.width as i32 / 2;
            let tex_y = ((pc * dx + pd * dy) >> 8) + dims.height as i32 / 2;
            if tex_x < 0 || tex_x >= dims.width as i32 || tex_y < 0 || tex_y >= dims.height as i32 {
                continue;
            }

            let tiles_w = dims.width as usize / 8;
            let tile_col = tex_x as usize / 8;
            let tile_row = tex_y as usize / 8;
            let tile_index = if one_d_mapping {
                tile_num + tile_row * tiles_w * if eightbpp { 2 } else { 1 }
                    + tile_col * if eightbpp { 2 } else { 1 }
            } else {
                tile_num + tile_row * 32 + tile_col * if eightbpp { 2 } else { 1 }
            };
            let px = tex_x as usize % 8;
            let py = tex_y as usize % 8;

            let color = if eightbpp {
                let idx = obj_vram_base + tile_index * 64 + py * 8 + px;
                let c = *vram.get(idx).unwrap_or(&0);
                if c == 0 {
                    continue;
                }
                palette_color(palette, 256 + c as usize)
            } else {
                let idx = obj_vram_base + tile_index * 32 + py * 4 + px / 2;
                let byte = *vram.get(idx).unwrap_or(&0);
                let nibble = if px % 2 == 0 { byte & 0xF } else { byte >> 4 };
                if nibble == 0 {
                    continue;
                }
                palette_color(palette, 256 + pal_bank * 16 + nibble as usize)
            };

            let sxu = screen_x as usize;
            if priority <= bg_priority[sxu] {
                buf[sxu] = color;
                bg_priority[sxu] = priority;
            }
        }
    }
}

pub fn render_scanline(ppu: &mut Ppu, palette: &[u8], vram: &[u8], oam: &[u8], line: usize) {
    let backdrop = palette_color(palette, 0);
    let mut buf = [backdrop; SCREEN_WIDTH];

    if !ppu.forced_blank() {
        let mut priority = [4u8; SCREEN_WIDTH];
        match ppu.bg_mode() {
            0 => {
                for bg in 0..4 {
                    if ppu.screen_on(bg) {
                        render_text_bg(ppu, palette, vram, line, bg, &mut buf, &mut priority);
                    }
                }
            }
            1 => {
                for bg in 0..2 {
                    if ppu.screen_on(bg) {
                        render_text_bg(ppu, palette, vram, line, bg, &mut buf, &mut priority);
                    }
                }
                if ppu.screen_on(2) {
                    render_affine_bg(ppu, palette, vram, line, 2, &mut buf, &mut priority);
                }
            }
            2 => {
                if ppu.screen_on(2) {
                    render_affine_bg(ppu, palette, vram, line, 2, &mut buf, &mut priority);
                }
                if ppu.screen_on(3) {
                    render_affine_bg(ppu, palette, vram, line, 3, &mut buf, &mut priority);
                }
            }
            3 => render_bitmap_mode3(vram, line, &mut buf),
            4 => render_bitmap_mode4(ppu, palette, vram, line, &mut buf),
            _ => render_bitmap_mode5(ppu, palette, vram, line, &mut buf),
        }

        if ppu.obj_enabled() {
            render_sprites(ppu, palette, vram, oam, line, &mut buf, &mut priority);
        }
    }

    let fb_off = line * SCREEN_WIDTH;
    ppu.framebuffer[fb_off..fb_off + SCREEN_WIDTH].copy_from_slice(&buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::Ppu;

    #[test]
    fn mode3_bitmap_reads_vram_directly_as_rgb555() {
        let mut ppu = Ppu::new();
        ppu.dispcnt = 3;
        let palette = vec![0u8; 0x400];
        let mut vram = vec![0u8; 0x1_8000];
        vram[0] = 0x34;
        vram[1] = 0x7A;
        render_scanline(&mut ppu, &palette, &vram, &[], 0);
        assert_eq!(ppu.framebuffer[0], 0x7A34);
    }

    #[test]
    fn mode4_uses_selected_page() {
        let mut ppu = Ppu::new();
        ppu.dispcnt = 4 | (1 << 4); // mode 4, page 1
        let mut palette = vec![0u8; 0x400];
        palette[2] = 0xFF;
        palette[3] = 0x7F;
        let mut vram = vec![0u8; 0x1_8000];
        vram[0xA000] = 1;
        render_scanline(&mut ppu, &palette, &vram, &[], 0);
        assert_eq!(ppu.framebuffer[0], 0x7FFF);
    }

    #[test]
    fn forced_blank_produces_backdrop_line() {
        let mut ppu = Ppu::new();
        ppu.dispcnt = 1 << 7;
        let mut palette = vec![0u8; 0x400];
        palette[0] = 0xAA;
        palette[1] = 0x2A;
        render_scanline(&mut ppu, &palette, &vec![0; 0x1_8000], &[], 0);
        assert_eq!(ppu.framebuffer[0], 0x2AAA);
    }
}
