//! Texture to CPU readback

use quadbatch_core::PixelRect;

use crate::error::GpuError;

/// Row pitch of a `width`-pixel RGBA8 copy, rounded up to wgpu's alignment
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop the row padding of a mapped readback buffer.
pub fn strip_padding(bytes: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let padded = padded_bytes_per_row(width) as usize;
    let row = width as usize * 4;
    if bytes.len() < padded * height as usize {
        return None;
    }

    let mut out = Vec::with_capacity(row * height as usize);
    for line in bytes.chunks(padded).take(height as usize) {
        out.extend_from_slice(&line[..row]);
    }
    Some(out)
}

/// Copy `rect` of an RGBA8 `texture` into tightly packed rows, top row first.
pub fn read_texture_region(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    rect: PixelRect,
) -> Result<Vec<u8>, GpuError> {
    let bytes_per_row = padded_bytes_per_row(rect.width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Quad Readback Buffer"),
        size: bytes_per_row as u64 * rect.height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Quad Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: rect.x,
                y: rect.y,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(rect.height),
            },
        },
        wgpu::Extent3d {
            width: rect.width,
            height: rect.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv().unwrap_or(Err(wgpu::BufferAsyncError))?;

    let data = slice.get_mapped_range();
    let pixels = strip_padding(&data, rect.width, rect.height);
    drop(data);
    buffer.unmap();

    pixels.ok_or(GpuError::PixelData {
        expected: rect.byte_len(),
        actual: 0,
    })
}
